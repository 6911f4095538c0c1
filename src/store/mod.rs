use crate::api::models::Video;
use crate::device::DeviceClass;

/// What to do with a freshly measured playback duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUpdate {
    /// Measurement was unusable (non-finite or <= 0); nothing happens.
    Ignored,
    /// Within the hysteresis window of the stored value: show it, but skip
    /// the network write entirely.
    LocalOnly(u64),
    /// Worth persisting; carries the rounded whole-second value to send.
    Persist(u64),
}

/// Measurements this close to the stored duration (in seconds) are treated as
/// codec rounding noise and never written back.
const DURATION_HYSTERESIS_SECS: i64 = 2;

/// The canonical in-memory video list, newest first.
///
/// This is the only type that writes to the collection. Mutations follow the
/// optimistic pattern: `apply_*` changes the local record synchronously,
/// the caller then dispatches the matching request, and whichever response
/// arrives is fed back through [`VideoStore::update`], which replaces the
/// whole record with the server's copy. Replacement is deliberately an
/// overwrite, not a per-field merge; a concurrent local increment can be
/// transiently clobbered until its own response lands.
#[derive(Debug, Default)]
pub struct VideoStore {
    videos: Vec<Video>,
}

impl VideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Replace the whole collection with the server's list. The server
    /// already orders newest-first; the order is preserved as-is.
    pub fn replace_all(&mut self, videos: Vec<Video>) {
        self.videos = videos;
    }

    /// Prepend a newly created record so it appears before all existing ones.
    pub fn add(&mut self, video: Video) {
        self.videos.insert(0, video);
    }

    /// Reconcile: replace the record with a matching id with the server's
    /// copy. No-op when the id is unknown — never inserts.
    pub fn update(&mut self, video: Video) -> bool {
        match self.videos.iter_mut().find(|v| v.id == video.id) {
            Some(slot) => {
                *slot = video;
                true
            }
            None => false,
        }
    }

    /// Absence is an expected outcome, not an error.
    pub fn get_by_id(&self, id: &str) -> Option<&Video> {
        self.videos.iter().find(|v| v.id == id)
    }

    /// Optimistically count one view against a device bucket. Returns false
    /// when the id is unknown (nothing to dispatch in that case).
    pub fn apply_view(&mut self, id: &str, device: DeviceClass) -> bool {
        match self.videos.iter_mut().find(|v| v.id == id) {
            Some(v) => {
                v.analytics.views += 1;
                *v.analytics.devices.bucket_mut(device) += 1;
                true
            }
            None => false,
        }
    }

    /// Optimistically count one like.
    pub fn apply_like(&mut self, id: &str) -> bool {
        match self.videos.iter_mut().find(|v| v.id == id) {
            Some(v) => {
                v.likes += 1;
                true
            }
            None => false,
        }
    }

    /// Decide how to handle a measured duration for `id`.
    ///
    /// The record itself is not touched here: a persisted duration comes back
    /// through [`VideoStore::update`] with the server's copy, and a
    /// `LocalOnly` value only affects what the session displays.
    pub fn stage_duration(&self, id: &str, measured_seconds: f64) -> DurationUpdate {
        if !measured_seconds.is_finite() || measured_seconds <= 0.0 {
            return DurationUpdate::Ignored;
        }
        let rounded = measured_seconds.round() as u64;

        let Some(video) = self.get_by_id(id) else {
            return DurationUpdate::Ignored;
        };

        let delta = (video.duration as i64 - rounded as i64).abs();
        if delta < DURATION_HYSTERESIS_SECS {
            DurationUpdate::LocalOnly(rounded)
        } else {
            DurationUpdate::Persist(rounded)
        }
    }

    /// Deletion is only offered for records that went through the tracked
    /// upload pipeline, proven by the presence of an asset id.
    pub fn is_deletable(&self, id: &str) -> bool {
        self.get_by_id(id)
            .is_some_and(|v| v.asset_id.as_deref().is_some_and(|a| !a.is_empty()))
    }

    /// Drop a record after the server confirmed the delete.
    pub fn remove(&mut self, id: &str) -> Option<Video> {
        let idx = self.videos.iter().position(|v| v.id == id)?;
        Some(self.videos.remove(idx))
    }
}
