use serde::{Deserialize, Serialize};

use crate::device::DeviceClass;

/// Per-device view counters. Under well-ordered updates
/// `views == desktop + tablet + mobile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCounts {
    #[serde(default)]
    pub desktop: u64,
    #[serde(default)]
    pub tablet: u64,
    #[serde(default)]
    pub mobile: u64,
}

impl DeviceCounts {
    pub fn bucket_mut(&mut self, device: DeviceClass) -> &mut u64 {
        match device {
            DeviceClass::Desktop => &mut self.desktop,
            DeviceClass::Tablet => &mut self.tablet,
            DeviceClass::Mobile => &mut self.mobile,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalytics {
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub devices: DeviceCounts,
    /// Cumulative seconds watched, maintained server-side only.
    #[serde(default)]
    pub watch_time: u64,
}

/// A video record as the server returns it. The server copy is authoritative;
/// local copies only drift while an optimistic mutation is in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub original_url: String,
    pub thumbnail_url: String,
    pub uploaded_by: String,
    pub created_at: String,
    /// Seconds; zero until refined by a playback measurement.
    #[serde(default)]
    pub duration: u64,
    /// Bytes.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub analytics: VideoAnalytics,
    /// Storage handle for the video asset. Only records uploaded through the
    /// tracked pipeline carry one, and only those may be deleted.
    #[serde(rename = "cloudinaryPublicId", skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub asset_id: Option<String>,
    #[serde(
        rename = "cloudinaryThumbnailPublicId",
        skip_serializing_if = "Option::is_none"
    )]
    #[serde(default)]
    pub thumbnail_asset_id: Option<String>,
}
