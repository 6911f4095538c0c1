pub mod actions;
pub mod events;
pub mod state;

use std::io::Write;

use anyhow::Context;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tokio::sync::mpsc;
use tracing::warn;

use crate::api::SyncClient;
use crate::config::Config;
use crate::device::{DeviceClass, DeviceMonitor};
use crate::input;
use crate::playback::adapter::{aspect_ratio_for, StreamPolicy};
use crate::playback::controller::{PlayState, PlaybackController, PlaybackRate};
use crate::playback::mpv::MpvHandle;
use crate::store::{DurationUpdate, VideoStore};
use actions::Action;
use events::{Event, NetEvent, PlayerEvent, SyncOp};
use state::{Toast, ToastKind, WatchState};

/// Terminals report widths in cells while the breakpoints are pixel-based;
/// eight pixels per glyph column is close enough for classification.
pub const CELL_WIDTH_PX: u32 = 8;

const SEEK_STEP_SECS: f64 = 10.0;
const VOLUME_STEP: u8 = 5;

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> anyhow::Result<Self> {
        enable_raw_mode().context("enable raw mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort cleanup; don't panic in Drop.
        let _ = disable_raw_mode();
        println!();
    }
}

/// One interactive watch session for a single video.
///
/// Single cooperative loop: input, playback environment, and network
/// responses all arrive as events on one channel. Optimistic mutations are
/// applied to the store synchronously inside the reducer before the matching
/// request task is spawned; response events overwrite the record on arrival,
/// so the last response to land wins.
pub struct App {
    cfg: Config,
    client: SyncClient,
    store: VideoStore,
    device: DeviceMonitor,
    policy: Box<dyn StreamPolicy>,
    controller: PlaybackController,
    state: WatchState,
    mpv: Option<MpvHandle>,
    current_url: Option<String>,
}

impl App {
    pub fn new(
        cfg: Config,
        client: SyncClient,
        store: VideoStore,
        device: DeviceMonitor,
        policy: Box<dyn StreamPolicy>,
        video_id: &str,
    ) -> Self {
        let controller = PlaybackController::new(video_id, cfg.player.autoplay);
        let state = WatchState::new(cfg.player.volume);
        Self {
            cfg,
            client,
            store,
            device,
            policy,
            controller,
            state,
            mpv: None,
            current_url: None,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let video_id = self.controller.video_id().to_string();

        // Absence is an expected outcome, not an error.
        let Some(video) = self.store.get_by_id(&video_id).cloned() else {
            println!("Video not found: {video_id}");
            return Ok(());
        };
        self.state.display_duration = (video.duration > 0).then_some(video.duration);

        let (tx, mut rx) = mpsc::channel::<Event>(256);

        // Count the view: local increment first, then the request. A reader
        // observing the store right after this sees the optimistic value.
        let device = self.device.current();
        self.store.apply_view(&video_id, device);
        self.spawn_record_view(&video_id, device, &tx);

        let _term = RawModeGuard::enter()?;
        input::spawn_input_task(tx.clone());

        std::fs::create_dir_all(&self.cfg.paths.data_dir).with_context(|| {
            format!("create data dir {}", self.cfg.paths.data_dir.display())
        })?;
        let mpv_log = self.cfg.paths.data_dir.join("mpv.log");
        let mpv = MpvHandle::spawn(tx.clone(), Some(&mpv_log))
            .await
            .context("start playback environment")?;
        mpv.set_volume(self.state.volume).await?;

        let url = self
            .policy
            .stream_url_for(&video.original_url, device);
        mpv.load_url(&url).await?;
        self.current_url = Some(url);
        self.mpv = Some(mpv);

        self.draw_status()?;
        while let Some(ev) = rx.recv().await {
            match ev {
                Event::Input(iev) => {
                    if let Some(action) = input::map_input_to_action(iev) {
                        self.handle_action(action, &tx).await;
                    }
                }
                Event::Player(pe) => self.handle_player(pe, &tx).await,
                Event::Net(ne) => self.handle_net(ne),
            }

            if self.state.should_quit {
                break;
            }
            self.draw_status()?;
        }

        Ok(())
    }

    async fn handle_action(&mut self, action: Action, tx: &mpsc::Sender<Event>) {
        // Anything other than the confirming keypress cancels a pending
        // delete.
        if action != Action::Delete {
            self.state.disarm_delete();
        }

        match action {
            Action::Quit => self.state.should_quit = true,

            Action::TogglePause => {
                if let Some(mpv) = &self.mpv
                    && let Err(e) = mpv.toggle_pause().await
                {
                    warn!("toggle pause: {e:#}");
                }
            }
            Action::SeekForward => self.seek(SEEK_STEP_SECS).await,
            Action::SeekBack => self.seek(-SEEK_STEP_SECS).await,
            Action::VolumeUp => self.set_volume(self.state.volume.saturating_add(VOLUME_STEP)).await,
            Action::VolumeDown => {
                self.set_volume(self.state.volume.saturating_sub(VOLUME_STEP)).await
            }

            Action::ToggleFullscreen => {
                // Request only; the substate follows the environment's
                // fullscreen notification, not this call.
                let want = self
                    .controller
                    .loaded()
                    .map(|l| !l.fullscreen)
                    .unwrap_or(true);
                if let Some(mpv) = &self.mpv
                    && let Err(e) = mpv.set_fullscreen(want).await
                {
                    warn!("fullscreen request: {e:#}");
                }
            }
            Action::ToggleSettings => self.controller.toggle_settings(),
            Action::CycleRate => {
                if let Some(rate) = self.controller.cycle_rate()
                    && let Some(mpv) = &self.mpv
                    && let Err(e) = mpv.set_speed(rate.as_f64()).await
                {
                    warn!("set speed: {e:#}");
                }
            }

            Action::Like => {
                let id = self.controller.video_id().to_string();
                if self.store.apply_like(&id) {
                    self.spawn_record_like(&id, tx);
                }
            }
            Action::Delete => self.handle_delete(tx),

            Action::Resize(w, _) => self.handle_resize(w).await,
        }
    }

    async fn handle_player(&mut self, ev: PlayerEvent, tx: &mpsc::Sender<Event>) {
        match ev {
            PlayerEvent::Duration { seconds } => {
                let was_idle = self.controller.loaded().is_none();
                if let Some(measured) = self.controller.on_metadata(seconds) {
                    self.report_duration(measured, tx);
                }
                if was_idle && self.controller.autoplay_requested() {
                    // Play attempt; if the environment rejects it no Started
                    // event arrives and the machine settles into paused.
                    if let Some(mpv) = &self.mpv
                        && let Err(e) = mpv.play().await
                    {
                        warn!("autoplay attempt: {e:#}");
                        self.controller.on_paused();
                    }
                }
            }
            PlayerEvent::Started => self.controller.on_play_started(),
            PlayerEvent::Paused => self.controller.on_paused(),
            PlayerEvent::Position { seconds } => self.controller.on_position(seconds),
            PlayerEvent::Fullscreen { active } => self.controller.on_fullscreen_changed(active),
            PlayerEvent::Ended => self.controller.on_paused(),
            PlayerEvent::Error(msg) => {
                self.state.toast = Some(Toast::error(msg));
            }
        }
    }

    fn handle_net(&mut self, ev: NetEvent) {
        match ev {
            NetEvent::VideoSynced { op: _, video } => {
                // Reconciliation is a whole-record overwrite with the server
                // copy. Not a merge: a still-unconfirmed local increment is
                // clobbered until its own response arrives.
                self.store.update(video);
            }
            NetEvent::SyncFailed { op, message } => {
                // Best-effort telemetry: optimistic state is kept, no
                // user-facing interruption.
                warn!(op = op.as_str(), %message, "sync request failed");
            }
            NetEvent::Deleted { id } => {
                self.store.remove(&id);
                self.state.should_quit = true;
            }
            NetEvent::DeleteFailed { message } => {
                self.state.disarm_delete();
                self.state.toast = Some(Toast::error(message));
            }
        }
    }

    /// Route a duration measurement: display always, persist only past the
    /// hysteresis window.
    fn report_duration(&mut self, measured: f64, tx: &mpsc::Sender<Event>) {
        let id = self.controller.video_id().to_string();
        match self.store.stage_duration(&id, measured) {
            DurationUpdate::Ignored => {}
            DurationUpdate::LocalOnly(secs) => {
                self.state.display_duration = Some(secs);
            }
            DurationUpdate::Persist(secs) => {
                self.state.display_duration = Some(secs);
                let client = self.client.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let ev = match client.update_duration(&id, secs).await {
                        Ok(video) => NetEvent::VideoSynced {
                            op: SyncOp::Duration,
                            video,
                        },
                        Err(e) => NetEvent::SyncFailed {
                            op: SyncOp::Duration,
                            message: e.to_string(),
                        },
                    };
                    let _ = tx.send(Event::Net(ev)).await;
                });
            }
        }
    }

    fn handle_delete(&mut self, tx: &mpsc::Sender<Event>) {
        let id = self.controller.video_id().to_string();
        if !self.store.is_deletable(&id) {
            self.state.toast = Some(Toast::error(
                "This video was not uploaded through StreamFlex and can't be deleted",
            ));
            return;
        }
        if !self.state.delete_armed() {
            self.state.arm_delete();
            self.state.toast = Some(Toast::info("Press x again to delete permanently"));
            return;
        }
        self.state.disarm_delete();

        let client = self.client.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let ev = match client.delete_video(&id).await {
                Ok(()) => NetEvent::Deleted { id },
                Err(e) => NetEvent::DeleteFailed {
                    message: e.user_message(),
                },
            };
            let _ = tx.send(Event::Net(ev)).await;
        });
    }

    async fn handle_resize(&mut self, cols: u16) {
        let before = self.device.current();
        self.device.observe_width(cols as u32 * CELL_WIDTH_PX);
        let after = self.device.current();
        if before == after {
            return;
        }

        // Reclassified: re-derive the stream URL. With the identity policy
        // this is a no-op; a transforming policy triggers a reload.
        let Some(video) = self.store.get_by_id(self.controller.video_id()) else {
            return;
        };
        let url = self.policy.stream_url_for(&video.original_url, after);
        if self.current_url.as_deref() != Some(url.as_str())
            && let Some(mpv) = &self.mpv
        {
            if let Err(e) = mpv.load_url(&url).await {
                warn!("reload stream: {e:#}");
            } else {
                self.current_url = Some(url);
            }
        }
    }

    async fn seek(&mut self, delta: f64) {
        if let Some(mpv) = &self.mpv
            && let Err(e) = mpv.seek_relative(delta).await
        {
            warn!("seek: {e:#}");
        }
    }

    async fn set_volume(&mut self, volume: u8) {
        self.state.volume = volume.min(100);
        if let Some(mpv) = &self.mpv
            && let Err(e) = mpv.set_volume(self.state.volume).await
        {
            warn!("set volume: {e:#}");
        }
    }

    fn spawn_record_view(&self, id: &str, device: DeviceClass, tx: &mpsc::Sender<Event>) {
        let client = self.client.clone();
        let id = id.to_string();
        let tx = tx.clone();
        tokio::spawn(async move {
            let ev = match client.record_view(&id, device).await {
                Ok(video) => NetEvent::VideoSynced {
                    op: SyncOp::View,
                    video,
                },
                Err(e) => NetEvent::SyncFailed {
                    op: SyncOp::View,
                    message: e.to_string(),
                },
            };
            let _ = tx.send(Event::Net(ev)).await;
        });
    }

    fn spawn_record_like(&self, id: &str, tx: &mpsc::Sender<Event>) {
        let client = self.client.clone();
        let id = id.to_string();
        let tx = tx.clone();
        tokio::spawn(async move {
            let ev = match client.record_like(&id).await {
                Ok(video) => NetEvent::VideoSynced {
                    op: SyncOp::Like,
                    video,
                },
                Err(e) => NetEvent::SyncFailed {
                    op: SyncOp::Like,
                    message: e.to_string(),
                },
            };
            let _ = tx.send(Event::Net(ev)).await;
        });
    }

    fn draw_status(&mut self) -> anyhow::Result<()> {
        if self.state.toast.as_ref().is_some_and(Toast::is_expired) {
            self.state.toast = None;
        }

        let id = self.controller.video_id();
        let video = self.store.get_by_id(id);
        let title = video.map(|v| v.title.as_str()).unwrap_or(id);
        let views = video.map(|v| v.analytics.views).unwrap_or(0);
        let likes = video.map(|v| v.likes).unwrap_or(0);

        let device = self.device.current();
        let (aw, ah) = aspect_ratio_for(device).ratio();

        let playback = match self.controller.loaded() {
            None => "loading".to_string(),
            Some(l) => {
                let icon = match l.play {
                    PlayState::Playing => "▶",
                    PlayState::Paused => "⏸",
                };
                let dur = self
                    .state
                    .display_duration
                    .map(|d| d as f64)
                    .unwrap_or(l.duration_secs);
                let mut s = format!(
                    "{icon} {}/{} {}",
                    format_time(l.position_secs),
                    format_time(dur),
                    l.rate.label()
                );
                if l.fullscreen {
                    s.push_str(" FS");
                }
                if l.settings_open {
                    let rates = PlaybackRate::ALL.map(PlaybackRate::label).join("/");
                    s.push_str(&format!(" [rates: {rates}]"));
                }
                s
            }
        };

        let mut line = format!(
            "{title} | {playback} | vol {} | {views} views, {likes} likes | {device} {aw}:{ah}",
            self.state.volume
        );
        if let Some(toast) = &self.state.toast {
            match toast.kind {
                ToastKind::Error => line.push_str(&format!(" | ! {}", toast.message)),
                ToastKind::Info => line.push_str(&format!(" | {}", toast.message)),
            }
        }

        let mut stdout = std::io::stdout();
        crossterm::execute!(
            stdout,
            crossterm::cursor::MoveToColumn(0),
            crossterm::terminal::Clear(crossterm::terminal::ClearType::CurrentLine),
            crossterm::style::Print(line),
        )
        .context("draw status line")?;
        stdout.flush().context("flush status line")?;
        Ok(())
    }
}

pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Video, VideoAnalytics};
    use crate::playback::adapter::OriginalStreams;

    fn tracked_video(id: &str) -> Video {
        Video {
            id: id.to_string(),
            title: format!("Video {}", id),
            description: "desc".to_string(),
            original_url: "https://cdn.example.com/v.mp4".to_string(),
            thumbnail_url: "https://cdn.example.com/t.jpg".to_string(),
            uploaded_by: "User".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            duration: 120,
            size: 1_000,
            likes: 0,
            analytics: VideoAnalytics::default(),
            asset_id: Some("streamflex/videos/x".to_string()),
            thumbnail_asset_id: None,
        }
    }

    fn make_app(video_id: &str) -> App {
        let mut store = VideoStore::new();
        store.replace_all(vec![tracked_video("v1")]);
        // Closed port: any dispatched request fails fast without a server.
        let client = SyncClient::new(Some("http://127.0.0.1:9")).unwrap();
        App::new(
            Config::default(),
            client,
            store,
            DeviceMonitor::new(1280),
            Box::new(OriginalStreams),
            video_id,
        )
    }

    #[tokio::test]
    async fn test_unrelated_action_disarms_delete() {
        let mut app = make_app("v1");
        let (tx, _rx) = mpsc::channel(8);

        app.handle_action(Action::Delete, &tx).await;
        assert!(app.state.delete_armed());

        app.handle_action(Action::ToggleSettings, &tx).await;
        assert!(!app.state.delete_armed());

        // The next press arms again instead of deleting.
        app.handle_action(Action::Delete, &tx).await;
        assert!(app.state.delete_armed());
        assert!(app.store.get_by_id("v1").is_some());
    }

    #[tokio::test]
    async fn test_untracked_record_never_arms() {
        let mut app = make_app("v1");
        let (tx, _rx) = mpsc::channel(8);
        if let Some(v) = app.store.videos().first() {
            let mut plain = v.clone();
            plain.asset_id = None;
            app.store.update(plain);
        }

        app.handle_action(Action::Delete, &tx).await;
        assert!(!app.state.delete_armed());
        assert!(app.state.toast.is_some());
    }
}
