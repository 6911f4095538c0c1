use crate::api::models::Video;

#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    Player(PlayerEvent),
    Net(NetEvent),
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Key(crossterm::event::KeyEvent),
    /// Terminal resize: the session's viewport-resize notification.
    Resize(u16, u16),
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Started,
    Paused,
    Position { seconds: f64 },
    Duration { seconds: f64 },
    Fullscreen { active: bool },
    Ended,
    Error(String),
}

/// Which best-effort sync request a response belongs to. Only used for log
/// labels; reconciliation itself treats every response the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
    View,
    Like,
    Duration,
}

impl SyncOp {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncOp::View => "view",
            SyncOp::Like => "like",
            SyncOp::Duration => "duration",
        }
    }
}

#[derive(Debug, Clone)]
pub enum NetEvent {
    /// A mutation's response arrived; the carried record is the server's
    /// authoritative copy and overwrites the local one.
    VideoSynced { op: SyncOp, video: Video },
    /// Best-effort mutation failed; logged, optimistic state kept.
    SyncFailed { op: SyncOp, message: String },
    Deleted { id: String },
    DeleteFailed { message: String },
}
