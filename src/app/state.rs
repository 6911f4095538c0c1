#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub created_at: std::time::Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Error,
}

impl Toast {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Info,
            created_at: std::time::Instant::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
            created_at: std::time::Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > std::time::Duration::from_secs(3)
    }
}

/// How long an armed delete stays live; matches the toast that announced it.
const DELETE_ARM_WINDOW: std::time::Duration = std::time::Duration::from_secs(3);

/// Session-local state for one watch session. The video record itself lives
/// in the store; this only holds what the status line needs.
#[derive(Debug)]
pub struct WatchState {
    pub should_quit: bool,
    pub volume: u8,
    /// What the session displays for duration; updated by measurements even
    /// when the hysteresis guard skips the network write.
    pub display_duration: Option<u64>,
    /// Delete requires a second keypress while armed; see `delete_armed`.
    delete_armed_at: Option<std::time::Instant>,
    pub toast: Option<Toast>,
}

impl WatchState {
    pub fn new(volume: u8) -> Self {
        Self {
            should_quit: false,
            volume,
            display_duration: None,
            delete_armed_at: None,
            toast: None,
        }
    }

    pub fn arm_delete(&mut self) {
        self.delete_armed_at = Some(std::time::Instant::now());
    }

    pub fn disarm_delete(&mut self) {
        self.delete_armed_at = None;
    }

    /// An armed delete expires on its own; a stale second keypress re-arms
    /// instead of deleting.
    pub fn delete_armed(&self) -> bool {
        self.delete_armed_at
            .is_some_and(|at| at.elapsed() <= DELETE_ARM_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_arming_expires() {
        let mut state = WatchState::new(80);
        assert!(!state.delete_armed());

        state.arm_delete();
        assert!(state.delete_armed());

        state.delete_armed_at = Some(std::time::Instant::now() - DELETE_ARM_WINDOW * 2);
        assert!(!state.delete_armed());

        state.arm_delete();
        state.disarm_delete();
        assert!(!state.delete_armed());
    }
}
