#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,

    TogglePause,
    SeekForward,
    SeekBack,
    VolumeUp,
    VolumeDown,

    ToggleFullscreen,
    ToggleSettings,
    CycleRate,

    Like,
    Delete,

    Resize(u16, u16),
}
