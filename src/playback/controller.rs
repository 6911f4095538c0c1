/// Playback rate is selected from a fixed set; arbitrary speeds are not
/// representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackRate {
    Half,
    #[default]
    Normal,
    OneAndHalf,
    Double,
}

impl PlaybackRate {
    pub const ALL: [PlaybackRate; 4] = [
        PlaybackRate::Half,
        PlaybackRate::Normal,
        PlaybackRate::OneAndHalf,
        PlaybackRate::Double,
    ];

    pub fn as_f64(self) -> f64 {
        match self {
            PlaybackRate::Half => 0.5,
            PlaybackRate::Normal => 1.0,
            PlaybackRate::OneAndHalf => 1.5,
            PlaybackRate::Double => 2.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlaybackRate::Half => "0.5x",
            PlaybackRate::Normal => "1x",
            PlaybackRate::OneAndHalf => "1.5x",
            PlaybackRate::Double => "2x",
        }
    }

    pub fn next(self) -> Self {
        match self {
            PlaybackRate::Half => PlaybackRate::Normal,
            PlaybackRate::Normal => PlaybackRate::OneAndHalf,
            PlaybackRate::OneAndHalf => PlaybackRate::Double,
            PlaybackRate::Double => PlaybackRate::Half,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
}

/// Substate that only exists once stream metadata has resolved. Fullscreen
/// and the settings menu live here so that "fullscreen while idle" cannot be
/// expressed at all.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPlayback {
    pub play: PlayState,
    pub duration_secs: f64,
    pub position_secs: f64,
    pub rate: PlaybackRate,
    pub fullscreen: bool,
    pub settings_open: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackState {
    Idle,
    Loaded(LoadedPlayback),
}

/// Per-player state machine for one video being watched.
///
/// The controller never assumes a request against the environment succeeded:
/// play/pause and fullscreen are confirmed by the environment's own change
/// notifications (`on_play_started`, `on_paused`, `on_fullscreen_changed`).
/// There is no terminal state; the machine resets to idle when the video
/// identity changes.
#[derive(Debug)]
pub struct PlaybackController {
    video_id: String,
    autoplay: bool,
    state: PlaybackState,
}

impl PlaybackController {
    pub fn new(video_id: impl Into<String>, autoplay: bool) -> Self {
        Self {
            video_id: video_id.into(),
            autoplay,
            state: PlaybackState::Idle,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn loaded(&self) -> Option<&LoadedPlayback> {
        match &self.state {
            PlaybackState::Loaded(l) => Some(l),
            PlaybackState::Idle => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(
            self.state,
            PlaybackState::Loaded(LoadedPlayback {
                play: PlayState::Playing,
                ..
            })
        )
    }

    /// Whether a play attempt should be issued as soon as metadata resolves.
    pub fn autoplay_requested(&self) -> bool {
        self.autoplay
    }

    /// Switch to a different video: the machine resets to idle. Loading the
    /// same id again is a no-op.
    pub fn load_video(&mut self, video_id: &str) {
        if self.video_id != video_id {
            self.video_id = video_id.to_string();
            self.state = PlaybackState::Idle;
        }
    }

    /// Stream metadata resolved. Transitions idle → loaded (paused until the
    /// environment confirms a play) and returns the measured duration to
    /// report upward, or `None` when the measurement is unusable.
    pub fn on_metadata(&mut self, duration_secs: f64) -> Option<f64> {
        match &mut self.state {
            PlaybackState::Idle => {
                self.state = PlaybackState::Loaded(LoadedPlayback {
                    play: PlayState::Paused,
                    duration_secs,
                    position_secs: 0.0,
                    rate: PlaybackRate::default(),
                    fullscreen: false,
                    settings_open: false,
                });
            }
            PlaybackState::Loaded(l) => {
                l.duration_secs = duration_secs;
            }
        }
        (duration_secs.is_finite() && duration_secs > 0.0).then_some(duration_secs)
    }

    /// Environment confirmed playback started.
    pub fn on_play_started(&mut self) {
        if let PlaybackState::Loaded(l) = &mut self.state {
            l.play = PlayState::Playing;
        }
    }

    /// Environment paused, or a play attempt (autoplay included) was
    /// rejected; the machine settles into paused rather than failing.
    pub fn on_paused(&mut self) {
        if let PlaybackState::Loaded(l) = &mut self.state {
            l.play = PlayState::Paused;
        }
    }

    /// Position moved (progress or a seek). Never changes the play state.
    pub fn on_position(&mut self, seconds: f64) {
        if let PlaybackState::Loaded(l) = &mut self.state {
            l.position_secs = seconds;
        }
    }

    /// Select a playback rate; selecting always closes the settings menu.
    pub fn select_rate(&mut self, rate: PlaybackRate) -> bool {
        match &mut self.state {
            PlaybackState::Loaded(l) => {
                l.rate = rate;
                l.settings_open = false;
                true
            }
            PlaybackState::Idle => false,
        }
    }

    /// Advance to the next rate in the fixed set. Returns the rate now in
    /// effect so the caller can apply it to the environment.
    pub fn cycle_rate(&mut self) -> Option<PlaybackRate> {
        match &self.state {
            PlaybackState::Loaded(l) => {
                let next = l.rate.next();
                self.select_rate(next);
                Some(next)
            }
            PlaybackState::Idle => None,
        }
    }

    pub fn toggle_settings(&mut self) {
        if let PlaybackState::Loaded(l) = &mut self.state {
            l.settings_open = !l.settings_open;
        }
    }

    /// The environment is the source of truth for fullscreen; this is the
    /// only place the substate changes.
    pub fn on_fullscreen_changed(&mut self, active: bool) {
        if let PlaybackState::Loaded(l) = &mut self.state {
            l.fullscreen = active;
        }
    }
}
