use crate::app::actions::Action;
use crate::app::events::{Event, InputEvent};
use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEventKind};
use tokio::sync::mpsc;

pub fn spawn_input_task(tx: mpsc::Sender<Event>) {
    tokio::task::spawn_blocking(move || {
        loop {
            if event::poll(std::time::Duration::from_millis(250)).unwrap_or(false) {
                match event::read() {
                    Ok(CtEvent::Key(k)) => {
                        if k.kind == KeyEventKind::Press
                            && tx.blocking_send(Event::Input(InputEvent::Key(k))).is_err()
                        {
                            break;
                        }
                    }
                    Ok(CtEvent::Resize(w, h)) => {
                        if tx
                            .blocking_send(Event::Input(InputEvent::Resize(w, h)))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(_) => {}
                }
            }
        }
    });
}

pub fn map_input_to_action(ev: InputEvent) -> Option<Action> {
    match ev {
        InputEvent::Resize(w, h) => Some(Action::Resize(w, h)),
        InputEvent::Key(k) => match k.code {
            KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),

            // Playback
            KeyCode::Char(' ') => Some(Action::TogglePause),
            KeyCode::Char(']') | KeyCode::Right => Some(Action::SeekForward),
            KeyCode::Char('[') | KeyCode::Left => Some(Action::SeekBack),
            KeyCode::Char('=') | KeyCode::Char('+') => Some(Action::VolumeUp),
            KeyCode::Char('-') | KeyCode::Char('_') => Some(Action::VolumeDown),

            // Player chrome
            KeyCode::Char('f') => Some(Action::ToggleFullscreen),
            KeyCode::Char('s') => Some(Action::ToggleSettings),
            KeyCode::Char('r') => Some(Action::CycleRate),

            // Video actions
            KeyCode::Char('l') => Some(Action::Like),
            KeyCode::Char('x') | KeyCode::Delete => Some(Action::Delete),

            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn key(c: char) -> InputEvent {
        InputEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn test_resize_maps_through() {
        assert_eq!(
            map_input_to_action(InputEvent::Resize(120, 40)),
            Some(Action::Resize(120, 40))
        );
    }

    #[test]
    fn test_playback_keys() {
        assert_eq!(map_input_to_action(key(' ')), Some(Action::TogglePause));
        assert_eq!(map_input_to_action(key('f')), Some(Action::ToggleFullscreen));
        assert_eq!(map_input_to_action(key('r')), Some(Action::CycleRate));
        assert_eq!(map_input_to_action(key('z')), None);
    }
}
