use std::time::Duration;
use tracing::trace;

use crate::domain::{DashConfig, DashError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &DashConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DashError> {
        if event::poll(Duration::from_millis(self.event_poll_time))?
            && let Event::Key(key) = event::read()?
            && key.kind == event::KeyEventKind::Press
        {
            return Ok(self.handle_key(key, model.raw_keyevents()));
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent, raw: bool) -> Option<Message> {
        // While a prompt is open every key belongs to it
        if raw {
            return Some(Message::RawKey(key));
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Message::Quit),
                _ => None,
            };
        }
        let message = match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Tab | KeyCode::BackTab => Some(Message::SwitchPage),
            KeyCode::Char('1') => Some(Message::ShowDashboard),
            KeyCode::Char('2') => Some(Message::ShowUsers),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Right | KeyCode::PageDown | KeyCode::Char('l') => Some(Message::NextPage),
            KeyCode::Left | KeyCode::PageUp | KeyCode::Char('h') => Some(Message::PrevPage),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::FirstPage),
            KeyCode::End | KeyCode::Char('G') => Some(Message::LastPage),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char(':') => Some(Message::GotoPage),
            KeyCode::Char('s') => Some(Message::ToggleSortKey),
            KeyCode::Char('o') => Some(Message::ToggleSortOrder),
            KeyCode::Char('y') => Some(Message::CopyRecord),
            KeyCode::Char('r') => Some(Message::Reload),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn controller() -> Controller {
        Controller::new(&DashConfig::default())
    }

    #[test]
    fn maps_navigation_keys() {
        let c = controller();
        let key = |code| c.handle_key(KeyEvent::new(code, KeyModifiers::NONE), false);
        assert!(matches!(key(KeyCode::Char('q')), Some(Message::Quit)));
        assert!(matches!(key(KeyCode::Right), Some(Message::NextPage)));
        assert!(matches!(key(KeyCode::Char('h')), Some(Message::PrevPage)));
        assert!(matches!(key(KeyCode::Char('/')), Some(Message::Search)));
        assert!(matches!(key(KeyCode::Enter), Some(Message::Enter)));
        assert!(matches!(key(KeyCode::Esc), Some(Message::Exit)));
        assert!(key(KeyCode::Char('x')).is_none());
    }

    #[test]
    fn prompt_receives_raw_keys() {
        let c = controller();
        let msg = c.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE), true);
        assert!(matches!(msg, Some(Message::RawKey(k)) if k.code == KeyCode::Char('q')));
    }

    #[test]
    fn ctrl_c_quits() {
        let c = controller();
        let msg = c.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), false);
        assert!(matches!(msg, Some(Message::Quit)));
    }
}
