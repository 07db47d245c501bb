use std::time::Duration;
use tracing::trace;

use crate::domain::{ContabConfig, ContabError, Message};
use crate::model::{Modus, Model};
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

/// Maps terminal events to messages. Every mode has its own key bindings.
pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &ContabConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    /// Wait for the next event. A poll timeout becomes a `Tick`.
    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, ContabError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(Some(Message::Tick));
        }
        let message = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(model.modus(), key),
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    pub fn handle_key(&self, modus: Modus, key: KeyEvent) -> Option<Message> {
        let message = match modus {
            Modus::TABLE => Self::table_key(key),
            Modus::POPUP => match key.code {
                KeyCode::Char('q') => Some(Message::Quit),
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?') => Some(Message::Exit),
                _ => None,
            },
            Modus::CONFIRM => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(Message::Confirm),
                _ => Some(Message::Exit),
            },
            Modus::EXPORTFORM => match key.code {
                KeyCode::Tab | KeyCode::Down => Some(Message::NextField),
                KeyCode::Left => Some(Message::PreviousChoice),
                KeyCode::Right | KeyCode::Char(' ') => Some(Message::NextChoice),
                KeyCode::Enter => Some(Message::Enter),
                KeyCode::Esc => Some(Message::Exit),
                _ => None,
            },
            Modus::CMDINPUT => Some(Message::RawKey(key)),
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn table_key(key: KeyEvent) -> Option<Message> {
        match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::MoveUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::MoveDown),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::MoveLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::MoveRight),
            KeyCode::PageUp => Some(Message::MovePageUp),
            KeyCode::PageDown => Some(Message::MovePageDown),
            KeyCode::Home | KeyCode::Char('g') => Some(Message::MoveBeginning),
            KeyCode::End | KeyCode::Char('G') => Some(Message::MoveEnd),
            KeyCode::Tab => Some(Message::NextTable),
            KeyCode::Char('c') => Some(Message::CopyCell),
            KeyCode::Char('r') => Some(Message::CopyRow),
            KeyCode::Char('e') => Some(Message::ExportTable),
            KeyCode::Char('E') => Some(Message::ExportTableAs),
            KeyCode::Char('i') => Some(Message::Import),
            KeyCode::Char('x') => Some(Message::OpenExportForm),
            KeyCode::Char('D') => Some(Message::DeleteAll),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        }
    }
}
