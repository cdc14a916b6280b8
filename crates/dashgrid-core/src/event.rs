//! Terminal input sources.

use std::collections::VecDeque;
use std::time::Duration;

use crossterm::event::{Event, KeyEvent, MouseEvent};

use crate::error::Signal;

/// The terminal events the input dispatcher acts on.
///
/// Key and mouse variants keep the crossterm payload, so key codes,
/// modifiers and mouse buttons keep the full crossterm API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// A keyboard event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// Terminal resized to (columns, rows).
    Resize(u16, u16),
}

/// A non-blocking source of input.
pub trait EventSource {
    /// The next pending event, or `None` right away if there is none.
    fn poll(&mut self) -> Result<Option<TerminalEvent>, Signal>;
}

/// Reads the real terminal through crossterm.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrosstermEvents;

impl EventSource for CrosstermEvents {
    /// Focus changes and pastes are consumed and skipped.
    fn poll(&mut self) -> Result<Option<TerminalEvent>, Signal> {
        while crossterm::event::poll(Duration::ZERO)? {
            match crossterm::event::read()? {
                Event::Key(key) => return Ok(Some(TerminalEvent::Key(key))),
                Event::Mouse(mouse) => return Ok(Some(TerminalEvent::Mouse(mouse))),
                Event::Resize(columns, rows) => return Ok(Some(TerminalEvent::Resize(columns, rows))),
                other => tracing::trace!(event = ?other, "ignored terminal event"),
            }
        }
        Ok(None)
    }
}

/// A queue of canned events, one handed out per poll.
#[derive(Debug, Default, Clone)]
pub struct ScriptedEvents {
    queue: VecDeque<TerminalEvent>,
}

impl ScriptedEvents {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `event` after everything already queued.
    pub fn push(&mut self, event: TerminalEvent) {
        self.queue.push_back(event);
    }

    /// Events still waiting to be polled.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl FromIterator<TerminalEvent> for ScriptedEvents {
    fn from_iter<I: IntoIterator<Item = TerminalEvent>>(iter: I) -> Self {
        Self {
            queue: iter.into_iter().collect(),
        }
    }
}

impl EventSource for ScriptedEvents {
    fn poll(&mut self) -> Result<Option<TerminalEvent>, Signal> {
        Ok(self.queue.pop_front())
    }
}
