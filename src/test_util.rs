// (C) 2025 - Enzo Lombardi

//! Test utilities for applications driving the render loop.
//!
//! [`ScriptedInput`] replays a fixed sequence of events through the
//! [`InputSource`] contract, which makes loop behavior testable without a
//! terminal. Pair it with [`Terminal::detached`](crate::terminal::Terminal::detached),
//! which swallows all output.
//!
//! # Examples
//!
//! ```
//! use termscreen::core::event::{Event, InputSource, KeyEvent};
//! use termscreen::test_util::ScriptedInput;
//!
//! let mut input = ScriptedInput::new();
//! input.push(Event::Key(KeyEvent::ctrl('c')));
//! assert!(input.poll().is_some());
//! assert!(input.poll().is_none());
//! ```

use crate::core::event::{Event, InputSource};
use std::collections::VecDeque;

/// An input source that serves a queue of scripted events.
#[derive(Default)]
pub struct ScriptedInput {
    events: VecDeque<Event>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Queue an event for a later poll.
    pub fn push(&mut self, event: Event) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> Option<Event> {
        self.events.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event::KeyEvent;

    #[test]
    fn test_scripted_input_is_fifo() {
        let mut input = ScriptedInput::from_events([
            Event::Key(KeyEvent::char('a')),
            Event::Key(KeyEvent::char('b')),
        ]);
        assert_eq!(input.poll(), Some(Event::Key(KeyEvent::char('a'))));
        assert_eq!(input.poll(), Some(Event::Key(KeyEvent::char('b'))));
        assert_eq!(input.poll(), None);
        assert!(input.is_empty());
    }
}
