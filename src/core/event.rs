// (C) 2025 - Enzo Lombardi

//! Event system - the input-source contract consumed by the render loop.
//!
//! Byte-level keyboard and mouse decoding is the terminal library's job; this
//! module only defines the event shapes the loop dispatches on, plus the
//! default [`CrosstermInput`] source that adapts crossterm's decoder.

use super::geometry::Size;
use crossterm::event::{self, Event as CtEvent, KeyEventKind, MouseButton, MouseEventKind};
use std::fmt;
use std::time::Duration;

pub use crossterm::event::{KeyCode, KeyModifiers};

// Mouse button masks
pub const MB_LEFT_BUTTON: u8 = 0x01;
pub const MB_MIDDLE_BUTTON: u8 = 0x02;
pub const MB_RIGHT_BUTTON: u8 = 0x04;

/// A decoded keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyEvent {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub fn char(ch: char) -> Self {
        Self::new(KeyCode::Char(ch), KeyModifiers::empty())
    }

    pub fn ctrl(ch: char) -> Self {
        Self::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    /// Ctrl+C / Ctrl+D in either case, the loop's stop chord.
    pub fn is_interrupt(&self) -> bool {
        self.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(self.code, KeyCode::Char('c' | 'C' | 'd' | 'D'))
    }
}

/// Mouse event data in absolute terminal coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub x: u16,
    pub y: u16,
    pub buttons: u8, // button state (bit flags)
}

/// One event from the input source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(Size),
    FocusGained,
    FocusLost,
    Paste(String),
}

/// A terminal size change, delivered to registered resize callbacks.
///
/// Fired only when the constrained new size actually differs from the old.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub old_size: Size,
    pub new_size: Size,
    pub timestamp_ms: i64,
}

impl fmt::Display for ResizeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resize {} -> {}", self.old_size, self.new_size)
    }
}

/// Non-blocking event supplier consumed by the render loop.
///
/// The loop polls once per tick; `None` means no event was ready. Sources
/// must never block past their own bounded poll.
pub trait InputSource {
    fn poll(&mut self) -> Option<Event>;
}

/// Default input source backed by crossterm's event decoder.
///
/// Key releases are filtered (Windows delivers both edges), mouse events are
/// reduced to position plus button mask, and terminal-delivered resizes come
/// through as [`Event::Resize`].
pub struct CrosstermInput {
    last_buttons: u8,
}

impl CrosstermInput {
    pub fn new() -> Self {
        Self { last_buttons: 0 }
    }

    fn convert_mouse(&mut self, mouse: event::MouseEvent) -> Option<Event> {
        let buttons = match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) | MouseEventKind::Drag(MouseButton::Left) => {
                MB_LEFT_BUTTON
            }
            MouseEventKind::Down(MouseButton::Right) | MouseEventKind::Drag(MouseButton::Right) => {
                MB_RIGHT_BUTTON
            }
            MouseEventKind::Down(MouseButton::Middle)
            | MouseEventKind::Drag(MouseButton::Middle) => MB_MIDDLE_BUTTON,
            MouseEventKind::Up(_) => 0,
            MouseEventKind::Moved => self.last_buttons,
            _ => return None,
        };
        self.last_buttons = buttons;
        Some(Event::Mouse(MouseEvent {
            x: mouse.column,
            y: mouse.row,
            buttons,
        }))
    }
}

impl Default for CrosstermInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for CrosstermInput {
    fn poll(&mut self) -> Option<Event> {
        if !event::poll(Duration::ZERO).ok()? {
            return None;
        }
        match event::read().ok()? {
            CtEvent::Key(key) => {
                // Only press edges become events
                if key.kind != KeyEventKind::Press {
                    return None;
                }
                Some(Event::Key(KeyEvent::new(key.code, key.modifiers)))
            }
            CtEvent::Mouse(mouse) => self.convert_mouse(mouse),
            CtEvent::Resize(cols, rows) => Some(Event::Resize(Size { rows, cols })),
            CtEvent::FocusGained => Some(Event::FocusGained),
            CtEvent::FocusLost => Some(Event::FocusLost),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_chord() {
        assert!(KeyEvent::ctrl('c').is_interrupt());
        assert!(KeyEvent::ctrl('C').is_interrupt());
        assert!(KeyEvent::ctrl('d').is_interrupt());
        assert!(KeyEvent::ctrl('D').is_interrupt());
        assert!(!KeyEvent::char('c').is_interrupt());
        assert!(!KeyEvent::ctrl('x').is_interrupt());
    }

    #[test]
    fn test_resize_event_display() {
        let ev = ResizeEvent {
            old_size: Size::new(24, 80),
            new_size: Size::new(40, 120),
            timestamp_ms: 0,
        };
        assert_eq!(format!("{ev}"), "resize 80x24 -> 120x40");
    }
}
