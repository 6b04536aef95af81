// (C) 2025 - Enzo Lombardi

//! Screen abstraction over the double buffer.
//!
//! A [`Screen`] owns exactly one [`ScreenBuffer`] and, when registered with a
//! [`manager::ScreenManager`], a viewport rectangle assigned by the current
//! layout. Managed screens are shared as [`ScreenHandle`]s: the caller keeps
//! one handle, the manager keeps another, and identity is pointer identity.
//! The manager clears the managed marker and viewport on removal, so neither
//! side ever frees the other.

pub mod buffer;
pub mod manager;

pub use buffer::{CellPatch, ResizeMode, ScreenBuffer};

use crate::core::ansi_dump;
use crate::core::draw::Cell;
use crate::core::geometry::Rect;
use std::cell::RefCell;
use std::io;
use std::path::Path;
use std::rc::Rc;

/// Shared, single-threaded handle to a screen.
pub type ScreenHandle = Rc<RefCell<Screen>>;

/// A drawable region with its own double buffer.
///
/// # Examples
///
/// ```
/// use termscreen::core::draw::Cell;
/// use termscreen::screen::Screen;
///
/// let mut screen = Screen::new(80, 24);
/// screen.set_cell(0, 0, Cell::from_char('A'));
/// assert_eq!(screen.cell(0, 0).map(|c| c.ch), Some('A'));
/// assert_eq!(screen.cell(100, 0), None);
/// ```
pub struct Screen {
    buffer: ScreenBuffer,
    viewport: Option<Rect>,
    managed: bool,
}

impl Screen {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            buffer: ScreenBuffer::new(width, height),
            viewport: None,
            managed: false,
        }
    }

    /// Create a screen already wrapped in a shared handle, the form the
    /// manager consumes.
    pub fn new_handle(width: u16, height: u16) -> ScreenHandle {
        Rc::new(RefCell::new(Self::new(width, height)))
    }

    pub fn width(&self) -> u16 {
        self.buffer.width()
    }

    pub fn height(&self) -> u16 {
        self.buffer.height()
    }

    /// Read a back-buffer cell; `None` outside the grid.
    pub fn cell(&self, x: u16, y: u16) -> Option<Cell> {
        self.buffer.cell(x, y)
    }

    /// Write a back-buffer cell; out-of-range writes are ignored.
    pub fn set_cell(&mut self, x: u16, y: u16, cell: Cell) {
        self.buffer.set_cell(x, y, cell);
    }

    /// Clear the back buffer to empty cells.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn swap_buffers(&mut self) {
        self.buffer.swap_buffers();
    }

    pub fn diff(&self) -> Vec<CellPatch> {
        self.buffer.diff()
    }

    pub fn force_repaint(&mut self) {
        self.buffer.force_repaint();
    }

    /// Direct resize path. The manager calls this per layout change; callers
    /// of unmanaged screens call it on terminal resize.
    pub fn resize(&mut self, width: u16, height: u16, mode: ResizeMode) {
        self.buffer.resize(width, height, mode);
    }

    /// The viewport assigned by the manager's layout, if any.
    pub fn viewport(&self) -> Option<Rect> {
        self.viewport
    }

    pub fn is_managed(&self) -> bool {
        self.managed
    }

    /// Manager back-reference: set on add, updated per layout.
    pub(crate) fn attach(&mut self, viewport: Rect) {
        self.managed = true;
        self.viewport = Some(viewport);
    }

    /// Manager back-reference: cleared on removal and manager drop.
    pub(crate) fn detach(&mut self) {
        self.managed = false;
        self.viewport = None;
    }

    /// A writing context that interprets coordinates as viewport offsets.
    pub fn viewport_context(&mut self) -> ViewportContext<'_> {
        ViewportContext { screen: self, rect: None }
    }

    /// A writing context over an explicit sub-rectangle of this screen.
    ///
    /// Coordinates are offsets into `rect` and clipped to it.
    pub fn sub_viewport(&mut self, rect: Rect) -> ViewportContext<'_> {
        ViewportContext {
            screen: self,
            rect: Some(rect),
        }
    }

    /// Dump the back buffer to a `cat`-viewable ANSI file.
    pub fn dump_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        ansi_dump::dump_to_file(&self.buffer, path)
    }
}

/// Viewport-relative writing context.
///
/// Built from [`Screen::sub_viewport`] the context covers an explicit
/// sub-rectangle; built from [`Screen::viewport_context`] it covers the
/// managed viewport, or the whole buffer for an unmanaged screen. Either
/// way, coordinates are offsets into the covered area and clipped to it.
pub struct ViewportContext<'a> {
    screen: &'a mut Screen,
    rect: Option<Rect>,
}

impl ViewportContext<'_> {
    /// Width and height of the drawable area.
    pub fn effective_size(&self) -> (u16, u16) {
        if let Some(rect) = self.rect {
            return (rect.width, rect.height);
        }
        match (self.screen.managed, self.screen.viewport) {
            (true, Some(vp)) => (vp.width, vp.height),
            _ => (self.screen.width(), self.screen.height()),
        }
    }

    /// Offset of the covered area within the screen's own buffer.
    fn base(&self) -> (u16, u16) {
        self.rect.map_or((0, 0), |r| (r.x, r.y))
    }

    pub fn set_cell(&mut self, vx: u16, vy: u16, cell: Cell) {
        let (w, h) = self.effective_size();
        if vx < w && vy < h {
            let (bx, by) = self.base();
            self.screen.set_cell(bx + vx, by + vy, cell);
        }
    }

    pub fn cell(&self, vx: u16, vy: u16) -> Option<Cell> {
        let (w, h) = self.effective_size();
        if vx < w && vy < h {
            let (bx, by) = self.base();
            self.screen.cell(bx + vx, by + vy)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmanaged_viewport_context_spans_buffer() {
        let mut screen = Screen::new(40, 12);
        let mut ctx = screen.viewport_context();
        assert_eq!(ctx.effective_size(), (40, 12));

        ctx.set_cell(39, 11, Cell::from_char('e'));
        assert_eq!(screen.cell(39, 11).map(|c| c.ch), Some('e'));
    }

    #[test]
    fn test_managed_viewport_context_clips() {
        let mut screen = Screen::new(20, 10);
        screen.attach(Rect::new(40, 0, 20, 10));

        let mut ctx = screen.viewport_context();
        assert_eq!(ctx.effective_size(), (20, 10));

        // Offsets are viewport-relative, not absolute
        ctx.set_cell(0, 0, Cell::from_char('L'));
        ctx.set_cell(20, 0, Cell::from_char('x')); // clipped
        drop(ctx);

        assert_eq!(screen.cell(0, 0).map(|c| c.ch), Some('L'));
        assert!(screen.diff().len() == 1);
    }

    #[test]
    fn test_explicit_viewport_offsets_and_clips() {
        let mut screen = Screen::new(40, 12);
        let mut ctx = screen.sub_viewport(Rect::new(10, 4, 5, 3));
        assert_eq!(ctx.effective_size(), (5, 3));

        ctx.set_cell(0, 0, Cell::from_char('a'));
        ctx.set_cell(4, 2, Cell::from_char('b'));
        ctx.set_cell(5, 0, Cell::from_char('x')); // clipped
        assert_eq!(ctx.cell(0, 0).map(|c| c.ch), Some('a'));
        drop(ctx);

        assert_eq!(screen.cell(10, 4).map(|c| c.ch), Some('a'));
        assert_eq!(screen.cell(14, 6).map(|c| c.ch), Some('b'));
        assert_eq!(screen.diff().len(), 2);
    }

    #[test]
    fn test_detach_clears_back_reference() {
        let mut screen = Screen::new(20, 10);
        screen.attach(Rect::new(0, 0, 20, 10));
        assert!(screen.is_managed());
        assert!(screen.viewport().is_some());

        screen.detach();
        assert!(!screen.is_managed());
        assert!(screen.viewport().is_none());
    }
}
