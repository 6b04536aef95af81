// (C) 2025 - Enzo Lombardi

//! Frame-paced render loop.
//!
//! The loop is a plain per-tick function driven by [`RunLoop::run`];
//! integrators with their own scheduler can call [`RunLoop::tick`] instead.
//! Each tick drains one input event, applies any deferred resize, renders
//! when the frame deadline has passed, and sleeps the remainder of the frame.
//!
//! Rendering walks the screen diff in row-major order and batches output:
//! cursor moves are skipped for horizontally adjacent runs and SGR state is
//! re-emitted only when the style changes. The whole frame goes to the
//! terminal in a single write, followed by the buffer swap and a flush.

use crate::core::ansi;
use crate::core::draw::Cell;
use crate::core::error::{ErrorKind, Result, TermScreenError};
use crate::core::event::{Event, InputSource};
use crate::core::geometry::Size;
use crate::core::style::Style;
use crate::screen::manager::ScreenManager;
use crate::screen::{CellPatch, ResizeMode};
use crate::terminal::Terminal;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 240;

/// Cooperative render loop with atomic run state and retained frame buffer.
///
/// # Examples
///
/// ```rust,no_run
/// use termscreen::app::RunLoop;
/// use termscreen::core::event::CrosstermInput;
/// use termscreen::screen::manager::{LayoutType, ScreenManager};
/// use termscreen::screen::Screen;
/// use termscreen::terminal::Terminal;
///
/// # fn main() -> termscreen::core::error::Result<()> {
/// let mut terminal = Terminal::init()?;
/// let mut manager = ScreenManager::new(LayoutType::Single);
/// manager.set_terminal(&terminal);
/// let screen = Screen::new_handle(1, 1);
/// manager.add_screen(&screen, Some("main"))?;
///
/// let mut input = CrosstermInput::new();
/// RunLoop::new(60)?.run(&mut terminal, &mut input, &mut manager)?;
/// # Ok(())
/// # }
/// ```
pub struct RunLoop {
    running: Arc<AtomicBool>,
    target_fps: u32,
    last_render: Option<Instant>,
    /// Reused across frames; capacity is retained between renders.
    frame: Vec<u8>,
}

impl RunLoop {
    /// # Errors
    ///
    /// `InvalidInput` when `target_fps` is outside `1..=240`.
    pub fn new(target_fps: u32) -> Result<Self> {
        Self::validate_fps(target_fps)?;
        Ok(Self {
            running: Arc::new(AtomicBool::new(false)),
            target_fps,
            last_render: None,
            frame: Vec::with_capacity(4096),
        })
    }

    fn validate_fps(fps: u32) -> Result<()> {
        if !(MIN_FPS..=MAX_FPS).contains(&fps) {
            return Err(TermScreenError::invalid_input(format!(
                "target fps {fps} outside {MIN_FPS}..={MAX_FPS}"
            )));
        }
        Ok(())
    }

    pub fn set_target_fps(&mut self, fps: u32) -> Result<()> {
        Self::validate_fps(fps)?;
        self.target_fps = fps;
        Ok(())
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps))
    }

    /// Shared run flag; storing `false` cancels the loop at the top of its
    /// next iteration.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Drive ticks until the run flag clears.
    pub fn run(
        &mut self,
        terminal: &mut Terminal,
        input: &mut dyn InputSource,
        manager: &mut ScreenManager,
    ) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        while self.running.load(Ordering::SeqCst) {
            self.tick(terminal, input, manager)?;
        }
        Ok(())
    }

    /// One loop iteration: deferred resize, one input event, paced render,
    /// frame sleep.
    pub fn tick(
        &mut self,
        terminal: &mut Terminal,
        input: &mut dyn InputSource,
        manager: &mut ScreenManager,
    ) -> Result<()> {
        if let Some(event) = terminal.poll_resize()? {
            self.apply_resize(manager, event.new_size)?;
        }

        if let Some(event) = input.poll() {
            self.dispatch(terminal, manager, event)?;
        }

        let frame_duration = self.frame_duration();
        let now = Instant::now();
        let due = self
            .last_render
            .is_none_or(|last| now.duration_since(last) >= frame_duration);
        if due {
            self.render(terminal, manager)?;
            self.last_render = Some(now);
        }

        if let Some(last) = self.last_render {
            if let Some(remaining) = frame_duration.checked_sub(last.elapsed()) {
                if !remaining.is_zero() {
                    std::thread::sleep(remaining);
                }
            }
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        terminal: &mut Terminal,
        manager: &mut ScreenManager,
        event: Event,
    ) -> Result<()> {
        match event {
            Event::Key(key) if key.is_interrupt() => {
                self.running.store(false, Ordering::SeqCst);
            }
            Event::Resize(size) => {
                if !size.is_valid() {
                    return Err(TermScreenError::new(ErrorKind::InvalidDimensions {
                        width: size.cols,
                        height: size.rows,
                    }));
                }
                terminal.handle_resize(size)?;
                self.apply_resize(manager, size)?;
            }
            // Remaining keys, mouse, focus and paste events fall through to
            // the caller's own handling layer.
            Event::Key(_) | Event::Mouse(_) | Event::FocusGained | Event::FocusLost
            | Event::Paste(_) => {}
        }
        Ok(())
    }

    /// Route a size change to the manager and force a full repaint.
    fn apply_resize(&mut self, manager: &mut ScreenManager, size: Size) -> Result<()> {
        manager.handle_resize(size.cols, size.rows, ResizeMode::PreserveContent)?;
        for handle in manager.draw_order() {
            if let Ok(mut screen) = handle.try_borrow_mut() {
                screen.force_repaint();
            }
        }
        Ok(())
    }

    /// Compose every visible screen's diff into the frame buffer and emit it
    /// in one terminal write.
    ///
    /// I/O failures are returned to the caller; the loop stays runnable.
    pub fn render(&mut self, terminal: &mut Terminal, manager: &mut ScreenManager) -> Result<()> {
        self.frame.clear();
        let visible = manager.draw_order();

        for handle in &visible {
            let Ok(screen) = handle.try_borrow() else {
                log::warn!("skipping render of busy screen");
                continue;
            };
            let origin = screen.viewport().map_or((0, 0), |v| (v.x, v.y));
            compose_frame(&mut self.frame, &screen.diff(), origin)
                .map_err(|e| TermScreenError::new(ErrorKind::WriteFailed(e)))?;
        }

        if self.frame.is_empty() {
            return Ok(());
        }
        terminal.write_bytes(&self.frame)?;
        for handle in &visible {
            if let Ok(mut screen) = handle.try_borrow_mut() {
                screen.swap_buffers();
            }
        }
        terminal.flush()
    }
}

/// Differential frame composer.
///
/// Walks row-major patches tracking the last cursor position and style:
/// horizontally adjacent cells need no cursor move, and SGR state (reset,
/// attributes, foreground, background) is emitted only when the style
/// changes. `origin` offsets screen-local coordinates into the viewport.
/// Wide glyphs advance the tracked position by their display width; NUL and
/// space both emit a plain ASCII space.
pub fn compose_frame(
    buf: &mut Vec<u8>,
    patches: &[CellPatch],
    origin: (u16, u16),
) -> io::Result<()> {
    use unicode_width::UnicodeWidthChar;

    let mut last_pos: Option<(u16, u16)> = None;
    let mut last_style: Option<Style> = None;

    for patch in patches {
        let adjacent = last_pos == Some((patch.x.wrapping_sub(1), patch.y));
        if !adjacent {
            ansi::cursor_move_to(buf, origin.1 + patch.y + 1, origin.0 + patch.x + 1)?;
        }

        if last_style != Some(patch.cell.style) {
            patch.cell.style.write_ansi(buf)?;
            last_style = Some(patch.cell.style);
        }

        emit_char(buf, patch.cell)?;

        let width = UnicodeWidthChar::width(patch.cell.ch).unwrap_or(1).max(1) as u16;
        last_pos = Some((patch.x + width - 1, patch.y));
    }
    Ok(())
}

fn emit_char(buf: &mut Vec<u8>, cell: Cell) -> io::Result<()> {
    if cell.ch == '\0' || cell.ch == ' ' {
        return buf.write_all(b" ");
    }
    let mut utf8 = [0u8; 4];
    buf.write_all(cell.ch.encode_utf8(&mut utf8).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::style::Color;

    fn patch(x: u16, y: u16, ch: char, style: Style) -> CellPatch {
        CellPatch {
            x,
            y,
            cell: Cell::new(ch, style),
        }
    }

    #[test]
    fn test_compose_batches_adjacent_run() {
        let red = Style::new(Color::Red, Color::Default);
        let patches = vec![
            patch(0, 0, 'A', red),
            patch(1, 0, 'B', red),
            patch(5, 0, 'C', red),
        ];
        let mut buf = Vec::new();
        compose_frame(&mut buf, &patches, (0, 0)).unwrap();

        assert_eq!(
            buf,
            b"\x1b[1;1H\x1b[0m\x1b[31m\x1b[49mAB\x1b[1;6HC".to_vec()
        );
        assert!(buf.len() < 32, "frame was {} bytes", buf.len());
    }

    #[test]
    fn test_compose_reemits_style_on_change() {
        let red = Style::new(Color::Red, Color::Default);
        let blue = Style::new(Color::Blue, Color::Default);
        let patches = vec![patch(0, 0, 'a', red), patch(1, 0, 'b', blue)];
        let mut buf = Vec::new();
        compose_frame(&mut buf, &patches, (0, 0)).unwrap();

        assert_eq!(
            buf,
            b"\x1b[1;1H\x1b[0m\x1b[31m\x1b[49ma\x1b[0m\x1b[34m\x1b[49mb".to_vec()
        );
    }

    #[test]
    fn test_compose_applies_viewport_origin() {
        let patches = vec![patch(0, 0, 'x', Style::default())];
        let mut buf = Vec::new();
        compose_frame(&mut buf, &patches, (40, 10)).unwrap();
        assert!(buf.starts_with(b"\x1b[11;41H"));
    }

    #[test]
    fn test_compose_nul_and_space_emit_space() {
        let patches = vec![
            patch(0, 0, '\0', Style::default()),
            patch(1, 0, ' ', Style::default()),
        ];
        let mut buf = Vec::new();
        compose_frame(&mut buf, &patches, (0, 0)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("  "));
        assert!(!text.contains('\0'));
    }

    #[test]
    fn test_compose_wide_glyph_keeps_adjacency() {
        let style = Style::default();
        // '漢' occupies two columns; the cell after the continuation column
        // is still part of the same run.
        let patches = vec![patch(0, 0, '漢', style), patch(2, 0, 'x', style)];
        let mut buf = Vec::new();
        compose_frame(&mut buf, &patches, (0, 0)).unwrap();

        let text = String::from_utf8(buf).unwrap();
        // One cursor move plus one style selection (reset, fg, bg)
        assert_eq!(text.matches("\x1b[").count(), 4);
    }

    #[test]
    fn test_fps_validation() {
        assert!(RunLoop::new(0).is_err());
        assert!(RunLoop::new(241).is_err());
        assert!(RunLoop::new(1).is_ok());
        assert!(RunLoop::new(240).is_ok());

        let mut run_loop = RunLoop::new(60).unwrap();
        assert!(run_loop.set_target_fps(0).is_err());
        assert_eq!(run_loop.target_fps(), 60);
        run_loop.set_target_fps(30).unwrap();
        assert_eq!(
            run_loop.frame_duration(),
            Duration::from_secs_f64(1.0 / 30.0)
        );
    }
}
