// (C) 2025 - Enzo Lombardi
//! ANSI dump utilities for debugging screen content
//!
//! This module dumps screen buffers to ANSI text files which can be viewed
//! with `cat` or any pager that renders escape codes (`less -R`).
//!
//! # Examples
//!
//! ```no_run
//! use termscreen::screen::Screen;
//!
//! let screen = Screen::new(80, 24);
//! // ... draw some content ...
//! screen.dump_to_file("debug_screen.ans").unwrap();
//! ```

use super::draw::Cell;
use super::style::Style;
use crate::screen::buffer::ScreenBuffer;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Dump a buffer's back content to an ANSI text file.
pub fn dump_to_file<P: AsRef<Path>>(buffer: &ScreenBuffer, path: P) -> io::Result<()> {
    let mut file = File::create(path)?;
    dump_region(
        &mut file,
        buffer,
        0,
        0,
        buffer.width(),
        buffer.height(),
    )
}

/// Dump a rectangular region of a buffer to any writer.
///
/// Emits a style selection only when the style changes along a row, so the
/// files stay small and diff-friendly.
pub fn dump_region<W: Write>(
    writer: &mut W,
    buffer: &ScreenBuffer,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
) -> io::Result<()> {
    for row in y..y.saturating_add(height).min(buffer.height()) {
        let mut last_style: Option<Style> = None;

        for col in x..x.saturating_add(width).min(buffer.width()) {
            let cell = buffer.cell(col, row).unwrap_or(Cell::EMPTY);

            if last_style != Some(cell.style) {
                cell.style.write_ansi(writer)?;
                last_style = Some(cell.style);
            }
            write!(writer, "{}", cell.ch)?;
        }

        // Reset at end of line
        writeln!(writer, "\x1b[0m")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::style::Color;

    #[test]
    fn test_dump_simple_buffer() {
        let mut buffer = ScreenBuffer::new(2, 1);
        let style = Style::new(Color::White, Color::Blue);
        buffer.set_cell(0, 0, Cell::new('H', style));
        buffer.set_cell(1, 0, Cell::new('i', style));

        let mut output = Vec::new();
        dump_region(&mut output, &buffer, 0, 0, 2, 1).unwrap();

        let result = String::from_utf8(output).unwrap();
        assert!(result.contains("Hi"));
        assert!(result.contains("\x1b[")); // Contains ANSI codes
    }

    #[test]
    fn test_dump_emits_style_changes_only() {
        let mut buffer = ScreenBuffer::new(4, 1);
        let red = Style::new(Color::Red, Color::Default);
        for x in 0..4 {
            buffer.set_cell(x, 0, Cell::new('r', red));
        }

        let mut output = Vec::new();
        dump_region(&mut output, &buffer, 0, 0, 4, 1).unwrap();
        let text = String::from_utf8(output).unwrap();

        // One selection for the run, one trailing reset
        assert_eq!(text.matches("\x1b[31m").count(), 1);
        assert!(text.ends_with("\x1b[0m\n"));
    }
}
