// (C) 2025 - Enzo Lombardi

//! ANSI escape sequence builder and reply parsers.
//!
//! The builder half formats cursor, style and screen control sequences into a
//! caller-owned byte sink; there is no internal state. The parser half
//! understands the two replies the runtime ever reads back from a terminal:
//! the Device Status Report cursor position, and the color SGRs this module
//! itself emits (used by the round-trip tests and the dump reader).
//!
//! # Supported sequences
//!
//! - Clear screen `CSI 2J`, clear line `CSI 2K`
//! - Cursor move `CSI row;col H` (1-indexed), save `CSI s`, restore `CSI u`
//! - Cursor show/hide `CSI ?25h` / `CSI ?25l`
//! - Alternate screen `CSI ?1049h` / `CSI ?1049l`
//! - SGR reset `CSI 0m`, attributes 1,2,3,4,5,7,8,9
//! - 16-color (30-37, 90-97 / 40-47, 100-107), 256-color (`38;5;n`),
//!   RGB (`38;2;r;g;b`), and the background twins
//! - Cursor style selectors `CSI 0 q` through `CSI 6 q`
//! - Device Status Report query `CSI 6n` and its `CSI row;col R` reply
//!
//! # Example
//!
//! ```
//! use termscreen::core::ansi;
//!
//! let mut out = Vec::new();
//! ansi::cursor_move_to(&mut out, 1, 1).unwrap();
//! ansi::clear_screen(&mut out).unwrap();
//! assert_eq!(out, b"\x1b[1;1H\x1b[2J");
//! ```

use super::geometry::Size;
use super::style::Color;
use std::io::{self, Write};

const CSI: &[u8] = b"\x1b[";

/// Clear the entire screen (`CSI 2J`).
pub fn clear_screen<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Clear the current line (`CSI 2K`).
pub fn clear_line<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[2K")
}

/// Move the cursor to a 1-indexed row and column.
pub fn cursor_move_to<W: Write>(w: &mut W, row: u16, col: u16) -> io::Result<()> {
    write!(w, "\x1b[{row};{col}H")
}

pub fn cursor_show<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

pub fn cursor_hide<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

pub fn cursor_save<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[s")
}

pub fn cursor_restore<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[u")
}

pub fn enter_alt_screen<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

pub fn leave_alt_screen<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

pub fn sgr_reset<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Select a cursor style (`CSI n q`, n in 0..=6; out-of-range clamps to 6).
pub fn cursor_style<W: Write>(w: &mut W, selector: u8) -> io::Result<()> {
    write!(w, "\x1b[{} q", selector.min(6))
}

/// Query the cursor position (`CSI 6n`); the terminal replies `CSI row;col R`.
pub fn device_status_report<W: Write>(w: &mut W) -> io::Result<()> {
    w.write_all(b"\x1b[6n")
}

/// Parse a Device Status Report reply into a size.
///
/// Accepts both the two-byte `ESC [` introducer and the single-byte `0x9B`
/// CSI. Rows and columns must be in `1..=9999`. Trailing bytes after the
/// terminating `R` are ignored.
pub fn parse_device_status_report(reply: &[u8]) -> Option<Size> {
    let body = if let Some(rest) = reply.strip_prefix(CSI) {
        rest
    } else if let Some(rest) = reply.strip_prefix(&[0x9B]) {
        rest
    } else {
        return None;
    };

    let end = body.iter().position(|&b| b == b'R')?;
    let mut parts = body[..end].split(|&b| b == b';');

    let rows = parse_decimal(parts.next()?)?;
    let cols = parse_decimal(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    if !(1..=9999).contains(&rows) || !(1..=9999).contains(&cols) {
        return None;
    }
    Some(Size { rows, cols })
}

fn parse_decimal(digits: &[u8]) -> Option<u16> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Parse one color SGR sequence back into its color variant.
///
/// Inverts [`Color::write_ansi`]: basic (30-37, 90-97 and background twins),
/// default (39/49), 256-color and RGB forms all round-trip. Returns the color
/// and whether it addressed the foreground.
pub fn parse_color_sgr(seq: &[u8]) -> Option<(Color, bool)> {
    let body = seq.strip_prefix(CSI).or_else(|| seq.strip_prefix(&[0x9B]))?;
    let body = body.strip_suffix(b"m")?;

    let mut params = body.split(|&b| b == b';').map(parse_decimal);
    let lead = params.next()??;

    match lead {
        39 => return none_left(params).then_some((Color::Default, true)),
        49 => return none_left(params).then_some((Color::Default, false)),
        38 | 48 => {
            let is_fg = lead == 38;
            let mode = params.next()??;
            let color = match mode {
                5 => Color::Indexed(u8::try_from(params.next()??).ok()?),
                2 => {
                    let r = u8::try_from(params.next()??).ok()?;
                    let g = u8::try_from(params.next()??).ok()?;
                    let b = u8::try_from(params.next()??).ok()?;
                    Color::Rgb(r, g, b)
                }
                _ => return None,
            };
            return none_left(params).then_some((color, is_fg));
        }
        _ => {}
    }

    // Basic colors: background codes are the foreground codes shifted by 10.
    let (fg_code, is_fg) = match lead {
        30..=37 | 90..=97 => (lead, true),
        40..=47 | 100..=107 => (lead - 10, false),
        _ => return None,
    };
    if !none_left(params) {
        return None;
    }
    Color::from_basic_fg_code(fg_code).map(|c| (c, is_fg))
}

fn none_left<I: Iterator>(mut iter: I) -> bool {
    iter.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_and_screen_sequences() {
        let mut out = Vec::new();
        cursor_move_to(&mut out, 12, 34).unwrap();
        assert_eq!(out, b"\x1b[12;34H");

        out.clear();
        cursor_hide(&mut out).unwrap();
        cursor_show(&mut out).unwrap();
        assert_eq!(out, b"\x1b[?25l\x1b[?25h");

        out.clear();
        enter_alt_screen(&mut out).unwrap();
        leave_alt_screen(&mut out).unwrap();
        assert_eq!(out, b"\x1b[?1049h\x1b[?1049l");

        out.clear();
        clear_line(&mut out).unwrap();
        sgr_reset(&mut out).unwrap();
        assert_eq!(out, b"\x1b[2K\x1b[0m");
    }

    #[test]
    fn test_cursor_save_restore() {
        let mut out = Vec::new();
        cursor_save(&mut out).unwrap();
        cursor_restore(&mut out).unwrap();
        assert_eq!(out, b"\x1b[s\x1b[u");
    }

    #[test]
    fn test_cursor_style_selectors() {
        for n in 0..=6u8 {
            let mut out = Vec::new();
            cursor_style(&mut out, n).unwrap();
            assert_eq!(out, format!("\x1b[{n} q").as_bytes());
        }
        let mut out = Vec::new();
        cursor_style(&mut out, 99).unwrap();
        assert_eq!(out, b"\x1b[6 q");
    }

    #[test]
    fn test_dsr_query_bytes() {
        let mut out = Vec::new();
        device_status_report(&mut out).unwrap();
        assert_eq!(out, b"\x1b[6n");
    }

    #[test]
    fn test_parse_dsr_reply() {
        assert_eq!(
            parse_device_status_report(b"\x1b[24;80R"),
            Some(Size::new(24, 80))
        );
        assert_eq!(
            parse_device_status_report(b"\x9b1;1R"),
            Some(Size::new(1, 1))
        );
        assert_eq!(
            parse_device_status_report(b"\x1b[9999;9999R"),
            Some(Size::new(9999, 9999))
        );
        // Trailing garbage after R is tolerated
        assert_eq!(
            parse_device_status_report(b"\x1b[30;120Rjunk"),
            Some(Size::new(30, 120))
        );
    }

    #[test]
    fn test_parse_dsr_rejects_malformed() {
        assert_eq!(parse_device_status_report(b""), None);
        assert_eq!(parse_device_status_report(b"\x1b[24;80"), None);
        assert_eq!(parse_device_status_report(b"\x1b[0;80R"), None);
        assert_eq!(parse_device_status_report(b"\x1b[10000;80R"), None);
        assert_eq!(parse_device_status_report(b"\x1b[24R"), None);
        assert_eq!(parse_device_status_report(b"\x1b[24;80;1R"), None);
        assert_eq!(parse_device_status_report(b"[24;80R"), None);
    }

    #[test]
    fn test_color_emit_parse_round_trip() {
        let colors = [
            Color::Default,
            Color::Black,
            Color::Red,
            Color::BrightCyan,
            Color::BrightWhite,
            Color::Indexed(0),
            Color::Indexed(16),
            Color::Indexed(255),
            Color::Rgb(0, 0, 0),
            Color::Rgb(255, 128, 1),
        ];
        for color in colors {
            for is_fg in [true, false] {
                let mut out = Vec::new();
                color.write_ansi(&mut out, is_fg).unwrap();
                assert_eq!(
                    parse_color_sgr(&out),
                    Some((color, is_fg)),
                    "round trip failed for {color:?} fg={is_fg}"
                );
            }
        }
    }

    #[test]
    fn test_parse_color_rejects_non_color_sgr() {
        assert_eq!(parse_color_sgr(b"\x1b[0m"), None);
        assert_eq!(parse_color_sgr(b"\x1b[1m"), None);
        assert_eq!(parse_color_sgr(b"\x1b[38;9;1m"), None);
        assert_eq!(parse_color_sgr(b"\x1b[38;5;256m"), None);
        assert_eq!(parse_color_sgr(b"\x1b[31;42m"), None);
    }
}
