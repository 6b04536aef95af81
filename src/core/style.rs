// (C) 2025 - Enzo Lombardi

//! Style model - color variants, the attribute bitset, and their SGR emitters.

use std::io::{self, Write};

/// A terminal color.
///
/// Covers the four ANSI color families: the terminal default, the sixteen
/// basic colors, the 256-color palette, and 24-bit RGB.
///
/// # Examples
///
/// ```
/// use termscreen::core::style::Color;
///
/// let mut out = Vec::new();
/// Color::Red.write_ansi(&mut out, true).unwrap();
/// assert_eq!(out, b"\x1b[31m");
///
/// out.clear();
/// Color::Indexed(208).write_ansi(&mut out, false).unwrap();
/// assert_eq!(out, b"\x1b[48;5;208m");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    /// Base SGR code for the basic sixteen, as a foreground.
    ///
    /// Returns `None` for `Default`, `Indexed` and `Rgb`, which use their own
    /// parameter forms.
    fn basic_fg_code(self) -> Option<u16> {
        match self {
            Color::Black => Some(30),
            Color::Red => Some(31),
            Color::Green => Some(32),
            Color::Yellow => Some(33),
            Color::Blue => Some(34),
            Color::Magenta => Some(35),
            Color::Cyan => Some(36),
            Color::White => Some(37),
            Color::BrightBlack => Some(90),
            Color::BrightRed => Some(91),
            Color::BrightGreen => Some(92),
            Color::BrightYellow => Some(93),
            Color::BrightBlue => Some(94),
            Color::BrightMagenta => Some(95),
            Color::BrightCyan => Some(96),
            Color::BrightWhite => Some(97),
            _ => None,
        }
    }

    /// Build a basic color from its foreground SGR code (30-37, 90-97).
    pub(crate) fn from_basic_fg_code(code: u16) -> Option<Color> {
        Some(match code {
            30 => Color::Black,
            31 => Color::Red,
            32 => Color::Green,
            33 => Color::Yellow,
            34 => Color::Blue,
            35 => Color::Magenta,
            36 => Color::Cyan,
            37 => Color::White,
            90 => Color::BrightBlack,
            91 => Color::BrightRed,
            92 => Color::BrightGreen,
            93 => Color::BrightYellow,
            94 => Color::BrightBlue,
            95 => Color::BrightMagenta,
            96 => Color::BrightCyan,
            97 => Color::BrightWhite,
            _ => return None,
        })
    }

    /// Emit exactly one SGR sequence selecting this color.
    ///
    /// Foreground uses 30-37/90-97, `38;5;n`, `38;2;r;g;b` or 39; background
    /// the 40/100/48/49 forms.
    pub fn write_ansi<W: Write>(&self, w: &mut W, is_fg: bool) -> io::Result<()> {
        match *self {
            Color::Default => {
                write!(w, "\x1b[{}m", if is_fg { 39 } else { 49 })
            }
            Color::Indexed(n) => {
                write!(w, "\x1b[{};5;{}m", if is_fg { 38 } else { 48 }, n)
            }
            Color::Rgb(r, g, b) => {
                write!(w, "\x1b[{};2;{};{};{}m", if is_fg { 38 } else { 48 }, r, g, b)
            }
            basic => {
                // Background codes are the foreground codes shifted by 10.
                let code = basic.basic_fg_code().unwrap_or(39) + if is_fg { 0 } else { 10 };
                write!(w, "\x1b[{code}m")
            }
        }
    }
}

/// Attribute bitset over the eight SGR text attributes.
///
/// The whole set lives in one byte, so emptiness and equality checks are a
/// single integer compare.
///
/// # Examples
///
/// ```
/// use termscreen::core::style::Attributes;
///
/// let mut attrs = Attributes::empty();
/// assert!(!attrs.is_set());
///
/// attrs.insert(Attributes::BOLD);
/// attrs.insert(Attributes::UNDERLINE);
/// assert!(attrs.is_set());
/// assert!(attrs.contains(Attributes::BOLD));
/// assert!(!attrs.contains(Attributes::ITALIC));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attributes(u8);

impl Attributes {
    pub const BOLD: Attributes = Attributes(0x01);
    pub const DIM: Attributes = Attributes(0x02);
    pub const ITALIC: Attributes = Attributes(0x04);
    pub const UNDERLINE: Attributes = Attributes(0x08);
    pub const BLINK: Attributes = Attributes(0x10);
    pub const REVERSE: Attributes = Attributes(0x20);
    pub const HIDDEN: Attributes = Attributes(0x40);
    pub const STRIKETHROUGH: Attributes = Attributes(0x80);

    /// Each attribute flag paired with its SGR parameter, in emit order.
    const SGR_TABLE: [(Attributes, u8); 8] = [
        (Self::BOLD, 1),
        (Self::DIM, 2),
        (Self::ITALIC, 3),
        (Self::UNDERLINE, 4),
        (Self::BLINK, 5),
        (Self::REVERSE, 7),
        (Self::HIDDEN, 8),
        (Self::STRIKETHROUGH, 9),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    /// True when any attribute bit is set. Single integer compare.
    pub const fn is_set(self) -> bool {
        self.0 != 0
    }

    pub const fn contains(self, other: Attributes) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Attributes) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Attributes) {
        self.0 &= !other.0;
    }

    /// Builder-style union, handy for literals in tests and callers.
    pub const fn with(self, other: Attributes) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Emit one SGR sequence per enabled attribute (codes 1,2,3,4,5,7,8,9).
    pub fn write_ansi<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for (flag, code) in Self::SGR_TABLE {
            if self.contains(flag) {
                write!(w, "\x1b[{code}m")?;
            }
        }
        Ok(())
    }
}

/// Foreground color, background color, and attribute bitset of one cell.
///
/// Equality is structural over the colors and a byte compare over the
/// attribute set; two styles differing in any single field are unequal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attributes,
}

impl Style {
    pub const fn new(fg: Color, bg: Color) -> Self {
        Self {
            fg,
            bg,
            attrs: Attributes::empty(),
        }
    }

    pub const fn with_attrs(fg: Color, bg: Color, attrs: Attributes) -> Self {
        Self { fg, bg, attrs }
    }

    /// Emit the full selection for this style: SGR reset, the enabled
    /// attributes, then foreground and background.
    pub fn write_ansi<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(b"\x1b[0m")?;
        self.attrs.write_ansi(w)?;
        self.fg.write_ansi(w, true)?;
        self.bg.write_ansi(w, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(color: Color, is_fg: bool) -> Vec<u8> {
        let mut out = Vec::new();
        color.write_ansi(&mut out, is_fg).unwrap();
        out
    }

    #[test]
    fn test_basic_color_codes() {
        assert_eq!(emit(Color::Black, true), b"\x1b[30m");
        assert_eq!(emit(Color::White, true), b"\x1b[37m");
        assert_eq!(emit(Color::BrightBlack, true), b"\x1b[90m");
        assert_eq!(emit(Color::BrightWhite, true), b"\x1b[97m");
        assert_eq!(emit(Color::Black, false), b"\x1b[40m");
        assert_eq!(emit(Color::BrightWhite, false), b"\x1b[107m");
    }

    #[test]
    fn test_default_color_codes() {
        assert_eq!(emit(Color::Default, true), b"\x1b[39m");
        assert_eq!(emit(Color::Default, false), b"\x1b[49m");
    }

    #[test]
    fn test_extended_color_codes() {
        assert_eq!(emit(Color::Indexed(0), true), b"\x1b[38;5;0m");
        assert_eq!(emit(Color::Indexed(255), false), b"\x1b[48;5;255m");
        assert_eq!(emit(Color::Rgb(1, 2, 3), true), b"\x1b[38;2;1;2;3m");
        assert_eq!(emit(Color::Rgb(255, 0, 128), false), b"\x1b[48;2;255;0;128m");
    }

    #[test]
    fn test_attributes_bitset() {
        let mut a = Attributes::empty();
        assert!(!a.is_set());

        a.insert(Attributes::BOLD);
        a.insert(Attributes::STRIKETHROUGH);
        assert!(a.is_set());
        assert!(a.contains(Attributes::BOLD));
        assert!(a.contains(Attributes::STRIKETHROUGH));
        assert!(!a.contains(Attributes::DIM));

        a.remove(Attributes::BOLD);
        assert!(!a.contains(Attributes::BOLD));
        assert!(a.is_set());

        a.remove(Attributes::STRIKETHROUGH);
        assert!(!a.is_set());
    }

    #[test]
    fn test_attributes_emit_order() {
        let attrs = Attributes::empty()
            .with(Attributes::BOLD)
            .with(Attributes::UNDERLINE)
            .with(Attributes::STRIKETHROUGH);
        let mut out = Vec::new();
        attrs.write_ansi(&mut out).unwrap();
        assert_eq!(out, b"\x1b[1m\x1b[4m\x1b[9m");
    }

    #[test]
    fn test_style_equality_is_per_field() {
        let base = Style::new(Color::Red, Color::Default);
        assert_eq!(base, base);

        let fg_diff = Style::new(Color::Blue, Color::Default);
        let bg_diff = Style::new(Color::Red, Color::Black);
        let attr_diff = Style::with_attrs(Color::Red, Color::Default, Attributes::BOLD);
        assert_ne!(base, fg_diff);
        assert_ne!(base, bg_diff);
        assert_ne!(base, attr_diff);
    }

    #[test]
    fn test_style_full_emit() {
        let style = Style::with_attrs(Color::Red, Color::Default, Attributes::BOLD);
        let mut out = Vec::new();
        style.write_ansi(&mut out).unwrap();
        assert_eq!(out, b"\x1b[0m\x1b[1m\x1b[31m\x1b[49m");
    }
}
