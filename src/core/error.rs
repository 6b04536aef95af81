// (C) 2025 - Enzo Lombardi

//! Error types for terminal runtime operations.
//!
//! This module provides the main error type used throughout the library,
//! with proper backtrace support and context preservation.

use super::geometry::Size;
use std::backtrace::Backtrace;
use std::fmt::{Display, Formatter};

/// Error type for terminal runtime operations.
///
/// Wraps error kinds with backtrace support for debugging.
///
/// # Examples
///
/// ```rust,no_run
/// use termscreen::core::error::Result;
///
/// fn init_display() -> Result<()> {
///     // Operations that can fail
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct TermScreenError {
    kind: ErrorKind,
    backtrace: Backtrace,
}

/// The specific kind of error that occurred.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Environment
    /// Stdout is not attached to a terminal
    NotATty,
    /// The terminal lacks a capability the runtime requires
    UnsupportedTerminal(String),

    // Mode
    /// Raw mode was entered while already active
    AlreadyInRawMode,
    /// Raw mode was exited while not active
    NotInRawMode,
    /// The raw-mode transition itself failed
    RawModeFailed(String),

    // Size detection
    /// No detection tier produced a size
    GetSizeFailed(String),
    /// A detected or requested size had a zero dimension
    InvalidSize(Size),
    /// Writing the ANSI size query failed
    AnsiQueryFailed(std::io::Error),
    /// The Device Status Report reply was missing or malformed
    DeviceStatusReportFailed,

    // I/O
    /// I/O operation failed
    Io(std::io::Error),
    /// Writing to the terminal failed
    WriteFailed(std::io::Error),
    /// The output pipe went away mid-write
    PipeError,
    /// A bounded wait expired
    Timeout,

    // Resize subsystem
    /// The platform resize watcher could not be installed
    ResizeMonitoringFailed(String),
    /// The polling worker thread could not be spawned
    ThreadCreationFailed(String),
    /// Signal handler registration failed
    SignalHandlingFailed(String),
    /// A resize was requested while one is already being applied
    ResizeInProgress,

    // Manager
    /// The screen is not registered with this manager
    ScreenNotFound,
    /// The layout configuration is unusable
    InvalidLayout(String),
    /// A screen with this id is already managed
    DuplicateId(String),
    /// The manager has no terminal size to lay out against
    TerminalNotSet,
    /// The operation needs at least one managed screen
    NoScreensManaged,
    /// The computed viewports do not fit the terminal
    LayoutCalculationFailed(String),
    /// Focus is locked to another screen
    FocusLocked,
    /// No managed screen can take focus
    NoFocusableScreens,

    // Loop
    /// A parameter was outside its documented range
    InvalidInput(String),
    /// Dimensions with a zero extent were supplied
    InvalidDimensions { width: u16, height: u16 },
    /// A buffer could not be grown
    AllocationError,
}

impl TermScreenError {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            backtrace: Backtrace::capture(),
        }
    }

    /// Creates an invalid input error.
    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput(msg.into()))
    }

    /// The kind of error that occurred.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns `true` if this error is an I/O or write error.
    pub fn is_io(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Io(_) | ErrorKind::WriteFailed(_) | ErrorKind::PipeError
        )
    }

    /// Returns `true` if this error came from the raw-mode adapter.
    pub fn is_raw_mode(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::AlreadyInRawMode | ErrorKind::NotInRawMode | ErrorKind::RawModeFailed(_)
        )
    }

    /// Returns `true` if this error came from the size detection pipeline.
    pub fn is_size_detection(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::GetSizeFailed(_)
                | ErrorKind::InvalidSize(_)
                | ErrorKind::AnsiQueryFailed(_)
                | ErrorKind::DeviceStatusReportFailed
        )
    }
}

impl Display for TermScreenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::NotATty => write!(f, "stdout is not a terminal")?,
            ErrorKind::UnsupportedTerminal(msg) => write!(f, "unsupported terminal: {}", msg)?,
            ErrorKind::AlreadyInRawMode => write!(f, "terminal is already in raw mode")?,
            ErrorKind::NotInRawMode => write!(f, "terminal is not in raw mode")?,
            ErrorKind::RawModeFailed(msg) => write!(f, "raw mode transition failed: {}", msg)?,
            ErrorKind::GetSizeFailed(msg) => write!(f, "terminal size detection failed: {}", msg)?,
            ErrorKind::InvalidSize(size) => write!(f, "invalid terminal size {}", size)?,
            ErrorKind::AnsiQueryFailed(e) => write!(f, "ANSI size query failed: {}", e)?,
            ErrorKind::DeviceStatusReportFailed => {
                write!(f, "no usable Device Status Report reply")?
            }
            ErrorKind::Io(e) => write!(f, "I/O error: {}", e)?,
            ErrorKind::WriteFailed(e) => write!(f, "terminal write failed: {}", e)?,
            ErrorKind::PipeError => write!(f, "terminal output pipe closed")?,
            ErrorKind::Timeout => write!(f, "operation timed out")?,
            ErrorKind::ResizeMonitoringFailed(msg) => {
                write!(f, "resize monitoring failed: {}", msg)?
            }
            ErrorKind::ThreadCreationFailed(msg) => {
                write!(f, "resize worker thread creation failed: {}", msg)?
            }
            ErrorKind::SignalHandlingFailed(msg) => {
                write!(f, "signal handler installation failed: {}", msg)?
            }
            ErrorKind::ResizeInProgress => write!(f, "a resize is already in progress")?,
            ErrorKind::ScreenNotFound => write!(f, "screen is not managed by this manager")?,
            ErrorKind::InvalidLayout(msg) => write!(f, "invalid layout: {}", msg)?,
            ErrorKind::DuplicateId(id) => write!(f, "screen id '{}' is already in use", id)?,
            ErrorKind::TerminalNotSet => write!(f, "no terminal attached to the manager")?,
            ErrorKind::NoScreensManaged => write!(f, "the manager holds no screens")?,
            ErrorKind::LayoutCalculationFailed(msg) => {
                write!(f, "layout calculation failed: {}", msg)?
            }
            ErrorKind::FocusLocked => write!(f, "focus is locked to another screen")?,
            ErrorKind::NoFocusableScreens => write!(f, "no focusable screen available")?,
            ErrorKind::InvalidInput(msg) => write!(f, "invalid input: {}", msg)?,
            ErrorKind::InvalidDimensions { width, height } => {
                write!(f, "invalid dimensions {}x{}", width, height)?
            }
            ErrorKind::AllocationError => write!(f, "buffer allocation failed")?,
        }

        // Include backtrace if captured
        if self.backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            write!(f, "\n\nBacktrace:\n{}", self.backtrace)?;
        }

        Ok(())
    }
}

impl std::error::Error for TermScreenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(e) | ErrorKind::WriteFailed(e) | ErrorKind::AnsiQueryFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TermScreenError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            return Self::new(ErrorKind::PipeError);
        }
        Self::new(ErrorKind::Io(e))
    }
}

impl From<ErrorKind> for TermScreenError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Result type for terminal runtime operations.
///
/// This is a type alias for `Result<T, TermScreenError>`.
pub type Result<T> = std::result::Result<T, TermScreenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_accessor() {
        let err = TermScreenError::new(ErrorKind::FocusLocked);
        assert!(matches!(err.kind(), ErrorKind::FocusLocked));
    }

    #[test]
    fn test_io_classification() {
        let io = TermScreenError::from(std::io::Error::other("boom"));
        assert!(io.is_io());

        let pipe = TermScreenError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(matches!(pipe.kind(), ErrorKind::PipeError));
    }

    #[test]
    fn test_display_has_no_type_names() {
        let err = TermScreenError::new(ErrorKind::InvalidSize(Size::new(0, 80)));
        let text = format!("{err}");
        assert!(text.contains("80x0"));
    }
}
