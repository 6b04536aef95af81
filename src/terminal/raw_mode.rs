// (C) 2025 - Enzo Lombardi

//! Raw-mode adapter - enter/exit raw mode with guaranteed restoration.
//!
//! The adapter saves the original terminal attributes on enter and restores
//! them on exit, on drop, and on the fatal paths: an `atexit` hook and
//! handlers for the common fatal signals call [`emergency_restore`], which
//! uses only async-signal-safe operations (`tcsetattr` plus one raw `write`
//! of cursor-show and main-screen bytes). A process-wide latch forbids two
//! live raw-mode instances.
//!
//! `VMIN`/`VTIME` control how input reads block: [`RawMode::set_read_timeout`]
//! sets the inter-byte timeout in deciseconds, [`RawMode::set_read_min_chars`]
//! the minimum byte count. Both are POSIX termios knobs and no-ops on
//! Windows, where raw mode is toggled through the console API instead.

use crate::core::error::{ErrorKind, Result, TermScreenError};

#[cfg(unix)]
pub use unix::RawMode;
#[cfg(windows)]
pub use windows::RawMode;

#[cfg(unix)]
mod unix {
    use super::*;
    use std::cell::UnsafeCell;
    use std::io;
    use std::mem::MaybeUninit;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Original attributes for the fatal-path handlers. Written once before
    /// `SAVED_VALID` flips to true; handlers only read after checking it.
    struct SavedTermios(UnsafeCell<MaybeUninit<libc::termios>>);

    // SAFETY: single-writer flag discipline described above; readers are the
    // signal/atexit handlers which never write.
    unsafe impl Sync for SavedTermios {}

    static SAVED_ATTRS: SavedTermios = SavedTermios(UnsafeCell::new(MaybeUninit::uninit()));
    static SAVED_VALID: AtomicBool = AtomicBool::new(false);
    static HOOKS_INSTALLED: AtomicBool = AtomicBool::new(false);

    /// Process-wide latch: holds the live adapter's saved attributes slot.
    static LATCH: Mutex<Option<libc::termios>> = Mutex::new(None);

    const FATAL_SIGNALS: [i32; 3] = [libc::SIGTERM, libc::SIGHUP, libc::SIGQUIT];

    /// Restore the saved attributes and re-show the cursor / main screen.
    ///
    /// Async-signal-safe; callable from handlers, `atexit` and destructors.
    /// Idempotent: repeated calls keep restoring the same saved state.
    pub(crate) fn emergency_restore() {
        if !SAVED_VALID.load(Ordering::SeqCst) {
            return;
        }
        // SAFETY: SAVED_VALID is only set after SAVED_ATTRS was written.
        let orig = unsafe { (*SAVED_ATTRS.0.get()).assume_init() };
        // SAFETY: tcsetattr and write are async-signal-safe syscalls.
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &orig);
            const RESTORE: &[u8] = b"\x1b[?25h\x1b[?1049l";
            libc::write(
                libc::STDOUT_FILENO,
                RESTORE.as_ptr().cast::<libc::c_void>(),
                RESTORE.len(),
            );
        }
    }

    extern "C" fn at_exit_restore() {
        emergency_restore();
    }

    fn install_cleanup_hooks() -> Result<()> {
        if HOOKS_INSTALLED.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // SAFETY: at_exit_restore only performs async-signal-safe work.
        unsafe {
            libc::atexit(at_exit_restore);
        }
        for sig in FATAL_SIGNALS {
            // SAFETY: the handler body is restricted to async-signal-safe
            // operations (emergency_restore plus the default re-raise).
            let registered = unsafe {
                signal_hook::low_level::register(sig, move || {
                    emergency_restore();
                    let _ = signal_hook::low_level::emulate_default_handler(sig);
                })
            };
            if let Err(e) = registered {
                return Err(TermScreenError::new(ErrorKind::SignalHandlingFailed(
                    format!("signal {sig}: {e}"),
                )));
            }
        }
        Ok(())
    }

    fn errno_failure(op: &str) -> TermScreenError {
        TermScreenError::new(ErrorKind::RawModeFailed(format!(
            "{op}: {}",
            io::Error::last_os_error()
        )))
    }

    /// Raw-mode state for one terminal.
    pub struct RawMode {
        active: bool,
    }

    impl RawMode {
        pub fn new() -> Self {
            Self { active: false }
        }

        pub fn is_raw(&self) -> bool {
            self.active
        }

        /// Enter raw mode, saving the original attributes.
        ///
        /// # Errors
        ///
        /// `AlreadyInRawMode` when this adapter (or any other in the
        /// process) is live; `RawModeFailed` when the termios calls fail,
        /// e.g. because stdin is not a terminal.
        pub fn enter(&mut self) -> Result<()> {
            if self.active {
                return Err(TermScreenError::new(ErrorKind::AlreadyInRawMode));
            }
            let mut latch = LATCH.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if latch.is_some() {
                return Err(TermScreenError::new(ErrorKind::AlreadyInRawMode));
            }

            let fd = libc::STDIN_FILENO;
            let mut orig = MaybeUninit::<libc::termios>::uninit();
            // SAFETY: tcgetattr fills the struct on success, checked below.
            if unsafe { libc::tcgetattr(fd, orig.as_mut_ptr()) } != 0 {
                return Err(errno_failure("tcgetattr"));
            }
            // SAFETY: initialized by the successful tcgetattr above.
            let orig = unsafe { orig.assume_init() };

            let mut raw = orig;
            // SAFETY: cfmakeraw only mutates the struct it is given.
            unsafe { libc::cfmakeraw(&mut raw) };
            raw.c_cc[libc::VMIN] = 0;
            raw.c_cc[libc::VTIME] = 1;
            // SAFETY: plain termios syscall on a valid fd.
            if unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &raw) } != 0 {
                return Err(errno_failure("tcsetattr"));
            }

            // Publish the saved attributes for the fatal-path handlers
            // before anything can die in raw mode.
            // SAFETY: the flag is still false, so no handler reads yet.
            unsafe {
                *SAVED_ATTRS.0.get() = MaybeUninit::new(orig);
            }
            SAVED_VALID.store(true, Ordering::SeqCst);

            if let Err(e) = install_cleanup_hooks() {
                // Do not stay raw without a working fatal path.
                SAVED_VALID.store(false, Ordering::SeqCst);
                // SAFETY: plain termios syscall restoring saved attributes.
                unsafe { libc::tcsetattr(fd, libc::TCSAFLUSH, &orig) };
                return Err(e);
            }

            *latch = Some(orig);
            self.active = true;
            Ok(())
        }

        /// Restore the saved attributes.
        ///
        /// # Errors
        ///
        /// `NotInRawMode` when the adapter is not live; `RawModeFailed` when
        /// restoration fails.
        pub fn exit(&mut self) -> Result<()> {
            if !self.active {
                return Err(TermScreenError::new(ErrorKind::NotInRawMode));
            }
            let mut latch = LATCH.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let orig = latch.take().ok_or_else(|| {
                TermScreenError::new(ErrorKind::NotInRawMode)
            })?;

            SAVED_VALID.store(false, Ordering::SeqCst);
            self.active = false;
            // SAFETY: plain termios syscall restoring saved attributes.
            if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &orig) } != 0 {
                return Err(errno_failure("tcsetattr"));
            }
            Ok(())
        }

        /// Set the inter-byte read timeout (`VTIME`) in deciseconds.
        pub fn set_read_timeout(&mut self, deciseconds: u8) -> Result<()> {
            self.update_cc(libc::VTIME, deciseconds)
        }

        /// Set the minimum byte count a read waits for (`VMIN`).
        pub fn set_read_min_chars(&mut self, n: u8) -> Result<()> {
            self.update_cc(libc::VMIN, n)
        }

        fn update_cc(&mut self, index: usize, value: u8) -> Result<()> {
            if !self.active {
                return Err(TermScreenError::new(ErrorKind::NotInRawMode));
            }
            let fd = libc::STDIN_FILENO;
            let mut current = MaybeUninit::<libc::termios>::uninit();
            // SAFETY: tcgetattr fills the struct on success, checked below.
            if unsafe { libc::tcgetattr(fd, current.as_mut_ptr()) } != 0 {
                return Err(errno_failure("tcgetattr"));
            }
            // SAFETY: initialized by the successful tcgetattr above.
            let mut current = unsafe { current.assume_init() };
            current.c_cc[index] = value;
            // SAFETY: plain termios syscall on a valid fd.
            if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &current) } != 0 {
                return Err(errno_failure("tcsetattr"));
            }
            Ok(())
        }

        /// Best-effort restoration; safe from destructors and repeatable.
        pub fn force_cleanup(&mut self) {
            if !self.active {
                return;
            }
            emergency_restore();
            SAVED_VALID.store(false, Ordering::SeqCst);
            let mut latch = LATCH.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            *latch = None;
            self.active = false;
        }
    }

    impl Default for RawMode {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for RawMode {
        fn drop(&mut self) {
            self.force_cleanup();
        }
    }
}

#[cfg(windows)]
mod windows {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    static LATCH: AtomicBool = AtomicBool::new(false);

    /// Raw-mode state for one terminal, over the console API.
    pub struct RawMode {
        active: bool,
    }

    impl RawMode {
        pub fn new() -> Self {
            Self { active: false }
        }

        pub fn is_raw(&self) -> bool {
            self.active
        }

        pub fn enter(&mut self) -> Result<()> {
            if self.active || LATCH.swap(true, Ordering::SeqCst) {
                return Err(TermScreenError::new(ErrorKind::AlreadyInRawMode));
            }
            crossterm::terminal::enable_raw_mode().map_err(|e| {
                LATCH.store(false, Ordering::SeqCst);
                TermScreenError::new(ErrorKind::RawModeFailed(e.to_string()))
            })?;
            self.active = true;
            Ok(())
        }

        pub fn exit(&mut self) -> Result<()> {
            if !self.active {
                return Err(TermScreenError::new(ErrorKind::NotInRawMode));
            }
            self.active = false;
            LATCH.store(false, Ordering::SeqCst);
            crossterm::terminal::disable_raw_mode()
                .map_err(|e| TermScreenError::new(ErrorKind::RawModeFailed(e.to_string())))
        }

        /// VTIME has no console equivalent; accepted and ignored.
        pub fn set_read_timeout(&mut self, _deciseconds: u8) -> Result<()> {
            if !self.active {
                return Err(TermScreenError::new(ErrorKind::NotInRawMode));
            }
            Ok(())
        }

        /// VMIN has no console equivalent; accepted and ignored.
        pub fn set_read_min_chars(&mut self, _n: u8) -> Result<()> {
            if !self.active {
                return Err(TermScreenError::new(ErrorKind::NotInRawMode));
            }
            Ok(())
        }

        pub fn force_cleanup(&mut self) {
            if !self.active {
                return;
            }
            let _ = crossterm::terminal::disable_raw_mode();
            LATCH.store(false, Ordering::SeqCst);
            self.active = false;
        }
    }

    impl Default for RawMode {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for RawMode {
        fn drop(&mut self) {
            self.force_cleanup();
        }
    }
}
