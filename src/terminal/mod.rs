// (C) 2025 - Enzo Lombardi

//! Terminal abstraction layer.
//!
//! This module provides the [`Terminal`] type which owns every piece of
//! process-terminal state the runtime touches:
//! - Raw mode and alternate screen, with guaranteed restoration
//! - The tiered size detection pipeline and its cache
//! - Cursor visibility and style
//! - The resize-callback registry and the platform resize watcher
//!
//! # Resize monitoring
//!
//! On POSIX the watcher is a `SIGWINCH` flag registered through
//! `signal-hook`; the handler only sets an atomic, and the owning loop picks
//! it up at its next tick via [`Terminal::poll_resize`]. On Windows a
//! background worker polls the console every 50 ms and parks the new size
//! for the same `poll_resize` path. Either way, callbacks run on the loop
//! thread, in registration order.
//!
//! # Examples
//!
//! ```rust,no_run
//! use termscreen::core::error::Result;
//! use termscreen::terminal::Terminal;
//!
//! fn main() -> Result<()> {
//!     let mut terminal = Terminal::init()?;
//!     let size = terminal.size()?;
//!     log::info!("running at {size}");
//!     // Render, poll, ...; restoration happens on drop.
//!     Ok(())
//! }
//! ```

pub mod raw_mode;
pub mod size;

pub use raw_mode::RawMode;

use crate::core::ansi;
use crate::core::error::{ErrorKind, Result, TermScreenError};
use crate::core::event::ResizeEvent;
use crate::core::geometry::{Size, SizeConstraints};
use chrono::Utc;
use crossterm::tty::IsTty;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Resize callback; a failing callback is logged and skipped, never
/// propagated, and never stops delivery to later callbacks.
pub type ResizeCallback = Box<dyn FnMut(&ResizeEvent) -> Result<()>>;

enum MonitorState {
    Off,
    #[cfg(unix)]
    Signal { signal_id: signal_hook::SigId },
    #[cfg(windows)]
    Polling {
        stop: Arc<AtomicBool>,
        pending: Arc<Mutex<Option<Size>>>,
        worker: std::thread::JoinHandle<()>,
    },
}

/// Owns the controlling terminal: handles, size cache, mode flags, resize
/// callbacks and the resize watcher.
///
/// Exactly one attached terminal exists per process (enforced by the
/// raw-mode latch); destruction restores raw mode, the alternate screen and
/// the cursor regardless of intervening failures.
pub struct Terminal {
    stdout: io::Stdout,
    /// False for the detached test/headless form, which never touches the TTY.
    attached: bool,
    size: Size,
    size_cache: Option<Size>,
    constraints: SizeConstraints,
    raw: RawMode,
    use_alt_screen: bool,
    cursor_visible: bool,
    debug_output: bool,
    resize_callbacks: Mutex<Vec<ResizeCallback>>,
    resize_flag: Arc<AtomicBool>,
    monitoring: MonitorState,
}

impl Terminal {
    /// Initialize the real terminal: raw mode, alternate screen, hidden
    /// cursor, detected size.
    ///
    /// # Errors
    ///
    /// `NotATty` when stdout is not a terminal; raw-mode and size-detection
    /// errors surface unchanged and abort startup.
    pub fn init() -> Result<Self> {
        let stdout = io::stdout();
        if !stdout.is_tty() {
            return Err(TermScreenError::new(ErrorKind::NotATty));
        }

        let mut terminal = Self {
            stdout,
            attached: true,
            size: size::FALLBACK_SIZE,
            size_cache: None,
            constraints: SizeConstraints::default(),
            raw: RawMode::new(),
            use_alt_screen: false,
            cursor_visible: true,
            debug_output: false,
            resize_callbacks: Mutex::new(Vec::new()),
            resize_flag: Arc::new(AtomicBool::new(false)),
            monitoring: MonitorState::Off,
        };

        terminal.raw.enter()?;
        terminal.enter_alt_screen()?;
        terminal.hide_cursor()?;
        terminal.clear()?;
        terminal.refresh_size()?;
        Ok(terminal)
    }

    /// Build a terminal that never touches the TTY.
    ///
    /// Every emit is discarded (successfully) unless debug output is turned
    /// on. The size pipeline skips the OS and ANSI tiers, which makes the
    /// environment/fallback behavior testable.
    pub fn detached(size: Size) -> Self {
        Self {
            stdout: io::stdout(),
            attached: false,
            size,
            size_cache: Some(size),
            constraints: SizeConstraints::default(),
            raw: RawMode::new(),
            use_alt_screen: false,
            cursor_visible: true,
            debug_output: false,
            resize_callbacks: Mutex::new(Vec::new()),
            resize_flag: Arc::new(AtomicBool::new(false)),
            monitoring: MonitorState::Off,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// When off (the default) a detached terminal swallows all output.
    pub fn set_debug_output(&mut self, debug: bool) {
        self.debug_output = debug;
    }

    pub fn debug_output(&self) -> bool {
        self.debug_output
    }

    // === Output plumbing ===

    /// Write raw bytes to stdout, honoring the detached/debug contract.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.attached && !self.debug_output {
            return Ok(());
        }
        self.stdout.write_all(bytes).map_err(|e| {
            if e.kind() == io::ErrorKind::BrokenPipe {
                TermScreenError::new(ErrorKind::PipeError)
            } else {
                TermScreenError::new(ErrorKind::WriteFailed(e))
            }
        })
    }

    pub fn flush(&mut self) -> Result<()> {
        if !self.attached && !self.debug_output {
            return Ok(());
        }
        self.stdout
            .flush()
            .map_err(|e| TermScreenError::new(ErrorKind::WriteFailed(e)))
    }

    fn emit<F>(&mut self, build: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut seq = Vec::with_capacity(16);
        build(&mut seq).map_err(|e| TermScreenError::new(ErrorKind::WriteFailed(e)))?;
        self.write_bytes(&seq)
    }

    // === Size pipeline ===

    /// Current size, served from the cache when it is still constraint-valid.
    pub fn size(&mut self) -> Result<Size> {
        if let Some(cached) = self.size_cache {
            if self.constraints.validate(cached) {
                return Ok(cached);
            }
        }
        self.refresh_size()
    }

    /// Last known size without consulting the pipeline.
    pub fn last_size(&self) -> Size {
        self.size
    }

    /// Force a full re-run of the detection pipeline.
    pub fn refresh_size(&mut self) -> Result<Size> {
        let detected = self.detect_size();
        let constrained = self.constraints.apply(detected);
        if !constrained.is_valid() {
            return Err(TermScreenError::new(ErrorKind::InvalidSize(constrained)));
        }
        self.size = constrained;
        self.size_cache = Some(constrained);
        Ok(constrained)
    }

    /// Constraint changes invalidate the cache.
    pub fn set_size_constraints(&mut self, constraints: SizeConstraints) {
        self.constraints = constraints;
        self.size_cache = None;
    }

    fn detect_size(&mut self) -> Size {
        if self.attached {
            // Tier 1: OS query
            match size::native_size() {
                Ok(size) if size.is_valid() => return size,
                Ok(_) => {}
                Err(e) => log::debug!("native size query failed: {e}"),
            }
            // Tier 2: ANSI cursor probe, only useful with an unbuffered reply
            #[cfg(unix)]
            if self.raw.is_raw() {
                match size::query_device_status_report(&mut self.stdout) {
                    Ok(size) if size.is_valid() => return size,
                    Ok(_) => {}
                    Err(e) => log::debug!("DSR size probe failed: {e}"),
                }
            }
        }
        // Tier 3: environment
        if let Some(size) = size::size_from_env() {
            return size;
        }
        // Tier 4: the historic default
        size::FALLBACK_SIZE
    }

    // === Mode flags (all idempotent on repeat calls) ===

    pub fn enter_raw_mode(&mut self) -> Result<()> {
        if !self.attached || self.raw.is_raw() {
            return Ok(());
        }
        self.raw.enter()
    }

    pub fn exit_raw_mode(&mut self) -> Result<()> {
        if !self.attached || !self.raw.is_raw() {
            return Ok(());
        }
        self.raw.exit()
    }

    pub fn is_raw(&self) -> bool {
        self.raw.is_raw()
    }

    /// Direct access to the raw-mode adapter for VMIN/VTIME tuning.
    pub fn raw_mode(&mut self) -> &mut RawMode {
        &mut self.raw
    }

    pub fn enter_alt_screen(&mut self) -> Result<()> {
        if self.use_alt_screen {
            return Ok(());
        }
        self.emit(ansi::enter_alt_screen)?;
        self.use_alt_screen = true;
        Ok(())
    }

    pub fn exit_alt_screen(&mut self) -> Result<()> {
        if !self.use_alt_screen {
            return Ok(());
        }
        self.emit(ansi::leave_alt_screen)?;
        self.use_alt_screen = false;
        Ok(())
    }

    pub fn is_alt_screen(&self) -> bool {
        self.use_alt_screen
    }

    pub fn show_cursor(&mut self) -> Result<()> {
        if self.cursor_visible {
            return Ok(());
        }
        self.emit(ansi::cursor_show)?;
        self.cursor_visible = true;
        Ok(())
    }

    pub fn hide_cursor(&mut self) -> Result<()> {
        if !self.cursor_visible {
            return Ok(());
        }
        self.emit(ansi::cursor_hide)?;
        self.cursor_visible = false;
        Ok(())
    }

    pub fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    /// Select a cursor style (`CSI n q`).
    pub fn set_cursor_style(&mut self, selector: u8) -> Result<()> {
        if selector > 6 {
            return Err(TermScreenError::invalid_input(format!(
                "cursor style selector {selector} outside 0..=6"
            )));
        }
        self.emit(|buf| ansi::cursor_style(buf, selector))
    }

    /// Clear the screen and home the cursor.
    pub fn clear(&mut self) -> Result<()> {
        self.emit(|buf| {
            ansi::clear_screen(buf)?;
            ansi::cursor_move_to(buf, 1, 1)
        })?;
        self.flush()
    }

    // === Resize monitoring ===

    /// Register a callback invoked on every accepted size change, in
    /// registration order.
    pub fn add_resize_callback(&self, callback: ResizeCallback) {
        self.resize_callbacks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(callback);
    }

    /// Install the platform resize watcher.
    ///
    /// Idempotent: a second call while monitoring is a no-op.
    pub fn start_resize_monitoring(&mut self) -> Result<()> {
        if !matches!(self.monitoring, MonitorState::Off) {
            return Ok(());
        }

        #[cfg(unix)]
        {
            let signal_id = signal_hook::flag::register(
                signal_hook::consts::SIGWINCH,
                Arc::clone(&self.resize_flag),
            )
            .map_err(|e| {
                TermScreenError::new(ErrorKind::SignalHandlingFailed(e.to_string()))
            })?;
            self.monitoring = MonitorState::Signal { signal_id };
            Ok(())
        }

        #[cfg(windows)]
        {
            let stop = Arc::new(AtomicBool::new(false));
            let pending: Arc<Mutex<Option<Size>>> = Arc::new(Mutex::new(None));
            let flag = Arc::clone(&self.resize_flag);
            let worker_stop = Arc::clone(&stop);
            let worker_pending = Arc::clone(&pending);
            let mut last = self.size;

            let worker = std::thread::Builder::new()
                .name("termscreen-resize".into())
                .spawn(move || {
                    while !worker_stop.load(Ordering::SeqCst) {
                        if let Ok(current) = size::native_size() {
                            if current.is_valid() && current != last {
                                last = current;
                                *worker_pending
                                    .lock()
                                    .unwrap_or_else(std::sync::PoisonError::into_inner) =
                                    Some(current);
                                flag.store(true, Ordering::SeqCst);
                            }
                        }
                        std::thread::sleep(std::time::Duration::from_millis(50));
                    }
                })
                .map_err(|e| {
                    TermScreenError::new(ErrorKind::ThreadCreationFailed(e.to_string()))
                })?;

            self.monitoring = MonitorState::Polling {
                stop,
                pending,
                worker,
            };
            Ok(())
        }
    }

    /// Uninstall the watcher, joining the worker where one exists.
    pub fn stop_resize_monitoring(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.monitoring, MonitorState::Off) {
            MonitorState::Off => Ok(()),
            #[cfg(unix)]
            MonitorState::Signal { signal_id } => {
                signal_hook::low_level::unregister(signal_id);
                Ok(())
            }
            #[cfg(windows)]
            MonitorState::Polling { stop, worker, .. } => {
                stop.store(true, Ordering::SeqCst);
                worker.join().map_err(|_| {
                    TermScreenError::new(ErrorKind::ResizeMonitoringFailed(
                        "resize worker panicked".into(),
                    ))
                })?;
                Ok(())
            }
        }
    }

    pub fn is_monitoring(&self) -> bool {
        !matches!(self.monitoring, MonitorState::Off)
    }

    /// The loop's per-tick check of the deferred resize flag.
    ///
    /// Consumes the flag, re-detects the size and routes it through
    /// [`handle_resize`](Self::handle_resize).
    pub fn poll_resize(&mut self) -> Result<Option<ResizeEvent>> {
        if !self.resize_flag.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }

        #[cfg(windows)]
        if let MonitorState::Polling { pending, .. } = &self.monitoring {
            let parked = pending
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .take();
            if let Some(new) = parked {
                return self.handle_resize(new);
            }
        }

        self.size_cache = None;
        let detected = self.detect_size();
        self.handle_resize(detected)
    }

    /// Apply a new size: clamp, compare, update the cache, and deliver the
    /// event to every callback in registration order.
    ///
    /// Returns `Ok(None)` when the constrained size equals the current one.
    pub fn handle_resize(&mut self, new: Size) -> Result<Option<ResizeEvent>> {
        let new = self.constraints.apply(new);
        if !new.is_valid() {
            return Err(TermScreenError::new(ErrorKind::InvalidSize(new)));
        }
        if new == self.size {
            return Ok(None);
        }

        let event = ResizeEvent {
            old_size: self.size,
            new_size: new,
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        self.size = new;
        self.size_cache = Some(new);

        // Snapshot the list so delivery survives re-entrant registration.
        let mut callbacks = std::mem::take(
            &mut *self
                .resize_callbacks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        );
        for callback in &mut callbacks {
            if let Err(e) = callback(&event) {
                log::warn!("resize callback failed: {e}");
            }
        }
        let mut guard = self
            .resize_callbacks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        callbacks.extend(std::mem::take(&mut *guard));
        *guard = callbacks;

        Ok(Some(event))
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        // Best-effort restoration; never raise from a destructor.
        let _ = self.stop_resize_monitoring();
        if self.attached {
            let _ = self.show_cursor();
            let _ = self.exit_alt_screen();
            let _ = self.flush();
            self.raw.force_cleanup();
        }
    }
}
