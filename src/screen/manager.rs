// (C) 2025 - Enzo Lombardi

//! Multi-screen manager - viewport layout, z-order, focus and modality.
//!
//! The manager partitions the terminal into viewports, one per managed
//! screen, according to the current [`LayoutType`]. It never owns the
//! caller's screens: both sides hold a [`ScreenHandle`] and identity is
//! pointer identity. On removal (and on manager drop) the screen's managed
//! marker and viewport are cleared.
//!
//! Layout variants need no dynamic dispatch; a tagged [`LayoutType`] plus one
//! recompute function switching on the tag keeps the manager monomorphic.

use crate::core::error::{ErrorKind, Result, TermScreenError};
use crate::core::geometry::{Rect, Size};
use crate::screen::{ResizeMode, ScreenHandle};
use crate::terminal::Terminal;
use chrono::Utc;
use std::rc::Rc;

/// Rule assigning viewports to managed screens from the terminal size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutType {
    /// Screen 0 fills the terminal; all others hidden.
    Single,
    /// Two screens side-by-side; further screens hidden.
    SplitHorizontal,
    /// Two screens stacked; further screens hidden.
    SplitVertical,
    /// The first `rows * cols` screens arranged row-major.
    Grid,
    /// Only the active screen fills the terminal.
    Tabbed,
    /// Screens keep their own viewports, clamped to the terminal.
    Floating,
    /// Viewports are set externally; the manager only ensures visibility.
    Custom,
}

/// Grid layout configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    pub rows: u16,
    pub cols: u16,
    pub row_spacing: u16,
    pub col_spacing: u16,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 2,
            cols: 2,
            row_spacing: 0,
            col_spacing: 0,
        }
    }
}

/// Split layout configuration. The ratio is the first pane's share and must
/// stay within `[0.1, 0.9]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitConfig {
    pub ratio: f32,
    pub spacing: u16,
}

pub const SPLIT_RATIO_MIN: f32 = 0.1;
pub const SPLIT_RATIO_MAX: f32 = 0.9;

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            ratio: 0.5,
            spacing: 0,
        }
    }
}

/// What happened to focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusEventKind {
    Gained,
    Lost,
    Locked,
    Unlocked,
}

/// A focus transition, delivered synchronously to each registered callback
/// in registration order. For a focus change the `Lost` event always
/// precedes the matching `Gained` event.
#[derive(Clone)]
pub struct FocusEvent {
    pub kind: FocusEventKind,
    pub screen: Option<ScreenHandle>,
    pub previous: Option<ScreenHandle>,
    pub timestamp_ms: i64,
}

pub type FocusCallback = Box<dyn FnMut(&FocusEvent)>;

/// A screen registered with the manager, with its layout record.
pub struct ManagedScreen {
    pub screen: ScreenHandle,
    pub viewport: Rect,
    /// Draw order back-to-front; ties broken by insertion order.
    pub z_index: i32,
    pub visible: bool,
    pub focusable: bool,
    pub id: Option<String>,
}

/// Partitions the terminal into viewports with layout, z-order, focus and
/// modality rules.
///
/// # Examples
///
/// ```
/// use termscreen::core::geometry::Size;
/// use termscreen::screen::manager::{LayoutType, ScreenManager};
/// use termscreen::screen::{ResizeMode, Screen};
///
/// let mut manager = ScreenManager::new(LayoutType::SplitHorizontal);
/// manager.set_terminal_size(Size::new(40, 80));
///
/// let left = Screen::new_handle(1, 1);
/// let right = Screen::new_handle(1, 1);
/// manager.add_screen(&left, Some("left")).unwrap();
/// manager.add_screen(&right, Some("right")).unwrap();
///
/// manager.handle_resize(80, 40, ResizeMode::PreserveContent).unwrap();
/// assert_eq!(left.borrow().viewport().unwrap().width, 40);
/// ```
pub struct ScreenManager {
    screens: Vec<ManagedScreen>,
    layout: LayoutType,
    grid: GridConfig,
    split: SplitConfig,
    terminal_size: Option<Size>,
    focused: Option<usize>,
    focus_lock: Option<usize>,
    modal: Option<usize>,
    active: usize,
    resizing: bool,
    focus_callbacks: Vec<FocusCallback>,
}

impl ScreenManager {
    pub fn new(layout: LayoutType) -> Self {
        Self {
            screens: Vec::new(),
            layout,
            grid: GridConfig::default(),
            split: SplitConfig::default(),
            terminal_size: None,
            focused: None,
            focus_lock: None,
            modal: None,
            active: 0,
            resizing: false,
            focus_callbacks: Vec::new(),
        }
    }

    /// Attach to a terminal by adopting its current size.
    ///
    /// Create the manager after the terminal and drop it before; the manager
    /// only keeps the size, never the handles.
    pub fn set_terminal(&mut self, terminal: &Terminal) {
        self.set_terminal_size(terminal.last_size());
    }

    pub fn set_terminal_size(&mut self, size: Size) {
        self.terminal_size = Some(size);
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    pub fn layout(&self) -> LayoutType {
        self.layout
    }

    pub fn managed_screens(&self) -> &[ManagedScreen] {
        &self.screens
    }

    pub fn screen_by_id(&self, id: &str) -> Option<ScreenHandle> {
        self.screens
            .iter()
            .find(|ms| ms.id.as_deref() == Some(id))
            .map(|ms| Rc::clone(&ms.screen))
    }

    pub fn focused_screen(&self) -> Option<ScreenHandle> {
        self.focused.map(|i| Rc::clone(&self.screens[i].screen))
    }

    pub fn is_focus_locked(&self) -> bool {
        self.focus_lock.is_some()
    }

    pub fn modal_screen(&self) -> Option<ScreenHandle> {
        self.modal.map(|i| Rc::clone(&self.screens[i].screen))
    }

    /// The screen a tabbed layout shows.
    pub fn active_screen(&self) -> Result<ScreenHandle> {
        if self.screens.is_empty() {
            return Err(TermScreenError::new(ErrorKind::NoScreensManaged));
        }
        Ok(Rc::clone(&self.screens[self.active].screen))
    }

    fn index_of(&self, screen: &ScreenHandle) -> Result<usize> {
        self.screens
            .iter()
            .position(|ms| Rc::ptr_eq(&ms.screen, screen))
            .ok_or_else(|| TermScreenError::new(ErrorKind::ScreenNotFound))
    }

    // === Registration ===

    /// Register a screen, optionally under a unique id.
    ///
    /// The first screen becomes focused and active. Registration is a
    /// structural change, so the layout is recomputed when a terminal size
    /// is known.
    pub fn add_screen(&mut self, screen: &ScreenHandle, id: Option<&str>) -> Result<()> {
        if let Some(id) = id {
            if self.screens.iter().any(|ms| ms.id.as_deref() == Some(id)) {
                return Err(TermScreenError::new(ErrorKind::DuplicateId(id.to_string())));
            }
        }
        if self.index_of(screen).is_ok() {
            return Err(TermScreenError::invalid_input("screen is already managed"));
        }

        let z_index = self.max_z().map_or(0, |z| z + 1);
        screen.borrow_mut().attach(Rect::default());
        self.screens.push(ManagedScreen {
            screen: Rc::clone(screen),
            viewport: Rect::default(),
            z_index,
            visible: true,
            focusable: true,
            id: id.map(str::to_string),
        });

        if self.screens.len() == 1 {
            self.focused = Some(0);
            self.active = 0;
        }

        self.relayout_if_sized()
    }

    /// Unregister a screen located by identity, clearing its back-reference.
    pub fn remove_screen(&mut self, screen: &ScreenHandle) -> Result<()> {
        let idx = self.index_of(screen)?;

        self.screens[idx].screen.borrow_mut().detach();
        self.screens.remove(idx);

        self.focused = Self::shift_index(self.focused, idx);
        self.focus_lock = Self::shift_index(self.focus_lock, idx);
        self.modal = Self::shift_index(self.modal, idx);
        if self.active >= idx {
            self.active = self.active.saturating_sub(1);
        }

        if self.screens.is_empty() {
            return Ok(());
        }
        self.relayout_if_sized()
    }

    /// Shift an optional index down past a removal, clearing it when it was
    /// the removed slot.
    fn shift_index(index: Option<usize>, removed: usize) -> Option<usize> {
        match index {
            Some(i) if i == removed => None,
            Some(i) if i > removed => Some(i - 1),
            other => other,
        }
    }

    // === Layout ===

    pub fn set_layout(&mut self, layout: LayoutType) -> Result<()> {
        self.layout = layout;
        self.relayout_if_sized()
    }

    pub fn set_split_config(&mut self, config: SplitConfig) -> Result<()> {
        if !(SPLIT_RATIO_MIN..=SPLIT_RATIO_MAX).contains(&config.ratio) {
            return Err(TermScreenError::invalid_input(format!(
                "split ratio {} outside [{SPLIT_RATIO_MIN}, {SPLIT_RATIO_MAX}]",
                config.ratio
            )));
        }
        self.split = config;
        if matches!(
            self.layout,
            LayoutType::SplitHorizontal | LayoutType::SplitVertical
        ) {
            return self.relayout_if_sized();
        }
        Ok(())
    }

    pub fn set_grid_config(&mut self, config: GridConfig) -> Result<()> {
        if config.rows == 0 || config.cols == 0 {
            return Err(TermScreenError::new(ErrorKind::InvalidLayout(
                "grid needs at least one row and one column".into(),
            )));
        }
        self.grid = config;
        if self.layout == LayoutType::Grid {
            return self.relayout_if_sized();
        }
        Ok(())
    }

    /// Select the screen a tabbed layout shows.
    pub fn set_active_screen(&mut self, screen: &ScreenHandle) -> Result<()> {
        if self.screens.is_empty() {
            return Err(TermScreenError::new(ErrorKind::NoScreensManaged));
        }
        self.active = self.index_of(screen)?;
        if self.layout == LayoutType::Tabbed {
            return self.relayout_if_sized();
        }
        Ok(())
    }

    /// Assign a viewport directly, for the custom and floating layouts.
    pub fn set_screen_viewport(&mut self, screen: &ScreenHandle, viewport: Rect) -> Result<()> {
        let idx = self.index_of(screen)?;
        self.screens[idx].viewport = viewport;
        if matches!(self.layout, LayoutType::Custom | LayoutType::Floating) {
            return self.relayout_if_sized();
        }
        Ok(())
    }

    pub fn set_screen_visible(&mut self, screen: &ScreenHandle, visible: bool) -> Result<()> {
        let idx = self.index_of(screen)?;
        self.screens[idx].visible = visible;
        Ok(())
    }

    pub fn set_screen_focusable(&mut self, screen: &ScreenHandle, focusable: bool) -> Result<()> {
        let idx = self.index_of(screen)?;
        self.screens[idx].focusable = focusable;
        Ok(())
    }

    /// Resize entry point, routed from the terminal.
    ///
    /// A re-entrancy guard rejects nested calls. Each visible screen gets its
    /// direct resize with the new viewport dimensions; a screen that cannot
    /// be borrowed is logged and skipped, never aborting the sweep.
    pub fn handle_resize(&mut self, new_cols: u16, new_rows: u16, mode: ResizeMode) -> Result<()> {
        if self.resizing {
            return Err(TermScreenError::new(ErrorKind::ResizeInProgress));
        }
        if new_cols == 0 || new_rows == 0 {
            return Err(TermScreenError::new(ErrorKind::InvalidDimensions {
                width: new_cols,
                height: new_rows,
            }));
        }

        self.resizing = true;
        self.terminal_size = Some(Size::new(new_rows, new_cols));
        let result = self.apply_layout(mode);
        self.resizing = false;
        result
    }

    fn relayout_if_sized(&mut self) -> Result<()> {
        if self.terminal_size.is_none() || self.screens.is_empty() {
            return Ok(());
        }
        self.apply_layout(ResizeMode::PreserveContent)
    }

    fn apply_layout(&mut self, mode: ResizeMode) -> Result<()> {
        if self.screens.is_empty() {
            return Ok(());
        }
        let placements = self.compute_viewports()?;

        for (ms, (viewport, visible)) in self.screens.iter_mut().zip(placements) {
            ms.viewport = viewport;
            ms.visible = visible;

            match ms.screen.try_borrow_mut() {
                Ok(mut screen) => {
                    screen.attach(viewport);
                    if visible {
                        screen.resize(viewport.width, viewport.height, mode);
                    }
                }
                Err(_) => {
                    log::warn!(
                        "skipping resize of busy screen{}",
                        ms.id.as_deref().map(|id| format!(" '{id}'")).unwrap_or_default()
                    );
                }
            }
        }
        Ok(())
    }

    /// Pure layout recompute: one `(viewport, visible)` per managed screen,
    /// in insertion order.
    fn compute_viewports(&self) -> Result<Vec<(Rect, bool)>> {
        let size = self
            .terminal_size
            .ok_or_else(|| TermScreenError::new(ErrorKind::TerminalNotSet))?;
        let term = Rect::new(0, 0, size.cols, size.rows);
        let n = self.screens.len();

        let mut placements: Vec<(Rect, bool)> = self
            .screens
            .iter()
            .map(|ms| (ms.viewport, false))
            .collect();

        match self.layout {
            LayoutType::Single => {
                placements[0] = (term, true);
            }
            LayoutType::SplitHorizontal => {
                let usable = size.cols.saturating_sub(self.split.spacing);
                let first = (f32::from(usable) * self.split.ratio) as u16;
                let second = usable.saturating_sub(first);
                if first == 0 || second == 0 {
                    return Err(TermScreenError::new(ErrorKind::LayoutCalculationFailed(
                        format!("horizontal split does not fit {size}"),
                    )));
                }
                placements[0] = (Rect::new(0, 0, first, size.rows), true);
                if n > 1 {
                    placements[1] = (
                        Rect::new(first + self.split.spacing, 0, second, size.rows),
                        true,
                    );
                }
            }
            LayoutType::SplitVertical => {
                let usable = size.rows.saturating_sub(self.split.spacing);
                let first = (f32::from(usable) * self.split.ratio) as u16;
                let second = usable.saturating_sub(first);
                if first == 0 || second == 0 {
                    return Err(TermScreenError::new(ErrorKind::LayoutCalculationFailed(
                        format!("vertical split does not fit {size}"),
                    )));
                }
                placements[0] = (Rect::new(0, 0, size.cols, first), true);
                if n > 1 {
                    placements[1] = (
                        Rect::new(0, first + self.split.spacing, size.cols, second),
                        true,
                    );
                }
            }
            LayoutType::Grid => {
                let spacing_w = self.grid.col_spacing * (self.grid.cols - 1);
                let spacing_h = self.grid.row_spacing * (self.grid.rows - 1);
                let cell_w = size.cols.saturating_sub(spacing_w) / self.grid.cols;
                let cell_h = size.rows.saturating_sub(spacing_h) / self.grid.rows;
                if cell_w == 0 || cell_h == 0 {
                    return Err(TermScreenError::new(ErrorKind::LayoutCalculationFailed(
                        format!(
                            "{}x{} grid does not fit {size}",
                            self.grid.rows, self.grid.cols
                        ),
                    )));
                }
                let cells = self.grid.rows as usize * self.grid.cols as usize;
                for (i, placement) in placements.iter_mut().enumerate().take(cells.min(n)) {
                    let row = (i / self.grid.cols as usize) as u16;
                    let col = (i % self.grid.cols as usize) as u16;
                    *placement = (
                        Rect::new(
                            col * (cell_w + self.grid.col_spacing),
                            row * (cell_h + self.grid.row_spacing),
                            cell_w,
                            cell_h,
                        ),
                        true,
                    );
                }
            }
            LayoutType::Tabbed => {
                let active = self.active.min(n - 1);
                placements[active] = (term, true);
            }
            LayoutType::Floating => {
                for (ms, placement) in self.screens.iter().zip(placements.iter_mut()) {
                    *placement = (ms.viewport.clamp_within(&term), ms.visible);
                }
            }
            LayoutType::Custom => {
                for placement in &mut placements {
                    placement.1 = true;
                }
            }
        }

        Ok(placements)
    }

    // === Focus & modality ===

    pub fn add_focus_callback(&mut self, callback: FocusCallback) {
        self.focus_callbacks.push(callback);
    }

    fn emit_focus(&mut self, kind: FocusEventKind, idx: Option<usize>, previous: Option<usize>) {
        let event = FocusEvent {
            kind,
            screen: idx.map(|i| Rc::clone(&self.screens[i].screen)),
            previous: previous.map(|i| Rc::clone(&self.screens[i].screen)),
            timestamp_ms: Utc::now().timestamp_millis(),
        };
        // Snapshot so a callback can never invalidate the iteration
        let mut callbacks = std::mem::take(&mut self.focus_callbacks);
        for callback in &mut callbacks {
            callback(&event);
        }
        callbacks.extend(std::mem::take(&mut self.focus_callbacks));
        self.focus_callbacks = callbacks;
    }

    /// Move focus to an index, delivering `lost` before `gained`.
    fn transition_focus(&mut self, idx: usize) {
        if self.focused == Some(idx) {
            return;
        }
        let previous = self.focused;
        self.focused = Some(idx);
        if previous.is_some() {
            self.emit_focus(FocusEventKind::Lost, previous, None);
        }
        self.emit_focus(FocusEventKind::Gained, Some(idx), previous);
    }

    /// Focus a managed, focusable screen.
    pub fn focus_screen(&mut self, screen: &ScreenHandle) -> Result<()> {
        let idx = self.index_of(screen)?;
        if !self.screens[idx].focusable {
            return Err(TermScreenError::invalid_input("screen is not focusable"));
        }
        if let Some(lock) = self.focus_lock {
            if lock != idx {
                return Err(TermScreenError::new(ErrorKind::FocusLocked));
            }
        }
        self.transition_focus(idx);
        Ok(())
    }

    /// Cycle focus forward through focusable, visible screens. No-op when
    /// none qualify or focus is locked.
    pub fn focus_next(&mut self) {
        self.cycle_focus(true);
    }

    /// Cycle focus backward through focusable, visible screens.
    pub fn focus_previous(&mut self) {
        self.cycle_focus(false);
    }

    fn cycle_focus(&mut self, forward: bool) {
        if self.screens.is_empty() || self.focus_lock.is_some() {
            return;
        }
        let n = self.screens.len();
        let start = self.focused.unwrap_or(if forward { n - 1 } else { 0 });
        for step in 1..=n {
            let idx = if forward {
                (start + step) % n
            } else {
                (start + n - step % n) % n
            };
            let ms = &self.screens[idx];
            if ms.focusable && ms.visible {
                self.transition_focus(idx);
                return;
            }
        }
    }

    /// Lock focus to one screen (`Some`) or release the lock (`None`).
    pub fn lock_focus(&mut self, screen: Option<&ScreenHandle>) -> Result<()> {
        match screen {
            Some(screen) => {
                let idx = self.index_of(screen)?;
                if !self.screens[idx].focusable {
                    return Err(TermScreenError::new(ErrorKind::NoFocusableScreens));
                }
                self.transition_focus(idx);
                self.focus_lock = Some(idx);
                self.emit_focus(FocusEventKind::Locked, Some(idx), None);
                Ok(())
            }
            None => {
                if let Some(locked) = self.focus_lock.take() {
                    self.emit_focus(FocusEventKind::Unlocked, Some(locked), None);
                }
                Ok(())
            }
        }
    }

    /// Make a screen modal: top of z-order plus a focus lock. `None` clears
    /// the modal state and releases the lock.
    pub fn set_modal_screen(&mut self, screen: Option<&ScreenHandle>) -> Result<()> {
        match screen {
            Some(screen) => {
                let idx = self.index_of(screen)?;
                self.screens[idx].z_index = self.max_z().map_or(0, |z| z + 1);
                self.modal = Some(idx);
                self.lock_focus(Some(screen))
            }
            None => {
                self.modal = None;
                self.lock_focus(None)
            }
        }
    }

    // === Z-order ===

    fn max_z(&self) -> Option<i32> {
        self.screens.iter().map(|ms| ms.z_index).max()
    }

    fn min_z(&self) -> Option<i32> {
        self.screens.iter().map(|ms| ms.z_index).min()
    }

    pub fn bring_to_front(&mut self, screen: &ScreenHandle) -> Result<()> {
        let idx = self.index_of(screen)?;
        self.screens[idx].z_index = self.max_z().map_or(0, |z| z + 1);
        Ok(())
    }

    pub fn send_to_back(&mut self, screen: &ScreenHandle) -> Result<()> {
        let idx = self.index_of(screen)?;
        self.screens[idx].z_index = self.min_z().map_or(0, |z| z - 1);
        Ok(())
    }

    /// Swap z with the nearest screen above; no-op at the top.
    pub fn move_up(&mut self, screen: &ScreenHandle) -> Result<()> {
        let idx = self.index_of(screen)?;
        let z = self.screens[idx].z_index;
        let neighbor = self
            .screens
            .iter()
            .enumerate()
            .filter(|(i, ms)| *i != idx && ms.z_index > z)
            .min_by_key(|(_, ms)| ms.z_index)
            .map(|(i, _)| i);
        if let Some(other) = neighbor {
            self.screens[idx].z_index = self.screens[other].z_index;
            self.screens[other].z_index = z;
        }
        Ok(())
    }

    /// Swap z with the nearest screen below; no-op at the bottom.
    pub fn move_down(&mut self, screen: &ScreenHandle) -> Result<()> {
        let idx = self.index_of(screen)?;
        let z = self.screens[idx].z_index;
        let neighbor = self
            .screens
            .iter()
            .enumerate()
            .filter(|(i, ms)| *i != idx && ms.z_index < z)
            .max_by_key(|(_, ms)| ms.z_index)
            .map(|(i, _)| i);
        if let Some(other) = neighbor {
            self.screens[idx].z_index = self.screens[other].z_index;
            self.screens[other].z_index = z;
        }
        Ok(())
    }

    /// Topmost visible screen whose viewport contains the point.
    pub fn screen_at_point(&self, x: u16, y: u16) -> Option<ScreenHandle> {
        self.screens
            .iter()
            .enumerate()
            .filter(|(_, ms)| ms.visible && ms.viewport.contains_absolute(x, y))
            .max_by_key(|(i, ms)| (ms.z_index, *i))
            .map(|(_, ms)| Rc::clone(&ms.screen))
    }

    /// Compact z values to `0..n` preserving order, so repeated raises never
    /// overflow.
    pub fn normalize_z_indices(&mut self) {
        let mut order: Vec<usize> = (0..self.screens.len()).collect();
        order.sort_by_key(|&i| (self.screens[i].z_index, i));
        for (z, idx) in order.into_iter().enumerate() {
            self.screens[idx].z_index = z as i32;
        }
    }

    /// Visible screens in draw order (back to front).
    pub fn draw_order(&self) -> Vec<ScreenHandle> {
        let mut order: Vec<usize> = (0..self.screens.len())
            .filter(|&i| self.screens[i].visible)
            .collect();
        order.sort_by_key(|&i| (self.screens[i].z_index, i));
        order
            .into_iter()
            .map(|i| Rc::clone(&self.screens[i].screen))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn mark_resizing(&mut self, value: bool) {
        self.resizing = value;
    }
}

impl Drop for ScreenManager {
    fn drop(&mut self) {
        for ms in &self.screens {
            if let Ok(mut screen) = ms.screen.try_borrow_mut() {
                screen.detach();
            }
        }
    }
}
