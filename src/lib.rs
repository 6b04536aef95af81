// (C) 2025 - Enzo Lombardi
// TermScreen - double-buffered terminal screen runtime
// Core modules
pub mod core;
pub mod screen;
pub mod terminal;
pub mod app;
pub mod test_util;

// Re-export commonly used types
pub mod prelude {
    pub use crate::app::RunLoop;
    pub use crate::core::draw::Cell;
    pub use crate::core::event::{Event, InputSource, ResizeEvent};
    pub use crate::core::geometry::{Rect, Size, SizeConstraints};
    pub use crate::core::style::{Attributes, Color, Style};
    pub use crate::screen::manager::{LayoutType, ScreenManager};
    pub use crate::screen::{ResizeMode, Screen, ScreenHandle};
    pub use crate::terminal::Terminal;
}
