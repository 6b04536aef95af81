// (C) 2025 - Enzo Lombardi
// Split-screen demo: two viewports side by side, live resize, Ctrl+C quits.

use simplelog::{Config, LevelFilter, WriteLogger};
use std::fs::File;
use termscreen::app::RunLoop;
use termscreen::core::event::CrosstermInput;
use termscreen::core::style::Attributes;
use termscreen::prelude::*;
use termscreen::screen::ScreenHandle;

fn fill(screen: &ScreenHandle, style: Style) {
    let mut screen = screen.borrow_mut();
    let mut ctx = screen.viewport_context();
    let (w, h) = ctx.effective_size();
    for y in 0..h {
        for x in 0..w {
            ctx.set_cell(x, y, Cell::new(' ', style));
        }
    }
}

fn draw_text(screen: &ScreenHandle, x: u16, y: u16, text: &str, style: Style) {
    let mut screen = screen.borrow_mut();
    let mut ctx = screen.viewport_context();
    for (i, ch) in text.chars().enumerate() {
        ctx.set_cell(x + i as u16, y, Cell::new(ch, style));
    }
}

fn main() -> termscreen::core::error::Result<()> {
    let _ = WriteLogger::init(
        LevelFilter::Info,
        Config::default(),
        File::create("split_demo.log")?,
    );

    let mut terminal = Terminal::init()?;
    terminal.start_resize_monitoring()?;
    terminal.add_resize_callback(Box::new(|event: &ResizeEvent| {
        log::info!("{event}");
        Ok(())
    }));

    let mut manager = ScreenManager::new(LayoutType::SplitHorizontal);
    manager.set_terminal(&terminal);

    let left = Screen::new_handle(1, 1);
    let right = Screen::new_handle(1, 1);
    manager.add_screen(&left, Some("left"))?;
    manager.add_screen(&right, Some("right"))?;

    let size = terminal.size()?;
    manager.handle_resize(size.cols, size.rows, ResizeMode::Clear)?;

    let left_style = Style::new(Color::BrightWhite, Color::Blue);
    let right_style = Style::new(Color::Black, Color::Cyan);
    let left_title = Style::with_attrs(Color::BrightWhite, Color::Blue, Attributes::BOLD);
    fill(&left, left_style);
    fill(&right, right_style);
    draw_text(&left, 2, 1, "left pane", left_title);
    draw_text(&right, 2, 1, "right pane - Ctrl+C quits", right_style);

    let mut input = CrosstermInput::new();
    RunLoop::new(30)?.run(&mut terminal, &mut input, &mut manager)?;

    terminal.stop_resize_monitoring()?;
    Ok(())
}
