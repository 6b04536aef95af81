// (C) 2025 - Enzo Lombardi
// Double-buffer behavior: diff correctness and resize content preservation.

use termscreen::core::draw::Cell;
use termscreen::core::style::{Color, Style};
use termscreen::screen::{ResizeMode, Screen};

#[test]
fn diff_tracks_single_cell_edit_cycle() {
    let mut screen = Screen::new(80, 24);
    assert!(screen.diff().is_empty());

    screen.set_cell(10, 5, Cell::from_char('X'));
    let diff = screen.diff();
    assert_eq!(diff.len(), 1);
    assert_eq!((diff[0].x, diff[0].y, diff[0].cell.ch), (10, 5, 'X'));

    screen.swap_buffers();
    assert!(screen.diff().is_empty());

    screen.set_cell(10, 5, Cell::from_char('Y'));
    let diff = screen.diff();
    assert_eq!(diff.len(), 1);
    assert_eq!((diff[0].x, diff[0].y, diff[0].cell.ch), (10, 5, 'Y'));
}

#[test]
fn writes_read_back_and_out_of_range_is_ignored() {
    let mut screen = Screen::new(80, 24);
    let styled = Cell::new('@', Style::new(Color::Yellow, Color::Blue));

    screen.set_cell(79, 23, styled);
    assert_eq!(screen.cell(79, 23), Some(styled));

    screen.set_cell(80, 0, styled);
    screen.set_cell(0, 24, styled);
    assert_eq!(screen.cell(80, 0), None);
    assert_eq!(screen.cell(0, 24), None);
    assert_eq!(screen.diff().len(), 1);
}

#[test]
fn shrink_then_grow_preserves_surviving_content() {
    let mut screen = Screen::new(80, 24);
    screen.set_cell(5, 5, Cell::from_char('A'));

    screen.resize(40, 10, ResizeMode::PreserveContent);
    assert_eq!(screen.cell(5, 5).map(|c| c.ch), Some('A'));
    assert_eq!(screen.cell(60, 20), None);

    screen.resize(80, 24, ResizeMode::PreserveContent);
    assert_eq!(screen.cell(5, 5).map(|c| c.ch), Some('A'));
    assert_eq!(screen.cell(60, 20), Some(Cell::EMPTY));
}

#[test]
fn content_outside_new_extents_is_discarded() {
    let mut screen = Screen::new(80, 24);
    screen.set_cell(70, 20, Cell::from_char('Z'));

    screen.resize(40, 10, ResizeMode::PreserveContent);
    screen.resize(80, 24, ResizeMode::PreserveContent);
    assert_eq!(screen.cell(70, 20), Some(Cell::EMPTY));
}

#[test]
fn resize_clear_starts_fresh() {
    let mut screen = Screen::new(40, 10);
    screen.set_cell(0, 0, Cell::from_char('A'));
    screen.resize(40, 10, ResizeMode::Clear);
    assert_eq!(screen.cell(0, 0), Some(Cell::EMPTY));
}

#[test]
fn force_repaint_dirties_all_content() {
    let mut screen = Screen::new(20, 5);
    screen.set_cell(3, 3, Cell::from_char('k'));
    screen.swap_buffers();
    assert!(screen.diff().is_empty());

    screen.force_repaint();
    let diff = screen.diff();
    assert_eq!(diff.len(), 1);
    assert_eq!(diff[0].cell.ch, 'k');
}

#[test]
fn dump_to_file_writes_viewable_ansi() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("screen.ans");

    let mut screen = Screen::new(10, 2);
    screen.set_cell(0, 0, Cell::new('H', Style::new(Color::Red, Color::Default)));
    screen.set_cell(1, 0, Cell::new('i', Style::new(Color::Red, Color::Default)));
    screen.dump_to_file(&path).unwrap();

    let dumped = std::fs::read_to_string(&path).unwrap();
    assert!(dumped.contains("Hi"));
    assert!(dumped.contains("\x1b[31m"));
    assert!(dumped.ends_with("\x1b[0m\n"));
}
