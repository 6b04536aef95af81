// (C) 2025 - Enzo Lombardi
// Size detection pipeline: environment fallback tiers and the DSR reply
// parser round trip.

use termscreen::core::ansi;
use termscreen::core::geometry::{Size, SizeConstraints};
use termscreen::terminal::Terminal;

// Everything that runs the detached pipeline lives in this one test: the
// pipeline reads the process-global LINES/COLUMNS, and cargo runs sibling
// tests on parallel threads.
#[test]
fn detached_pipeline_tiers_and_caching() {
    let mut terminal = Terminal::detached(Size::new(10, 10));

    // Tier 3: both variables present
    // SAFETY: this test is the only one in the binary touching LINES/COLUMNS.
    unsafe {
        std::env::set_var("LINES", "30");
        std::env::set_var("COLUMNS", "120");
    }
    assert_eq!(terminal.refresh_size().unwrap(), Size::new(30, 120));

    // Tier 4: nothing set
    // SAFETY: as above.
    unsafe {
        std::env::remove_var("LINES");
        std::env::remove_var("COLUMNS");
    }
    assert_eq!(terminal.refresh_size().unwrap(), Size::new(24, 80));

    // One variable alone does not satisfy the environment tier
    // SAFETY: as above.
    unsafe {
        std::env::set_var("LINES", "33");
    }
    assert_eq!(terminal.refresh_size().unwrap(), Size::new(24, 80));
    // SAFETY: as above.
    unsafe {
        std::env::remove_var("LINES");
    }

    // Constraints clamp the fallback and invalidate the cache
    terminal.set_size_constraints(SizeConstraints::new(30, 100, 200, 500));
    assert_eq!(terminal.refresh_size().unwrap(), Size::new(30, 100));
    assert_eq!(terminal.size().unwrap(), Size::new(30, 100));

    // size() serves the cache until constraints change again
    terminal.set_size_constraints(SizeConstraints::new(40, 200, 100, 400));
    assert_eq!(terminal.size().unwrap(), Size::new(40, 200));
}

#[test]
fn dsr_reply_round_trips_across_the_range() {
    for rows in [1u16, 2, 24, 100, 999, 5000, 9999] {
        for cols in [1u16, 80, 132, 9999] {
            let reply = format!("\x1b[{rows};{cols}R");
            assert_eq!(
                ansi::parse_device_status_report(reply.as_bytes()),
                Some(Size::new(rows, cols)),
                "failed for {rows};{cols}"
            );
        }
    }
}

#[test]
fn constraint_application_always_validates() {
    let constraints = [
        SizeConstraints::default(),
        SizeConstraints::new(10, 40, 50, 200),
        SizeConstraints::new(24, 80, 24, 80),
    ];
    let sizes = [
        Size::new(1, 1),
        Size::new(24, 80),
        Size::new(9999, 9999),
        Size::new(17, 3),
    ];
    for c in constraints {
        for s in sizes {
            assert!(c.validate(c.apply(s)), "failed for {s} under {c:?}");
        }
    }
}
