use vte::ansi::{Color, NamedColor, Rgb};

use super::{GridSync, resolve_cell};
use crate::cell::CellFlags;
use crate::color::Palette;
use crate::event::{Event, EventListener};
use crate::grid::Grid;
use crate::index::{Column, Line, Point, Rect};
use crate::terminal::CursorState;
use crate::vt::{ScreenCell, ScreenSink, VtInterpreter};

struct BellCounter(std::sync::atomic::AtomicUsize);

impl EventListener for BellCounter {
    fn send_event(&self, event: Event) {
        if event == Event::Bell {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }
}

fn sync_parts(cols: usize, lines: usize) -> (Grid, CursorState, VtInterpreter) {
    (
        Grid::new(cols, lines),
        CursorState::default(),
        VtInterpreter::new(cols, lines),
    )
}

#[test]
fn damage_copies_cells_into_grid() {
    let (mut grid, mut cursor, mut vt) = sync_parts(10, 3);
    let listener = crate::event::VoidListener;
    vt.feed(b"ab", &mut GridSync::new(&mut grid, &mut cursor, &listener));

    assert_eq!(grid.cell(Line(0), Column(0)).ch, 'a');
    assert_eq!(grid.cell(Line(0), Column(1)).ch, 'b');
    assert_eq!(cursor.point, Point::new(Line(0), Column(2)));
    assert!(cursor.visible);
}

#[test]
fn reapplying_damage_is_idempotent() {
    let (mut grid, mut cursor, mut vt) = sync_parts(10, 3);
    let listener = crate::event::VoidListener;
    vt.feed(b"\x1b[31mred\r\nplain", &mut GridSync::new(&mut grid, &mut cursor, &listener));
    let _ = grid.drain_dirty().count();
    let before: Vec<_> = (0..3).map(|l| grid[Line(l)].clone()).collect();

    let rect = Rect::full(10, 3);
    let mut sync = GridSync::new(&mut grid, &mut cursor, &listener);
    sync.on_damage(rect, vt.screen());
    sync.on_damage(rect, vt.screen());

    let after: Vec<_> = (0..3).map(|l| grid[Line(l)].clone()).collect();
    assert_eq!(before, after);
    // Identical content: nothing was rewritten.
    assert!(!grid.dirty().is_any_dirty());
}

#[test]
fn damage_outside_grid_is_clamped() {
    let (mut grid, mut cursor, vt) = sync_parts(4, 2);
    let listener = crate::event::VoidListener;
    let mut sync = GridSync::new(&mut grid, &mut cursor, &listener);
    sync.on_damage(Rect::new(0, 0, 50, 50), vt.screen());
    assert_eq!(grid.cols(), 4);
}

#[test]
fn resize_callback_resizes_grid() {
    let (mut grid, mut cursor, mut vt) = sync_parts(10, 3);
    let listener = crate::event::VoidListener;
    vt.resize(5, 6, &mut GridSync::new(&mut grid, &mut cursor, &listener));
    assert_eq!((grid.cols(), grid.lines()), (5, 6));
}

#[test]
fn bell_is_forwarded_to_listener() {
    let (mut grid, mut cursor, mut vt) = sync_parts(10, 3);
    let listener = BellCounter(Default::default());
    vt.feed(b"\x07x\x07", &mut GridSync::new(&mut grid, &mut cursor, &listener));
    assert_eq!(listener.0.load(std::sync::atomic::Ordering::SeqCst), 2);
    // Bells carry no grid mutation beyond the printed character.
    assert_eq!(grid.row_text(Line(0)), "x");
}

#[test]
fn hidden_cursor_is_reported() {
    let (mut grid, mut cursor, mut vt) = sync_parts(10, 3);
    let listener = crate::event::VoidListener;
    vt.feed(b"\x1b[?25l", &mut GridSync::new(&mut grid, &mut cursor, &listener));
    assert!(!cursor.visible);
}

#[test]
fn resolve_applies_inverse() {
    let palette = Palette::default();
    let cell = ScreenCell {
        ch: 'x',
        fg: Color::Spec(Rgb { r: 1, g: 2, b: 3 }),
        bg: Color::Spec(Rgb { r: 9, g: 9, b: 9 }),
        flags: CellFlags::INVERSE,
    };
    let out = resolve_cell(&cell, &palette);
    assert_eq!(out.fg, Rgb { r: 9, g: 9, b: 9 });
    assert_eq!(out.bg, Rgb { r: 1, g: 2, b: 3 });
}

#[test]
fn resolve_hidden_matches_background() {
    let palette = Palette::default();
    let cell = ScreenCell {
        ch: 's',
        flags: CellFlags::HIDDEN,
        ..ScreenCell::default()
    };
    let out = resolve_cell(&cell, &palette);
    assert_eq!(out.fg, out.bg);
    assert_eq!(out.bg, palette.resolve(Color::Named(NamedColor::Background)));
}
