use tessera_core::cell::{Cell, CellFlags, Rgb};
use tessera_core::color::palette::DEFAULT_BG;

use super::{CellGeometry, RowInstances, build_row};
use crate::gpu::atlas::AtlasEntry;

const GEOM: CellGeometry = CellGeometry {
    width: 10.0,
    height: 20.0,
    baseline: 16.0,
};

fn entry(width: u32, height: u32) -> AtlasEntry {
    AtlasEntry {
        uv_pos: [0.0; 2],
        uv_size: [0.1; 2],
        width,
        height,
        left: 1,
        top: 12,
    }
}

fn build(cells: &[Cell], glyph: &mut dyn FnMut(char, bool) -> Option<AtlasEntry>) -> RowInstances {
    let mut out = RowInstances::default();
    build_row(&mut out, cells, 2, GEOM, DEFAULT_BG, glyph);
    out
}

fn f32_at(bytes: &[u8], offset: usize) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset..offset + 4]);
    f32::from_ne_bytes(raw)
}

#[test]
fn blank_row_emits_nothing() {
    let cells = vec![Cell::default(); 8];
    let row = build(&cells, &mut |_, _| panic!("no glyph lookups for blanks"));
    assert_eq!(row.backgrounds.count(), 0);
    assert_eq!(row.glyphs.count(), 0);
    assert_eq!(row.decorations.count(), 0);
}

#[test]
fn glyph_is_placed_on_baseline() {
    let cells = [Cell::default(), Cell::with_char('a')];
    let row = build(&cells, &mut |ch, bold| {
        assert_eq!((ch, bold), ('a', false));
        Some(entry(6, 12))
    });
    assert_eq!(row.glyphs.count(), 1);
    let b = row.glyphs.as_bytes();
    // x = col * width + left, y = line * height + baseline - top
    assert_eq!(f32_at(b, 0), 11.0);
    assert_eq!(f32_at(b, 4), 44.0);
    assert_eq!(f32_at(b, 8), 6.0);
    assert_eq!(f32_at(b, 12), 12.0);
}

#[test]
fn non_default_background_gets_a_rect() {
    let mut cell = Cell::default();
    cell.bg = Rgb { r: 200, g: 0, b: 0 };
    let row = build(&[cell], &mut |_, _| None);
    assert_eq!(row.backgrounds.count(), 1);
    assert_eq!(f32_at(row.backgrounds.as_bytes(), 4), 40.0);
}

#[test]
fn bold_flag_reaches_lookup() {
    let mut cell = Cell::with_char('B');
    cell.flags = CellFlags::BOLD;
    let mut seen = Vec::new();
    build(&[cell], &mut |ch, bold| {
        seen.push((ch, bold));
        Some(entry(5, 5))
    });
    assert_eq!(seen, [('B', true)]);
}

#[test]
fn missing_font_draws_placeholder_boxes() {
    let row = build(&[Cell::with_char('x'), Cell::with_char('y')], &mut |_, _| None);
    assert_eq!(row.glyphs.count(), 0);
    assert_eq!(row.decorations.count(), 2);
}

#[test]
fn empty_glyphs_draw_nothing() {
    let row = build(&[Cell::with_char('\u{200b}')], &mut |_, _| Some(entry(0, 0)));
    assert_eq!(row.glyphs.count(), 0);
    assert_eq!(row.decorations.count(), 0);
}

#[test]
fn hidden_cells_skip_glyphs() {
    let mut cell = Cell::with_char('h');
    cell.flags = CellFlags::HIDDEN;
    let row = build(&[cell], &mut |_, _| panic!("hidden cell looked up"));
    assert_eq!(row.glyphs.count(), 0);
}

#[test]
fn decorations_and_wide_spacers() {
    let mut wide = Cell::with_char('中');
    wide.flags = CellFlags::WIDE_CHAR | CellFlags::UNDERLINE;
    let mut spacer = Cell::default();
    spacer.flags = CellFlags::WIDE_CHAR_SPACER;
    let mut struck = Cell::with_char('s');
    struck.flags = CellFlags::STRIKETHROUGH;

    let row = build(&[wide, spacer, struck], &mut |_, _| Some(entry(4, 4)));
    assert_eq!(row.glyphs.count(), 2);
    assert_eq!(row.decorations.count(), 2);
    // Underline spans both columns of the wide cell.
    assert_eq!(f32_at(row.decorations.as_bytes(), 8), 20.0);
}
