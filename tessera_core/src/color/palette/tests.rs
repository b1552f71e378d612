use vte::ansi::{Color, NamedColor, Rgb};

use super::{DEFAULT_BG, DEFAULT_FG, NUM_COLORS, Palette};
use crate::cell::CellFlags;

#[test]
fn named_defaults_resolve() {
    let p = Palette::default();
    assert_eq!(p.resolve(Color::Named(NamedColor::Foreground)), DEFAULT_FG);
    assert_eq!(p.resolve(Color::Named(NamedColor::Background)), DEFAULT_BG);
    assert_eq!(p.foreground(), DEFAULT_FG);
    assert_eq!(p.background(), DEFAULT_BG);
}

#[test]
fn spec_color_passes_through() {
    let p = Palette::default();
    let rgb = Rgb { r: 1, g: 2, b: 3 };
    assert_eq!(p.resolve(Color::Spec(rgb)), rgb);
}

#[test]
fn cube_and_grayscale_entries() {
    let p = Palette::default();
    assert_eq!(p.resolve(Color::Indexed(16)), Rgb { r: 0, g: 0, b: 0 });
    assert_eq!(p.resolve(Color::Indexed(231)), Rgb { r: 255, g: 255, b: 255 });
    assert_eq!(p.resolve(Color::Indexed(232)), Rgb { r: 8, g: 8, b: 8 });
    assert_eq!(p.resolve(Color::Indexed(255)), Rgb { r: 238, g: 238, b: 238 });
}

#[test]
fn bold_brightens_base_colors() {
    let p = Palette::default();
    let red = Color::Named(NamedColor::Red);
    let bright_red = p.resolve(Color::Indexed(9));
    assert_eq!(p.resolve_fg(red, CellFlags::BOLD), bright_red);
    assert_eq!(p.resolve_fg(red, CellFlags::empty()), p.resolve(red));
}

#[test]
fn bold_is_bright_can_be_disabled() {
    let mut p = Palette::default();
    p.set_bold_is_bright(false);
    let red = Color::Named(NamedColor::Red);
    assert_eq!(p.resolve_fg(red, CellFlags::BOLD), p.resolve(red));
}

#[test]
fn dim_uses_dim_slot() {
    let p = Palette::default();
    let dimmed = p.resolve_fg(Color::Named(NamedColor::Foreground), CellFlags::DIM);
    assert_eq!(dimmed, p.resolve(Color::Named(NamedColor::DimForeground)));
    assert!(dimmed.r < DEFAULT_FG.r);
}

#[test]
fn dim_truecolor_reduces_brightness() {
    let p = Palette::default();
    let rgb = Rgb { r: 90, g: 150, b: 30 };
    assert_eq!(p.resolve_fg(Color::Spec(rgb), CellFlags::DIM), Rgb { r: 60, g: 100, b: 20 });
}

#[test]
fn set_and_reset_indexed() {
    let mut p = Palette::default();
    let original = p.resolve(Color::Indexed(4));
    let custom = Rgb { r: 9, g: 9, b: 9 };
    p.set_indexed(4, custom);
    assert_eq!(p.resolve(Color::Indexed(4)), custom);
    p.reset_indexed(4);
    assert_eq!(p.resolve(Color::Indexed(4)), original);
}

#[test]
fn out_of_range_index_ignored() {
    let mut p = Palette::default();
    p.set_indexed(NUM_COLORS + 5, Rgb { r: 1, g: 1, b: 1 });
    p.reset_indexed(NUM_COLORS + 5);
}

#[test]
fn custom_defaults() {
    let fg = Rgb { r: 10, g: 20, b: 30 };
    let bg = Rgb { r: 40, g: 50, b: 60 };
    let p = Palette::with_defaults(fg, bg);
    assert_eq!(p.foreground(), fg);
    assert_eq!(p.background(), bg);
}
