//! 270-entry color palette.
//!
//! Layout: 0–15 ANSI, 16–231 6×6×6 cube, 232–255 grayscale ramp,
//! 256–269 named semantic slots (foreground, background, cursor, dim
//! variants, bright/dim foreground). The interpreter's screen stores
//! unresolved `vte::ansi::Color` values; grid sync resolves them here.

use vte::ansi::{Color, NamedColor};

pub use vte::ansi::Rgb;

use crate::cell::CellFlags;

/// Total palette entries: 256 indexed + 14 named semantic slots.
pub const NUM_COLORS: usize = 270;

/// Default foreground (light gray).
pub const DEFAULT_FG: Rgb = Rgb { r: 0xd3, g: 0xd7, b: 0xcf };
/// Default background (near black).
pub const DEFAULT_BG: Rgb = Rgb { r: 0x12, g: 0x12, b: 0x14 };
/// Default cursor color.
pub const DEFAULT_CURSOR: Rgb = Rgb { r: 0xff, g: 0xff, b: 0xff };

/// Standard xterm ANSI colors (indices 0–15).
const ANSI_COLORS: [Rgb; 16] = [
    Rgb { r: 0x00, g: 0x00, b: 0x00 },
    Rgb { r: 0xcc, g: 0x00, b: 0x00 },
    Rgb { r: 0x4e, g: 0x9a, b: 0x06 },
    Rgb { r: 0xc4, g: 0xa0, b: 0x00 },
    Rgb { r: 0x34, g: 0x65, b: 0xa4 },
    Rgb { r: 0x75, g: 0x50, b: 0x7b },
    Rgb { r: 0x06, g: 0x98, b: 0x9a },
    Rgb { r: 0xd3, g: 0xd7, b: 0xcf },
    Rgb { r: 0x55, g: 0x57, b: 0x53 },
    Rgb { r: 0xef, g: 0x29, b: 0x29 },
    Rgb { r: 0x8a, g: 0xe2, b: 0x34 },
    Rgb { r: 0xfc, g: 0xe9, b: 0x4f },
    Rgb { r: 0x72, g: 0x9f, b: 0xcf },
    Rgb { r: 0xad, g: 0x7f, b: 0xa8 },
    Rgb { r: 0x34, g: 0xe2, b: 0xe2 },
    Rgb { r: 0xee, g: 0xee, b: 0xec },
];

/// Indexed and named color table with per-index overrides (OSC 4/104).
#[derive(Debug, Clone)]
pub struct Palette {
    colors: [Rgb; NUM_COLORS],
    defaults: [Rgb; NUM_COLORS],
    /// Bold text in one of the 8 base colors uses the bright variant.
    bold_is_bright: bool,
}

impl Default for Palette {
    fn default() -> Self {
        Self::with_defaults(DEFAULT_FG, DEFAULT_BG)
    }
}

impl Palette {
    /// Build the xterm palette with custom default foreground/background.
    pub fn with_defaults(fg: Rgb, bg: Rgb) -> Self {
        let colors = build_default_palette(fg, bg);
        Self {
            colors,
            defaults: colors,
            bold_is_bright: true,
        }
    }

    pub fn set_bold_is_bright(&mut self, enabled: bool) {
        self.bold_is_bright = enabled;
    }

    /// Resolve a color without attribute adjustment.
    pub fn resolve(&self, color: Color) -> Rgb {
        match color {
            Color::Spec(rgb) => rgb,
            Color::Indexed(idx) => self.colors[idx as usize],
            Color::Named(name) => self.colors[name as usize],
        }
    }

    /// Resolve a foreground color, applying bold-as-bright and dim.
    pub fn resolve_fg(&self, color: Color, flags: CellFlags) -> Rgb {
        let color = if self.bold_is_bright && flags.contains(CellFlags::BOLD) {
            brighten(color)
        } else {
            color
        };
        if flags.contains(CellFlags::DIM) {
            return match dim_slot(color) {
                Some(slot) => self.resolve(slot),
                None => dim(self.resolve(color)),
            };
        }
        self.resolve(color)
    }

    /// Set an indexed color (OSC 4).
    pub fn set_indexed(&mut self, index: usize, color: Rgb) {
        if index < NUM_COLORS {
            self.colors[index] = color;
        }
    }

    /// Reset an indexed color to its default (OSC 104).
    pub fn reset_indexed(&mut self, index: usize) {
        if index < NUM_COLORS {
            self.colors[index] = self.defaults[index];
        }
    }

    pub fn foreground(&self) -> Rgb {
        self.colors[NamedColor::Foreground as usize]
    }

    pub fn background(&self) -> Rgb {
        self.colors[NamedColor::Background as usize]
    }

    pub fn cursor_color(&self) -> Rgb {
        self.colors[NamedColor::Cursor as usize]
    }
}

/// Map a base color (0–7) to its bright counterpart (8–15).
fn brighten(color: Color) -> Color {
    match color {
        Color::Named(name) if (name as usize) < 8 => Color::Indexed(name as u8 + 8),
        Color::Indexed(idx) if idx < 8 => Color::Indexed(idx + 8),
        other => other,
    }
}

/// The dim palette slot for a color, if the palette has one.
fn dim_slot(color: Color) -> Option<Color> {
    match color {
        Color::Named(NamedColor::Foreground) => Some(Color::Named(NamedColor::DimForeground)),
        Color::Named(name) if (name as usize) < 8 => Some(Color::Named(dim_named(name as usize))),
        _ => None,
    }
}

/// `NamedColor::DimBlack..=DimWhite` by base index.
fn dim_named(base: usize) -> NamedColor {
    match base {
        0 => NamedColor::DimBlack,
        1 => NamedColor::DimRed,
        2 => NamedColor::DimGreen,
        3 => NamedColor::DimYellow,
        4 => NamedColor::DimBlue,
        5 => NamedColor::DimMagenta,
        6 => NamedColor::DimCyan,
        _ => NamedColor::DimWhite,
    }
}

/// Build the xterm-256 palette around the given default colors.
fn build_default_palette(fg: Rgb, bg: Rgb) -> [Rgb; NUM_COLORS] {
    let mut colors = [Rgb { r: 0, g: 0, b: 0 }; NUM_COLORS];

    colors[..16].copy_from_slice(&ANSI_COLORS);

    for r in 0..6u8 {
        for g in 0..6u8 {
            for b in 0..6u8 {
                let idx = 16 + (r as usize * 36) + (g as usize * 6) + b as usize;
                colors[idx] = Rgb {
                    r: cube_level(r),
                    g: cube_level(g),
                    b: cube_level(b),
                };
            }
        }
    }

    for i in 0..24u8 {
        let v = 8 + i * 10;
        colors[232 + i as usize] = Rgb { r: v, g: v, b: v };
    }

    colors[NamedColor::Foreground as usize] = fg;
    colors[NamedColor::Background as usize] = bg;
    colors[NamedColor::Cursor as usize] = DEFAULT_CURSOR;

    for i in 0..8 {
        colors[NamedColor::DimBlack as usize + i] = dim(colors[i]);
    }

    colors[NamedColor::BrightForeground as usize] = fg;
    colors[NamedColor::DimForeground as usize] = dim(fg);

    colors
}

fn cube_level(v: u8) -> u8 {
    if v == 0 { 0 } else { 55 + v * 40 }
}

/// Reduce a color to 2/3 brightness.
fn dim(c: Rgb) -> Rgb {
    Rgb {
        r: (c.r as u16 * 2 / 3) as u8,
        g: (c.g as u16 * 2 / 3) as u8,
        b: (c.b as u16 * 2 / 3) as u8,
    }
}

#[cfg(test)]
mod tests;
