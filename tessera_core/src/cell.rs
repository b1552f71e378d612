//! Terminal cell types.
//!
//! A `Cell` is one resolved character position in the render-facing grid:
//! the glyph, concrete RGB colors, and attribute flags. Palette lookups and
//! inverse/hidden handling have already been applied by the time a cell is
//! written, so renderers read colors directly.

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

pub use vte::ansi::Rgb;

use crate::color::palette::{DEFAULT_BG, DEFAULT_FG};

bitflags! {
    /// Per-cell attribute flags (SGR and internal).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellFlags: u16 {
        const BOLD              = 1 << 0;
        const DIM               = 1 << 1;
        const ITALIC            = 1 << 2;
        const UNDERLINE         = 1 << 3;
        const BLINK             = 1 << 4;
        const INVERSE           = 1 << 5;
        const HIDDEN            = 1 << 6;
        const STRIKETHROUGH     = 1 << 7;
        const WIDE_CHAR         = 1 << 8;
        const WIDE_CHAR_SPACER  = 1 << 9;
        const DOUBLE_UNDERLINE  = 1 << 10;
        const CURLY_UNDERLINE   = 1 << 11;

        const ANY_UNDERLINE = Self::UNDERLINE.bits()
            | Self::DOUBLE_UNDERLINE.bits()
            | Self::CURLY_UNDERLINE.bits();
    }
}

/// One character position in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// The character displayed. `' '` for blank cells.
    pub ch: char,
    pub fg: Rgb,
    pub bg: Rgb,
    pub flags: CellFlags,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
            flags: CellFlags::empty(),
        }
    }
}

impl Cell {
    /// A cell holding `ch` with default colors.
    pub fn with_char(ch: char) -> Self {
        Self { ch, ..Self::default() }
    }

    /// Display width in columns (1 or 2). Spacers report 0.
    pub fn width(&self) -> usize {
        if self.flags.contains(CellFlags::WIDE_CHAR_SPACER) {
            return 0;
        }
        self.ch.width().unwrap_or(1).max(1)
    }

    /// True for a blank cell with default colors and no attributes.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
