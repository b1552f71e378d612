//! Color resolution for terminal cells.

pub mod palette;

pub use palette::Palette;
