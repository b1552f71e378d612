//! A grid line.

use std::ops::Index;

use crate::cell::{Cell, CellFlags};
use crate::index::Column;

/// The cells of one visible line. Writes go through [`Row::write`] so the
/// grid learns whether anything actually changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row(Box<[Cell]>);

impl Row {
    pub fn new(cols: usize) -> Self {
        Self(vec![Cell::default(); cols].into_boxed_slice())
    }

    pub fn cols(&self) -> usize {
        self.0.len()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.0
    }

    /// Store `cell` at `col`. False when `col` is past the end or the cell
    /// already holds the same value.
    pub fn write(&mut self, col: Column, cell: Cell) -> bool {
        match self.0.get_mut(col.0) {
            Some(slot) if *slot != cell => {
                *slot = cell;
                true
            }
            _ => false,
        }
    }

    /// Fit to `cols`, keeping leading cells and blanking new ones.
    pub fn resize(&mut self, cols: usize) {
        if cols == self.cols() {
            return;
        }
        let mut cells = std::mem::take(&mut self.0).into_vec();
        cells.resize(cols, Cell::default());
        self.0 = cells.into_boxed_slice();
    }

    /// What the line reads as. Wide-char spacers add nothing and trailing
    /// blanks are dropped.
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.0.len());
        for cell in self.0.iter() {
            if !cell.flags.contains(CellFlags::WIDE_CHAR_SPACER) {
                text.push(cell.ch);
            }
        }
        text.truncate(text.trim_end().len());
        text
    }
}

impl Index<Column> for Row {
    type Output = Cell;

    fn index(&self, col: Column) -> &Cell {
        &self.0[col.0]
    }
}
