//! Render-facing terminal grid.
//!
//! The `Grid` holds the resolved cells of the visible screen and a per-row
//! dirty tracker. It is written only by terminal sync (damage callbacks
//! from the VT interpreter) and read by the renderer between frames, so
//! it carries no cursor, scroll region or mode state of its own.

pub mod dirty;
pub mod row;

use std::ops::Index;

use thiserror::Error;

use crate::cell::Cell;
use crate::index::{Column, Line};

pub use dirty::{DirtyIter, DirtyTracker};
pub use row::Row;

/// Grid operation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    /// Both dimensions must be at least one cell.
    #[error("invalid grid size {cols}x{lines}: dimensions must be non-zero")]
    InvalidSize { cols: usize, lines: usize },
}

/// The 2D cell buffer of the visible screen.
///
/// Every coordinate in `[0, cols) x [0, lines)` holds a cell at all times.
#[derive(Debug, Clone)]
pub struct Grid {
    /// Visible rows, index 0 at the top.
    rows: Vec<Row>,
    cols: usize,
    lines: usize,
    dirty: DirtyTracker,
}

impl Grid {
    /// Create a blank grid. Zero dimensions are raised to one; callers that
    /// take user input validate first (see [`Grid::validate_size`]).
    pub fn new(cols: usize, lines: usize) -> Self {
        debug_assert!(cols > 0 && lines > 0, "grid dimensions must be non-zero");
        let cols = cols.max(1);
        let lines = lines.max(1);
        Self {
            rows: (0..lines).map(|_| Row::new(cols)).collect(),
            cols,
            lines,
            dirty: DirtyTracker::new(lines),
        }
    }

    /// Reject zero-sized dimensions.
    pub fn validate_size(cols: usize, lines: usize) -> Result<(), GridError> {
        if cols == 0 || lines == 0 {
            return Err(GridError::InvalidSize { cols, lines });
        }
        Ok(())
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Reallocate to `cols` x `lines`.
    ///
    /// Cells covered by both the old and new bounds keep their content,
    /// cells outside the new bounds are discarded, newly exposed cells are
    /// blank. Every row is marked dirty.
    pub fn resize(&mut self, cols: usize, lines: usize) -> Result<(), GridError> {
        Self::validate_size(cols, lines)?;
        if cols == self.cols && lines == self.lines {
            return Ok(());
        }

        self.rows.truncate(lines);
        for row in &mut self.rows {
            row.resize(cols);
        }
        self.rows.resize_with(lines, || Row::new(cols));

        self.cols = cols;
        self.lines = lines;
        self.dirty.resize(lines);
        Ok(())
    }

    /// Overwrite one cell and mark its row dirty.
    ///
    /// Coordinates are the caller's responsibility: out-of-range writes
    /// panic in debug builds and are dropped in release builds.
    #[inline]
    pub fn set_cell(&mut self, line: Line, col: Column, cell: Cell) {
        debug_assert!(
            line.0 < self.lines && col.0 < self.cols,
            "set_cell({line}, {col}) outside {}x{} grid",
            self.cols,
            self.lines,
        );
        if self.rows.get_mut(line.0).is_some_and(|row| row.write(col, cell)) {
            self.dirty.mark(line.0);
        }
    }

    /// Read one cell. Panics if out of range.
    #[inline]
    pub fn cell(&self, line: Line, col: Column) -> &Cell {
        &self.rows[line.0][col]
    }

    /// Read one cell, `None` if out of range.
    pub fn get(&self, line: Line, col: Column) -> Option<&Cell> {
        self.rows.get(line.0).and_then(|row| row.cells().get(col.0))
    }

    /// Trimmed text of one row.
    pub fn row_text(&self, line: Line) -> String {
        self.rows.get(line.0).map(Row::text).unwrap_or_default()
    }

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    /// Yield dirty rows, clearing each mark as it is yielded.
    pub fn drain_dirty(&mut self) -> DirtyIter<'_> {
        self.dirty.drain()
    }

    /// Mark every row dirty (palette or screen switch).
    pub fn mark_all_dirty(&mut self) {
        self.dirty.mark_all();
    }
}

impl Index<Line> for Grid {
    type Output = Row;

    fn index(&self, line: Line) -> &Row {
        &self.rows[line.0]
    }
}
