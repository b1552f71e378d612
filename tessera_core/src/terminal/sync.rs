//! Interpreter-to-grid synchronization.

use crate::cell::{Cell, CellFlags};
use crate::color::Palette;
use crate::event::{Event, EventListener};
use crate::grid::Grid;
use crate::index::{Column, Line, Point, Rect};
use crate::vt::{Screen, ScreenCell, ScreenSink};

use super::CursorState;

/// The `ScreenSink` a `Terminal` hands to its interpreter for one feed.
///
/// Borrows the grid, cursor and listener disjointly from the terminal;
/// the grid never sees the interpreter.
pub(super) struct GridSync<'a> {
    grid: &'a mut Grid,
    cursor: &'a mut CursorState,
    listener: &'a dyn EventListener,
}

impl<'a> GridSync<'a> {
    pub(super) fn new(
        grid: &'a mut Grid,
        cursor: &'a mut CursorState,
        listener: &'a dyn EventListener,
    ) -> Self {
        Self {
            grid,
            cursor,
            listener,
        }
    }
}

impl ScreenSink for GridSync<'_> {
    fn on_damage(&mut self, rect: Rect, screen: &Screen) {
        // The interpreter and grid agree on size after every on_resize;
        // clamping guards the caller-owned set_cell boundary regardless.
        let rect = rect.clamp(
            self.grid.cols().min(screen.cols()),
            self.grid.lines().min(screen.lines()),
        );
        let palette = screen.palette();
        for line in rect.top..rect.bottom {
            for col in rect.left..rect.right {
                let (line, col) = (Line(line), Column(col));
                let cell = resolve_cell(screen.cell(line, col), palette);
                self.grid.set_cell(line, col, cell);
            }
        }
    }

    fn on_move_cursor(&mut self, pos: Point, _old: Point, visible: bool) {
        *self.cursor = CursorState {
            point: pos,
            visible,
        };
    }

    fn on_resize(&mut self, cols: usize, lines: usize) {
        if let Err(e) = self.grid.resize(cols, lines) {
            log::error!("grid resize rejected: {e}");
        }
    }

    fn on_bell(&mut self) {
        self.listener.send_event(Event::Bell);
    }
}

/// Translate an interpreter cell into a render cell: resolve colors,
/// apply inverse and hidden.
pub fn resolve_cell(cell: &ScreenCell, palette: &Palette) -> Cell {
    let mut fg = palette.resolve_fg(cell.fg, cell.flags);
    let mut bg = palette.resolve(cell.bg);
    if cell.flags.contains(CellFlags::INVERSE) {
        std::mem::swap(&mut fg, &mut bg);
    }
    if cell.flags.contains(CellFlags::HIDDEN) {
        fg = bg;
    }
    Cell {
        ch: cell.ch,
        fg,
        bg,
        flags: cell.flags,
    }
}

#[cfg(test)]
mod tests;
