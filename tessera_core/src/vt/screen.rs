//! Authoritative screen state owned by the VT interpreter.
//!
//! Cells here keep unresolved `vte::ansi::Color` values exactly as the
//! escape sequences set them. Every mutation widens a pending damage
//! rectangle which the interpreter flushes to its `ScreenSink`.

use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;
use vte::ansi::{Color, NamedColor};

use crate::cell::CellFlags;
use crate::color::Palette;
use crate::color::palette::NUM_COLORS;
use crate::index::{Column, Line, Point, Rect};

bitflags! {
    /// Terminal modes set by SM/RM and DECSET/DECRST.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScreenMode: u16 {
        const SHOW_CURSOR        = 1 << 0;
        const APP_CURSOR         = 1 << 1;
        const APP_KEYPAD         = 1 << 2;
        const LINE_WRAP          = 1 << 3;
        const INSERT             = 1 << 4;
        const ORIGIN             = 1 << 5;
        const LINE_FEED_NEW_LINE = 1 << 6;
        const ALT_SCREEN         = 1 << 7;
        const BRACKETED_PASTE    = 1 << 8;
    }
}

impl Default for ScreenMode {
    fn default() -> Self {
        Self::SHOW_CURSOR | Self::LINE_WRAP
    }
}

/// One cell as the interpreter sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenCell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
    pub flags: CellFlags,
}

impl Default for ScreenCell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::Named(NamedColor::Foreground),
            bg: Color::Named(NamedColor::Background),
            flags: CellFlags::empty(),
        }
    }
}

/// DECSC state.
#[derive(Debug, Clone, Copy)]
struct SavedCursor {
    point: Point,
    template: ScreenCell,
    pending_wrap: bool,
    origin: bool,
}

/// Which part of the screen an erase covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Erase {
    /// Cursor to end.
    Below,
    /// Start to cursor, inclusive.
    Above,
    All,
}

/// Screen contents, cursor and modes.
#[derive(Debug, Clone)]
pub struct Screen {
    rows: Vec<Vec<ScreenCell>>,
    /// The inactive buffer (primary while the alternate screen is shown).
    inactive: Vec<Vec<ScreenCell>>,
    cols: usize,
    lines: usize,
    cursor: Point,
    /// Cursor sits past the last column; the next printable wraps first.
    pending_wrap: bool,
    /// Attributes applied to newly printed characters.
    template: ScreenCell,
    saved: Option<SavedCursor>,
    /// Scroll region, top inclusive, bottom exclusive.
    scroll_top: usize,
    scroll_bottom: usize,
    tabs: Vec<bool>,
    mode: ScreenMode,
    palette: Palette,
    /// Title change not yet picked up by the host.
    title: Option<Option<String>>,
    damage: Rect,
    /// Lines scrolled off the top of the full screen, per buffer.
    scrolled: u64,
    inactive_scrolled: u64,
}

impl Screen {
    pub fn new(cols: usize, lines: usize) -> Self {
        let cols = cols.max(1);
        let lines = lines.max(1);
        Self {
            rows: blank_rows(cols, lines, ScreenCell::default()),
            inactive: blank_rows(cols, lines, ScreenCell::default()),
            cols,
            lines,
            cursor: Point::default(),
            pending_wrap: false,
            template: ScreenCell::default(),
            saved: None,
            scroll_top: 0,
            scroll_bottom: lines,
            tabs: default_tabs(cols),
            mode: ScreenMode::default(),
            palette: Palette::default(),
            title: None,
            damage: Rect::default(),
            scrolled: 0,
            inactive_scrolled: 0,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Read one cell. Panics if out of range.
    pub fn cell(&self, line: Line, col: Column) -> &ScreenCell {
        &self.rows[line.0][col.0]
    }

    /// Cursor position as displayed (clamped to the last column while a
    /// wrap is pending).
    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn cursor_visible(&self) -> bool {
        self.mode.contains(ScreenMode::SHOW_CURSOR)
    }

    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    pub fn is_alt(&self) -> bool {
        self.mode.contains(ScreenMode::ALT_SCREEN)
    }

    /// Lines the active buffer has scrolled up by as a whole since it was
    /// created. Region scrolls that leave the top row in place do not count.
    pub fn scrolled_lines(&self) -> u64 {
        self.scrolled
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Replace the palette (host color configuration). Damages everything.
    pub fn set_palette(&mut self, palette: Palette) {
        self.palette = palette;
        self.damage_all();
    }

    /// Pending title change: `Some(Some(t))` set, `Some(None)` reset.
    pub fn take_title(&mut self) -> Option<Option<String>> {
        self.title.take()
    }

    /// Text of one line with trailing blanks trimmed.
    pub fn line_text(&self, line: Line) -> String {
        let text: String = self.rows[line.0]
            .iter()
            .filter(|c| !c.flags.contains(CellFlags::WIDE_CHAR_SPACER))
            .map(|c| c.ch)
            .collect();
        text.trim_end().to_owned()
    }

    // --- Damage ---

    pub(super) fn damage(&mut self, rect: Rect) {
        self.damage = self.damage.union(rect.clamp(self.cols, self.lines));
    }

    pub(super) fn damage_all(&mut self) {
        self.damage(Rect::full(self.cols, self.lines));
    }

    /// Take the accumulated damage, leaving none pending.
    pub(super) fn take_damage(&mut self) -> Option<Rect> {
        let rect = std::mem::take(&mut self.damage);
        (!rect.is_empty()).then_some(rect)
    }

    // --- Printing ---

    /// Write a printable character at the cursor and advance.
    pub(super) fn put_char(&mut self, c: char) {
        let width = match c.width() {
            Some(0) | None => return,
            Some(w) => w,
        };

        let wrap = self.mode.contains(ScreenMode::LINE_WRAP);
        if self.pending_wrap && wrap {
            self.carriage_return();
            self.linefeed();
        }
        self.pending_wrap = false;

        // A wide char that does not fit on the line wraps early.
        if width == 2 && self.cursor.column.0 + 1 >= self.cols {
            if !wrap || self.cols < 2 {
                return;
            }
            let line = self.cursor.line.0;
            let col = self.cursor.column.0;
            self.rows[line][col] = self.blank();
            self.damage(Rect::cell(line, col));
            self.carriage_return();
            self.linefeed();
        }

        if self.mode.contains(ScreenMode::INSERT) {
            self.insert_blank(width);
        }

        let line = self.cursor.line.0;
        let col = self.cursor.column.0;
        self.clear_wide_fragments(line, col, width);

        let mut cell = self.template;
        cell.ch = c;
        if width == 2 {
            cell.flags.insert(CellFlags::WIDE_CHAR);
            let mut spacer = self.template;
            spacer.ch = ' ';
            spacer.flags.insert(CellFlags::WIDE_CHAR_SPACER);
            self.rows[line][col + 1] = spacer;
        }
        self.rows[line][col] = cell;
        self.damage(Rect::new(line, col, line + 1, col + width));

        let next = col + width;
        if next >= self.cols {
            self.cursor.column = Column(self.cols - 1);
            self.pending_wrap = wrap;
        } else {
            self.cursor.column = Column(next);
        }
    }

    /// Overwriting half of a wide char blanks the other half.
    fn clear_wide_fragments(&mut self, line: usize, col: usize, width: usize) {
        let blank = self.blank();
        let row = &mut self.rows[line];
        if row[col].flags.contains(CellFlags::WIDE_CHAR_SPACER) && col > 0 {
            row[col - 1] = blank;
            self.damage(Rect::cell(line, col - 1));
        }
        let last = col + width - 1;
        let row = &mut self.rows[line];
        if row[last].flags.contains(CellFlags::WIDE_CHAR) && last + 1 < self.cols {
            row[last + 1] = blank;
            self.damage(Rect::cell(line, last + 1));
        }
    }

    /// Blank cell carrying the current background (BCE).
    fn blank(&self) -> ScreenCell {
        ScreenCell {
            bg: self.template.bg,
            ..ScreenCell::default()
        }
    }

    // --- Cursor movement ---

    pub(super) fn carriage_return(&mut self) {
        self.cursor.column = Column(0);
        self.pending_wrap = false;
    }

    pub(super) fn linefeed(&mut self) {
        self.pending_wrap = false;
        let line = self.cursor.line.0;
        if line + 1 == self.scroll_bottom {
            self.scroll_up(1);
        } else if line + 1 < self.lines {
            self.cursor.line = Line(line + 1);
        }
    }

    pub(super) fn reverse_index(&mut self) {
        self.pending_wrap = false;
        if self.cursor.line.0 == self.scroll_top {
            self.scroll_down(1);
        } else if self.cursor.line.0 > 0 {
            self.cursor.line -= 1;
        }
    }

    pub(super) fn backspace(&mut self) {
        if self.pending_wrap {
            self.pending_wrap = false;
        } else {
            self.cursor.column -= 1;
        }
    }

    /// Absolute move, honoring origin mode.
    pub(super) fn goto(&mut self, line: usize, col: usize) {
        let (top, bottom) = if self.mode.contains(ScreenMode::ORIGIN) {
            (self.scroll_top, self.scroll_bottom)
        } else {
            (0, self.lines)
        };
        self.cursor.line = Line((top + line).min(bottom - 1));
        self.cursor.column = Column(col.min(self.cols - 1));
        self.pending_wrap = false;
    }

    pub(super) fn goto_line(&mut self, line: usize) {
        let col = self.cursor.column.0;
        self.goto(line, col);
    }

    pub(super) fn goto_col(&mut self, col: usize) {
        self.cursor.column = Column(col.min(self.cols - 1));
        self.pending_wrap = false;
    }

    /// Relative vertical move; stops at the scroll region edge when the
    /// cursor starts inside it.
    pub(super) fn move_vertical(&mut self, delta: isize) {
        let line = self.cursor.line.0;
        let (top, bottom) = if (self.scroll_top..self.scroll_bottom).contains(&line) {
            (self.scroll_top, self.scroll_bottom - 1)
        } else {
            (0, self.lines - 1)
        };
        let target = line.saturating_add_signed(delta).clamp(top, bottom);
        self.cursor.line = Line(target);
        self.pending_wrap = false;
    }

    pub(super) fn move_horizontal(&mut self, delta: isize) {
        let col = self.cursor.column.0.saturating_add_signed(delta);
        self.cursor.column = Column(col.min(self.cols - 1));
        self.pending_wrap = false;
    }

    pub(super) fn tab_forward(&mut self, count: usize) {
        for _ in 0..count {
            let mut col = self.cursor.column.0 + 1;
            while col < self.cols && !self.tabs[col] {
                col += 1;
            }
            self.cursor.column = Column(col.min(self.cols - 1));
        }
        self.pending_wrap = false;
    }

    pub(super) fn tab_backward(&mut self, count: usize) {
        for _ in 0..count {
            let mut col = self.cursor.column.0;
            while col > 0 {
                col -= 1;
                if self.tabs[col] {
                    break;
                }
            }
            self.cursor.column = Column(col);
        }
        self.pending_wrap = false;
    }

    pub(super) fn set_tab_stop(&mut self) {
        let col = self.cursor.column.0;
        self.tabs[col] = true;
    }

    pub(super) fn clear_tab_stops(&mut self, all: bool) {
        if all {
            self.tabs.fill(false);
        } else {
            let col = self.cursor.column.0;
            self.tabs[col] = false;
        }
    }

    pub(super) fn save_cursor(&mut self) {
        self.saved = Some(SavedCursor {
            point: self.cursor,
            template: self.template,
            pending_wrap: self.pending_wrap,
            origin: self.mode.contains(ScreenMode::ORIGIN),
        });
    }

    pub(super) fn restore_cursor(&mut self) {
        let saved = self.saved.unwrap_or(SavedCursor {
            point: Point::default(),
            template: ScreenCell::default(),
            pending_wrap: false,
            origin: false,
        });
        self.cursor = Point::new(
            Line(saved.point.line.0.min(self.lines - 1)),
            Column(saved.point.column.0.min(self.cols - 1)),
        );
        self.template = saved.template;
        self.pending_wrap = saved.pending_wrap;
        self.mode.set(ScreenMode::ORIGIN, saved.origin);
    }

    // --- Attributes and modes ---

    pub(super) fn template_mut(&mut self) -> &mut ScreenCell {
        &mut self.template
    }

    pub(super) fn set_mode(&mut self, mode: ScreenMode, enabled: bool) {
        self.mode.set(mode, enabled);
        if mode.contains(ScreenMode::ORIGIN) {
            self.goto(0, 0);
        }
    }

    pub(super) fn set_title(&mut self, title: Option<String>) {
        self.title = Some(title);
    }

    pub(super) fn set_color(&mut self, index: usize, rgb: vte::ansi::Rgb) {
        self.palette.set_indexed(index, rgb);
        self.damage_all();
    }

    pub(super) fn reset_color(&mut self, index: usize) {
        self.palette.reset_indexed(index);
        self.damage_all();
    }

    /// Switch to the alternate screen (DECSET 1049), clearing it.
    pub(super) fn enter_alt_screen(&mut self) {
        if self.is_alt() {
            return;
        }
        self.save_cursor();
        std::mem::swap(&mut self.rows, &mut self.inactive);
        std::mem::swap(&mut self.scrolled, &mut self.inactive_scrolled);
        self.mode.insert(ScreenMode::ALT_SCREEN);
        let blank = self.blank();
        for row in &mut self.rows {
            row.fill(blank);
        }
        self.damage_all();
    }

    /// Return to the primary screen (DECRST 1049), restoring the cursor.
    pub(super) fn leave_alt_screen(&mut self) {
        if !self.is_alt() {
            return;
        }
        std::mem::swap(&mut self.rows, &mut self.inactive);
        std::mem::swap(&mut self.scrolled, &mut self.inactive_scrolled);
        self.mode.remove(ScreenMode::ALT_SCREEN);
        self.restore_cursor();
        self.damage_all();
    }

    // --- Erasing and editing ---

    pub(super) fn erase_display(&mut self, erase: Erase) {
        let blank = self.blank();
        let line = self.cursor.line.0;
        match erase {
            Erase::Below => {
                self.erase_line(Erase::Below);
                for row in &mut self.rows[line + 1..] {
                    row.fill(blank);
                }
                self.damage(Rect::lines(line + 1, self.lines, self.cols));
            }
            Erase::Above => {
                self.erase_line(Erase::Above);
                for row in &mut self.rows[..line] {
                    row.fill(blank);
                }
                self.damage(Rect::lines(0, line, self.cols));
            }
            Erase::All => {
                for row in &mut self.rows {
                    row.fill(blank);
                }
                self.damage_all();
            }
        }
    }

    pub(super) fn erase_line(&mut self, erase: Erase) {
        let blank = self.blank();
        let line = self.cursor.line.0;
        let col = self.cursor.column.0;
        let range = match erase {
            Erase::Below => col..self.cols,
            Erase::Above => 0..col + 1,
            Erase::All => 0..self.cols,
        };
        self.rows[line][range.clone()].fill(blank);
        self.damage(Rect::new(line, range.start, line + 1, range.end));
    }

    /// ECH: blank `count` cells from the cursor without shifting.
    pub(super) fn erase_chars(&mut self, count: usize) {
        let blank = self.blank();
        let line = self.cursor.line.0;
        let col = self.cursor.column.0;
        let end = (col + count.max(1)).min(self.cols);
        self.rows[line][col..end].fill(blank);
        self.damage(Rect::new(line, col, line + 1, end));
    }

    /// DCH: delete `count` cells, shifting the rest of the line left.
    pub(super) fn delete_chars(&mut self, count: usize) {
        let blank = self.blank();
        let line = self.cursor.line.0;
        let col = self.cursor.column.0;
        let count = count.max(1).min(self.cols - col);
        let row = &mut self.rows[line];
        row[col..].rotate_left(count);
        let cols = self.cols;
        row[cols - count..].fill(blank);
        self.damage(Rect::new(line, col, line + 1, self.cols));
    }

    /// ICH: insert `count` blanks at the cursor, shifting right.
    pub(super) fn insert_blank(&mut self, count: usize) {
        let blank = self.blank();
        let line = self.cursor.line.0;
        let col = self.cursor.column.0;
        let count = count.max(1).min(self.cols - col);
        let row = &mut self.rows[line];
        row[col..].rotate_right(count);
        row[col..col + count].fill(blank);
        self.damage(Rect::new(line, col, line + 1, self.cols));
    }

    /// Scroll the region `top..bottom` up by `count`, blanking the bottom.
    fn scroll_region_up(&mut self, top: usize, count: usize) {
        let bottom = self.scroll_bottom;
        if top >= bottom {
            return;
        }
        let count = count.max(1).min(bottom - top);
        let blank = self.blank();
        self.rows[top..bottom].rotate_left(count);
        for row in &mut self.rows[bottom - count..bottom] {
            row.fill(blank);
        }
        if top == 0 && bottom == self.lines {
            self.scrolled += count as u64;
        }
        self.damage(Rect::lines(top, bottom, self.cols));
    }

    /// Scroll the region `top..bottom` down by `count`, blanking the top.
    fn scroll_region_down(&mut self, top: usize, count: usize) {
        let bottom = self.scroll_bottom;
        if top >= bottom {
            return;
        }
        let count = count.max(1).min(bottom - top);
        let blank = self.blank();
        self.rows[top..bottom].rotate_right(count);
        for row in &mut self.rows[top..top + count] {
            row.fill(blank);
        }
        self.damage(Rect::lines(top, bottom, self.cols));
    }

    pub(super) fn scroll_up(&mut self, count: usize) {
        self.scroll_region_up(self.scroll_top, count);
    }

    pub(super) fn scroll_down(&mut self, count: usize) {
        self.scroll_region_down(self.scroll_top, count);
    }

    /// IL: only acts when the cursor is inside the scroll region.
    pub(super) fn insert_lines(&mut self, count: usize) {
        let line = self.cursor.line.0;
        if (self.scroll_top..self.scroll_bottom).contains(&line) {
            self.scroll_region_down(line, count);
            self.cursor.column = Column(0);
        }
    }

    /// DL: only acts when the cursor is inside the scroll region.
    pub(super) fn delete_lines(&mut self, count: usize) {
        let line = self.cursor.line.0;
        if (self.scroll_top..self.scroll_bottom).contains(&line) {
            self.scroll_region_up(line, count);
            self.cursor.column = Column(0);
        }
    }

    /// DECSTBM with 1-based inclusive bounds. Invalid regions are ignored.
    pub(super) fn set_scroll_region(&mut self, top: usize, bottom: Option<usize>) {
        let top = top.max(1) - 1;
        let bottom = bottom.map_or(self.lines, |b| b.min(self.lines));
        if top + 1 >= bottom {
            return;
        }
        self.scroll_top = top;
        self.scroll_bottom = bottom;
        self.goto(0, 0);
    }

    /// DECALN: fill the screen with 'E'.
    pub(super) fn fill_alignment(&mut self) {
        let cell = ScreenCell {
            ch: 'E',
            ..ScreenCell::default()
        };
        for row in &mut self.rows {
            row.fill(cell);
        }
        self.scroll_top = 0;
        self.scroll_bottom = self.lines;
        self.cursor = Point::default();
        self.damage_all();
    }

    /// RIS: back to the power-on state, keeping the size.
    pub(super) fn reset(&mut self) {
        let (cols, lines) = (self.cols, self.lines);
        let mut palette = std::mem::take(&mut self.palette);
        for index in 0..NUM_COLORS {
            palette.reset_indexed(index);
        }
        let scrolled = (self.scrolled, self.inactive_scrolled);
        *self = Self::new(cols, lines);
        // Counters keep running so anchors taken before the reset stay
        // comparable.
        (self.scrolled, self.inactive_scrolled) = scrolled;
        self.palette = palette;
        self.title = Some(None);
        self.damage_all();
    }

    /// Resize both buffers. Content in the overlap is preserved, the
    /// cursor is clamped, and the scroll region resets to the full screen.
    pub(super) fn resize(&mut self, cols: usize, lines: usize) {
        for rows in [&mut self.rows, &mut self.inactive] {
            rows.truncate(lines);
            for row in rows.iter_mut() {
                row.resize(cols, ScreenCell::default());
            }
            rows.resize_with(lines, || vec![ScreenCell::default(); cols]);
        }
        self.cols = cols;
        self.lines = lines;
        self.cursor.line = Line(self.cursor.line.0.min(lines - 1));
        self.cursor.column = Column(self.cursor.column.0.min(cols - 1));
        self.pending_wrap = false;
        self.scroll_top = 0;
        self.scroll_bottom = lines;
        self.tabs = default_tabs(cols);
        self.damage = Rect::default();
        self.damage_all();
    }
}

fn blank_rows(cols: usize, lines: usize, blank: ScreenCell) -> Vec<Vec<ScreenCell>> {
    vec![vec![blank; cols]; lines]
}

/// Tab stops every 8 columns.
fn default_tabs(cols: usize) -> Vec<bool> {
    (0..cols).map(|c| c > 0 && c % 8 == 0).collect()
}
