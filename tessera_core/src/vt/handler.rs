//! `vte::ansi::Handler` implementation driving a [`Screen`].
//!
//! Each handler method delegates to a screen operation. Bells flush the
//! pending damage first so the sink observes events in stream order.

use vte::ansi::{
    Attr, ClearMode, Handler, LineClearMode, Mode, NamedMode, NamedPrivateMode, PrivateMode, Rgb,
    TabulationClearMode,
};

use crate::cell::CellFlags;

use super::screen::{Erase, Screen, ScreenMode};
use super::{ScreenSink, flush};

/// Short-lived adapter between the parser and one `feed` call.
pub(super) struct Performer<'a, S: ScreenSink> {
    screen: &'a mut Screen,
    sink: &'a mut S,
    output: &'a mut Vec<u8>,
}

impl<'a, S: ScreenSink> Performer<'a, S> {
    pub(super) fn new(screen: &'a mut Screen, sink: &'a mut S, output: &'a mut Vec<u8>) -> Self {
        Self { screen, sink, output }
    }

    fn reply(&mut self, bytes: &[u8]) {
        self.output.extend_from_slice(bytes);
    }

    fn private_mode(&mut self, mode: PrivateMode, enabled: bool) {
        let PrivateMode::Named(mode) = mode else {
            log::trace!("unhandled private mode {mode:?}");
            return;
        };
        let flag = match mode {
            NamedPrivateMode::CursorKeys => ScreenMode::APP_CURSOR,
            NamedPrivateMode::Origin => ScreenMode::ORIGIN,
            NamedPrivateMode::LineWrap => ScreenMode::LINE_WRAP,
            NamedPrivateMode::ShowCursor => ScreenMode::SHOW_CURSOR,
            NamedPrivateMode::BracketedPaste => ScreenMode::BRACKETED_PASTE,
            NamedPrivateMode::SwapScreenAndSetRestoreCursor => {
                if enabled {
                    self.screen.enter_alt_screen();
                } else {
                    self.screen.leave_alt_screen();
                }
                return;
            }
            _ => {
                log::trace!("unhandled private mode {mode:?}");
                return;
            }
        };
        self.screen.set_mode(flag, enabled);
    }

    fn ansi_mode(&mut self, mode: Mode, enabled: bool) {
        match mode {
            Mode::Named(NamedMode::Insert) => self.screen.set_mode(ScreenMode::INSERT, enabled),
            Mode::Named(NamedMode::LineFeedNewLine) => {
                self.screen.set_mode(ScreenMode::LINE_FEED_NEW_LINE, enabled);
            }
            _ => log::trace!("unhandled mode {mode:?}"),
        }
    }
}

impl<S: ScreenSink> Handler for Performer<'_, S> {
    #[inline]
    fn input(&mut self, c: char) {
        self.screen.put_char(c);
    }

    fn goto(&mut self, line: i32, col: usize) {
        self.screen.goto(line.max(0) as usize, col);
    }

    fn goto_line(&mut self, line: i32) {
        self.screen.goto_line(line.max(0) as usize);
    }

    fn goto_col(&mut self, col: usize) {
        self.screen.goto_col(col);
    }

    fn move_up(&mut self, n: usize) {
        self.screen.move_vertical(-(n.max(1) as isize));
    }

    fn move_down(&mut self, n: usize) {
        self.screen.move_vertical(n.max(1) as isize);
    }

    fn move_forward(&mut self, n: usize) {
        self.screen.move_horizontal(n.max(1) as isize);
    }

    fn move_backward(&mut self, n: usize) {
        self.screen.move_horizontal(-(n.max(1) as isize));
    }

    fn move_down_and_cr(&mut self, n: usize) {
        self.move_down(n);
        self.screen.carriage_return();
    }

    fn move_up_and_cr(&mut self, n: usize) {
        self.move_up(n);
        self.screen.carriage_return();
    }

    fn put_tab(&mut self, count: u16) {
        self.screen.tab_forward(count as usize);
    }

    fn move_forward_tabs(&mut self, count: u16) {
        self.screen.tab_forward(count as usize);
    }

    fn move_backward_tabs(&mut self, count: u16) {
        self.screen.tab_backward(count as usize);
    }

    fn set_horizontal_tabstop(&mut self) {
        self.screen.set_tab_stop();
    }

    fn clear_tabs(&mut self, mode: TabulationClearMode) {
        self.screen.clear_tab_stops(matches!(mode, TabulationClearMode::All));
    }

    #[inline]
    fn backspace(&mut self) {
        self.screen.backspace();
    }

    #[inline]
    fn carriage_return(&mut self) {
        self.screen.carriage_return();
    }

    #[inline]
    fn linefeed(&mut self) {
        self.screen.linefeed();
        if self.screen.mode().contains(ScreenMode::LINE_FEED_NEW_LINE) {
            self.screen.carriage_return();
        }
    }

    fn newline(&mut self) {
        self.screen.linefeed();
        self.screen.carriage_return();
    }

    fn bell(&mut self) {
        flush(&mut *self.screen, &mut *self.sink);
        self.sink.on_bell();
    }

    fn substitute(&mut self) {
        self.screen.put_char(' ');
    }

    fn reverse_index(&mut self) {
        self.screen.reverse_index();
    }

    fn scroll_up(&mut self, count: usize) {
        self.screen.scroll_up(count);
    }

    fn scroll_down(&mut self, count: usize) {
        self.screen.scroll_down(count);
    }

    fn insert_blank_lines(&mut self, count: usize) {
        self.screen.insert_lines(count);
    }

    fn delete_lines(&mut self, count: usize) {
        self.screen.delete_lines(count);
    }

    fn insert_blank(&mut self, count: usize) {
        self.screen.insert_blank(count);
    }

    fn erase_chars(&mut self, count: usize) {
        self.screen.erase_chars(count);
    }

    fn delete_chars(&mut self, count: usize) {
        self.screen.delete_chars(count);
    }

    fn clear_line(&mut self, mode: LineClearMode) {
        let erase = match mode {
            LineClearMode::Right => Erase::Below,
            LineClearMode::Left => Erase::Above,
            LineClearMode::All => Erase::All,
        };
        self.screen.erase_line(erase);
    }

    fn clear_screen(&mut self, mode: ClearMode) {
        match mode {
            ClearMode::Below => self.screen.erase_display(Erase::Below),
            ClearMode::Above => self.screen.erase_display(Erase::Above),
            ClearMode::All => self.screen.erase_display(Erase::All),
            // No scrollback to clear.
            ClearMode::Saved => {}
        }
    }

    fn set_scrolling_region(&mut self, top: usize, bottom: Option<usize>) {
        self.screen.set_scroll_region(top, bottom);
    }

    fn save_cursor_position(&mut self) {
        self.screen.save_cursor();
    }

    fn restore_cursor_position(&mut self) {
        self.screen.restore_cursor();
    }

    fn terminal_attribute(&mut self, attr: Attr) {
        let template = self.screen.template_mut();
        match attr {
            Attr::Reset => {
                let blank = super::ScreenCell::default();
                template.fg = blank.fg;
                template.bg = blank.bg;
                template.flags = CellFlags::empty();
            }
            Attr::Bold => template.flags.insert(CellFlags::BOLD),
            Attr::Dim => template.flags.insert(CellFlags::DIM),
            Attr::Italic => template.flags.insert(CellFlags::ITALIC),
            Attr::Underline => {
                template.flags.remove(CellFlags::ANY_UNDERLINE);
                template.flags.insert(CellFlags::UNDERLINE);
            }
            Attr::DoubleUnderline => {
                template.flags.remove(CellFlags::ANY_UNDERLINE);
                template.flags.insert(CellFlags::DOUBLE_UNDERLINE);
            }
            Attr::Undercurl => {
                template.flags.remove(CellFlags::ANY_UNDERLINE);
                template.flags.insert(CellFlags::CURLY_UNDERLINE);
            }
            Attr::BlinkSlow | Attr::BlinkFast => template.flags.insert(CellFlags::BLINK),
            Attr::Reverse => template.flags.insert(CellFlags::INVERSE),
            Attr::Hidden => template.flags.insert(CellFlags::HIDDEN),
            Attr::Strike => template.flags.insert(CellFlags::STRIKETHROUGH),
            Attr::CancelBold => template.flags.remove(CellFlags::BOLD),
            Attr::CancelBoldDim => template.flags.remove(CellFlags::BOLD | CellFlags::DIM),
            Attr::CancelItalic => template.flags.remove(CellFlags::ITALIC),
            Attr::CancelUnderline => template.flags.remove(CellFlags::ANY_UNDERLINE),
            Attr::CancelBlink => template.flags.remove(CellFlags::BLINK),
            Attr::CancelReverse => template.flags.remove(CellFlags::INVERSE),
            Attr::CancelHidden => template.flags.remove(CellFlags::HIDDEN),
            Attr::CancelStrike => template.flags.remove(CellFlags::STRIKETHROUGH),
            Attr::Foreground(color) => template.fg = color,
            Attr::Background(color) => template.bg = color,
            _ => log::trace!("unhandled attribute {attr:?}"),
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        self.ansi_mode(mode, true);
    }

    fn unset_mode(&mut self, mode: Mode) {
        self.ansi_mode(mode, false);
    }

    fn set_private_mode(&mut self, mode: PrivateMode) {
        self.private_mode(mode, true);
    }

    fn unset_private_mode(&mut self, mode: PrivateMode) {
        self.private_mode(mode, false);
    }

    fn set_keypad_application_mode(&mut self) {
        self.screen.set_mode(ScreenMode::APP_KEYPAD, true);
    }

    fn unset_keypad_application_mode(&mut self) {
        self.screen.set_mode(ScreenMode::APP_KEYPAD, false);
    }

    fn set_title(&mut self, title: Option<String>) {
        self.screen.set_title(title);
    }

    fn set_color(&mut self, index: usize, color: Rgb) {
        self.screen.set_color(index, color);
    }

    fn reset_color(&mut self, index: usize) {
        self.screen.reset_color(index);
    }

    fn decaln(&mut self) {
        self.screen.fill_alignment();
    }

    fn reset_state(&mut self) {
        self.screen.reset();
    }

    fn device_status(&mut self, status: usize) {
        match status {
            5 => self.reply(b"\x1b[0n"),
            6 => {
                let pos = self.screen.cursor();
                let report = format!("\x1b[{};{}R", pos.line.0 + 1, pos.column.0 + 1);
                self.reply(report.as_bytes());
            }
            _ => log::trace!("unhandled device status {status}"),
        }
    }

    fn identify_terminal(&mut self, intermediate: Option<char>) {
        match intermediate {
            Some('>') => self.reply(b"\x1b[>1;100;0c"),
            _ => self.reply(b"\x1b[?62;22c"),
        }
    }

    fn text_area_size_chars(&mut self) {
        let report = format!("\x1b[8;{};{}t", self.screen.lines(), self.screen.cols());
        self.reply(report.as_bytes());
    }
}
