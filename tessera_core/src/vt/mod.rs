//! VT interpreter boundary.
//!
//! `VtInterpreter` parses subprocess output with `vte` and keeps the
//! authoritative [`Screen`]. Whoever feeds it supplies a [`ScreenSink`];
//! the interpreter reports changes through exactly four callbacks, all
//! invoked synchronously from inside `feed` or `resize`. The sink never
//! holds a reference back to the interpreter: `on_damage` receives a
//! shared borrow of the screen for the duration of the call so the sink
//! can re-read the damaged cells.
//!
//! Widget control sequences (see [`command`]) never reach the parser; they
//! are queued as [`WidgetCommand`]s for the host to apply.

pub mod command;
mod handler;
pub mod screen;

use vte::ansi::Processor;

use crate::index::{Point, Rect};

use command::{OscSplitter, Piece};
use handler::Performer;
pub use command::{CreateWidget, WidgetCommand};
pub use screen::{Screen, ScreenCell, ScreenMode};

/// Receiver of interpreter callbacks.
pub trait ScreenSink {
    /// Cells in `rect` changed; re-read them from `screen`.
    fn on_damage(&mut self, rect: Rect, screen: &Screen);
    /// Cursor moved from `old` to `pos`, or its visibility changed.
    fn on_move_cursor(&mut self, pos: Point, old: Point, visible: bool);
    /// Screen dimensions changed. Damage for the new area follows.
    fn on_resize(&mut self, cols: usize, lines: usize);
    /// BEL received.
    fn on_bell(&mut self);
}

/// `vte` parser plus the screen it drives.
pub struct VtInterpreter {
    parser: Processor,
    screen: Screen,
    /// Replies to device queries, waiting to be written to the PTY.
    output: Vec<u8>,
    osc: OscSplitter,
    commands: Vec<WidgetCommand>,
}

impl VtInterpreter {
    pub fn new(cols: usize, lines: usize) -> Self {
        Self {
            parser: Processor::new(),
            screen: Screen::new(cols, lines),
            output: Vec::new(),
            osc: OscSplitter::default(),
            commands: Vec::new(),
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    /// Replace the color palette; the whole screen is reported damaged on
    /// the next flush.
    pub fn set_palette(&mut self, palette: crate::color::Palette, sink: &mut impl ScreenSink) {
        self.screen.set_palette(palette);
        flush(&mut self.screen, sink);
    }

    /// Parse `bytes`, reporting damage, cursor moves and bells to `sink`.
    ///
    /// Damage is flushed before every bell and once more at the end; the
    /// cursor move (if any) is reported after the final damage so a
    /// renderer never sees the cursor ahead of the cells it points at.
    /// A widget command records the cursor as of its position in `bytes`.
    pub fn feed(&mut self, bytes: &[u8], sink: &mut impl ScreenSink) {
        let old = self.screen.cursor();
        let was_visible = self.screen.cursor_visible();

        let Self {
            parser,
            screen,
            output,
            osc,
            commands,
        } = self;
        osc.split(bytes, &mut |piece| match piece {
            Piece::Bytes(bytes) => {
                let mut performer = Performer::new(&mut *screen, &mut *sink, &mut *output);
                parser.advance(&mut performer, bytes);
            }
            Piece::Command(body) => commands.extend(widget_command(&body, screen)),
        });

        flush(&mut self.screen, sink);
        notify_cursor(&self.screen, sink, old, was_visible);
    }

    /// Resize the screen: `on_resize`, then damage for the whole new area.
    pub fn resize(&mut self, cols: usize, lines: usize, sink: &mut impl ScreenSink) {
        if cols == self.screen.cols() && lines == self.screen.lines() {
            return;
        }
        let old = self.screen.cursor();
        let was_visible = self.screen.cursor_visible();

        flush(&mut self.screen, sink);
        self.screen.resize(cols, lines);
        sink.on_resize(cols, lines);
        flush(&mut self.screen, sink);
        notify_cursor(&self.screen, sink, old, was_visible);
    }

    /// Take the bytes queued in reply to DSR/DA queries.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Pending title change: `Some(Some(t))` set, `Some(None)` reset.
    pub fn take_title(&mut self) -> Option<Option<String>> {
        self.screen.take_title()
    }

    /// Widget commands seen since the last call, in stream order.
    pub fn take_widget_commands(&mut self) -> Vec<WidgetCommand> {
        std::mem::take(&mut self.commands)
    }
}

/// Decode one widget sequence body. Malformed sequences are dropped whole.
fn widget_command(body: &[u8], screen: &Screen) -> Option<WidgetCommand> {
    match command::parse(body) {
        Ok(WidgetCommand::Create(mut create)) => {
            create.cursor = screen.cursor();
            create.scrolled = screen.scrolled_lines();
            create.alt_screen = screen.is_alt();
            Some(WidgetCommand::Create(create))
        }
        Ok(command) => Some(command),
        Err(e) => {
            log::warn!("ignoring widget sequence: {e}");
            None
        }
    }
}

/// Report pending damage, if any.
fn flush(screen: &mut Screen, sink: &mut impl ScreenSink) {
    if let Some(rect) = screen.take_damage() {
        sink.on_damage(rect, screen);
    }
}

fn notify_cursor(screen: &Screen, sink: &mut impl ScreenSink, old: Point, was_visible: bool) {
    let pos = screen.cursor();
    let visible = screen.cursor_visible();
    if pos != old || visible != was_visible {
        sink.on_move_cursor(pos, old, visible);
    }
}
