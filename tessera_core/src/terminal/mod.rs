//! PTY-backed terminal.
//!
//! A `Terminal` owns one [`Grid`], one [`VtInterpreter`] and at most one
//! subprocess. All state changes happen inside [`Terminal::update`], the
//! single polling point the frame loop calls once per frame: it reads
//! whatever output the child produced since the last call, feeds it to
//! the interpreter (whose callbacks write the grid through `GridSync`),
//! writes pending input and query replies back, and observes child exit.
//!
//! Lifecycle: `Created -> Started -> Running -> Stopped`. Spawn failure
//! and child exit both land in `Stopped`; a stopped terminal ignores
//! input and further `update` calls are no-ops. After the child exits,
//! `update` keeps reading for up to [`EXIT_DRAIN_POLLS`] more calls so
//! trailing output still lands, without ever waiting on the stream.

pub mod pty;
mod sync;

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::color::Palette;
use crate::event::{Event, EventListener};
use crate::grid::{Grid, GridError};
use crate::index::{Column, Line, Point};
use crate::input::{self, Key, KeyInput, Modifiers, MouseInput, MouseKind, NamedKey};
use crate::vt::{ScreenMode, VtInterpreter, WidgetCommand};

pub use pty::{NativePty, NativePtySpawner, ShellCommand, Spawner, Subprocess};
pub use sync::resolve_cell;

use sync::GridSync;

/// Polls that keep reading after child exit while the output stream is
/// still open.
pub const EXIT_DRAIN_POLLS: u8 = 8;

const READ_BUF_CAPACITY: usize = 64 * 1024;

/// Cap on arrow keys sent for one wheel event.
const MAX_SCROLL_LINES: usize = 10;

/// Terminal failures.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error(transparent)]
    InvalidSize(#[from] GridError),
    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("pty i/o failed")]
    Io(#[from] io::Error),
    #[error("terminal has not been started")]
    NotStarted,
    #[error("terminal was already started")]
    AlreadyStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalState {
    /// Constructed, no subprocess yet.
    Created,
    /// Subprocess spawned, no output seen yet.
    Started,
    /// Subprocess has produced output.
    Running,
    /// Spawn failed or the subprocess exited.
    Stopped,
}

/// Cursor position and visibility as last reported by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub point: Point,
    pub visible: bool,
}

impl CursorState {
    pub fn line(&self) -> Line {
        self.point.line
    }

    pub fn column(&self) -> Column {
        self.point.column
    }
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            point: Point::default(),
            visible: true,
        }
    }
}

/// Cell metrics in pixels: advance width and line height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub cell_width: f32,
    pub cell_height: f32,
}

impl FontMetrics {
    pub fn new(cell_width: f32, cell_height: f32) -> Self {
        Self {
            cell_width: cell_width.max(1.0),
            cell_height: cell_height.max(1.0),
        }
    }

    /// Whole cells that fit in a `width` x `height` pixel area, at least 1x1.
    pub fn grid_size(&self, width: u32, height: u32) -> (usize, usize) {
        let cols = (width as f32 / self.cell_width).floor() as usize;
        let lines = (height as f32 / self.cell_height).floor() as usize;
        (cols.max(1), lines.max(1))
    }

    /// Pixel extent of a `cols` x `lines` grid.
    pub fn pixel_size(&self, cols: usize, lines: usize) -> (u32, u32) {
        (
            (cols as f32 * self.cell_width).ceil() as u32,
            (lines as f32 * self.cell_height).ceil() as u32,
        )
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::new(8.0, 16.0)
    }
}

/// Child exit seen, output stream not yet closed.
#[derive(Debug, Clone, Copy)]
struct PendingExit {
    code: Option<u32>,
    polls_left: u8,
}

/// A terminal screen driven by a subprocess.
pub struct Terminal {
    grid: Grid,
    cursor: CursorState,
    interpreter: VtInterpreter,
    process: Option<Box<dyn Subprocess>>,
    spawner: Box<dyn Spawner>,
    listener: Arc<dyn EventListener>,
    state: TerminalState,
    metrics: FontMetrics,
    /// Encoded input not yet accepted by the PTY.
    pending_input: Vec<u8>,
    read_buf: Vec<u8>,
    exit_code: Option<u32>,
    exiting: Option<PendingExit>,
    widget_commands: Vec<WidgetCommand>,
}

impl Terminal {
    /// Create a terminal of `cols` x `lines` cells. No subprocess runs
    /// until [`Terminal::start`].
    pub fn new(
        cols: usize,
        lines: usize,
        metrics: FontMetrics,
        listener: impl EventListener,
    ) -> Result<Self, TerminalError> {
        Grid::validate_size(cols, lines)?;
        Ok(Self {
            grid: Grid::new(cols, lines),
            cursor: CursorState::default(),
            interpreter: VtInterpreter::new(cols, lines),
            process: None,
            spawner: Box::new(NativePtySpawner),
            listener: Arc::new(listener),
            state: TerminalState::Created,
            metrics,
            pending_input: Vec::new(),
            read_buf: Vec::with_capacity(READ_BUF_CAPACITY),
            exit_code: None,
            exiting: None,
            widget_commands: Vec::new(),
        })
    }

    /// Replace the subprocess spawner.
    #[must_use]
    pub fn with_spawner(mut self, spawner: impl Spawner + 'static) -> Self {
        self.spawner = Box::new(spawner);
        self
    }

    /// Spawn `shell` (or the default shell) on a PTY sized to the grid.
    pub fn start(&mut self, shell: Option<&str>) -> Result<(), TerminalError> {
        let command = shell.map_or_else(ShellCommand::default_shell, ShellCommand::new);
        self.start_command(&command)
    }

    /// Spawn an explicit program with arguments.
    pub fn start_command(&mut self, command: &ShellCommand) -> Result<(), TerminalError> {
        if self.state != TerminalState::Created {
            return Err(TerminalError::AlreadyStarted);
        }
        let (cols, lines) = self.pty_size();
        match self.spawner.spawn(command, cols, lines) {
            Ok(process) => {
                self.process = Some(process);
                self.state = TerminalState::Started;
                self.flush_input();
                Ok(())
            }
            Err(e) => {
                log::error!("terminal start failed: {e}");
                self.state = TerminalState::Stopped;
                self.pending_input.clear();
                Err(e)
            }
        }
    }

    /// Poll the subprocess once. Returns `true` if the grid, cursor or
    /// run state may have changed.
    pub fn update(&mut self) -> bool {
        let Some(process) = self.process.as_mut() else {
            return false;
        };

        let mut buf = std::mem::take(&mut self.read_buf);
        buf.clear();
        let open = process.read_available(&mut buf);

        if self.exiting.is_none() {
            let code = match process.try_wait() {
                Ok(Some(code)) => Some(Some(code)),
                Ok(None) => None,
                Err(e) => {
                    log::warn!("child liveness query failed: {e}");
                    Some(None)
                }
            };
            self.exiting = code.map(|code| PendingExit {
                code,
                polls_left: EXIT_DRAIN_POLLS,
            });
        }

        let changed = !buf.is_empty();
        if changed {
            self.advance(&buf);
        }
        self.read_buf = buf;
        self.flush_input();

        if let Some(exit) = self.exiting.as_mut() {
            if !open || exit.polls_left == 0 {
                let code = exit.code;
                self.stop(code);
                return true;
            }
            exit.polls_left -= 1;
        }
        changed
    }

    /// Feed bytes to the interpreter as if the subprocess had written them.
    pub fn advance(&mut self, bytes: &[u8]) {
        if self.state == TerminalState::Started {
            self.state = TerminalState::Running;
        }
        let mut sync = GridSync::new(&mut self.grid, &mut self.cursor, &*self.listener);
        self.interpreter.feed(bytes, &mut sync);

        match self.interpreter.take_title() {
            Some(Some(title)) => self.listener.send_event(Event::Title(title)),
            Some(None) => self.listener.send_event(Event::ResetTitle),
            None => {}
        }
        let reply = self.interpreter.take_output();
        self.pending_input.extend_from_slice(&reply);
        self.widget_commands.extend(self.interpreter.take_widget_commands());
    }

    /// Widget commands the child has written since the last call.
    pub fn take_widget_commands(&mut self) -> Vec<WidgetCommand> {
        std::mem::take(&mut self.widget_commands)
    }

    fn stop(&mut self, code: Option<u32>) {
        log::info!("terminal child exited with {code:?}");
        self.process = None;
        self.exiting = None;
        self.state = TerminalState::Stopped;
        self.exit_code = code;
        self.pending_input.clear();
        self.listener.send_event(Event::ChildExit(code));
    }

    /// Write as much pending input as the PTY accepts; the rest stays
    /// queued so an encoded sequence is never split by a dropped tail.
    fn flush_input(&mut self) {
        let Some(process) = self.process.as_mut() else {
            if self.state == TerminalState::Stopped {
                self.pending_input.clear();
            }
            return;
        };
        while !self.pending_input.is_empty() {
            match process.write(&self.pending_input) {
                Ok(0) => break,
                Ok(n) => {
                    self.pending_input.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    log::warn!("pty write failed: {e}");
                    break;
                }
            }
        }
        if let Err(e) = process.flush() {
            log::warn!("pty flush failed: {e}");
        }
    }

    fn queue_input(&mut self, bytes: &[u8]) {
        if self.state == TerminalState::Stopped || bytes.is_empty() {
            return;
        }
        self.pending_input.extend_from_slice(bytes);
        self.flush_input();
    }

    /// Send a character key.
    pub fn send_key(&mut self, c: char, mods: Modifiers) {
        let bytes = input::encode_char(c, mods);
        self.queue_input(&bytes);
    }

    /// Send any key, honoring application cursor mode.
    pub fn send_special_key(&mut self, key: Key, mods: Modifiers) {
        let app_cursor = self.interpreter.screen().mode().contains(ScreenMode::APP_CURSOR);
        let bytes = input::encode_key(key, mods, app_cursor);
        self.queue_input(&bytes);
    }

    pub fn send_input(&mut self, input: &KeyInput) {
        self.send_special_key(input.key, input.mods);
    }

    /// Handle a mouse event nobody else claimed. The terminal has no mouse
    /// reporting; on the alternate screen the wheel scrolls by sending
    /// arrow keys. Returns whether the event produced input.
    pub fn send_mouse(&mut self, input: &MouseInput) -> bool {
        let MouseKind::Scroll { dy, .. } = input.kind else {
            return false;
        };
        if !self.is_alt_screen() || !self.is_running() {
            return false;
        }
        let lines = dy.abs().round() as usize;
        if lines == 0 {
            return false;
        }
        let key = if dy > 0.0 { NamedKey::ArrowUp } else { NamedKey::ArrowDown };
        for _ in 0..lines.min(MAX_SCROLL_LINES) {
            self.send_special_key(Key::Named(key), Modifiers::empty());
        }
        true
    }

    /// Send bytes unmodified (paste, scripted input).
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.queue_input(bytes);
    }

    /// Resize grid, interpreter and PTY.
    pub fn resize(&mut self, cols: usize, lines: usize) -> Result<(), TerminalError> {
        Grid::validate_size(cols, lines)?;
        let mut sync = GridSync::new(&mut self.grid, &mut self.cursor, &*self.listener);
        self.interpreter.resize(cols, lines, &mut sync);
        let (cols, lines) = self.pty_size();
        if let Some(process) = self.process.as_mut() {
            if let Err(e) = process.resize(cols, lines) {
                log::warn!("pty resize to {cols}x{lines} failed: {e}");
            }
        }
        Ok(())
    }

    /// Resize to the whole cells fitting `width` x `height` pixels.
    /// Returns whether the cell dimensions changed.
    pub fn resize_to_pixels(&mut self, width: u32, height: u32) -> Result<bool, TerminalError> {
        let (cols, lines) = self.metrics.grid_size(width, height);
        if cols == self.grid.cols() && lines == self.grid.lines() {
            return Ok(false);
        }
        self.resize(cols, lines)?;
        Ok(true)
    }

    /// Replace the color palette; the whole grid is re-resolved.
    pub fn set_palette(&mut self, palette: Palette) {
        let mut sync = GridSync::new(&mut self.grid, &mut self.cursor, &*self.listener);
        self.interpreter.set_palette(palette, &mut sync);
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Mutable grid access for renderers consuming dirty rows.
    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TerminalState::Started | TerminalState::Running)
    }

    pub fn state(&self) -> TerminalState {
        self.state
    }

    pub fn is_alt_screen(&self) -> bool {
        self.interpreter.screen().is_alt()
    }

    /// Lines scrolled off the top of the active buffer so far.
    pub fn scrolled_lines(&self) -> u64 {
        self.interpreter.screen().scrolled_lines()
    }

    pub fn exit_code(&self) -> Option<u32> {
        self.exit_code
    }

    pub fn pid(&self) -> Option<u32> {
        self.process.as_ref().and_then(|p| p.pid())
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    /// Pixel extent of the grid at the current metrics.
    pub fn pixel_size(&self) -> (u32, u32) {
        self.metrics.pixel_size(self.grid.cols(), self.grid.lines())
    }

    /// Bytes waiting for the PTY to accept them.
    pub fn pending_input(&self) -> usize {
        self.pending_input.len()
    }

    fn pty_size(&self) -> (u16, u16) {
        let clamp = |n: usize| u16::try_from(n).unwrap_or(u16::MAX);
        (clamp(self.grid.cols()), clamp(self.grid.lines()))
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.take() {
            log::debug!("terminating child {:?}", process.pid());
            if let Err(e) = process.kill() {
                log::debug!("kill failed: {e}");
            }
        }
    }
}
