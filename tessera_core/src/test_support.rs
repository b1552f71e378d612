//! Recording doubles shared by the terminal, widget, plugin and
//! coordinator tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::event::{Event, EventListener};
use crate::gpu::{GpuBackend, SurfaceSize};
use crate::input::{KeyInput, MouseInput};
use crate::plugin::{Plugin, PluginContext, PluginMeta};
use crate::terminal::{ShellCommand, Spawner, Subprocess, TerminalError};
use crate::widget::{self, FrameContext, PixelRect, Widget, WidgetError, WidgetHandle, WidgetParams};

/// Records every event for later assertions.
#[derive(Clone, Default)]
pub struct RecordingListener(Arc<Mutex<Vec<Event>>>);

impl RecordingListener {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }
}

impl EventListener for RecordingListener {
    fn send_event(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct Script {
    pub output: VecDeque<Vec<u8>>,
    pub written: Vec<u8>,
    pub exit: Option<u32>,
    /// Output stream stays open after the child exits.
    pub linger: bool,
    /// Upper bound on bytes accepted per `write`; 0 means unlimited.
    pub max_write: usize,
    pub resized: Option<(u16, u16)>,
    pub killed: bool,
    pub spawned: Option<ShellCommand>,
}

/// Subprocess fake fed from a shared script.
#[derive(Clone, Default)]
pub struct ScriptedProcess(pub Rc<RefCell<Script>>);

impl ScriptedProcess {
    pub fn push_output(&self, bytes: &[u8]) {
        self.0.borrow_mut().output.push_back(bytes.to_vec());
    }

    pub fn exit(&self, code: u32) {
        self.0.borrow_mut().exit = Some(code);
    }

    pub fn written(&self) -> Vec<u8> {
        self.0.borrow().written.clone()
    }

    /// Forget what was written so far.
    pub fn clear_written(&self) {
        self.0.borrow_mut().written.clear();
    }
}

impl Subprocess for ScriptedProcess {
    fn read_available(&mut self, out: &mut Vec<u8>) -> bool {
        let mut script = self.0.borrow_mut();
        while let Some(chunk) = script.output.pop_front() {
            out.extend_from_slice(&chunk);
        }
        script.exit.is_none() || script.linger
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut script = self.0.borrow_mut();
        let n = if script.max_write == 0 {
            bytes.len()
        } else {
            bytes.len().min(script.max_write)
        };
        script.written.extend_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn resize(&mut self, cols: u16, lines: u16) -> io::Result<()> {
        self.0.borrow_mut().resized = Some((cols, lines));
        Ok(())
    }

    fn try_wait(&mut self) -> io::Result<Option<u32>> {
        Ok(self.0.borrow().exit)
    }

    fn kill(&mut self) -> io::Result<()> {
        self.0.borrow_mut().killed = true;
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        Some(4242)
    }
}

impl Spawner for ScriptedProcess {
    fn spawn(
        &self,
        command: &ShellCommand,
        _cols: u16,
        _lines: u16,
    ) -> Result<Box<dyn Subprocess>, TerminalError> {
        self.0.borrow_mut().spawned = Some(command.clone());
        Ok(Box::new(self.clone()))
    }
}

/// Ordered record of everything the backend and widgets did.
pub type Journal = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Error)]
#[error("mock surface failure")]
pub struct MockError;

/// Backend that records pass boundaries and presents into a journal.
#[derive(Default)]
pub struct MockBackend {
    pub journal: Journal,
    /// `begin_frame` returns `Ok(None)`.
    pub unavailable: bool,
    /// `begin_frame` returns an error.
    pub broken: bool,
    frames: u64,
}

impl MockBackend {
    /// Backend whose surface is never available.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Backend that fails to acquire every frame.
    pub fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    pub fn clear(&self) {
        self.journal.borrow_mut().clear();
    }
}

/// Draw commands recorded while the pass is open.
pub struct MockPass {
    pub draws: Vec<String>,
}

impl GpuBackend for MockBackend {
    type Device = Journal;
    type Frame = u64;
    type Pass<'p> = MockPass;
    type Error = MockError;

    fn device(&self) -> &Journal {
        &self.journal
    }

    fn begin_frame(&mut self, _size: SurfaceSize) -> Result<Option<u64>, MockError> {
        if self.broken {
            return Err(MockError);
        }
        if self.unavailable {
            return Ok(None);
        }
        self.frames += 1;
        Ok(Some(self.frames))
    }

    fn encode_pass(&mut self, _frame: &mut u64, draw: &mut dyn FnMut(&mut MockPass)) {
        self.journal.borrow_mut().push("pass:open".to_owned());
        let mut pass = MockPass { draws: Vec::new() };
        draw(&mut pass);
        let mut journal = self.journal.borrow_mut();
        journal.extend(pass.draws);
        journal.push("pass:close".to_owned());
    }

    fn present(&mut self, frame: u64) {
        self.journal.borrow_mut().push(format!("present:{frame}"));
    }
}

/// Shared view into a `MockWidget`'s lifecycle.
#[derive(Default)]
pub struct Tally {
    pub inits: Cell<usize>,
    pub prepares: Cell<usize>,
    pub renders: Cell<usize>,
    pub disposes: Cell<usize>,
    pub keys: Cell<usize>,
    pub mice: Cell<usize>,
    pub dropped: Cell<bool>,
    pub fail_prepare: Cell<bool>,
    pub wants_keyboard: Cell<bool>,
    pub wants_mouse: Cell<bool>,
    /// Pointer area; `None` covers the whole surface.
    pub area: Cell<Option<PixelRect>>,
    /// Last context seen by `prepare_frame`.
    pub seen: Cell<Option<FrameContext>>,
}

fn bump(c: &Cell<usize>) {
    c.set(c.get() + 1);
}

pub struct MockWidget {
    name: String,
    payload: String,
    tally: Rc<Tally>,
    fail_init: bool,
    disposed: bool,
}

impl MockWidget {
    pub fn new(name: &str) -> (Self, Rc<Tally>) {
        let tally = Rc::new(Tally::default());
        let widget = Self {
            name: name.to_owned(),
            payload: String::new(),
            tally: tally.clone(),
            fail_init: false,
            disposed: false,
        };
        (widget, tally)
    }

    pub fn failing(name: &str) -> (Self, Rc<Tally>) {
        let (mut widget, tally) = Self::new(name);
        widget.fail_init = true;
        (widget, tally)
    }

    pub fn with_payload(mut self, payload: &str) -> Self {
        self.payload = payload.to_owned();
        self
    }

    pub fn handle(name: &str) -> (WidgetHandle<MockBackend>, Rc<Tally>) {
        let (widget, tally) = Self::new(name);
        match widget::build::<MockBackend, _>(widget) {
            Ok(handle) => (handle, tally),
            Err(e) => panic!("mock widget failed to build: {e}"),
        }
    }
}

impl Widget<MockBackend> for MockWidget {
    fn name(&self) -> &str {
        &self.name
    }

    fn payload(&self) -> &str {
        &self.payload
    }

    fn init(&mut self) -> Result<(), WidgetError> {
        bump(&self.tally.inits);
        if self.fail_init {
            return Err(WidgetError::Payload(format!("{} refused to start", self.name)));
        }
        Ok(())
    }

    fn prepare_frame(&mut self, device: &Journal, ctx: &FrameContext) -> Result<(), WidgetError> {
        bump(&self.tally.prepares);
        self.tally.seen.set(Some(*ctx));
        device.borrow_mut().push(format!("prepare:{}", self.name));
        if self.tally.fail_prepare.get() {
            return Err(WidgetError::Gpu("out of memory".to_owned()));
        }
        Ok(())
    }

    fn render(&mut self, pass: &mut MockPass, _ctx: &FrameContext) {
        bump(&self.tally.renders);
        pass.draws.push(format!("render:{}", self.name));
    }

    fn wants_keyboard(&self) -> bool {
        self.tally.wants_keyboard.get()
    }

    fn wants_mouse(&self) -> bool {
        self.tally.wants_mouse.get()
    }

    fn hit_test(&self, x: f32, y: f32) -> bool {
        self.tally.area.get().is_none_or(|r| r.contains(x, y))
    }

    fn on_key(&mut self, _input: &KeyInput) {
        bump(&self.tally.keys);
    }

    fn on_mouse(&mut self, _input: &MouseInput) {
        bump(&self.tally.mice);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        bump(&self.tally.disposes);
    }
}

impl Drop for MockWidget {
    fn drop(&mut self) {
        self.tally.dropped.set(true);
    }
}

/// Plugin with two widget kinds; a payload of `fail` fails init.
pub struct MockPlugin {
    meta: PluginMeta,
    pub tallies: Rc<RefCell<Vec<Rc<Tally>>>>,
    pub resizes: Rc<Cell<usize>>,
    pub disposes: Rc<Cell<usize>>,
}

impl MockPlugin {
    pub fn new(name: &str) -> Self {
        Self {
            meta: PluginMeta::new(name, "0.1.0", "tests", "records widget lifecycles"),
            tallies: Rc::default(),
            resizes: Rc::default(),
            disposes: Rc::default(),
        }
    }
}

impl Plugin<MockBackend> for MockPlugin {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn widget_kinds(&self) -> &[&'static str] {
        &["box", "other"]
    }

    fn create_widget(
        &mut self,
        kind: &str,
        _params: WidgetParams,
        payload: &str,
        _ctx: &PluginContext<MockBackend>,
    ) -> Result<WidgetHandle<MockBackend>, WidgetError> {
        let (widget, tally) = if payload == "fail" {
            MockWidget::failing(kind)
        } else {
            MockWidget::new(kind)
        };
        self.tallies.borrow_mut().push(tally);
        widget::build(widget.with_payload(payload))
    }

    fn on_terminal_resize(&mut self, _cols: usize, _lines: usize) {
        bump(&self.resizes);
    }

    fn dispose(&mut self) {
        bump(&self.disposes);
    }
}
