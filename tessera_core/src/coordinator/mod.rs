//! Per-frame orchestration and input routing.
//!
//! One frame runs four steps in a fixed order:
//!
//! 1. `Terminal::update` for every attached terminal, then the widget
//!    commands their children wrote are applied.
//! 2. `prepare_frame` on every live widget. Failures are logged and only
//!    exclude that widget from this frame.
//! 3. One shared pass: `render` on each prepared widget in creation order.
//! 4. Present.
//!
//! Input goes to the topmost interested widget, ordered by z then creation
//! sequence, with interest re-queried for every event. Key input nobody
//! claims falls through to the first attached terminal.
//!
//! Relative widgets are anchored to the cursor as it was when they were
//! created. The anchor moves up with every line the terminal scrolls, so a
//! widget stays next to the output it was created beside.

use std::cell::RefCell;
use std::rc::Rc;

use crate::gpu::{GpuBackend, SurfaceSize};
use crate::input::{KeyInput, MouseInput};
use crate::plugin::PluginRegistry;
use crate::index::Point;
use crate::terminal::Terminal;
use crate::vt::{CreateWidget, WidgetCommand};
use crate::widget::{Anchor, FrameContext, ScreenType, WidgetError, WidgetHandle, WidgetId};

/// Z of the terminal view.
pub const TERMINAL_Z: i32 = 0;
/// Z given to widgets added without one.
pub const DEFAULT_WIDGET_Z: i32 = 200;

/// Where an input event went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Widget(WidgetId),
    Terminal,
    Unhandled,
}

/// Outcome of one [`FrameCoordinator::frame`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    /// Widgets rendered, in render order.
    pub rendered: Vec<WidgetId>,
    /// Widgets whose `prepare_frame` failed this frame.
    pub failed: Vec<WidgetId>,
    /// Widgets created by terminal output this frame.
    pub created: Vec<WidgetId>,
    /// The surface was unavailable and nothing was drawn.
    pub surface_skipped: bool,
    /// Some terminal reported new output or a state change.
    pub terminal_changed: bool,
}

/// Cursor cell and scroll count captured when a widget was created.
#[derive(Debug, Clone, Copy)]
struct Origin {
    point: Point,
    scrolled: u64,
}

impl Origin {
    fn anchor(&self, scrolled_now: u64) -> Anchor {
        let shift = i64::try_from(scrolled_now.saturating_sub(self.scrolled)).unwrap_or(i64::MAX);
        Anchor::new(
            (self.point.line.0 as i64).saturating_sub(shift),
            self.point.column.0 as i64,
        )
    }
}

struct Entry<B: GpuBackend> {
    id: WidgetId,
    z: i32,
    seq: u64,
    running: bool,
    /// Screen the widget is bound to; `None` shows on both.
    screen: Option<ScreenType>,
    /// `None` when no terminal was attached at creation.
    origin: Option<Origin>,
    handle: WidgetHandle<B>,
}

impl<B: GpuBackend> Entry<B> {
    fn is_live(&self, screen: ScreenType) -> bool {
        self.running && self.screen.is_none_or(|s| s == screen)
    }

    fn dispose(&self) {
        match self.handle.try_borrow_mut() {
            Ok(mut widget) => widget.dispose(),
            Err(_) => log::error!("{} is borrowed during dispose", self.id),
        }
    }
}

/// Owns the widget set and drives frames against a backend.
pub struct FrameCoordinator<B: GpuBackend> {
    registry: PluginRegistry<B>,
    /// Creation order.
    entries: Vec<Entry<B>>,
    terminals: Vec<Rc<RefCell<Terminal>>>,
    next_id: u64,
    next_seq: u64,
    frame: u64,
}

impl<B: GpuBackend> FrameCoordinator<B> {
    pub fn new(registry: PluginRegistry<B>) -> Self {
        Self {
            registry,
            entries: Vec::new(),
            terminals: Vec::new(),
            next_id: 1,
            next_seq: 0,
            frame: 0,
        }
    }

    pub fn registry(&self) -> &PluginRegistry<B> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PluginRegistry<B> {
        &mut self.registry
    }

    /// Poll `terminal` in step 1 and send it unclaimed input. The first
    /// attached terminal decides the active screen.
    pub fn attach_terminal(&mut self, terminal: Rc<RefCell<Terminal>>) {
        self.terminals.push(terminal);
    }

    /// Add the widget that draws a terminal: z 0, shown on both screens.
    pub fn add_terminal_view(&mut self, handle: WidgetHandle<B>) -> WidgetId {
        self.insert(handle, TERMINAL_Z, None, None)
    }

    /// Add a built widget at the default z, bound to the active screen.
    pub fn add(&mut self, handle: WidgetHandle<B>) -> WidgetId {
        self.add_with_z(handle, DEFAULT_WIDGET_Z)
    }

    /// Add at `z`, bound to the active screen and anchored at the current
    /// cursor of the first terminal.
    pub fn add_with_z(&mut self, handle: WidgetHandle<B>, z: i32) -> WidgetId {
        let screen = self.active_screen();
        let origin = self.terminals.first().map(|t| {
            let t = t.borrow();
            Origin {
                point: t.cursor().point,
                scrolled: t.scrolled_lines(),
            }
        });
        self.insert(handle, z, Some(screen), origin)
    }

    /// Create a widget through the registry and add it. On failure nothing
    /// is added.
    pub fn create(&mut self, spec: &str, args: &str, payload: &str) -> Result<WidgetId, WidgetError> {
        self.create_with_z(spec, args, payload, DEFAULT_WIDGET_Z)
    }

    pub fn create_with_z(
        &mut self,
        spec: &str,
        args: &str,
        payload: &str,
        z: i32,
    ) -> Result<WidgetId, WidgetError> {
        let handle = self.registry.create(spec, args, payload)?;
        Ok(self.add_with_z(handle, z))
    }

    fn insert(
        &mut self,
        handle: WidgetHandle<B>,
        z: i32,
        screen: Option<ScreenType>,
        origin: Option<Origin>,
    ) -> WidgetId {
        let id = WidgetId(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        log::debug!("added {id} `{}` at z {z}", handle.borrow().name());
        self.entries.push(Entry {
            id,
            z,
            seq,
            running: true,
            screen,
            origin,
            handle,
        });
        id
    }

    /// Remove and dispose a widget. The widget itself is released once any
    /// outstanding handle from [`FrameCoordinator::get`] is dropped.
    pub fn remove(&mut self, id: WidgetId) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        let entry = self.entries.remove(pos);
        entry.dispose();
        true
    }

    /// Pause or resume a widget. Paused widgets are neither prepared,
    /// rendered nor routed input.
    pub fn set_running(&mut self, id: WidgetId, running: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.running = running;
                true
            }
            None => false,
        }
    }

    /// Apply a command written by a terminal child. Creates answer with the
    /// new id. Lifecycle commands only reach widgets bound to a screen; the
    /// terminal view cannot be deleted or paused from inside the terminal.
    pub fn apply(&mut self, command: WidgetCommand) -> Result<Option<WidgetId>, WidgetError> {
        let target = |coord: &Self, raw: u64| {
            let id = WidgetId(raw);
            coord
                .entries
                .iter()
                .any(|e| e.id == id && e.screen.is_some())
                .then_some(id)
                .ok_or(WidgetError::NoSuchWidget(id))
        };
        match command {
            WidgetCommand::Create(create) => self.create_in_band(&create).map(Some),
            WidgetCommand::Delete(raw) => {
                let id = target(self, raw)?;
                self.remove(id);
                Ok(None)
            }
            WidgetCommand::Stop(raw) => {
                let id = target(self, raw)?;
                self.set_running(id, false);
                Ok(None)
            }
            WidgetCommand::Start(raw) => {
                let id = target(self, raw)?;
                self.set_running(id, true);
                Ok(None)
            }
        }
    }

    fn create_in_band(&mut self, create: &CreateWidget) -> Result<WidgetId, WidgetError> {
        let handle = self.registry.create(&create.plugin, &create.args(), &create.payload)?;
        let origin = Origin {
            point: create.cursor,
            scrolled: create.scrolled,
        };
        let screen = ScreenType::from_alt(create.alt_screen);
        Ok(self.insert(handle, DEFAULT_WIDGET_Z, Some(screen), Some(origin)))
    }

    pub fn is_running(&self, id: WidgetId) -> Option<bool> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.running)
    }

    pub fn get(&self, id: WidgetId) -> Option<WidgetHandle<B>> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.handle.clone())
    }

    /// Ids in creation order.
    pub fn widget_ids(&self) -> Vec<WidgetId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Forward a terminal grid size change to plugins.
    pub fn on_terminal_resize(&mut self, cols: usize, lines: usize) {
        self.registry.on_terminal_resize(cols, lines);
    }

    fn active_screen(&self) -> ScreenType {
        self.terminals
            .first()
            .map_or(ScreenType::Main, |t| ScreenType::from_alt(t.borrow().is_alt_screen()))
    }

    /// Context shared by all widgets this frame, with the scroll count of
    /// the active buffer for resolving anchors.
    fn frame_context(&self, surface: SurfaceSize) -> (FrameContext, u64) {
        let (metrics, scrolled) = match self.terminals.first() {
            Some(t) => {
                let t = t.borrow();
                (t.metrics(), t.scrolled_lines())
            }
            None => (self.registry.context().metrics, 0),
        };
        let ctx = FrameContext {
            surface,
            metrics,
            frame: self.frame,
            anchor: Anchor::default(),
            screen: self.active_screen(),
        };
        (ctx, scrolled)
    }

    /// Run one frame. Errors come only from acquiring the frame; widget
    /// failures are reported in the returned [`FrameReport`].
    pub fn frame(&mut self, backend: &mut B, surface: SurfaceSize) -> Result<FrameReport, B::Error> {
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            ..FrameReport::default()
        };

        let mut commands = Vec::new();
        for terminal in &self.terminals {
            let mut terminal = terminal.borrow_mut();
            report.terminal_changed |= terminal.update();
            commands.extend(terminal.take_widget_commands());
        }
        for command in commands {
            match self.apply(command) {
                Ok(Some(id)) => report.created.push(id),
                Ok(None) => {}
                Err(e) => log::warn!("widget command failed: {e}"),
            }
        }

        let (base, scrolled) = self.frame_context(surface);
        let device = backend.device().clone();
        let mut prepared = Vec::with_capacity(self.entries.len());
        for entry in self.entries.iter().filter(|e| e.is_live(base.screen)) {
            let ctx = FrameContext {
                anchor: entry.origin.map(|o| o.anchor(scrolled)).unwrap_or_default(),
                ..base
            };
            let result = entry.handle.borrow_mut().prepare_frame(&device, &ctx);
            match result {
                Ok(()) => prepared.push((entry, ctx)),
                Err(e) => {
                    log::warn!(
                        "{} `{}` skipped this frame: {e}",
                        entry.id,
                        entry.handle.borrow().name()
                    );
                    report.failed.push(entry.id);
                }
            }
        }

        let Some(mut gpu_frame) = backend.begin_frame(surface)? else {
            log::trace!("frame {} skipped: surface unavailable", self.frame);
            report.surface_skipped = true;
            return Ok(report);
        };

        backend.encode_pass(&mut gpu_frame, &mut |pass| {
            for (entry, ctx) in &prepared {
                entry.handle.borrow_mut().render(pass, ctx);
            }
        });
        backend.present(gpu_frame);

        report.rendered = prepared.iter().map(|(e, _)| e.id).collect();
        Ok(report)
    }

    /// Topmost live widget whose interest predicate holds right now.
    fn target(&self, wants: impl Fn(&Entry<B>) -> bool) -> Option<&Entry<B>> {
        let screen = self.active_screen();
        self.entries
            .iter()
            .filter(|e| e.is_live(screen) && wants(*e))
            .max_by_key(|e| (e.z, e.seq))
    }

    pub fn dispatch_key(&mut self, input: &KeyInput) -> Routed {
        if let Some(entry) = self.target(|e| e.handle.borrow().wants_keyboard()) {
            entry.handle.borrow_mut().on_key(input);
            return Routed::Widget(entry.id);
        }
        match self.terminals.first() {
            Some(terminal) => {
                terminal.borrow_mut().send_input(input);
                Routed::Terminal
            }
            None => Routed::Unhandled,
        }
    }

    /// Route to the topmost widget that wants the mouse and is under the
    /// pointer; anything else goes to the terminal.
    pub fn dispatch_mouse(&mut self, input: &MouseInput) -> Routed {
        let hit = |e: &Entry<B>| {
            let widget = e.handle.borrow();
            widget.wants_mouse() && widget.hit_test(input.x, input.y)
        };
        if let Some(entry) = self.target(hit) {
            entry.handle.borrow_mut().on_mouse(input);
            return Routed::Widget(entry.id);
        }
        match self.terminals.first() {
            Some(terminal) if terminal.borrow_mut().send_mouse(input) => Routed::Terminal,
            _ => Routed::Unhandled,
        }
    }
}

impl<B: GpuBackend> Drop for FrameCoordinator<B> {
    fn drop(&mut self) {
        for entry in &self.entries {
            entry.dispose();
        }
        self.registry.dispose();
    }
}

#[cfg(test)]
mod tests;
