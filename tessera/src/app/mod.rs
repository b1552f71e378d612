//! The window: winit event loop driving a [`FrameCoordinator`].

mod input;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::keyboard::ModifiersState;
use winit::window::{Window, WindowId};

use tessera_core::color::Palette;
use tessera_core::color::palette::DEFAULT_CURSOR;
use tessera_core::event::{Event, EventListener};
use tessera_core::{
    FontMetrics, FrameCoordinator, GpuBackend as _, MouseInput, MouseKind, PluginContext, PluginRegistry,
    ShellCommand, SurfaceSize, Terminal, TerminalError, WidgetError,
};

use crate::config::Config;
use crate::font::Font;
use crate::gpu::{GpuError, WgpuBackend};
use crate::plugins;
use crate::widgets::TerminalView;

/// Interval between PTY polls while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(8);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window")]
    Window(#[from] winit::error::OsError),
    #[error("GPU initialization failed")]
    Gpu(#[from] GpuError),
    #[error("terminal setup failed")]
    Terminal(#[from] TerminalError),
    #[error("terminal view failed to initialize")]
    View(#[from] WidgetError),
}

/// Events delivered to the event loop from terminal callbacks.
#[derive(Debug)]
pub enum UserEvent {
    Terminal(Event),
}

/// Forwards terminal events into the event loop.
struct ProxyListener {
    proxy: Mutex<EventLoopProxy<UserEvent>>,
}

impl EventListener for ProxyListener {
    fn send_event(&self, event: Event) {
        // Fails only after the loop has exited.
        let _ = self.proxy.lock().send_event(UserEvent::Terminal(event));
    }
}

/// Everything that exists once the window is up. Fields drop in order:
/// widgets first, the window last.
struct Session {
    coordinator: FrameCoordinator<WgpuBackend>,
    terminal: Rc<RefCell<Terminal>>,
    backend: WgpuBackend,
    window: Arc<Window>,
}

pub struct App {
    config: Config,
    shell: Option<String>,
    proxy: EventLoopProxy<UserEvent>,
    session: Option<Session>,
    modifiers: ModifiersState,
    cursor_pos: (f32, f32),
    error: Option<AppError>,
}

impl App {
    /// Open the window and run until the shell exits or the window closes.
    pub fn run(config: Config, shell: Option<String>) -> Result<(), AppError> {
        let event_loop = EventLoop::<UserEvent>::with_user_event().build()?;
        let proxy = event_loop.create_proxy();
        let mut app = Self {
            config,
            shell,
            proxy,
            session: None,
            modifiers: ModifiersState::empty(),
            cursor_pos: (0.0, 0.0),
            error: None,
        };
        event_loop.run_app(&mut app)?;
        match app.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn start_session(&mut self, event_loop: &ActiveEventLoop) -> Result<Session, AppError> {
        let t0 = Instant::now();
        let font = Font::discover(self.config.font.path.as_deref(), self.config.font.size);
        let metrics = font.as_ref().map_or_else(FontMetrics::default, Font::metrics);

        let cols = self.config.terminal.columns.max(1);
        let lines = self.config.terminal.rows.max(1);
        let (width, height) = metrics.pixel_size(cols, lines);
        let attrs = Window::default_attributes()
            .with_title("tessera")
            .with_inner_size(PhysicalSize::new(width, height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let background = self.config.colors.background_rgb();
        let backend = WgpuBackend::new(Arc::clone(&window), background)?;

        let listener = ProxyListener {
            proxy: Mutex::new(self.proxy.clone()),
        };
        let mut terminal = Terminal::new(cols, lines, metrics, listener)?;
        let mut palette = Palette::with_defaults(self.config.colors.foreground_rgb(), background);
        palette.set_bold_is_bright(self.config.colors.bold_is_bright);
        terminal.set_palette(palette);

        let size = window.inner_size();
        terminal.resize_to_pixels(size.width, size.height)?;
        let shell = self.shell.as_deref().or(self.config.terminal.shell.as_deref());
        match shell.and_then(ShellCommand::parse) {
            Some(command) => terminal.start_command(&command)?,
            None => terminal.start(None)?,
        }
        let terminal = Rc::new(RefCell::new(terminal));

        let mut registry = PluginRegistry::new(PluginContext {
            device: backend.device().clone(),
            metrics,
        });
        plugins::register_builtin(&mut registry);

        let mut coordinator = FrameCoordinator::new(registry);
        coordinator.attach_terminal(Rc::clone(&terminal));
        let view = TerminalView::new(
            Rc::clone(&terminal),
            backend.device().clone(),
            font,
            background,
            DEFAULT_CURSOR,
        );
        coordinator.add_terminal_view(tessera_core::widget::build(view)?);

        for spec in &self.config.widgets {
            let created = match spec.z {
                Some(z) => coordinator.create_with_z(&spec.name, &spec.args, &spec.payload, z),
                None => coordinator.create(&spec.name, &spec.args, &spec.payload),
            };
            match created {
                Ok(id) => log::info!("app: created `{}` as {id}", spec.name),
                Err(e) => log::warn!("app: widget `{}` not created: {e}", spec.name),
            }
        }

        log::info!(
            "app: session ready in {:.1}ms ({} plugins)",
            t0.elapsed().as_secs_f64() * 1000.0,
            coordinator.registry().available_plugins().len(),
        );
        Ok(Session {
            coordinator,
            terminal,
            backend,
            window,
        })
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let size = session.window.inner_size();
        let surface = SurfaceSize::new(size.width, size.height);
        match session.coordinator.frame(&mut session.backend, surface) {
            Ok(report) => {
                if !report.failed.is_empty() {
                    log::debug!("frame {}: {} widgets skipped", report.frame, report.failed.len());
                }
            }
            Err(e) => {
                log::error!("frame failed: {e}");
                self.error = Some(AppError::Gpu(e));
                event_loop.exit();
            }
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let changed = session.terminal.borrow_mut().resize_to_pixels(size.width, size.height);
        match changed {
            Ok(true) => {
                let (cols, lines) = {
                    let t = session.terminal.borrow();
                    (t.grid().cols(), t.grid().lines())
                };
                session.coordinator.on_terminal_resize(cols, lines);
            }
            Ok(false) => {}
            Err(e) => log::warn!("resize to {}x{} px ignored: {e}", size.width, size.height),
        }
        session.window.request_redraw();
    }

    fn mouse(&mut self, kind: MouseKind) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let mut event = MouseInput::new(kind, self.cursor_pos.0, self.cursor_pos.1);
        event.mods = input::modifiers(self.modifiers);
        session.coordinator.dispatch_mouse(&event);
    }

    fn cell_height(&self) -> f32 {
        self.session
            .as_ref()
            .map_or(FontMetrics::default().cell_height, |s| s.terminal.borrow().metrics().cell_height)
    }
}

impl ApplicationHandler<UserEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.session.is_some() || self.error.is_some() {
            return;
        }
        match self.start_session(event_loop) {
            Ok(session) => self.session = Some(session),
            Err(e) => {
                log::error!("startup failed: {e}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: UserEvent) {
        let UserEvent::Terminal(event) = event;
        match event {
            Event::Bell => log::info!("bell"),
            Event::Title(title) => {
                if let Some(s) = &self.session {
                    s.window.set_title(&title);
                }
            }
            Event::ResetTitle => {
                if let Some(s) = &self.session {
                    s.window.set_title("tessera");
                }
            }
            Event::ChildExit(code) => {
                log::info!("shell exited ({code:?}), closing");
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(session) = &self.session {
            session.window.request_redraw();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + POLL_INTERVAL));
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::Resized(size) => self.resize(size),
            WindowEvent::ModifiersChanged(mods) => self.modifiers = mods.state(),
            WindowEvent::KeyboardInput { event, .. } => {
                let mods = input::modifiers(self.modifiers);
                if let Some(session) = self.session.as_mut() {
                    for key in input::key_inputs(&event.logical_key, event.state, mods) {
                        session.coordinator.dispatch_key(&key);
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_pos = (position.x as f32, position.y as f32);
                self.mouse(MouseKind::Move);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(button) = input::mouse_button(button) {
                    self.mouse(input::button_kind(state, button));
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let kind = input::scroll_kind(delta, self.cell_height());
                self.mouse(kind);
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(session) = self.session.take() {
            log::info!("app: exiting after {} frames", session.coordinator.frame_count());
        }
    }
}
