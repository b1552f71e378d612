//! Widgets: renderable, input-receiving content created by plugins.
//!
//! A widget is built in two phases. Plugins construct the raw value with
//! only its identity, payload and injected services, then hand it to
//! [`build`], which runs the fallible [`Widget::init`] and either returns
//! a shared handle or drops the partial widget and returns the error.
//! There is no other way to obtain a [`WidgetHandle`].
//!
//! Per frame, `prepare_frame` runs off-pass (uploads, offscreen renders,
//! standalone submissions) and `render` encodes draws into the shared pass
//! against resources that already exist.

mod params;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;

use crate::gpu::{GpuBackend, SurfaceSize};
use crate::input::{KeyInput, MouseInput};
use crate::terminal::FontMetrics;

pub use params::{PositionMode, WidgetParams};

/// Stable identifier assigned by the frame coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(pub u64);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "widget#{}", self.0)
    }
}

/// Terminal screen a widget belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenType {
    #[default]
    Main,
    Alternate,
}

impl ScreenType {
    pub fn from_alt(alt: bool) -> Self {
        if alt { Self::Alternate } else { Self::Main }
    }
}

/// Widget and plugin failures.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error("no plugin named `{0}`")]
    UnknownPlugin(String),
    #[error("plugin `{plugin}` has no widget kind `{kind}`")]
    UnknownWidget { plugin: String, kind: String },
    #[error("invalid widget argument `{arg}`: {reason}")]
    InvalidArgument { arg: String, reason: String },
    #[error("invalid payload: {0}")]
    Payload(String),
    #[error("widget `{name}` failed to initialize")]
    Init {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("plugin `{name}` failed to load")]
    PluginLoad {
        name: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
    #[error("gpu resource error: {0}")]
    Gpu(String),
    #[error("`{0}` was already disposed")]
    Disposed(String),
    #[error("no live widget {0}")]
    NoSuchWidget(WidgetId),
}

/// A pixel rectangle on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Cell a relative widget is placed from: the cursor when the widget was
/// created, moved up by every line scrolled off the top since. `line` goes
/// negative once that cell has left the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Anchor {
    pub line: i64,
    pub column: i64,
}

impl Anchor {
    pub fn new(line: i64, column: i64) -> Self {
        Self { line, column }
    }
}

/// Per-frame information passed to a widget in both phases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub surface: SurfaceSize,
    pub metrics: FontMetrics,
    /// Monotonic frame counter, starting at 1.
    pub frame: u64,
    /// This widget's relative placement origin.
    pub anchor: Anchor,
    pub screen: ScreenType,
}

impl FrameContext {
    /// Convert cell placement to pixels. `fallback` is the widget's natural
    /// size in cells for unspecified dimensions. Origins left of the
    /// surface clamp to 0. Absolute origins above it clamp too; relative
    /// ones do not, so content scrolled past the top moves off-screen.
    pub fn place(&self, params: &WidgetParams, fallback: (u32, u32)) -> PixelRect {
        let (col, line) = match params.position {
            PositionMode::Absolute => (i64::from(params.x), i64::from(params.y).max(0)),
            PositionMode::Relative => (
                self.anchor.column + i64::from(params.x),
                self.anchor.line + i64::from(params.y),
            ),
        };
        let cols = params.width.unwrap_or(fallback.0);
        let lines = params.height.unwrap_or(fallback.1);
        PixelRect {
            x: col.max(0) as f32 * self.metrics.cell_width,
            y: line as f32 * self.metrics.cell_height,
            width: cols as f32 * self.metrics.cell_width,
            height: lines as f32 * self.metrics.cell_height,
        }
    }
}

/// A unit of renderable content.
///
/// `dispose` must be idempotent and must leave the widget safe to drop;
/// `Drop` must not assume `dispose` ran.
pub trait Widget<B: GpuBackend> {
    fn name(&self) -> &str;

    fn payload(&self) -> &str;

    /// Fallible setup: parse the payload, acquire resources.
    fn init(&mut self) -> Result<(), WidgetError>;

    /// Off-pass GPU work for this frame. An error skips `render` for this
    /// frame only.
    fn prepare_frame(&mut self, _device: &B::Device, _ctx: &FrameContext) -> Result<(), WidgetError> {
        Ok(())
    }

    /// Encode draws into the shared pass. Must not create resources that
    /// need their own submission.
    fn render(&mut self, pass: &mut B::Pass<'_>, ctx: &FrameContext);

    fn wants_keyboard(&self) -> bool {
        false
    }

    fn wants_mouse(&self) -> bool {
        false
    }

    /// Whether the surface point `(x, y)` is over this widget. Mouse events
    /// are only routed to widgets that want the mouse and are hit.
    fn hit_test(&self, _x: f32, _y: f32) -> bool {
        true
    }

    fn on_key(&mut self, _input: &KeyInput) {}

    fn on_mouse(&mut self, _input: &MouseInput) {}

    /// Release owned resources.
    fn dispose(&mut self);
}

/// Shared ownership of a live widget.
pub type WidgetHandle<B> = Rc<RefCell<dyn Widget<B>>>;

/// Run `init` on a freshly constructed widget. On failure the partial
/// widget is dropped and the error names it.
pub fn build<B, W>(mut widget: W) -> Result<WidgetHandle<B>, WidgetError>
where
    B: GpuBackend,
    W: Widget<B> + 'static,
{
    match widget.init() {
        Ok(()) => {
            log::debug!("widget `{}` initialized", widget.name());
            Ok(Rc::new(RefCell::new(widget)))
        }
        Err(source) => {
            let name = widget.name().to_owned();
            drop(widget);
            log::warn!("widget `{name}` failed to initialize: {source}");
            Err(WidgetError::Init {
                name,
                source: Box::new(source),
            })
        }
    }
}
