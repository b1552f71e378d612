//! Core of the tessera terminal host.
//!
//! This crate holds everything that does not touch a window or a concrete
//! graphics API: the terminal cell grid and its damage tracking, the sink
//! through which the VT interpreter drives grid updates, the PTY-backed
//! `Terminal`, key encoding, and the widget/plugin lifecycle coordinated by
//! `FrameCoordinator` against an abstract `GpuBackend`.

#![deny(unsafe_code)]

pub mod cell;
pub mod color;
pub mod coordinator;
pub mod event;
pub mod gpu;
pub mod grid;
pub mod index;
pub mod input;
pub mod plugin;
pub mod terminal;
pub mod vt;
pub mod widget;

pub use cell::{Cell, CellFlags};
pub use coordinator::{FrameCoordinator, FrameReport, Routed};
pub use event::{Event, EventListener, VoidListener};
pub use gpu::{GpuBackend, SurfaceSize};
pub use grid::{DirtyTracker, Grid, GridError, Row};
pub use index::{Column, Line, Point, Rect};
pub use input::{Key, KeyInput, Modifiers, MouseButton, MouseInput, MouseKind, NamedKey};
pub use plugin::{Plugin, PluginContext, PluginMeta, PluginRegistry};
pub use terminal::{
    CursorState, FontMetrics, ShellCommand, Spawner, Subprocess, Terminal, TerminalError,
    TerminalState,
};
pub use vt::{CreateWidget, WidgetCommand};
pub use widget::{
    Anchor, FrameContext, PixelRect, PositionMode, ScreenType, Widget, WidgetError, WidgetHandle,
    WidgetId, WidgetParams,
};

#[cfg(test)]
mod test_support;
