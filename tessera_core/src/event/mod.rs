//! Terminal event types and listener trait.
//!
//! Events flow outward from a `Terminal` to whatever hosts it. Tests use
//! `VoidListener` or a recording listener; the window app forwards events
//! through winit's event loop proxy.

/// Notifications a terminal emits while it is polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// BEL received.
    Bell,
    /// Window title changed (OSC 0/2).
    Title(String),
    /// Window title reset to default.
    ResetTitle,
    /// The subprocess exited. `None` when no exit code is available.
    ChildExit(Option<u32>),
}

/// Receives terminal events.
///
/// The default implementation is a no-op, so `VoidListener` needs no
/// method body.
///
/// Bound: `Send + Sync + 'static` so a listener backed by an event loop
/// proxy can be shared with background code.
pub trait EventListener: Send + Sync + 'static {
    fn send_event(&self, _event: Event) {}
}

/// No-op event listener for tests and headless operation.
pub struct VoidListener;

impl EventListener for VoidListener {}
