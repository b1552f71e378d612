//! Graphics backend boundary.
//!
//! The core never names a graphics API. A backend hands widgets a cheap
//! device handle for off-pass work (resource creation, uploads, standalone
//! command submissions during `prepare_frame`), and opens exactly one
//! shared render pass per frame into which widgets encode draws.

/// Drawable surface size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A graphics backend the frame coordinator drives.
///
/// One frame is `begin_frame`, one `encode_pass`, then `present`. The pass
/// borrow handed to the draw callback cannot outlive it, so no widget can
/// retain the pass past its `render` call.
pub trait GpuBackend: 'static {
    /// Resource-creation and submission handle given to widgets.
    type Device: Clone;
    /// An acquired frame: target image plus pending commands.
    type Frame;
    /// The open shared render pass.
    type Pass<'p>;
    type Error: std::error::Error + 'static;

    fn device(&self) -> &Self::Device;

    /// Acquire the next frame. `Ok(None)` means the surface is unavailable
    /// this time (minimized, lost and reconfigured) and the frame should be
    /// skipped.
    fn begin_frame(&mut self, size: SurfaceSize) -> Result<Option<Self::Frame>, Self::Error>;

    /// Open the shared pass on `frame`, run `draw` inside it, close it.
    fn encode_pass(&mut self, frame: &mut Self::Frame, draw: &mut dyn FnMut(&mut Self::Pass<'_>));

    /// Submit the frame's commands and present it.
    fn present(&mut self, frame: Self::Frame);
}
