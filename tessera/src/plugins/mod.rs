//! Plugins shipped with the binary.
//!
//! `panel` is registered eagerly. `plot` and `image` are registered lazily
//! and constructed the first time a widget of theirs is requested.

pub mod image;
pub mod panel;
pub mod plot;

use tessera_core::{PixelRect, PluginRegistry};

use crate::gpu::WgpuBackend;

/// Register every built-in plugin.
pub fn register_builtin(registry: &mut PluginRegistry<WgpuBackend>) {
    registry.register(Box::new(panel::PanelPlugin::new()));
    registry.register_lazy(plot::NAME, |_ctx| Ok(Box::new(plot::PlotPlugin::new())));
    registry.register_lazy(image::NAME, |_ctx| Ok(Box::new(image::ImagePlugin::new())));
}

/// Whole pixels covered by `rect`, at least 1x1.
pub(crate) fn pixel_extent(rect: &PixelRect) -> (u32, u32) {
    (
        rect.width.round().max(1.0) as u32,
        rect.height.round().max(1.0) as u32,
    )
}
