//! Solid color boxes.

use tessera_core::cell::Rgb;
use tessera_core::{
    FrameContext, PixelRect, Plugin, PluginContext, PluginMeta, Widget, WidgetError,
    WidgetHandle, WidgetParams,
};

use crate::config::parse_hex_color;
use crate::gpu::instance_writer::{InstanceBatch, InstanceWriter};
use crate::gpu::{GpuDevice, WgpuBackend, rgba};

pub const NAME: &str = "panel";

/// Size in cells when `-w`/`-h` are not given.
const DEFAULT_CELLS: (u32, u32) = (10, 3);

pub struct PanelPlugin {
    meta: PluginMeta,
}

impl PanelPlugin {
    pub fn new() -> Self {
        Self {
            meta: PluginMeta::new(NAME, env!("CARGO_PKG_VERSION"), "tessera", "Solid color box"),
        }
    }
}

impl Default for PanelPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin<WgpuBackend> for PanelPlugin {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn widget_kinds(&self) -> &[&'static str] {
        &["box"]
    }

    fn create_widget(
        &mut self,
        _kind: &str,
        params: WidgetParams,
        payload: &str,
        ctx: &PluginContext<WgpuBackend>,
    ) -> Result<WidgetHandle<WgpuBackend>, WidgetError> {
        tessera_core::widget::build(PanelWidget::new(params, payload, ctx.device.clone()))
    }
}

/// Parse a panel payload: `#rrggbb`, optionally followed by `/alpha` in 0..=1.
pub(crate) fn parse_panel_color(payload: &str) -> Result<(Rgb, f32), WidgetError> {
    let (hex, alpha) = match payload.split_once('/') {
        Some((hex, alpha)) => {
            let alpha: f32 = alpha
                .trim()
                .parse()
                .map_err(|_| WidgetError::Payload(format!("bad alpha `{alpha}`")))?;
            if !(0.0..=1.0).contains(&alpha) {
                return Err(WidgetError::Payload(format!("alpha {alpha} outside 0..=1")));
            }
            (hex, alpha)
        }
        None => (payload, 1.0),
    };
    let color = parse_hex_color(hex)
        .ok_or_else(|| WidgetError::Payload(format!("expected #rrggbb, got `{hex}`")))?;
    Ok((color, alpha))
}

pub struct PanelWidget {
    params: WidgetParams,
    payload: String,
    gpu: GpuDevice,
    color: [f32; 4],
    batch: InstanceBatch,
    placed: Option<PixelRect>,
    disposed: bool,
}

impl PanelWidget {
    fn new(params: WidgetParams, payload: &str, gpu: GpuDevice) -> Self {
        Self {
            params,
            payload: payload.to_owned(),
            gpu,
            color: [0.0; 4],
            batch: InstanceBatch::new("panel"),
            placed: None,
            disposed: false,
        }
    }
}

impl Widget<WgpuBackend> for PanelWidget {
    fn name(&self) -> &str {
        NAME
    }

    fn payload(&self) -> &str {
        &self.payload
    }

    fn init(&mut self) -> Result<(), WidgetError> {
        let (color, alpha) = parse_panel_color(&self.payload)?;
        self.color = rgba(color, alpha);
        Ok(())
    }

    fn prepare_frame(&mut self, gpu: &GpuDevice, ctx: &FrameContext) -> Result<(), WidgetError> {
        let rect = ctx.place(&self.params, DEFAULT_CELLS);
        if self.placed == Some(rect) {
            return Ok(());
        }
        let mut writer = InstanceWriter::new();
        writer.push_rect(rect.x, rect.y, rect.width, rect.height, self.color);
        self.batch.upload(&gpu.device, &gpu.queue, &writer);
        self.placed = Some(rect);
        Ok(())
    }

    fn render(&mut self, pass: &mut wgpu::RenderPass<'_>, _ctx: &FrameContext) {
        pass.set_pipeline(&self.gpu.pipelines.quad);
        pass.set_bind_group(0, &*self.gpu.surface_uniforms, &[]);
        self.batch.draw(pass);
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.batch.release();
            self.placed = None;
        }
    }
}

#[cfg(test)]
mod tests;
