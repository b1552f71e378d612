//! Sample plots rendered offscreen.
//!
//! The plot is drawn into its own texture during `prepare_frame` with a
//! separate encoder and submission, then composited into the shared pass
//! as a single textured quad. A left click inside the plot toggles the
//! highlight and forces a redraw of the texture.

use tessera_core::{
    FrameContext, MouseButton, MouseInput, MouseKind, PixelRect, Plugin, PluginContext,
    PluginMeta, Widget, WidgetError, WidgetHandle, WidgetParams,
};

use super::pixel_extent;
use crate::gpu::instance_writer::{InstanceBatch, InstanceWriter};
use crate::gpu::{GpuDevice, WgpuBackend};

pub const NAME: &str = "plot";

const DEFAULT_CELLS: (u32, u32) = (30, 8);

const BACKGROUND: [f32; 4] = [0.08, 0.08, 0.10, 1.0];
const NORMAL: [f32; 4] = [0.35, 0.65, 0.95, 1.0];
const HIGHLIGHT: [f32; 4] = [0.98, 0.72, 0.25, 1.0];
/// Thickness of a line-plot point, in pixels.
const LINE_WIDTH: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotStyle {
    Line,
    Bars,
}

impl PlotStyle {
    fn from_kind(kind: &str) -> Self {
        if kind == "bars" { Self::Bars } else { Self::Line }
    }
}

pub struct PlotPlugin {
    meta: PluginMeta,
}

impl PlotPlugin {
    pub fn new() -> Self {
        Self {
            meta: PluginMeta::new(
                NAME,
                env!("CARGO_PKG_VERSION"),
                "tessera",
                "Line and bar plots of comma-separated samples",
            ),
        }
    }
}

impl Default for PlotPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin<WgpuBackend> for PlotPlugin {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn widget_kinds(&self) -> &[&'static str] {
        &["line", "bars"]
    }

    fn create_widget(
        &mut self,
        kind: &str,
        params: WidgetParams,
        payload: &str,
        ctx: &PluginContext<WgpuBackend>,
    ) -> Result<WidgetHandle<WgpuBackend>, WidgetError> {
        let widget = PlotWidget::new(PlotStyle::from_kind(kind), params, payload, ctx.device.clone());
        tessera_core::widget::build(widget)
    }
}

/// Parse comma- or whitespace-separated finite samples.
pub(crate) fn parse_samples(payload: &str) -> Result<Vec<f32>, WidgetError> {
    let samples = payload
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| match s.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(WidgetError::Payload(format!("bad sample `{s}`"))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if samples.is_empty() {
        return Err(WidgetError::Payload("plot needs at least one sample".to_owned()));
    }
    Ok(samples)
}

/// Instances drawing `samples` into a `width` x `height` target.
pub(crate) fn plot_instances(
    samples: &[f32],
    style: PlotStyle,
    width: f32,
    height: f32,
    highlight: bool,
) -> InstanceWriter {
    let mut w = InstanceWriter::new();
    w.push_rect(0.0, 0.0, width, height, BACKGROUND);
    if samples.is_empty() {
        return w;
    }

    let (min, max) = samples
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let lo = min.min(0.0);
    let span = (max - lo).max(f32::EPSILON);
    let step = width / samples.len() as f32;
    let color = if highlight { HIGHLIGHT } else { NORMAL };

    for (i, &v) in samples.iter().enumerate() {
        let x = i as f32 * step;
        let y = height - (v - lo) / span * height;
        match style {
            PlotStyle::Bars => {
                let gap = (step * 0.15).min(2.0);
                w.push_rect(x + gap, y, (step - 2.0 * gap).max(1.0), height - y, color);
            }
            PlotStyle::Line => {
                let top = (y - LINE_WIDTH / 2.0).clamp(0.0, height - LINE_WIDTH);
                w.push_rect(x, top, step.max(1.0), LINE_WIDTH, color);
            }
        }
    }
    w
}

/// Offscreen color target plus the bind group that samples it.
struct Canvas {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sample_group: wgpu::BindGroup,
    uniforms: wgpu::BindGroup,
    size: (u32, u32),
}

impl Canvas {
    fn new(gpu: &GpuDevice, (width, height): (u32, u32)) -> Self {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("plot_canvas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: gpu.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sample_group = gpu.pipelines.texture_bind_group(
            &gpu.device,
            &view,
            &gpu.pipelines.linear_sampler,
            "plot_canvas_bind_group",
        );
        let (_buffer, uniforms) = gpu.offscreen_uniforms(width, height);
        Self {
            texture,
            view,
            sample_group,
            uniforms,
            size: (width, height),
        }
    }

    /// Draw `instances` into the canvas and submit immediately.
    fn draw(&self, gpu: &GpuDevice, instances: &InstanceWriter) {
        let mut batch = InstanceBatch::new("plot_instances");
        batch.upload(&gpu.device, &gpu.queue, instances);

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("plot_encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("plot_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&gpu.pipelines.quad);
            pass.set_bind_group(0, &self.uniforms, &[]);
            batch.draw(&mut pass);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        batch.release();
    }
}

pub struct PlotWidget {
    style: PlotStyle,
    params: WidgetParams,
    payload: String,
    gpu: GpuDevice,
    samples: Vec<f32>,
    highlight: bool,
    /// The canvas must be redrawn before the next render.
    stale: bool,
    canvas: Option<Canvas>,
    quad: InstanceBatch,
    placed: Option<PixelRect>,
    disposed: bool,
}

impl PlotWidget {
    fn new(style: PlotStyle, params: WidgetParams, payload: &str, gpu: GpuDevice) -> Self {
        Self {
            style,
            params,
            payload: payload.to_owned(),
            gpu,
            samples: Vec::new(),
            highlight: false,
            stale: true,
            canvas: None,
            quad: InstanceBatch::new("plot_quad"),
            placed: None,
            disposed: false,
        }
    }
}

impl Widget<WgpuBackend> for PlotWidget {
    fn name(&self) -> &str {
        NAME
    }

    fn payload(&self) -> &str {
        &self.payload
    }

    fn init(&mut self) -> Result<(), WidgetError> {
        self.samples = parse_samples(&self.payload)?;
        Ok(())
    }

    fn prepare_frame(&mut self, gpu: &GpuDevice, ctx: &FrameContext) -> Result<(), WidgetError> {
        if self.disposed {
            return Err(WidgetError::Disposed(NAME.to_owned()));
        }
        let rect = ctx.place(&self.params, DEFAULT_CELLS);
        let extent = pixel_extent(&rect);
        let limit = gpu.device.limits().max_texture_dimension_2d;
        if extent.0 > limit || extent.1 > limit {
            return Err(WidgetError::Gpu(format!(
                "plot of {}x{} px exceeds the {limit} px texture limit",
                extent.0, extent.1
            )));
        }

        if self.canvas.as_ref().is_none_or(|c| c.size != extent) {
            if let Some(old) = self.canvas.take() {
                old.texture.destroy();
            }
            self.canvas = Some(Canvas::new(gpu, extent));
            self.stale = true;
        }
        if self.stale
            && let Some(canvas) = &self.canvas
        {
            let instances = plot_instances(
                &self.samples,
                self.style,
                extent.0 as f32,
                extent.1 as f32,
                self.highlight,
            );
            canvas.draw(gpu, &instances);
            self.stale = false;
        }

        if self.placed != Some(rect) {
            let mut writer = InstanceWriter::new();
            writer.push_image(rect.x, rect.y, rect.width, rect.height, [1.0; 4]);
            self.quad.upload(&gpu.device, &gpu.queue, &writer);
            self.placed = Some(rect);
        }
        Ok(())
    }

    fn render(&mut self, pass: &mut wgpu::RenderPass<'_>, _ctx: &FrameContext) {
        let Some(canvas) = &self.canvas else {
            return;
        };
        pass.set_pipeline(&self.gpu.pipelines.image);
        pass.set_bind_group(0, &*self.gpu.surface_uniforms, &[]);
        pass.set_bind_group(1, &canvas.sample_group, &[]);
        self.quad.draw(pass);
    }

    fn wants_mouse(&self) -> bool {
        !self.disposed
    }

    /// Only the drawn rectangle is interactive; the rest of the surface
    /// belongs to the terminal.
    fn hit_test(&self, x: f32, y: f32) -> bool {
        self.placed.is_some_and(|r| r.contains(x, y))
    }

    fn on_mouse(&mut self, input: &MouseInput) {
        if self.hit_test(input.x, input.y) && input.kind == MouseKind::Press(MouseButton::Left) {
            self.highlight = !self.highlight;
            self.stale = true;
            log::debug!("plot: highlight {}", if self.highlight { "on" } else { "off" });
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(canvas) = self.canvas.take() {
            canvas.texture.destroy();
        }
        self.quad.release();
        self.placed = None;
    }
}
