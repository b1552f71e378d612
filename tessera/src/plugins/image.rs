//! Inline PNG images.
//!
//! The payload is a base64 PNG. Decoding and the device texture size check
//! happen in `init`, so a bad or oversized payload fails construction. The texture is created and filled on the first
//! `prepare_frame`; the decoded pixels are dropped once uploaded.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use tessera_core::{
    FrameContext, PixelRect, Plugin, PluginContext, PluginMeta, Widget, WidgetError,
    WidgetHandle, WidgetParams,
};

use crate::gpu::instance_writer::{InstanceBatch, InstanceWriter};
use crate::gpu::{GpuDevice, WgpuBackend};

pub const NAME: &str = "image";

pub struct ImagePlugin {
    meta: PluginMeta,
}

impl ImagePlugin {
    pub fn new() -> Self {
        Self {
            meta: PluginMeta::new(NAME, env!("CARGO_PKG_VERSION"), "tessera", "Base64 PNG images"),
        }
    }
}

impl Default for ImagePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin<WgpuBackend> for ImagePlugin {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn widget_kinds(&self) -> &[&'static str] {
        &["png"]
    }

    fn create_widget(
        &mut self,
        _kind: &str,
        params: WidgetParams,
        payload: &str,
        ctx: &PluginContext<WgpuBackend>,
    ) -> Result<WidgetHandle<WgpuBackend>, WidgetError> {
        tessera_core::widget::build(ImageWidget::new(params, payload, ctx.device.clone()))
    }
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Decoded {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) rgba: Vec<u8>,
}

pub(crate) fn decode_payload(payload: &str) -> Result<Decoded, WidgetError> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| WidgetError::Payload(format!("invalid base64: {e}")))?;
    let img = image::load_from_memory_with_format(&bytes, image::ImageFormat::Png)
        .map_err(|e| WidgetError::Payload(format!("invalid PNG: {e}")))?
        .to_rgba8();
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(WidgetError::Payload("empty image".to_owned()));
    }
    Ok(Decoded {
        width,
        height,
        rgba: img.into_raw(),
    })
}

/// Reject images the device cannot hold in one texture.
pub(crate) fn check_texture_size(decoded: &Decoded, limit: u32) -> Result<(), WidgetError> {
    if decoded.width > limit || decoded.height > limit {
        return Err(WidgetError::Payload(format!(
            "{}x{} image exceeds the {limit} px texture limit",
            decoded.width, decoded.height
        )));
    }
    Ok(())
}

/// Natural size in cells: pixel size divided by cell size, rounded up.
pub(crate) fn natural_cells(width: u32, height: u32, cell_w: f32, cell_h: f32) -> (u32, u32) {
    let cols = (width as f32 / cell_w.max(1.0)).ceil().max(1.0) as u32;
    let lines = (height as f32 / cell_h.max(1.0)).ceil().max(1.0) as u32;
    (cols, lines)
}

struct Uploaded {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

pub struct ImageWidget {
    params: WidgetParams,
    payload: String,
    gpu: GpuDevice,
    pending: Option<Decoded>,
    uploaded: Option<Uploaded>,
    quad: InstanceBatch,
    placed: Option<PixelRect>,
    disposed: bool,
}

impl ImageWidget {
    fn new(params: WidgetParams, payload: &str, gpu: GpuDevice) -> Self {
        Self {
            params,
            payload: payload.to_owned(),
            gpu,
            pending: None,
            uploaded: None,
            quad: InstanceBatch::new("image_quad"),
            placed: None,
            disposed: false,
        }
    }

    fn upload(gpu: &GpuDevice, decoded: &Decoded) -> Uploaded {
        let size = wgpu::Extent3d {
            width: decoded.width,
            height: decoded.height,
            depth_or_array_layers: 1,
        };
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("image_widget"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &decoded.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * decoded.width),
                rows_per_image: Some(decoded.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = gpu.pipelines.texture_bind_group(
            &gpu.device,
            &view,
            &gpu.pipelines.linear_sampler,
            "image_bind_group",
        );
        Uploaded {
            texture,
            bind_group,
            size: (decoded.width, decoded.height),
        }
    }
}

impl Widget<WgpuBackend> for ImageWidget {
    fn name(&self) -> &str {
        NAME
    }

    fn payload(&self) -> &str {
        &self.payload
    }

    fn init(&mut self) -> Result<(), WidgetError> {
        let decoded = decode_payload(&self.payload)?;
        check_texture_size(&decoded, self.gpu.device.limits().max_texture_dimension_2d)?;
        log::debug!("image: decoded {}x{}", decoded.width, decoded.height);
        self.pending = Some(decoded);
        Ok(())
    }

    fn prepare_frame(&mut self, gpu: &GpuDevice, ctx: &FrameContext) -> Result<(), WidgetError> {
        if let Some(decoded) = self.pending.take() {
            self.uploaded = Some(Self::upload(gpu, &decoded));
        }
        let Some(uploaded) = &self.uploaded else {
            return Err(WidgetError::Gpu("image texture unavailable".to_owned()));
        };

        let fallback = natural_cells(
            uploaded.size.0,
            uploaded.size.1,
            ctx.metrics.cell_width,
            ctx.metrics.cell_height,
        );
        let rect = ctx.place(&self.params, fallback);
        if self.placed != Some(rect) {
            let mut writer = InstanceWriter::new();
            writer.push_image(rect.x, rect.y, rect.width, rect.height, [1.0; 4]);
            self.quad.upload(&gpu.device, &gpu.queue, &writer);
            self.placed = Some(rect);
        }
        Ok(())
    }

    fn render(&mut self, pass: &mut wgpu::RenderPass<'_>, _ctx: &FrameContext) {
        let Some(uploaded) = &self.uploaded else {
            return;
        };
        pass.set_pipeline(&self.gpu.pipelines.image);
        pass.set_bind_group(0, &*self.gpu.surface_uniforms, &[]);
        pass.set_bind_group(1, &uploaded.bind_group, &[]);
        self.quad.draw(pass);
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.pending = None;
        if let Some(uploaded) = self.uploaded.take() {
            uploaded.texture.destroy();
        }
        self.quad.release();
    }
}
