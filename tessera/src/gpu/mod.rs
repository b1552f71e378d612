//! wgpu implementation of the core's graphics backend.
//!
//! [`WgpuBackend`] owns the window surface. Widgets receive a cloneable
//! [`GpuDevice`] carrying the device, queue, shared pipelines and the
//! surface-space uniform bind group, and draw into a `wgpu::RenderPass`.

pub mod atlas;
pub mod instance_writer;
pub mod pipeline;

use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;
use winit::window::Window;

use tessera_core::cell::Rgb;
use tessera_core::{GpuBackend, SurfaceSize};

use pipeline::{Pipelines, UNIFORM_SIZE, uniform_bytes};

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("failed to create surface")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoFormat,
    #[error("surface error")]
    Frame(#[source] wgpu::SurfaceError),
}

/// Handle shared by every widget. Cloning is cheap.
#[derive(Clone)]
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub pipelines: Rc<Pipelines>,
    /// Surface-space projection, rewritten at the start of every frame.
    pub surface_uniforms: Rc<wgpu::BindGroup>,
}

impl GpuDevice {
    /// A uniform buffer and bind group for an offscreen target.
    pub fn offscreen_uniforms(&self, width: u32, height: u32) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen_uniforms"),
            size: UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue
            .write_buffer(&buffer, 0, &uniform_bytes(width as f32, height as f32));
        let bind_group = self.pipelines.uniform_bind_group(&self.device, &buffer);
        (buffer, bind_group)
    }
}

/// An acquired surface texture and the frame's command encoder.
pub struct WgpuFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    gpu: GpuDevice,
    uniform_buffer: wgpu::Buffer,
    clear_color: wgpu::Color,
}

impl WgpuBackend {
    /// Create instance, surface, adapter, device and pipelines for `window`.
    pub fn new(window: Arc<Window>, background: Rgb) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(Arc::clone(&window))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("tessera"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        }))?;

        let caps = surface.get_capabilities(&adapter);
        // Non-sRGB so palette colors pass through without a second gamma curve.
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(GpuError::NoFormat)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let pipelines = Rc::new(Pipelines::new(&device, format));
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("surface_uniforms"),
            size: UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(
            &uniform_buffer,
            0,
            &uniform_bytes(config.width as f32, config.height as f32),
        );
        let surface_uniforms = Rc::new(pipelines.uniform_bind_group(&device, &uniform_buffer));

        log::info!(
            "gpu: adapter={}, backend={:?}, format={format:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
        );

        Ok(Self {
            surface,
            config,
            gpu: GpuDevice {
                device,
                queue,
                format,
                pipelines,
                surface_uniforms,
            },
            uniform_buffer,
            clear_color: to_wgpu_color(background),
        })
    }

    fn reconfigure(&mut self, size: SurfaceSize) {
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.gpu.device, &self.config);
        self.gpu.queue.write_buffer(
            &self.uniform_buffer,
            0,
            &uniform_bytes(size.width as f32, size.height as f32),
        );
    }
}

impl GpuBackend for WgpuBackend {
    type Device = GpuDevice;
    type Frame = WgpuFrame;
    type Pass<'p> = wgpu::RenderPass<'p>;
    type Error = GpuError;

    fn device(&self) -> &GpuDevice {
        &self.gpu
    }

    fn begin_frame(&mut self, size: SurfaceSize) -> Result<Option<WgpuFrame>, GpuError> {
        if size.is_empty() {
            return Ok(None);
        }
        if size.width != self.config.width || size.height != self.config.height {
            self.reconfigure(size);
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("gpu: surface lost, reconfiguring");
                self.reconfigure(size);
                return Ok(None);
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(None),
            Err(e) => return Err(GpuError::Frame(e)),
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        Ok(Some(WgpuFrame {
            surface_texture,
            view,
            encoder,
        }))
    }

    fn encode_pass(&mut self, frame: &mut WgpuFrame, draw: &mut dyn FnMut(&mut wgpu::RenderPass<'_>)) {
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("shared_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        draw(&mut pass);
    }

    fn present(&mut self, frame: WgpuFrame) {
        self.gpu.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }
}

/// Convert an RGB color to normalized RGBA floats.
pub fn rgba(c: Rgb, alpha: f32) -> [f32; 4] {
    [
        f32::from(c.r) / 255.0,
        f32::from(c.g) / 255.0,
        f32::from(c.b) / 255.0,
        alpha,
    ]
}

fn to_wgpu_color(c: Rgb) -> wgpu::Color {
    let [r, g, b, a] = rgba(c, 1.0);
    wgpu::Color {
        r: f64::from(r),
        g: f64::from(g),
        b: f64::from(b),
        a: f64::from(a),
    }
}
