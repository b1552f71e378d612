//! Render pipelines shared by every widget.
//!
//! All three pipelines draw instanced quads from the same 80-byte record,
//! so a widget can batch rects, glyphs and images with one writer.

/// Instance data stride in bytes.
///
/// Layout:
///   [0..8]   pos:      vec2<f32>  (pixel position)
///   [8..16]  size:     vec2<f32>  (pixel size)
///   [16..24] `uv_pos`:   vec2<f32>  (texture UV top-left)
///   [24..32] `uv_size`:  vec2<f32>  (texture UV size)
///   [32..48] `fg_color`: vec4<f32>  (glyph tint / image tint)
///   [48..64] `bg_color`: vec4<f32>  (quad fill)
///   [64..68] flags:    u32
///   [68..80] _pad:     12 bytes
pub const INSTANCE_STRIDE: u64 = 80;

/// Size of the uniform block: projection plus viewport and padding.
pub const UNIFORM_SIZE: u64 = 80;

const INSTANCE_ATTRS: [wgpu::VertexAttribute; 7] = [
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 0,
        shader_location: 0,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 8,
        shader_location: 1,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 16,
        shader_location: 2,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 24,
        shader_location: 3,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x4,
        offset: 32,
        shader_location: 4,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x4,
        offset: 48,
        shader_location: 5,
    },
    wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Uint32,
        offset: 64,
        shader_location: 6,
    },
];

pub fn instance_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: INSTANCE_STRIDE,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRS,
    }
}

// --- WGSL ---

const COMMON_SRC: &str = "
struct Uniforms {
    projection: mat4x4<f32>,
    viewport: vec2<f32>,
    _pad: vec2<f32>,
}

@group(0) @binding(0) var<uniform> uniforms: Uniforms;

struct QuadInput {
    @location(0) pos: vec2<f32>,
    @location(1) size: vec2<f32>,
    @location(2) uv_pos: vec2<f32>,
    @location(3) uv_size: vec2<f32>,
    @location(4) fg_color: vec4<f32>,
    @location(5) bg_color: vec4<f32>,
    @location(6) flags: u32,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) fg_color: vec4<f32>,
    @location(2) bg_color: vec4<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vi: u32, input: QuadInput) -> VertexOutput {
    let corner = vec2<f32>(f32(vi & 1u), f32((vi >> 1u) & 1u));
    let pixel_pos = input.pos + input.size * corner;

    var out: VertexOutput;
    out.position = uniforms.projection * vec4<f32>(pixel_pos, 0.0, 1.0);
    out.uv = input.uv_pos + input.uv_size * corner;
    out.fg_color = input.fg_color;
    out.bg_color = input.bg_color;
    return out;
}
";

const QUAD_FS_SRC: &str = "
@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return input.bg_color;
}
";

const TEXTURED_FS_SRC: &str = "
@group(1) @binding(0) var tex: texture_2d<f32>;
@group(1) @binding(1) var tex_sampler: sampler;

// Glyph atlas: coverage in the red channel, tinted by fg.
@fragment
fn fs_glyph(input: VertexOutput) -> @location(0) vec4<f32> {
    let a = textureSample(tex, tex_sampler, input.uv).r;
    let color = input.fg_color;
    return vec4<f32>(color.rgb * a, a) * color.a;
}

// Straight-alpha RGBA image, modulated by fg.
@fragment
fn fs_image(input: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(tex, tex_sampler, input.uv) * input.fg_color;
    return vec4<f32>(texel.rgb * texel.a, texel.a);
}
";

// --- Layouts ---

/// group(0) binding(0): projection + viewport.
pub fn create_uniform_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("uniform_bind_group_layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
            },
            count: None,
        }],
    })
}

/// group(1): texture at binding 0, sampler at binding 1.
pub fn create_texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("texture_bind_group_layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Column-major orthographic projection mapping pixels (origin top-left)
/// to clip space.
#[rustfmt::skip]
pub fn ortho_projection(width: f32, height: f32) -> [f32; 16] {
    let w = width.max(1.0);
    let h = height.max(1.0);
    [
        2.0 / w, 0.0, 0.0, 0.0,
        0.0, -2.0 / h, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        -1.0, 1.0, 0.0, 1.0,
    ]
}

/// Uniform block bytes for a target of `width` x `height` pixels.
pub fn uniform_bytes(width: f32, height: f32) -> Vec<u8> {
    let mut out = Vec::with_capacity(UNIFORM_SIZE as usize);
    for v in ortho_projection(width, height) {
        out.extend_from_slice(&v.to_ne_bytes());
    }
    for v in [width, height, 0.0, 0.0] {
        out.extend_from_slice(&v.to_ne_bytes());
    }
    out
}

/// Premultiplied-alpha blending, shared by all pipelines.
const PREMULTIPLIED: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    label: &str,
    shader: &wgpu::ShaderModule,
    fs_entry: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::RenderPipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[instance_buffer_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs_entry),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(PREMULTIPLIED),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

/// Pipelines, layouts and samplers created once per device.
pub struct Pipelines {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub quad: wgpu::RenderPipeline,
    pub glyph: wgpu::RenderPipeline,
    pub image: wgpu::RenderPipeline,
    pub nearest_sampler: wgpu::Sampler,
    pub linear_sampler: wgpu::Sampler,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat) -> Self {
        let uniform_layout = create_uniform_bind_group_layout(device);
        let texture_layout = create_texture_bind_group_layout(device);

        let quad_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quad_shader"),
            source: wgpu::ShaderSource::Wgsl(format!("{COMMON_SRC}{QUAD_FS_SRC}").into()),
        });
        let textured_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("textured_shader"),
            source: wgpu::ShaderSource::Wgsl(format!("{COMMON_SRC}{TEXTURED_FS_SRC}").into()),
        });

        let quad = create_pipeline(
            device,
            format,
            "quad_pipeline",
            &quad_shader,
            "fs_main",
            &[&uniform_layout],
        );
        let glyph = create_pipeline(
            device,
            format,
            "glyph_pipeline",
            &textured_shader,
            "fs_glyph",
            &[&uniform_layout, &texture_layout],
        );
        let image = create_pipeline(
            device,
            format,
            "image_pipeline",
            &textured_shader,
            "fs_image",
            &[&uniform_layout, &texture_layout],
        );

        let nearest_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("nearest_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            uniform_layout,
            texture_layout,
            quad,
            glyph,
            image,
            nearest_sampler,
            linear_sampler,
        }
    }

    /// Bind a uniform buffer created for `uniform_bytes`.
    pub fn uniform_bind_group(&self, device: &wgpu::Device, buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    pub fn texture_bind_group(
        &self,
        device: &wgpu::Device,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        label: &str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }
}
