//! Instance byte buffers and their GPU-side batches.

use super::pipeline::INSTANCE_STRIDE;

/// Reuse an existing GPU buffer if it has enough capacity, otherwise create a new one.
pub(crate) fn reuse_or_create_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    existing: Option<wgpu::Buffer>,
    data: &[u8],
    label: &str,
) -> wgpu::Buffer {
    let needed = (data.len() as u64).max(INSTANCE_STRIDE);
    if let Some(buf) = existing.filter(|b| b.size() >= needed) {
        if !data.is_empty() {
            queue.write_buffer(&buf, 0, data);
        }
        return buf;
    }
    let buf = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: needed,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    if !data.is_empty() {
        queue.write_buffer(&buf, 0, data);
    }
    buf
}

/// Instance flag: quad samples a texture.
pub(crate) const FLAG_TEXTURED: u32 = 1;

/// Writes quad instances to a byte buffer without unsafe code.
#[derive(Debug, Default)]
pub(crate) struct InstanceWriter {
    data: Vec<u8>,
}

impl InstanceWriter {
    pub(crate) fn new() -> Self {
        Self {
            data: Vec::with_capacity(4096),
        }
    }

    /// Solid rectangle.
    pub(crate) fn push_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: [f32; 4]) {
        let fill = premultiply(color);
        self.push_raw([x, y], [w, h], [0.0; 2], [0.0; 2], [0.0; 4], fill, 0);
    }

    /// Glyph quad sampling the atlas, tinted with `fg`.
    pub(crate) fn push_glyph(
        &mut self,
        pos: [f32; 2],
        size: [f32; 2],
        uv_pos: [f32; 2],
        uv_size: [f32; 2],
        fg: [f32; 4],
    ) {
        self.push_raw(pos, size, uv_pos, uv_size, fg, [0.0; 4], FLAG_TEXTURED);
    }

    /// Full-texture quad, modulated by `tint`.
    pub(crate) fn push_image(&mut self, x: f32, y: f32, w: f32, h: f32, tint: [f32; 4]) {
        self.push_raw([x, y], [w, h], [0.0; 2], [1.0; 2], tint, [0.0; 4], FLAG_TEXTURED);
    }

    #[expect(clippy::too_many_arguments, reason = "Maps 1:1 to the GPU instance struct layout")]
    fn push_raw(
        &mut self,
        pos: [f32; 2],
        size: [f32; 2],
        uv_pos: [f32; 2],
        uv_size: [f32; 2],
        fg: [f32; 4],
        bg: [f32; 4],
        flags: u32,
    ) {
        let floats = pos.iter().chain(&size).chain(&uv_pos).chain(&uv_size).chain(&fg).chain(&bg);
        for v in floats {
            self.data.extend_from_slice(&v.to_ne_bytes());
        }
        self.data.extend_from_slice(&flags.to_ne_bytes());
        // 12 bytes padding to reach the 80-byte stride
        self.data.extend_from_slice(&[0u8; 12]);
    }

    /// Append every instance of `other`.
    pub(crate) fn append(&mut self, other: &Self) {
        self.data.extend_from_slice(&other.data);
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
    }

    pub(crate) fn count(&self) -> u32 {
        (self.data.len() / INSTANCE_STRIDE as usize) as u32
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

fn premultiply(c: [f32; 4]) -> [f32; 4] {
    [c[0] * c[3], c[1] * c[3], c[2] * c[3], c[3]]
}

/// Uploaded instances plus their count, kept across frames.
#[derive(Debug, Default)]
pub(crate) struct InstanceBatch {
    buffer: Option<wgpu::Buffer>,
    count: u32,
    label: &'static str,
}

impl InstanceBatch {
    pub(crate) fn new(label: &'static str) -> Self {
        Self {
            buffer: None,
            count: 0,
            label,
        }
    }

    /// Upload `writer`'s instances, growing the buffer when needed.
    pub(crate) fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, writer: &InstanceWriter) {
        self.count = writer.count();
        if writer.is_empty() {
            return;
        }
        let existing = self.buffer.take();
        self.buffer = Some(reuse_or_create_buffer(
            device,
            queue,
            existing,
            writer.as_bytes(),
            self.label,
        ));
    }

    /// Record the draw. Bind groups must already be set.
    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if let Some(buf) = &self.buffer
            && self.count > 0
        {
            pass.set_vertex_buffer(0, buf.slice(..));
            pass.draw(0..4, 0..self.count);
        }
    }

    pub(crate) fn count(&self) -> u32 {
        self.count
    }

    /// Drop the GPU buffer.
    pub(crate) fn release(&mut self) {
        if let Some(buf) = self.buffer.take() {
            buf.destroy();
        }
        self.count = 0;
    }
}

#[cfg(test)]
mod tests;
