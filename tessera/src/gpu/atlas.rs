//! Single-page glyph atlas.
//!
//! Glyph coverage bitmaps are packed into one `R8Unorm` texture with a
//! guillotine best-short-side-fit packer. When the page fills up the whole
//! atlas is cleared and `generation` advances so callers can rebuild.

use std::collections::HashMap;

use crate::font::GlyphBitmap;

/// Atlas page size in pixels (width = height).
pub const PAGE_SIZE: u32 = 1024;

/// Empty pixels kept between neighbouring glyphs to stop sampling bleed.
const GUTTER: u32 = 1;

/// Cache key: character plus bold flag.
pub type GlyphKey = (char, bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Guillotine rectangle packer, best-short-side-fit.
#[derive(Debug)]
pub(crate) struct RectPacker {
    width: u32,
    height: u32,
    free: Vec<Rect>,
}

impl RectPacker {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        let mut packer = Self {
            width,
            height,
            free: Vec::new(),
        };
        packer.reset();
        packer
    }

    pub(crate) fn reset(&mut self) {
        self.free.clear();
        self.free.push(Rect {
            x: 0,
            y: 0,
            w: self.width,
            h: self.height,
        });
    }

    /// Top-left of a free `w` x `h` area, or `None` when nothing fits.
    pub(crate) fn pack(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        let (idx, r) = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, r)| r.w >= w && r.h >= h)
            .min_by_key(|(_, r)| {
                let (dw, dh) = (r.w - w, r.h - h);
                (dw.min(dh), dw.max(dh))
            })
            .map(|(i, r)| (i, *r))?;

        self.free.swap_remove(idx);
        let (dw, dh) = (r.w - w, r.h - h);
        // Split along the shorter leftover axis.
        let (right, below) = if dw < dh {
            (
                Rect { x: r.x + w, y: r.y, w: dw, h },
                Rect { x: r.x, y: r.y + h, w: r.w, h: dh },
            )
        } else {
            (
                Rect { x: r.x + w, y: r.y, w: dw, h: r.h },
                Rect { x: r.x, y: r.y + h, w, h: dh },
            )
        };
        self.free.extend([right, below].into_iter().filter(|r| r.w > 0 && r.h > 0));
        Some((r.x, r.y))
    }
}

/// Location and placement of a cached glyph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtlasEntry {
    pub uv_pos: [f32; 2],
    pub uv_size: [f32; 2],
    pub width: u32,
    pub height: u32,
    /// Offset from the pen position to the bitmap's left edge.
    pub left: i32,
    /// Distance from the baseline up to the bitmap's top edge.
    pub top: i32,
}

impl AtlasEntry {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

pub struct GlyphAtlas {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    packer: RectPacker,
    entries: HashMap<GlyphKey, AtlasEntry>,
    generation: u64,
}

impl GlyphAtlas {
    pub fn new(device: &wgpu::Device) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glyph_atlas"),
            size: wgpu::Extent3d {
                width: PAGE_SIZE,
                height: PAGE_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            packer: RectPacker::new(PAGE_SIZE, PAGE_SIZE),
            entries: HashMap::new(),
            generation: 0,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Bumped whenever previously returned entries become invalid.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cached entry for `key`, rasterizing and uploading on a miss.
    ///
    /// Glyphs the rasterizer rejects are cached as empty entries so they
    /// are not retried every frame.
    pub fn get_or_insert(
        &mut self,
        queue: &wgpu::Queue,
        key: GlyphKey,
        rasterize: impl FnOnce() -> Option<GlyphBitmap>,
    ) -> AtlasEntry {
        if let Some(entry) = self.entries.get(&key) {
            return *entry;
        }
        let entry = match rasterize() {
            Some(bitmap) => self.upload(queue, &bitmap),
            None => empty_entry(),
        };
        self.entries.insert(key, entry);
        entry
    }

    fn upload(&mut self, queue: &wgpu::Queue, bitmap: &GlyphBitmap) -> AtlasEntry {
        let (w, h) = (bitmap.width, bitmap.height);
        if w == 0 || h == 0 || w + GUTTER > PAGE_SIZE || h + GUTTER > PAGE_SIZE {
            return AtlasEntry {
                left: bitmap.left,
                top: bitmap.top,
                ..empty_entry()
            };
        }

        let slot = match self.packer.pack(w + GUTTER, h + GUTTER) {
            Some(slot) => slot,
            None => {
                log::debug!("atlas: page full after {} glyphs, clearing", self.entries.len());
                self.clear();
                match self.packer.pack(w + GUTTER, h + GUTTER) {
                    Some(slot) => slot,
                    None => return empty_entry(),
                }
            }
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: slot.0,
                    y: slot.1,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            &bitmap.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );

        let page = PAGE_SIZE as f32;
        AtlasEntry {
            uv_pos: [slot.0 as f32 / page, slot.1 as f32 / page],
            uv_size: [w as f32 / page, h as f32 / page],
            width: w,
            height: h,
            left: bitmap.left,
            top: bitmap.top,
        }
    }

    pub fn clear(&mut self) {
        self.packer.reset();
        self.entries.clear();
        self.generation += 1;
    }
}

fn empty_entry() -> AtlasEntry {
    AtlasEntry {
        uv_pos: [0.0; 2],
        uv_size: [0.0; 2],
        width: 0,
        height: 0,
        left: 0,
        top: 0,
    }
}
