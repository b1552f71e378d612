//! The terminal grid as a widget.
//!
//! Rows are cached as instance bytes and rebuilt only when the grid marks
//! them dirty. `prepare_frame` rebuilds and uploads; `render` only binds
//! and draws.

use std::cell::RefCell;
use std::rc::Rc;

use tessera_core::cell::{Cell, CellFlags, Rgb};
use tessera_core::index::Line;
use tessera_core::{CursorState, FontMetrics, FrameContext, Terminal, Widget, WidgetError};

use crate::font::Font;
use crate::gpu::atlas::{AtlasEntry, GlyphAtlas};
use crate::gpu::instance_writer::{InstanceBatch, InstanceWriter};
use crate::gpu::{GpuDevice, WgpuBackend, rgba};

/// Alpha of the block cursor drawn under the glyph.
const CURSOR_ALPHA: f32 = 0.6;

/// Stand-in for a glyph when no font is available.
const MISSING_GLYPH_ALPHA: f32 = 0.5;

/// Cached instances for one grid row.
#[derive(Debug, Default)]
pub(crate) struct RowInstances {
    pub(crate) backgrounds: InstanceWriter,
    pub(crate) glyphs: InstanceWriter,
    /// Underlines, strikethrough and missing-glyph boxes, drawn after glyphs.
    pub(crate) decorations: InstanceWriter,
}

/// Pixel geometry shared by every cell.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CellGeometry {
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) baseline: f32,
}

impl CellGeometry {
    pub(crate) fn from_metrics(metrics: FontMetrics, baseline: f32) -> Self {
        Self {
            width: metrics.cell_width,
            height: metrics.cell_height,
            baseline,
        }
    }
}

/// Rebuild `out` for one row. `glyph` resolves a character and bold flag
/// to an atlas entry; `None` means no font is loaded.
pub(crate) fn build_row(
    out: &mut RowInstances,
    cells: &[Cell],
    line: usize,
    geom: CellGeometry,
    default_bg: Rgb,
    glyph: &mut dyn FnMut(char, bool) -> Option<AtlasEntry>,
) {
    out.backgrounds.clear();
    out.glyphs.clear();
    out.decorations.clear();

    let y = line as f32 * geom.height;
    for (col, cell) in cells.iter().enumerate() {
        if cell.flags.contains(CellFlags::WIDE_CHAR_SPACER) {
            continue;
        }
        let x = col as f32 * geom.width;
        let w = geom.width * cell.width() as f32;

        if cell.bg != default_bg {
            out.backgrounds.push_rect(x, y, w, geom.height, rgba(cell.bg, 1.0));
        }

        let fg = rgba(cell.fg, 1.0);
        if cell.ch != ' ' && !cell.flags.contains(CellFlags::HIDDEN) {
            match glyph(cell.ch, cell.flags.contains(CellFlags::BOLD)) {
                Some(entry) if !entry.is_empty() => out.glyphs.push_glyph(
                    [x + entry.left as f32, y + geom.baseline - entry.top as f32],
                    [entry.width as f32, entry.height as f32],
                    entry.uv_pos,
                    entry.uv_size,
                    fg,
                ),
                Some(_) => {}
                None => {
                    let inset = (geom.width * 0.15).max(1.0);
                    out.decorations.push_rect(
                        x + inset,
                        y + inset,
                        w - 2.0 * inset,
                        geom.height - 2.0 * inset,
                        [fg[0], fg[1], fg[2], MISSING_GLYPH_ALPHA],
                    );
                }
            }
        }

        let thickness = (geom.height / 14.0).max(1.0);
        if cell.flags.intersects(CellFlags::ANY_UNDERLINE) {
            let uy = (y + geom.baseline + thickness).min(y + geom.height - thickness);
            out.decorations.push_rect(x, uy, w, thickness, fg);
        }
        if cell.flags.contains(CellFlags::STRIKETHROUGH) {
            let sy = y + geom.height / 2.0;
            out.decorations.push_rect(x, sy, w, thickness, fg);
        }
    }
}

/// Draws the terminal grid and cursor.
pub struct TerminalView {
    terminal: Rc<RefCell<Terminal>>,
    gpu: GpuDevice,
    font: Option<Font>,
    atlas: Option<GlyphAtlas>,
    atlas_bind_group: Option<wgpu::BindGroup>,
    atlas_generation: u64,
    rows: Vec<RowInstances>,
    backgrounds: InstanceBatch,
    glyphs: InstanceBatch,
    decorations: InstanceBatch,
    cursor: InstanceBatch,
    last_cursor: Option<CursorState>,
    default_bg: Rgb,
    cursor_color: Rgb,
    disposed: bool,
}

impl TerminalView {
    pub fn new(
        terminal: Rc<RefCell<Terminal>>,
        gpu: GpuDevice,
        font: Option<Font>,
        default_bg: Rgb,
        cursor_color: Rgb,
    ) -> Self {
        Self {
            terminal,
            gpu,
            font,
            atlas: None,
            atlas_bind_group: None,
            atlas_generation: 0,
            rows: Vec::new(),
            backgrounds: InstanceBatch::new("terminal_backgrounds"),
            glyphs: InstanceBatch::new("terminal_glyphs"),
            decorations: InstanceBatch::new("terminal_decorations"),
            cursor: InstanceBatch::new("terminal_cursor"),
            last_cursor: None,
            default_bg,
            cursor_color,
            disposed: false,
        }
    }

    fn geometry(&self, metrics: FontMetrics) -> CellGeometry {
        let baseline = self
            .font
            .as_ref()
            .map_or(metrics.cell_height * 0.8, Font::baseline);
        CellGeometry::from_metrics(metrics, baseline)
    }

    fn upload_rows(&mut self, gpu: &GpuDevice) {
        let mut bg = InstanceWriter::new();
        let mut fg = InstanceWriter::new();
        let mut deco = InstanceWriter::new();
        for row in &self.rows {
            bg.append(&row.backgrounds);
            fg.append(&row.glyphs);
            deco.append(&row.decorations);
        }
        self.backgrounds.upload(&gpu.device, &gpu.queue, &bg);
        self.glyphs.upload(&gpu.device, &gpu.queue, &fg);
        self.decorations.upload(&gpu.device, &gpu.queue, &deco);
    }

    fn upload_cursor(&mut self, gpu: &GpuDevice, cursor: CursorState, geom: CellGeometry) {
        let mut writer = InstanceWriter::new();
        if cursor.visible {
            writer.push_rect(
                cursor.column().0 as f32 * geom.width,
                cursor.line().0 as f32 * geom.height,
                geom.width,
                geom.height,
                rgba(self.cursor_color, CURSOR_ALPHA),
            );
        }
        self.cursor.upload(&gpu.device, &gpu.queue, &writer);
    }
}

impl Widget<WgpuBackend> for TerminalView {
    fn name(&self) -> &str {
        "terminal"
    }

    fn payload(&self) -> &str {
        ""
    }

    fn init(&mut self) -> Result<(), WidgetError> {
        if self.font.is_none() {
            log::warn!("terminal view: no font, drawing placeholder boxes");
        }
        let atlas = GlyphAtlas::new(&self.gpu.device);
        self.atlas_bind_group = Some(self.gpu.pipelines.texture_bind_group(
            &self.gpu.device,
            atlas.view(),
            &self.gpu.pipelines.nearest_sampler,
            "glyph_atlas_bind_group",
        ));
        self.atlas_generation = atlas.generation();
        self.atlas = Some(atlas);
        Ok(())
    }

    fn prepare_frame(&mut self, gpu: &GpuDevice, ctx: &FrameContext) -> Result<(), WidgetError> {
        if self.disposed {
            return Err(WidgetError::Disposed(self.name().to_owned()));
        }
        let geom = self.geometry(ctx.metrics);
        let terminal = Rc::clone(&self.terminal);
        let mut term = terminal.borrow_mut();

        let lines = term.grid().lines();
        if self.rows.len() != lines {
            self.rows.resize_with(lines, RowInstances::default);
            term.grid_mut().mark_all_dirty();
        }

        let dirty: Vec<usize> = term.grid_mut().drain_dirty().collect();
        if !dirty.is_empty() {
            let grid = term.grid();
            let Self {
                rows,
                font,
                atlas,
                default_bg,
                ..
            } = self;
            for line in dirty {
                let mut lookup = |ch: char, bold: bool| -> Option<AtlasEntry> {
                    let font = font.as_mut()?;
                    let atlas = atlas.as_mut()?;
                    Some(atlas.get_or_insert(&gpu.queue, (ch, bold), || font.rasterize(ch, bold)))
                };
                build_row(&mut rows[line], grid[Line(line)].cells(), line, geom, *default_bg, &mut lookup);
            }
            self.upload_rows(gpu);

            // The atlas cleared mid-rebuild: earlier rows hold stale UVs.
            if let Some(atlas) = &self.atlas
                && atlas.generation() != self.atlas_generation
            {
                self.atlas_generation = atlas.generation();
                term.grid_mut().mark_all_dirty();
            }
        }

        let cursor = term.cursor();
        if self.last_cursor != Some(cursor) {
            self.last_cursor = Some(cursor);
            self.upload_cursor(gpu, cursor, geom);
        }
        Ok(())
    }

    fn render(&mut self, pass: &mut wgpu::RenderPass<'_>, _ctx: &FrameContext) {
        let pipelines = &self.gpu.pipelines;
        pass.set_bind_group(0, &*self.gpu.surface_uniforms, &[]);

        pass.set_pipeline(&pipelines.quad);
        self.backgrounds.draw(pass);
        self.cursor.draw(pass);

        if let Some(bind_group) = &self.atlas_bind_group
            && self.glyphs.count() > 0
        {
            pass.set_pipeline(&pipelines.glyph);
            pass.set_bind_group(1, bind_group, &[]);
            self.glyphs.draw(pass);
        }

        if self.decorations.count() > 0 {
            pass.set_pipeline(&pipelines.quad);
            self.decorations.draw(pass);
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.backgrounds.release();
        self.glyphs.release();
        self.decorations.release();
        self.cursor.release();
        self.atlas_bind_group = None;
        self.atlas = None;
        self.rows.clear();
        log::debug!("terminal view disposed");
    }
}

#[cfg(test)]
mod tests;
