//! Monospace font loading and glyph rasterization via swash.
//!
//! One regular face plus an optional bold face. Without a bold face, bold
//! cells are emboldened synthetically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::Format;
use swash::{CacheKey, FontRef};
use thiserror::Error;

use tessera_core::FontMetrics;

/// Stroke strength for synthetic bold.
const SYNTHETIC_BOLD: f32 = 0.6;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a usable font", path.display())]
    Invalid { path: PathBuf },
}

/// A rasterized glyph's coverage bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
    /// One coverage byte per pixel, row-major.
    pub data: Vec<u8>,
}

struct FaceData {
    bytes: Vec<u8>,
    offset: u32,
    key: CacheKey,
}

impl FaceData {
    fn load(path: &Path) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_bytes(bytes).ok_or_else(|| FontError::Invalid {
            path: path.to_owned(),
        })
    }

    fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        let fr = FontRef::from_index(&bytes, 0)?;
        let (offset, key) = (fr.offset, fr.key);
        Some(Self { bytes, offset, key })
    }

    fn font_ref(&self) -> FontRef<'_> {
        FontRef {
            data: &self.bytes,
            offset: self.offset,
            key: self.key,
        }
    }
}

pub struct Font {
    regular: FaceData,
    bold: Option<FaceData>,
    size: f32,
    scale_ctx: ScaleContext,
    cell_width: f32,
    cell_height: f32,
    baseline: f32,
}

impl Font {
    /// Load `regular` (and `bold` when given) at `size` pixels.
    pub fn load(regular: &Path, bold: Option<&Path>, size: f32) -> Result<Self, FontError> {
        let regular = FaceData::load(regular)?;
        let bold = match bold.map(FaceData::load).transpose() {
            Ok(face) => face,
            Err(e) => {
                log::warn!("font: bold face unusable, using synthetic bold: {e}");
                None
            }
        };

        let fr = regular.font_ref();
        let metrics = fr.metrics(&[]).scale(size);
        let advance = fr
            .glyph_metrics(&[])
            .scale(size)
            .advance_width(fr.charmap().map('M'));
        let (cell_width, cell_height, baseline) =
            cell_dimensions(metrics.ascent, metrics.descent, advance);

        Ok(Self {
            regular,
            bold,
            size,
            scale_ctx: ScaleContext::new(),
            cell_width,
            cell_height,
            baseline,
        })
    }

    /// Use the configured font, else the first known monospace font found
    /// on the system.
    pub fn discover(configured: Option<&Path>, size: f32) -> Option<Self> {
        if let Some(path) = configured {
            match Self::load(path, None, size) {
                Ok(font) => {
                    log::info!("font: loaded {}", path.display());
                    return Some(font);
                }
                Err(e) => log::warn!("font: {e}, searching system fonts"),
            }
        }
        let (regular, bold) = find_system_font()?;
        match Self::load(&regular, bold.as_deref(), size) {
            Ok(font) => {
                log::info!("font: using {}", regular.display());
                Some(font)
            }
            Err(e) => {
                log::warn!("font: {e}");
                None
            }
        }
    }

    pub fn metrics(&self) -> FontMetrics {
        FontMetrics::new(self.cell_width, self.cell_height)
    }

    /// Pixels from the cell top down to the baseline.
    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    /// Coverage bitmap for `ch`, or `None` when the font has no glyph.
    pub fn rasterize(&mut self, ch: char, bold: bool) -> Option<GlyphBitmap> {
        let (face, synthetic) = match (&self.bold, bold) {
            (Some(face), true) => (face, false),
            (None, true) => (&self.regular, true),
            (_, false) => (&self.regular, false),
        };
        let fr = face.font_ref();
        let glyph_id = fr.charmap().map(ch);
        if glyph_id == 0 {
            return None;
        }

        let mut scaler = self.scale_ctx.builder(fr).size(self.size).hint(true).build();
        let mut render = Render::new(&[Source::Outline]);
        render.format(Format::Alpha);
        if synthetic {
            render.embolden(SYNTHETIC_BOLD);
        }
        let image = render.render(&mut scaler, glyph_id)?;

        Some(GlyphBitmap {
            width: image.placement.width,
            height: image.placement.height,
            left: image.placement.left,
            top: image.placement.top,
            data: image.data,
        })
    }
}

/// Cell width, height and baseline from scaled font metrics, rounded up to
/// whole pixels.
pub(crate) fn cell_dimensions(ascent: f32, descent: f32, advance: f32) -> (f32, f32, f32) {
    let height = (ascent + descent.abs()).ceil().max(1.0);
    let width = advance.ceil().max(1.0);
    (width, height, ascent.ceil())
}

// --- Discovery ---

/// Regular/bold filename pairs, in preference order.
#[cfg(not(target_os = "windows"))]
const FAMILIES: &[(&str, &str)] = &[
    ("JetBrainsMono-Regular.ttf", "JetBrainsMono-Bold.ttf"),
    ("UbuntuMono-Regular.ttf", "UbuntuMono-Bold.ttf"),
    ("DejaVuSansMono.ttf", "DejaVuSansMono-Bold.ttf"),
    ("LiberationMono-Regular.ttf", "LiberationMono-Bold.ttf"),
    ("NotoSansMono-Regular.ttf", "NotoSansMono-Bold.ttf"),
];

#[cfg(target_os = "windows")]
const FAMILIES: &[(&str, &str)] = &[
    ("JetBrainsMono-Regular.ttf", "JetBrainsMono-Bold.ttf"),
    ("CascadiaMono.ttf", "CascadiaMono-Bold.ttf"),
    ("consola.ttf", "consolab.ttf"),
    ("cour.ttf", "courbd.ttf"),
];

fn font_dirs() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let root = std::env::var("WINDIR").unwrap_or_else(|_| r"C:\Windows".to_owned());
        vec![PathBuf::from(root).join("Fonts")]
    }
    #[cfg(not(target_os = "windows"))]
    {
        let mut dirs = Vec::new();
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(&home).join(".local/share/fonts"));
            dirs.push(PathBuf::from(home).join(".fonts"));
        }
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        dirs
    }
}

fn find_system_font() -> Option<(PathBuf, Option<PathBuf>)> {
    let mut index = HashMap::new();
    for dir in font_dirs() {
        index_font_dir(&dir, &mut index);
    }
    pick_family(&index, FAMILIES)
}

/// Recursively map file names to paths. The first path seen for a name wins.
pub(crate) fn index_font_dir(dir: &Path, index: &mut HashMap<String, PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            index_font_dir(&path, index);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            index.entry(name.to_owned()).or_insert_with(|| path.clone());
        }
    }
}

pub(crate) fn pick_family(
    index: &HashMap<String, PathBuf>,
    families: &[(&str, &str)],
) -> Option<(PathBuf, Option<PathBuf>)> {
    families.iter().find_map(|(regular, bold)| {
        let regular = index.get(*regular)?.clone();
        Some((regular, index.get(*bold).cloned()))
    })
}
