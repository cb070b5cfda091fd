//! Atlas generation: per-glyph colouring and rasterisation, grid packing and
//! the glyph table.

use astrelis_core::alloc::{HashMap, HashSet};
use astrelis_core::geometry::Rect;
use astrelis_core::profiling::{finish_generation, profile_function, profile_scope};
use serde::{Deserialize, Serialize};

use crate::coloring::{ColoringConfig, color_shape};
use crate::contour::Shape;
use crate::edge::Bounds;
use crate::error::{MsdfError, MsdfResult};
use crate::font::{Font, FontMetrics};
use crate::overlap::{OverlapReport, correct_overlaps};
use crate::rasterize::{AlphaMode, GlyphBitmap, GlyphLayout, rasterize_glyph};

/// Hard ceiling on either atlas dimension, in pixels.
pub const MAX_ATLAS_DIMENSION: u32 = 8192;

/// Atlas generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Pixels per em inside a cell.
    pub glyph_size: u32,
    /// Pixels of distance field around each glyph.
    pub padding: u32,
    /// Distance in pixels between the encoded values 0 and 1.
    pub range: f64,
    pub coloring: ColoringConfig,
    pub alpha: AlphaMode,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            glyph_size: 48,
            padding: 4,
            range: 4.0,
            coloring: ColoringConfig::default(),
            alpha: AlphaMode::Opaque,
        }
    }
}

impl AtlasConfig {
    pub fn new(glyph_size: u32, padding: u32, range: f64) -> Self {
        Self {
            glyph_size,
            padding,
            range,
            ..Default::default()
        }
    }

    pub fn with_glyph_size(mut self, glyph_size: u32) -> Self {
        self.glyph_size = glyph_size;
        self
    }

    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_range(mut self, range: f64) -> Self {
        self.range = range;
        self
    }

    pub fn with_coloring(mut self, coloring: ColoringConfig) -> Self {
        self.coloring = coloring;
        self
    }

    /// Shorthand for toggling overlap correction in the colouring config.
    pub fn with_correct_overlaps(mut self, correct: bool) -> Self {
        self.coloring.correct_overlaps = correct;
        self
    }

    pub fn with_alpha(mut self, alpha: AlphaMode) -> Self {
        self.alpha = alpha;
        self
    }

    /// Edge length of one atlas cell in pixels.
    pub fn cell_size(&self) -> u32 {
        self.glyph_size.saturating_add(self.padding.saturating_mul(2))
    }

    pub fn validate(&self) -> MsdfResult<()> {
        if self.glyph_size == 0 {
            return Err(MsdfError::InvalidConfig {
                reason: "glyph_size must be positive".to_string(),
            });
        }
        let cell = u64::from(self.glyph_size) + 2 * u64::from(self.padding);
        if cell > u64::from(MAX_ATLAS_DIMENSION) {
            return Err(MsdfError::AtlasTooLarge {
                required_width: cell,
                required_height: cell,
                max_dimension: MAX_ATLAS_DIMENSION,
            });
        }
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(MsdfError::InvalidConfig {
                reason: format!("range must be positive, got {}", self.range),
            });
        }
        self.coloring.validate()
    }
}

/// Glyph quad geometry in em units; multiply by `glyph_size` for pixels.
///
/// The quad is the box the glyph's UV rectangle covers, padding included.
/// `bearing_y` is the quad's top edge above the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GlyphMetrics {
    pub advance_width: f32,
    pub bearing_x: f32,
    pub bearing_y: f32,
    pub width: f32,
    pub height: f32,
}

impl GlyphMetrics {
    fn from_plane(advance: f64, plane: Option<&Bounds>) -> Self {
        match plane {
            Some(plane) => Self {
                advance_width: advance as f32,
                bearing_x: plane.left as f32,
                bearing_y: plane.top as f32,
                width: (plane.right - plane.left) as f32,
                height: (plane.top - plane.bottom) as f32,
            },
            None => Self {
                advance_width: advance as f32,
                ..Default::default()
            },
        }
    }
}

/// One entry of the glyph table.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasGlyph {
    pub codepoint: char,
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    pub metrics: GlyphMetrics,
    /// Pixel rectangle in the atlas, top-left origin. `None` for blank glyphs.
    pub atlas_bounds: Option<Rect<u32>>,
    /// Em-space rectangle of the quad, y up. `None` for blank glyphs.
    pub plane_bounds: Option<Bounds>,
}

impl AtlasGlyph {
    /// Whether the glyph has any pixels in the atlas.
    pub fn is_blank(&self) -> bool {
        self.atlas_bounds.is_none()
    }
}

/// UV rectangle of `rect` inside an atlas of `width` x `height` pixels.
pub fn uv_rect(rect: &Rect<u32>, width: u32, height: u32) -> ([f32; 2], [f32; 2]) {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    (
        [rect.x as f32 / w, rect.y as f32 / h],
        [rect.right() as f32 / w, rect.bottom() as f32 / h],
    )
}

/// Places equally sized cells on a near-square grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridPacker {
    cell_size: u32,
    columns: u32,
    rows: u32,
}

impl GridPacker {
    /// Grid for `count` cells: `ceil(sqrt(count))` columns and as many rows
    /// as needed.
    pub fn new(count: usize, cell_size: u32) -> MsdfResult<Self> {
        let count = count as u64;
        let columns = integer_sqrt_ceil(count);
        let rows = if columns == 0 { 0 } else { count.div_ceil(columns) };

        let required_width = columns * u64::from(cell_size);
        let required_height = rows * u64::from(cell_size);
        let limit = u64::from(MAX_ATLAS_DIMENSION);
        if required_width > limit || required_height > limit {
            return Err(MsdfError::AtlasTooLarge {
                required_width,
                required_height,
                max_dimension: MAX_ATLAS_DIMENSION,
            });
        }

        Ok(Self {
            cell_size,
            columns: columns as u32,
            rows: rows as u32,
        })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn width(&self) -> u32 {
        self.columns * self.cell_size
    }

    pub fn height(&self) -> u32 {
        self.rows * self.cell_size
    }

    /// Cell `index`, filled row by row from the top-left.
    pub fn cell(&self, index: usize) -> Rect<u32> {
        let index = index as u32;
        let columns = self.columns.max(1);
        Rect::new(
            (index % columns) * self.cell_size,
            (index / columns) * self.cell_size,
            self.cell_size,
            self.cell_size,
        )
    }
}

fn integer_sqrt_ceil(n: u64) -> u64 {
    let mut root = (n as f64).sqrt().ceil() as u64;
    while root * root < n {
        root += 1;
    }
    while root > 0 && (root - 1) * (root - 1) >= n {
        root -= 1;
    }
    root
}

/// A generated atlas: RGBA8 pixels (row-major, top-left origin) and the
/// glyph table.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasResult {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub glyphs: HashMap<char, AtlasGlyph>,
    pub config: AtlasConfig,
    pub font_metrics: FontMetrics,
    /// Requested codepoints the font has no glyph for, in request order.
    /// They are still in the table, blank, with the fallback advance.
    pub missing_glyphs: Vec<char>,
    /// Glyphs whose overlapping contours could not be fully corrected.
    pub uncorrected_overlaps: Vec<(char, OverlapReport)>,
}

impl AtlasResult {
    fn empty(config: AtlasConfig, font_metrics: FontMetrics) -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
            glyphs: HashMap::new(),
            config,
            font_metrics,
            missing_glyphs: Vec::new(),
            uncorrected_overlaps: Vec::new(),
        }
    }

    pub fn glyph(&self, codepoint: char) -> Option<&AtlasGlyph> {
        self.glyphs.get(&codepoint)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let px = self.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Codepoints in the table, sorted.
    pub fn codepoints(&self) -> Vec<char> {
        let mut codepoints: Vec<char> = self.glyphs.keys().copied().collect();
        codepoints.sort_unstable();
        codepoints
    }

    fn blit(&mut self, cell: &Rect<u32>, bitmap: &GlyphBitmap) {
        let bytes = bitmap.as_bytes();
        let row_len = (bitmap.width * 4) as usize;
        for row in 0..bitmap.height {
            let src = (row as usize) * row_len;
            let dst = (((cell.y + row) * self.width + cell.x) * 4) as usize;
            self.pixels[dst..dst + row_len].copy_from_slice(&bytes[src..src + row_len]);
        }
    }
}

/// Everything one glyph task produces; merged into the atlas on the calling
/// thread.
struct RenderedGlyph {
    codepoint: char,
    bitmap: GlyphBitmap,
    layout: GlyphLayout,
    advance: f64,
    missing: bool,
    overlap: Option<OverlapReport>,
}

fn render_glyph(font: &Font, codepoint: char, config: &AtlasConfig) -> RenderedGlyph {
    profile_scope!("render_glyph");

    let (shape, missing) = match font.outline(codepoint) {
        Ok(shape) => (Shape::clone(&shape), false),
        Err(MsdfError::GlyphNotFound { .. }) => {
            tracing::warn!(?codepoint, "No glyph in font; using a blank cell");
            (Shape::new(), true)
        }
        Err(err) => {
            tracing::warn!(?codepoint, "Outline extraction failed ({err}); using a blank cell");
            (Shape::new(), true)
        }
    };
    let advance = if missing {
        font.fallback_advance()
    } else {
        font.advance(codepoint)
            .unwrap_or_else(|_| font.fallback_advance())
    };

    let coloring = config.coloring.for_glyph(codepoint);
    let mut shape = shape;
    color_shape(&mut shape, &coloring);

    let mut layout = GlyphLayout::new(&shape.bounds(), config.glyph_size, config.padding);
    let overlap = if coloring.correct_overlaps && !shape.is_empty() {
        let report = correct_overlaps(&mut shape, config.range / layout.scale);
        layout = GlyphLayout::new(&shape.bounds(), config.glyph_size, config.padding);
        Some(report)
    } else {
        None
    };

    let bitmap = rasterize_glyph(
        &shape,
        &layout,
        config.range,
        config.alpha,
        coloring.correct_overlaps,
    );

    tracing::debug!(
        ?codepoint,
        edges = shape.edge_count(),
        box_width = layout.box_width,
        box_height = layout.box_height,
        "Rasterised glyph"
    );

    RenderedGlyph {
        codepoint,
        bitmap,
        layout,
        advance,
        missing,
        overlap,
    }
}

/// Builds an MSDF atlas for every distinct codepoint in `chars`.
///
/// Codepoints the font lacks become blank cells with the fallback advance and
/// are listed in [`AtlasResult::missing_glyphs`]. Errors (invalid config, an
/// atlas over [`MAX_ATLAS_DIMENSION`]) come wrapped in
/// [`MsdfError::AtlasGenerationFailed`].
pub fn generate_atlas(font: &Font, chars: &str, config: &AtlasConfig) -> MsdfResult<AtlasResult> {
    profile_function!();

    let result = build_atlas(font, chars, config).map_err(MsdfError::into_generation_failure);
    finish_generation();
    result
}

fn build_atlas(font: &Font, chars: &str, config: &AtlasConfig) -> MsdfResult<AtlasResult> {
    config.validate()?;

    let mut seen = HashSet::new();
    let codepoints: Vec<char> = chars.chars().filter(|c| seen.insert(*c)).collect();
    if codepoints.is_empty() {
        tracing::debug!("Empty charset; returning an empty atlas");
        return Ok(AtlasResult::empty(*config, font.metrics()));
    }

    let packer = GridPacker::new(codepoints.len(), config.cell_size())?;

    #[cfg(feature = "parallel")]
    let rendered: Vec<RenderedGlyph> = {
        use rayon::prelude::*;
        codepoints
            .par_iter()
            .map(|ch| render_glyph(font, *ch, config))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let rendered: Vec<RenderedGlyph> = codepoints
        .iter()
        .map(|ch| render_glyph(font, *ch, config))
        .collect();

    let mut atlas = AtlasResult {
        width: packer.width(),
        height: packer.height(),
        pixels: vec![0; (packer.width() as usize) * (packer.height() as usize) * 4],
        ..AtlasResult::empty(*config, font.metrics())
    };

    {
        profile_scope!("pack_glyphs");
        for (index, glyph) in rendered.into_iter().enumerate() {
            let cell = packer.cell(index);
            atlas.blit(&cell, &glyph.bitmap);

            let atlas_bounds = (!glyph.layout.is_empty()).then(|| {
                Rect::new(cell.x, cell.y, glyph.layout.box_width, glyph.layout.box_height)
            });
            let (uv_min, uv_max) = match &atlas_bounds {
                Some(rect) => uv_rect(rect, atlas.width, atlas.height),
                None => ([0.0; 2], [0.0; 2]),
            };
            let plane_bounds = glyph.layout.plane_bounds();

            if glyph.missing {
                atlas.missing_glyphs.push(glyph.codepoint);
            }
            if let Some(report) = glyph.overlap.filter(|r| !r.is_fully_corrected()) {
                tracing::warn!(
                    codepoint = ?glyph.codepoint,
                    unresolved = report.unresolved_pairs.len(),
                    "Overlapping contours could not be fully corrected"
                );
                atlas.uncorrected_overlaps.push((glyph.codepoint, report));
            }

            atlas.glyphs.insert(
                glyph.codepoint,
                AtlasGlyph {
                    codepoint: glyph.codepoint,
                    uv_min,
                    uv_max,
                    metrics: GlyphMetrics::from_plane(glyph.advance, plane_bounds.as_ref()),
                    atlas_bounds,
                    plane_bounds,
                },
            );
        }
    }

    tracing::info!(
        glyphs = atlas.glyphs.len(),
        width = atlas.width,
        height = atlas.height,
        missing = atlas.missing_glyphs.len(),
        "Generated MSDF atlas"
    );

    Ok(atlas)
}
