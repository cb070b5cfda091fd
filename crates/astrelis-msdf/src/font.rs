use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use astrelis_core::alloc::HashMap;
use serde::{Deserialize, Serialize};
use ttf_parser::{Face, GlyphId};

use crate::contour::Shape;
use crate::error::{MsdfError, MsdfResult};
use crate::outline;

/// Advance used when a font has no usable `.notdef` advance, in em.
pub const DEFAULT_FALLBACK_ADVANCE: f64 = 0.5;

/// Vertical font metrics in em units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontMetrics {
    pub units_per_em: u16,
    pub ascender: f64,
    /// Negative for fonts that descend below the baseline.
    pub descender: f64,
    pub line_height: f64,
}

/// A parsed font face and the outlines resolved from it so far.
///
/// The face is re-parsed from the owned bytes on demand; parsing only reads
/// the table directory. Outlines are cached per codepoint and released when
/// the font is dropped or [`Font::clear_cache`] is called.
pub struct Font {
    data: Vec<u8>,
    face_index: u32,
    metrics: FontMetrics,
    fallback_advance: f64,
    outlines: RwLock<HashMap<char, Arc<Shape>>>,
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("bytes", &self.data.len())
            .field("face_index", &self.face_index)
            .field("metrics", &self.metrics)
            .field("cached_outlines", &self.cached_outlines())
            .finish()
    }
}

impl Font {
    /// Parse the first face of a TrueType/OpenType font.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> MsdfResult<Self> {
        Self::from_bytes_with_index(data, 0)
    }

    /// Parse face `face_index` of a font or font collection.
    pub fn from_bytes_with_index(data: impl Into<Vec<u8>>, face_index: u32) -> MsdfResult<Self> {
        let data = data.into();
        let (metrics, fallback_advance) = {
            let face = Face::parse(&data, face_index)?;
            let upm = f64::from(face.units_per_em());
            let metrics = FontMetrics {
                units_per_em: face.units_per_em(),
                ascender: f64::from(face.ascender()) / upm,
                descender: f64::from(face.descender()) / upm,
                line_height: f64::from(
                    i32::from(face.ascender()) - i32::from(face.descender())
                        + i32::from(face.line_gap()),
                ) / upm,
            };
            let fallback_advance = face
                .glyph_hor_advance(GlyphId(0))
                .filter(|advance| *advance > 0)
                .map(|advance| f64::from(advance) / upm)
                .unwrap_or(DEFAULT_FALLBACK_ADVANCE);
            (metrics, fallback_advance)
        };

        tracing::debug!(
            bytes = data.len(),
            face_index,
            units_per_em = metrics.units_per_em,
            "Loaded font"
        );

        Ok(Self {
            data,
            face_index,
            metrics,
            fallback_advance,
            outlines: RwLock::new(HashMap::new()),
        })
    }

    fn face(&self) -> MsdfResult<Face<'_>> {
        Ok(Face::parse(&self.data, self.face_index)?)
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn face_index(&self) -> u32 {
        self.face_index
    }

    /// Advance for codepoints the font cannot supply, in em.
    pub fn fallback_advance(&self) -> f64 {
        self.fallback_advance
    }

    pub fn glyph_count(&self) -> u16 {
        self.face().map(|face| face.number_of_glyphs()).unwrap_or(0)
    }

    pub fn has_glyph(&self, codepoint: char) -> bool {
        self.face()
            .map(|face| face.glyph_index(codepoint).is_some())
            .unwrap_or(false)
    }

    /// Horizontal advance of `codepoint` in em.
    pub fn advance(&self, codepoint: char) -> MsdfResult<f64> {
        let face = self.face()?;
        let glyph = face
            .glyph_index(codepoint)
            .ok_or(MsdfError::GlyphNotFound { codepoint })?;
        Ok(face
            .glyph_hor_advance(glyph)
            .map(|advance| f64::from(advance) / f64::from(face.units_per_em()))
            .unwrap_or(self.fallback_advance))
    }

    /// Normalised outline of `codepoint`, cached after the first request.
    ///
    /// Mapped glyphs without contours (a space) give an empty shape; unmapped
    /// codepoints fail with [`MsdfError::GlyphNotFound`].
    pub fn outline(&self, codepoint: char) -> MsdfResult<Arc<Shape>> {
        if let Some(shape) = self.read_cache().get(&codepoint) {
            return Ok(shape.clone());
        }

        let face = self.face()?;
        let shape = Arc::new(outline::extract_outline(&face, codepoint)?);
        tracing::trace!(
            ?codepoint,
            contours = shape.contours.len(),
            edges = shape.edge_count(),
            "Extracted outline"
        );

        Ok(self
            .write_cache()
            .entry(codepoint)
            .or_insert(shape)
            .clone())
    }

    pub fn cached_outlines(&self) -> usize {
        self.read_cache().len()
    }

    /// Release every cached outline.
    pub fn clear_cache(&self) {
        self.write_cache().clear();
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, HashMap<char, Arc<Shape>>> {
        self.outlines.read().unwrap_or_else(|poisoned| {
            tracing::error!("Outline cache lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, HashMap<char, Arc<Shape>>> {
        self.outlines.write().unwrap_or_else(|poisoned| {
            tracing::error!("Outline cache lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }
}

/// Parse font bytes into a [`Font`].
pub fn load_font(bytes: impl Into<Vec<u8>>) -> MsdfResult<Font> {
    Font::from_bytes(bytes)
}
