//! Outline extraction from `ttf-parser` into [`Shape`]s.
//!
//! Coordinates are divided by units-per-em so one em spans `[0, 1]`, with y
//! pointing up as in the font. Curves keep their degree; nothing is
//! flattened here.

use astrelis_core::math::DVec2;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use crate::contour::{Contour, Shape};
use crate::edge::EdgeSegment;
use crate::error::{MsdfError, MsdfResult};

/// Collects `OutlineBuilder` callbacks into contours.
pub struct ShapeBuilder {
    scale: f64,
    contours: Vec<Contour>,
    current: Contour,
    start: DVec2,
    cursor: DVec2,
}

impl ShapeBuilder {
    /// Builder that maps font units to em units.
    pub fn new(units_per_em: u16) -> Self {
        Self::with_scale(1.0 / f64::from(units_per_em.max(1)))
    }

    pub fn with_scale(scale: f64) -> Self {
        Self {
            scale,
            contours: Vec::new(),
            current: Contour::new(),
            start: DVec2::ZERO,
            cursor: DVec2::ZERO,
        }
    }

    fn point(&self, x: f32, y: f32) -> DVec2 {
        DVec2::new(f64::from(x), f64::from(y)) * self.scale
    }

    fn finish_contour(&mut self) {
        if self.current.is_empty() {
            return;
        }
        if self.cursor != self.start {
            self.current.push(EdgeSegment::line(self.cursor, self.start));
        }
        self.contours.push(std::mem::take(&mut self.current));
        self.cursor = self.start;
    }

    /// Closes any open contour and returns the oriented, cleaned-up shape.
    pub fn finish(mut self) -> Shape {
        self.finish_contour();
        let mut shape = Shape::from_contours(self.contours);
        shape.normalize();
        shape
    }
}

impl OutlineBuilder for ShapeBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.finish_contour();
        self.start = self.point(x, y);
        self.cursor = self.start;
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let to = self.point(x, y);
        if to != self.cursor {
            self.current.push(EdgeSegment::line(self.cursor, to));
        }
        self.cursor = to;
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let control = self.point(x1, y1);
        let to = self.point(x, y);
        if to != self.cursor || control != self.cursor {
            self.current
                .push(EdgeSegment::quadratic(self.cursor, control, to));
        }
        self.cursor = to;
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (c1, c2) = (self.point(x1, y1), self.point(x2, y2));
        let to = self.point(x, y);
        if to != self.cursor || c1 != self.cursor || c2 != self.cursor {
            self.current
                .push(EdgeSegment::cubic(self.cursor, c1, c2, to));
        }
        self.cursor = to;
    }

    fn close(&mut self) {
        self.finish_contour();
    }
}

/// Outline of `glyph` in em units. Glyphs without contours give an empty shape.
pub fn glyph_shape(face: &Face<'_>, glyph: GlyphId) -> Shape {
    let mut builder = ShapeBuilder::new(face.units_per_em());
    match face.outline_glyph(glyph, &mut builder) {
        Some(_) => builder.finish(),
        None => Shape::new(),
    }
}

/// Outline of the glyph mapped to `codepoint`.
///
/// Fails with [`MsdfError::GlyphNotFound`] when the font's character map has
/// no entry for it.
pub fn extract_outline(face: &Face<'_>, codepoint: char) -> MsdfResult<Shape> {
    let glyph = face
        .glyph_index(codepoint)
        .ok_or(MsdfError::GlyphNotFound { codepoint })?;
    Ok(glyph_shape(face, glyph))
}
