//! Distance field rasterisation.
//!
//! Every texel of a glyph cell, padding included, stores per channel the
//! signed distance to the nearest edge carrying that channel, mapped so
//! that 0.5 lies on the outline and values above 0.5 are inside:
//!
//! ```text
//! value = clamp(0.5 - distance_px / range, 0, 1)
//! ```

use astrelis_core::math::{DVec2, median};
use astrelis_core::profiling::profile_function;
use serde::{Deserialize, Serialize};

use crate::contour::{Contour, Shape};
use crate::edge::{Bounds, EdgeSegment, SignedDistance};

/// What the alpha channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlphaMode {
    /// Constant 255.
    #[default]
    Opaque,
    /// True single-channel signed distance, encoded like the colour channels.
    TrueDistance,
}

/// Where a glyph sits inside its square atlas cell.
///
/// Maps between cell pixels (top-left origin, y down) and em space (y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphLayout {
    /// Cell edge length in pixels, padding included.
    pub cell_size: u32,
    /// Pixels per em.
    pub scale: f64,
    /// Em-space position of the cell's top-left corner.
    pub origin: DVec2,
    /// Pixel size of the glyph box (ink plus padding) at the cell's top-left.
    pub box_width: u32,
    pub box_height: u32,
}

impl GlyphLayout {
    /// Lays out a glyph with outline `bounds` in a cell of
    /// `glyph_size + 2 * padding` pixels. One em maps to `glyph_size` pixels
    /// unless the glyph is larger than an em, in which case it is scaled
    /// down to fit.
    pub fn new(bounds: &Bounds, glyph_size: u32, padding: u32) -> Self {
        let cell_size = glyph_size + 2 * padding;
        if bounds.is_empty() {
            return Self {
                cell_size,
                scale: glyph_size as f64,
                origin: DVec2::ZERO,
                box_width: 0,
                box_height: 0,
            };
        }

        let (width, height) = (bounds.width(), bounds.height());
        let extent = width.max(height);
        let scale = if extent > 1.0 {
            glyph_size as f64 / extent
        } else {
            glyph_size as f64
        };

        let ink = |em: f64| ((em * scale - 1e-9).ceil().max(0.0) as u32).min(glyph_size);
        let (ink_width, ink_height) = (ink(width), ink(height));
        let offset_x = padding as f64 + (ink_width as f64 - width * scale) / 2.0;
        let offset_y = padding as f64 + (ink_height as f64 - height * scale) / 2.0;

        Self {
            cell_size,
            scale,
            origin: DVec2::new(
                bounds.left - offset_x / scale,
                bounds.top + offset_y / scale,
            ),
            box_width: ink_width + 2 * padding,
            box_height: ink_height + 2 * padding,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.box_width == 0 || self.box_height == 0
    }

    /// Em-space position of the centre of cell pixel `(x, y)`.
    pub fn pixel_center(&self, x: u32, y: u32) -> DVec2 {
        DVec2::new(
            self.origin.x + (x as f64 + 0.5) / self.scale,
            self.origin.y - (y as f64 + 0.5) / self.scale,
        )
    }

    /// Continuous cell-pixel coordinates of an em-space point.
    pub fn em_to_pixel(&self, p: DVec2) -> DVec2 {
        DVec2::new(
            (p.x - self.origin.x) * self.scale,
            (self.origin.y - p.y) * self.scale,
        )
    }

    /// Em-space rectangle covered by the glyph box; `None` for empty glyphs.
    pub fn plane_bounds(&self) -> Option<Bounds> {
        if self.is_empty() {
            return None;
        }
        Some(Bounds {
            left: self.origin.x,
            top: self.origin.y,
            right: self.origin.x + self.box_width as f64 / self.scale,
            bottom: self.origin.y - self.box_height as f64 / self.scale,
        })
    }
}

/// RGBA8 distance image of one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
}

impl GlyphBitmap {
    pub fn filled(width: u32, height: u32, value: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; (width * height) as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Median of the three colour channels, decoded to `[0, 1]`.
    pub fn median_at(&self, x: u32, y: u32) -> f64 {
        let [r, g, b, _] = self.pixel(x, y);
        median(r as f64, g as f64, b as f64) / 255.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

/// Per-channel signed distances at one point, in em (positive outside).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultiDistance {
    pub channels: [f64; 3],
    /// Plain nearest-edge distance, used for true-distance alpha.
    pub true_distance: f64,
}

impl MultiDistance {
    pub fn median(&self) -> f64 {
        median(self.channels[0], self.channels[1], self.channels[2])
    }
}

#[derive(Clone, Copy)]
struct ChannelHit<'a> {
    distance: SignedDistance,
    segment: Option<&'a EdgeSegment>,
    param: f64,
}

impl Default for ChannelHit<'_> {
    fn default() -> Self {
        Self {
            distance: SignedDistance::FAR,
            segment: None,
            param: 0.0,
        }
    }
}

/// Nearest edge per channel over some set of edges.
#[derive(Clone, Copy, Default)]
struct EdgeSelector<'a> {
    channels: [ChannelHit<'a>; 3],
    nearest: SignedDistance,
}

impl<'a> EdgeSelector<'a> {
    fn add_contour(&mut self, contour: &'a Contour, p: DVec2) {
        for edge in &contour.edges {
            let (distance, param) = edge.segment.signed_distance(p);
            if distance.is_closer_than(&self.nearest) {
                self.nearest = distance;
            }
            for (channel, hit) in self.channels.iter_mut().enumerate() {
                if edge.color.has_channel(channel) && distance.is_closer_than(&hit.distance) {
                    *hit = ChannelHit {
                        distance,
                        segment: Some(&edge.segment),
                        param,
                    };
                }
            }
        }
    }

    fn merge(&mut self, other: &EdgeSelector<'a>) {
        if other.nearest.is_closer_than(&self.nearest) {
            self.nearest = other.nearest;
        }
        for (mine, theirs) in self.channels.iter_mut().zip(other.channels.iter()) {
            if theirs.distance.is_closer_than(&mine.distance) {
                *mine = *theirs;
            }
        }
    }

    fn resolve(&self, p: DVec2) -> MultiDistance {
        let mut channels = [SignedDistance::FAR.distance; 3];
        for (out, hit) in channels.iter_mut().zip(self.channels.iter()) {
            if let Some(segment) = hit.segment {
                let mut distance = hit.distance;
                segment.distance_to_pseudo_distance(&mut distance, p, hit.param);
                *out = distance.distance;
            }
        }
        MultiDistance {
            channels,
            true_distance: self.nearest.distance,
        }
    }
}

/// Per-channel distance at `p`, nearest edge over the whole shape.
pub fn simple_distance(shape: &Shape, p: DVec2) -> MultiDistance {
    let mut selector = EdgeSelector::default();
    for contour in &shape.contours {
        selector.add_contour(contour, p);
    }
    selector.resolve(p)
}

/// Per-channel distance at `p` resolved contour by contour, so that
/// overlapping contours of the same winding do not cut into each other.
///
/// `windings` holds [`Contour::winding`] for each contour.
pub fn overlapping_distance(shape: &Shape, windings: &[i32], p: DVec2) -> MultiDistance {
    // Inside-positive throughout; flipped back on return.
    let flip = |d: MultiDistance| MultiDistance {
        channels: d.channels.map(|c| -c),
        true_distance: -d.true_distance,
    };

    let mut whole = EdgeSelector::default();
    let mut inner = EdgeSelector::default();
    let mut outer = EdgeSelector::default();
    let mut per_contour = Vec::with_capacity(shape.contours.len());

    for (contour, &winding) in shape.contours.iter().zip(windings) {
        let mut selector = EdgeSelector::default();
        selector.add_contour(contour, p);
        whole.merge(&selector);
        let resolved = flip(selector.resolve(p));
        let scalar = resolved.median();
        if winding > 0 && scalar >= 0.0 {
            inner.merge(&selector);
        }
        if winding < 0 && scalar <= 0.0 {
            outer.merge(&selector);
        }
        per_contour.push((winding, resolved));
    }

    let whole_distance = flip(whole.resolve(p));
    let inner_distance = flip(inner.resolve(p));
    let outer_distance = flip(outer.resolve(p));
    let inner_scalar = inner_distance.median();
    let outer_scalar = outer_distance.median();

    let (mut distance, winding) =
        if inner_scalar >= 0.0 && inner_scalar.abs() <= outer_scalar.abs() {
            let mut distance = inner_distance;
            for (w, candidate) in &per_contour {
                let scalar = candidate.median();
                if *w > 0 && scalar.abs() < outer_scalar.abs() && scalar > distance.median() {
                    distance = *candidate;
                }
            }
            (distance, 1)
        } else if outer_scalar <= 0.0 && outer_scalar.abs() < inner_scalar.abs() {
            let mut distance = outer_distance;
            for (w, candidate) in &per_contour {
                let scalar = candidate.median();
                if *w < 0 && scalar.abs() < inner_scalar.abs() && scalar < distance.median() {
                    distance = *candidate;
                }
            }
            (distance, -1)
        } else {
            return flip(whole_distance);
        };

    for (w, candidate) in &per_contour {
        let scalar = candidate.median();
        let current = distance.median();
        if *w != winding && scalar * current >= 0.0 && scalar.abs() < current.abs() {
            distance = *candidate;
        }
    }
    if distance.median() == whole_distance.median() {
        distance = whole_distance;
    }
    distance.true_distance = whole_distance.true_distance;
    flip(distance)
}

/// Maps an em distance to a channel byte.
#[inline]
pub fn encode_distance(distance_em: f64, scale: f64, range: f64) -> u8 {
    let value = (0.5 - distance_em * scale / range).clamp(0.0, 1.0);
    (value * 255.0).round() as u8
}

/// Rasterises a coloured shape into its cell.
///
/// Empty shapes produce a cell that reads as "far outside" everywhere.
pub fn rasterize_glyph(
    shape: &Shape,
    layout: &GlyphLayout,
    range: f64,
    alpha: AlphaMode,
    overlap_aware: bool,
) -> GlyphBitmap {
    profile_function!();

    let size = layout.cell_size;
    if shape.is_empty() {
        let alpha = match alpha {
            AlphaMode::Opaque => 255,
            AlphaMode::TrueDistance => 0,
        };
        return GlyphBitmap::filled(size, size, [0, 0, 0, alpha]);
    }

    let windings: Vec<i32> = shape.contours.iter().map(Contour::winding).collect();
    let mut bitmap = GlyphBitmap::filled(size, size, [0; 4]);
    for y in 0..size {
        for x in 0..size {
            let p = layout.pixel_center(x, y);
            let distance = if overlap_aware {
                overlapping_distance(shape, &windings, p)
            } else {
                simple_distance(shape, p)
            };
            let [r, g, b] = distance
                .channels
                .map(|d| encode_distance(d, layout.scale, range));
            let a = match alpha {
                AlphaMode::Opaque => 255,
                AlphaMode::TrueDistance => {
                    encode_distance(distance.true_distance, layout.scale, range)
                }
            };
            bitmap.pixels[(y * size + x) as usize] = [r, g, b, a];
        }
    }
    bitmap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coloring::{ColoringConfig, color_shape};
    use crate::contour::tests::polygon;
    use astrelis_core::math::dvec2;

    fn square_shape(left: f64, bottom: f64, size: f64) -> Shape {
        let mut shape = Shape::from_contours(vec![polygon(&[
            (left, bottom),
            (left + size, bottom),
            (left + size, bottom + size),
            (left, bottom + size),
        ])]);
        shape.normalize();
        color_shape(&mut shape, &ColoringConfig::default());
        shape
    }

    #[test]
    fn test_layout_of_unit_glyph() {
        let bounds = Bounds {
            left: 0.1,
            bottom: 0.0,
            right: 0.6,
            top: 0.7,
        };
        let layout = GlyphLayout::new(&bounds, 48, 4);
        assert_eq!(layout.cell_size, 56);
        assert_eq!(layout.scale, 48.0);
        // 0.5 em * 48 = 24 px, 0.7 em * 48 = 33.6 -> 34 px
        assert_eq!(layout.box_width, 24 + 8);
        assert_eq!(layout.box_height, 34 + 8);

        let top_left_ink = layout.em_to_pixel(dvec2(bounds.left, bounds.top));
        assert!((top_left_ink.x - 4.0).abs() < 1e-9);
        assert!((top_left_ink.y - 4.2).abs() < 1e-9);

        let plane = layout.plane_bounds().unwrap();
        assert!((plane.right - plane.left - 32.0 / 48.0).abs() < 1e-12);
        assert!((plane.top - plane.bottom - 42.0 / 48.0).abs() < 1e-12);
        assert!(plane.left < bounds.left && plane.top > bounds.top);
    }

    #[test]
    fn test_layout_scales_down_oversized_glyphs() {
        let bounds = Bounds {
            left: 0.0,
            bottom: -0.5,
            right: 2.0,
            top: 0.5,
        };
        let layout = GlyphLayout::new(&bounds, 32, 2);
        assert_eq!(layout.scale, 16.0);
        assert_eq!(layout.box_width, 32 + 4);
        assert!(layout.box_width <= layout.cell_size);
    }

    #[test]
    fn test_empty_layout() {
        let layout = GlyphLayout::new(&Bounds::EMPTY, 48, 4);
        assert!(layout.is_empty());
        assert!(layout.plane_bounds().is_none());
        assert_eq!(layout.cell_size, 56);
    }

    #[test]
    fn test_encode_distance() {
        assert_eq!(encode_distance(0.0, 48.0, 4.0), 128);
        assert_eq!(encode_distance(1.0, 48.0, 4.0), 0);
        assert_eq!(encode_distance(-1.0, 48.0, 4.0), 255);
        // One pixel inside with a four pixel range.
        assert_eq!(encode_distance(-1.0 / 48.0, 48.0, 4.0), 191);
    }

    #[test]
    fn test_square_field_has_correct_sign() {
        let shape = square_shape(0.2, 0.2, 0.5);
        let layout = GlyphLayout::new(&shape.bounds(), 32, 4);
        let bitmap = rasterize_glyph(&shape, &layout, 4.0, AlphaMode::Opaque, false);
        assert_eq!(bitmap.width, 40);
        assert_eq!(bitmap.pixels.len(), 40 * 40);

        let center = layout.em_to_pixel(dvec2(0.45, 0.45));
        assert!(bitmap.median_at(center.x as u32, center.y as u32) > 0.5);
        assert!(bitmap.median_at(0, 0) < 0.5);
        assert!(bitmap.median_at(39, 39) < 0.5);
        assert!(bitmap.pixels.iter().all(|p| p[3] == 255));
    }

    #[test]
    fn test_square_zero_crossing_near_outline() {
        let shape = square_shape(0.2, 0.2, 0.5);
        let layout = GlyphLayout::new(&shape.bounds(), 32, 4);
        let bitmap = rasterize_glyph(&shape, &layout, 4.0, AlphaMode::Opaque, false);
        for y in 0..bitmap.height {
            for x in 0..bitmap.width {
                let p = layout.pixel_center(x, y);
                let true_px = shape.signed_distance(p) * layout.scale;
                if true_px.abs() <= 1.0 {
                    continue;
                }
                let inside = bitmap.median_at(x, y) > 0.5;
                assert_eq!(inside, true_px < 0.0, "pixel ({x}, {y}) at {true_px} px");
            }
        }
    }

    #[test]
    fn test_corner_stays_sharp() {
        // Just outside the corner diagonally: a single-channel SDF would
        // round this off, the median keeps it outside.
        let shape = square_shape(0.0, 0.0, 1.0);
        let p = dvec2(1.02, 1.02);
        let distance = simple_distance(&shape, p);
        assert!(distance.median() > 0.0);
        assert!(distance.true_distance > 0.0);
    }

    #[test]
    fn test_true_distance_alpha() {
        let shape = square_shape(0.2, 0.2, 0.5);
        let layout = GlyphLayout::new(&shape.bounds(), 32, 4);
        let bitmap = rasterize_glyph(&shape, &layout, 4.0, AlphaMode::TrueDistance, false);
        let center = layout.em_to_pixel(dvec2(0.45, 0.45));
        assert_eq!(bitmap.pixel(center.x as u32, center.y as u32)[3], 255);
        assert_eq!(bitmap.pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_empty_shape_reads_as_outside() {
        let layout = GlyphLayout::new(&Bounds::EMPTY, 16, 2);
        let bitmap = rasterize_glyph(&Shape::new(), &layout, 4.0, AlphaMode::Opaque, true);
        assert_eq!(bitmap.pixels.len(), 20 * 20);
        assert!(bitmap.pixels.iter().all(|p| *p == [0, 0, 0, 255]));
        assert_eq!(bitmap.as_bytes().len(), 20 * 20 * 4);
    }

    #[test]
    fn test_overlap_aware_combiner_agrees_on_disjoint_shape() {
        let mut shape = square_shape(0.0, 0.0, 0.4);
        shape.contours.extend(square_shape(0.6, 0.0, 0.4).contours);
        let windings: Vec<i32> = shape.contours.iter().map(Contour::winding).collect();
        for p in [dvec2(0.2, 0.2), dvec2(0.5, 0.2), dvec2(0.8, 0.1), dvec2(1.2, 0.5)] {
            let plain = simple_distance(&shape, p);
            let aware = overlapping_distance(&shape, &windings, p);
            assert_eq!(plain.median() > 0.0, aware.median() > 0.0, "at {p}");
        }
    }

    #[test]
    fn test_overlap_aware_combiner_ignores_buried_edges() {
        // Two same-winding squares overlapping in the middle. The right
        // square's left edge at x = 0.5 runs through the filled union.
        let mut shape = square_shape(0.0, 0.0, 0.6);
        shape.contours.extend(square_shape(0.5, 0.1, 0.6).contours);
        let windings: Vec<i32> = shape.contours.iter().map(Contour::winding).collect();
        assert_eq!(windings, vec![1, 1]);

        let p = dvec2(0.48, 0.3);
        assert!(overlapping_distance(&shape, &windings, p).median() < 0.0);
    }
}
