//! Edge colouring.
//!
//! Colour boundaries are placed at sharp corners and at curvature-sign
//! reversals so the median of the three channels reconstructs those points
//! as sharp features, while smooth runs of same-direction curvature keep a
//! single colour.
//!
//! # Example
//!
//! ```
//! use astrelis_msdf::{ColoringConfig, ColoringMode, Contour, EdgeSegment, Shape, color_shape};
//! use astrelis_core::math::dvec2;
//!
//! let square = Contour::from_segments([
//!     EdgeSegment::line(dvec2(0.0, 0.0), dvec2(1.0, 0.0)),
//!     EdgeSegment::line(dvec2(1.0, 0.0), dvec2(1.0, 1.0)),
//!     EdgeSegment::line(dvec2(1.0, 1.0), dvec2(0.0, 1.0)),
//!     EdgeSegment::line(dvec2(0.0, 1.0), dvec2(0.0, 0.0)),
//! ]);
//! let mut shape = Shape::from_contours(vec![square]);
//! color_shape(&mut shape, &ColoringConfig::default().with_mode(ColoringMode::DistanceBased));
//!
//! let edges = &shape.contours[0].edges;
//! for i in 0..edges.len() {
//!     assert_ne!(edges[i].color, edges[(i + 1) % edges.len()].color);
//! }
//! ```

use std::f64::consts::PI;

use astrelis_core::profiling::profile_function;
use serde::{Deserialize, Serialize};

use crate::color::EdgeColor;
use crate::contour::{Contour, Shape};
use crate::edge::Edge;
use crate::error::{MsdfError, MsdfResult};

/// Strategy used to pick colours at each boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColoringMode {
    /// Cycles cyan, magenta, yellow at every boundary.
    #[default]
    Simple,
    /// Merges nearby boundaries and picks colours with a seeded generator.
    DistanceBased,
}

/// Edge colouring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColoringConfig {
    pub mode: ColoringMode,
    pub seed: u64,
    /// Interior angle in radians below which a vertex counts as a corner.
    pub corner_angle_threshold: f64,
    /// Boundaries closer than this fraction of the glyph extent are merged
    /// (distance-based mode only).
    pub distance_threshold: f64,
    pub correct_overlaps: bool,
    /// How many edges back a curved edge is remembered across straight or
    /// flat edges when looking for inflections.
    pub inflection_window: usize,
    /// Minimum turning (sine of the control-leg angle) for an edge to count
    /// as curved when looking for inflections.
    pub inflection_significance: f64,
    /// A curvature reversal only counts when the weaker of the two curved
    /// edges turns at least this fraction as much as the stronger one.
    pub inflection_relative_significance: f64,
}

impl Default for ColoringConfig {
    fn default() -> Self {
        Self {
            mode: ColoringMode::Simple,
            seed: 0,
            corner_angle_threshold: 3.0,
            distance_threshold: 0.05,
            correct_overlaps: false,
            inflection_window: 5,
            inflection_significance: 0.01,
            inflection_relative_significance: 0.01,
        }
    }
}

impl ColoringConfig {
    pub fn with_mode(mut self, mode: ColoringMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_corner_angle_threshold(mut self, radians: f64) -> Self {
        self.corner_angle_threshold = radians;
        self
    }

    pub fn with_distance_threshold(mut self, fraction: f64) -> Self {
        self.distance_threshold = fraction;
        self
    }

    pub fn with_correct_overlaps(mut self, correct: bool) -> Self {
        self.correct_overlaps = correct;
        self
    }

    pub fn with_inflection_window(mut self, edges: usize) -> Self {
        self.inflection_window = edges;
        self
    }

    pub fn with_inflection_significance(mut self, significance: f64) -> Self {
        self.inflection_significance = significance;
        self
    }

    pub fn with_inflection_relative_significance(mut self, fraction: f64) -> Self {
        self.inflection_relative_significance = fraction;
        self
    }

    /// Per-glyph configuration: the seed is mixed with the codepoint so
    /// glyphs sharing a style do not all start on the same colour.
    pub fn for_glyph(&self, ch: char) -> Self {
        Self {
            seed: self
                .seed
                .wrapping_add((ch as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            ..*self
        }
    }

    pub fn validate(&self) -> MsdfResult<()> {
        if !(self.corner_angle_threshold > 0.0 && self.corner_angle_threshold <= PI) {
            return Err(MsdfError::InvalidConfig {
                reason: format!(
                    "corner_angle_threshold must be in (0, pi], got {}",
                    self.corner_angle_threshold
                ),
            });
        }
        if !(self.distance_threshold.is_finite() && self.distance_threshold >= 0.0) {
            return Err(MsdfError::InvalidConfig {
                reason: format!(
                    "distance_threshold must be a non-negative fraction, got {}",
                    self.distance_threshold
                ),
            });
        }
        if self.inflection_window == 0 {
            return Err(MsdfError::InvalidConfig {
                reason: "inflection_window must be at least 1".to_string(),
            });
        }
        if !(self.inflection_significance.is_finite() && self.inflection_significance >= 0.0) {
            return Err(MsdfError::InvalidConfig {
                reason: format!(
                    "inflection_significance must be non-negative, got {}",
                    self.inflection_significance
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.inflection_relative_significance) {
            return Err(MsdfError::InvalidConfig {
                reason: format!(
                    "inflection_relative_significance must be in [0, 1], got {}",
                    self.inflection_relative_significance
                ),
            });
        }
        Ok(())
    }
}

/// Why a colour boundary sits at a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryKind {
    Corner,
    Inflection,
}

/// A colour boundary at the start of edge `edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorBoundary {
    pub edge: usize,
    pub kind: BoundaryKind,
}

/// Seeded splitmix64 generator used by the distance-based strategy.
#[derive(Debug, Clone)]
pub struct ColorRng {
    state: u64,
}

impl ColorRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn pick(&mut self, len: usize) -> usize {
        (self.next_u64() % len as u64) as usize
    }
}

enum ColorPicker {
    Cycle { start: usize },
    Random(ColorRng),
}

impl ColorPicker {
    fn first(&mut self) -> EdgeColor {
        match self {
            ColorPicker::Cycle { start } => EdgeColor::PALETTE[*start % 3],
            ColorPicker::Random(rng) => EdgeColor::PALETTE[rng.pick(3)],
        }
    }

    /// A colour different from `prev` and, if given, from `banned`.
    fn next(&mut self, prev: EdgeColor, banned: Option<EdgeColor>) -> EdgeColor {
        match self {
            ColorPicker::Cycle { .. } => {
                let index = EdgeColor::PALETTE
                    .iter()
                    .position(|c| *c == prev)
                    .unwrap_or(2);
                let candidate = EdgeColor::PALETTE[(index + 1) % 3];
                if Some(candidate) == banned {
                    EdgeColor::PALETTE[(index + 2) % 3]
                } else {
                    candidate
                }
            }
            ColorPicker::Random(rng) => {
                let mut candidates = [EdgeColor::BLACK; 3];
                let mut len = 0;
                for color in EdgeColor::PALETTE {
                    if color != prev && Some(color) != banned {
                        candidates[len] = color;
                        len += 1;
                    }
                }
                if len == 0 {
                    return prev;
                }
                candidates[rng.pick(len)]
            }
        }
    }
}

/// Whether the interior angle between `incoming` and `outgoing` is below
/// `angle_threshold` radians.
fn is_corner(incoming: Edge, outgoing: Edge, angle_threshold: f64) -> bool {
    let (Some(a), Some(b)) = (
        incoming.segment.direction(1.0).try_normalize(),
        outgoing.segment.direction(0.0).try_normalize(),
    ) else {
        return false;
    };
    let turn = a.perp_dot(b).atan2(a.dot(b)).abs();
    PI - turn < angle_threshold
}

/// Vertices of `contour` where colours must change, in edge order.
pub fn find_color_boundaries(contour: &Contour, config: &ColoringConfig) -> Vec<ColorBoundary> {
    let n = contour.len();
    if n == 0 {
        return Vec::new();
    }

    let corners: Vec<bool> = (0..n)
        .map(|i| {
            is_corner(
                contour.edges[(i + n - 1) % n],
                contour.edges[i],
                config.corner_angle_threshold,
            )
        })
        .collect();
    let inflections = find_inflections(contour, &corners, config);

    (0..n)
        .filter_map(|edge| {
            if corners[edge] {
                Some(ColorBoundary {
                    edge,
                    kind: BoundaryKind::Corner,
                })
            } else if inflections[edge] {
                Some(ColorBoundary {
                    edge,
                    kind: BoundaryKind::Inflection,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Marks edges whose curvature sign is opposite to the last significantly
/// curved edge within the lookback window, provided the weaker of the two
/// curvatures is not negligible next to the stronger.
///
/// Straight and flat edges in between do not reset the memory, so a short
/// straight piece between two curves cannot hide the reversal. Corners reset
/// it. A contour without corners is walked one extra time up to its first
/// curved edge so the reversal across the wrap-around is seen.
fn find_inflections(contour: &Contour, corners: &[bool], config: &ColoringConfig) -> Vec<bool> {
    let n = contour.len();
    let mut found = vec![false; n];
    let start = corners.iter().position(|c| *c);
    let steps = if start.is_some() { n } else { 2 * n };
    let start = start.unwrap_or(0);

    let mut memory: Option<(f64, usize)> = None;
    for step in 0..steps {
        let i = (start + step) % n;
        if corners[i] {
            memory = None;
        }

        let k = contour.edges[i].segment.curvature();
        if k.abs() < config.inflection_significance || k == 0.0 {
            if let Some((_, gap)) = memory.as_mut() {
                *gap += 1;
                if *gap >= config.inflection_window {
                    memory = None;
                }
            }
            continue;
        }

        if let Some((previous, _)) = memory
            && previous * k < 0.0
            && previous.abs().min(k.abs())
                >= config.inflection_relative_significance * previous.abs().max(k.abs())
        {
            found[i] = true;
        }
        memory = Some((k, 0));

        if step >= n {
            break;
        }
    }
    found
}

/// Drops boundaries that crowd each other: within a cluster closer than
/// `min_distance`, corners are all kept and inflections are discarded; a
/// cluster of inflections alone collapses to its middle member.
fn merge_close_boundaries(
    contour: &Contour,
    boundaries: &[ColorBoundary],
    min_distance: f64,
) -> Vec<ColorBoundary> {
    if boundaries.len() < 2 || min_distance <= 0.0 {
        return boundaries.to_vec();
    }

    let point = |b: &ColorBoundary| contour.edges[b.edge].segment.start();
    let mut clusters: Vec<Vec<ColorBoundary>> = Vec::new();
    for boundary in boundaries {
        match clusters.last_mut() {
            Some(cluster)
                if cluster
                    .last()
                    .is_some_and(|last| point(last).distance(point(boundary)) < min_distance) =>
            {
                cluster.push(*boundary);
            }
            _ => clusters.push(vec![*boundary]),
        }
    }
    if clusters.len() > 1 {
        let wraps = match (clusters.last().and_then(|c| c.last()), clusters[0].first()) {
            (Some(last), Some(first)) => point(last).distance(point(first)) < min_distance,
            _ => false,
        };
        if wraps {
            if let Some(tail) = clusters.pop() {
                let mut merged = tail;
                merged.extend(clusters[0].iter().copied());
                clusters[0] = merged;
            }
        }
    }

    let mut kept: Vec<ColorBoundary> = Vec::with_capacity(boundaries.len());
    for cluster in clusters {
        let corners: Vec<ColorBoundary> = cluster
            .iter()
            .copied()
            .filter(|b| b.kind == BoundaryKind::Corner)
            .collect();
        if corners.is_empty() {
            kept.push(cluster[cluster.len() / 2]);
        } else {
            kept.extend(corners);
        }
    }
    kept.sort_by_key(|b| b.edge);
    kept
}

/// Assigns a colour to every edge of `shape`.
///
/// Cubic edges are first split at significant internal inflections. The
/// result is deterministic for a given shape and configuration.
pub fn color_shape(shape: &mut Shape, config: &ColoringConfig) {
    profile_function!();

    let bounds = shape.bounds();
    let extent = bounds.width().max(bounds.height());
    let mut rng = ColorRng::new(config.seed);

    for contour in &mut shape.contours {
        if contour.is_empty() {
            continue;
        }
        contour.split_cubic_inflections(config.inflection_significance);

        let mut boundaries = find_color_boundaries(contour, config);
        let mut picker = match config.mode {
            ColoringMode::Simple => ColorPicker::Cycle {
                start: if contour.len() < 3 {
                    (config.seed % 3) as usize
                } else {
                    0
                },
            },
            ColoringMode::DistanceBased => {
                boundaries = merge_close_boundaries(
                    contour,
                    &boundaries,
                    config.distance_threshold * extent,
                );
                ColorPicker::Random(ColorRng::new(rng.next_u64()))
            }
        };

        match boundaries.len() {
            0 => color_smooth(contour, &mut picker),
            1 => color_teardrop(contour, boundaries[0].edge, &mut picker),
            _ => color_splines(contour, &boundaries, &mut picker),
        }
    }
}

/// Colours runs between boundaries, never reusing the first colour on the
/// last run so the wrap-around boundary stays visible.
fn color_splines(contour: &mut Contour, boundaries: &[ColorBoundary], picker: &mut ColorPicker) {
    let n = contour.len();
    let count = boundaries.len();
    let start = boundaries[0].edge;
    let initial = picker.first();
    let mut color = initial;
    let mut spline = 0;
    for i in 0..n {
        let index = (start + i) % n;
        if spline + 1 < count && boundaries[spline + 1].edge == index {
            spline += 1;
            let banned = (spline == count - 1).then_some(initial);
            color = picker.next(color, banned);
        }
        contour.edges[index].color = color;
    }
}

/// One boundary only: colours sweep through `[first, WHITE, last]` so the
/// boundary still separates two different colours.
fn color_teardrop(contour: &mut Contour, corner: usize, picker: &mut ColorPicker) {
    let first = picker.first();
    let last = picker.next(first, None);
    let colors = [first, EdgeColor::WHITE, last];

    let n = contour.len();
    if n >= 3 {
        for i in 0..n {
            let slot = (2.0625 + 2.875 * i as f64 / (n - 1) as f64) as usize - 2;
            contour.edges[(corner + i) % n].color = colors[slot.min(2)];
        }
        return;
    }

    // Too few edges to carry three colours: split every edge in thirds,
    // starting from the boundary.
    let mut parts = Vec::with_capacity(3 * n);
    for i in 0..n {
        let edge = contour.edges[(corner + i) % n];
        parts.extend(edge.segment.split_in_thirds());
    }
    let slots: &[usize] = if n == 1 {
        &[0, 1, 2]
    } else {
        &[0, 0, 1, 1, 2, 2]
    };
    contour.edges = parts
        .into_iter()
        .zip(slots)
        .map(|(segment, slot)| Edge::with_color(segment, colors[*slot]))
        .collect();
}

/// No boundary at all: split the longest edge in half and give the two
/// halves' runs distinct colours.
fn color_smooth(contour: &mut Contour, picker: &mut ColorPicker) {
    let Some(longest) = contour
        .edges
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            a.segment
                .length()
                .total_cmp(&b.segment.length())
                .then(ib.cmp(ia))
        })
        .map(|(i, _)| i)
    else {
        return;
    };

    let (head, tail) = contour.edges[longest].segment.split_at(0.5);
    contour.edges[longest] = Edge::new(head);
    contour.edges.insert(longest + 1, Edge::new(tail));

    let boundaries = [
        ColorBoundary {
            edge: longest,
            kind: BoundaryKind::Corner,
        },
        ColorBoundary {
            edge: longest + 1,
            kind: BoundaryKind::Corner,
        },
    ];
    color_splines(contour, &boundaries, picker);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::tests::polygon;
    use crate::edge::EdgeSegment;
    use astrelis_core::math::{DVec2, dvec2};

    fn em(x: f64, y: f64) -> DVec2 {
        dvec2(x / 1000.0, y / 1000.0)
    }

    /// Wave-topped block: one inflection at (300, 400) between two quadratics.
    fn wave_contour() -> Contour {
        let mut shape = Shape::from_contours(vec![Contour::from_segments([
            EdgeSegment::line(em(0.0, 0.0), em(0.0, 400.0)),
            EdgeSegment::quadratic(em(0.0, 400.0), em(150.0, 200.0), em(300.0, 400.0)),
            EdgeSegment::quadratic(em(300.0, 400.0), em(450.0, 600.0), em(600.0, 400.0)),
            EdgeSegment::line(em(600.0, 400.0), em(600.0, 0.0)),
            EdgeSegment::line(em(600.0, 0.0), em(0.0, 0.0)),
        ])]);
        shape.normalize();
        shape.contours.remove(0)
    }

    fn boundary_points(contour: &Contour, config: &ColoringConfig) -> Vec<(DVec2, BoundaryKind)> {
        find_color_boundaries(contour, config)
            .into_iter()
            .map(|b| (contour.edges[b.edge].segment.start(), b.kind))
            .collect()
    }

    fn assert_valid_coloring(contour: &Contour, config: &ColoringConfig) {
        let n = contour.len();
        for edge in &contour.edges {
            assert_ne!(edge.color, EdgeColor::BLACK, "every edge gets a colour");
        }
        for i in 0..n {
            let prev = contour.edges[(i + n - 1) % n];
            let cur = contour.edges[i];
            if is_corner(prev, cur, config.corner_angle_threshold) {
                assert_ne!(prev.color, cur.color, "corner at edge {i} shares a colour");
            }
        }
        let first = contour.edges[0].color;
        assert!(
            contour.edges.iter().any(|e| e.color != first),
            "a contour needs at least two colours"
        );
    }

    #[test]
    fn test_corner_detection_on_square() {
        let square = polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let boundaries = find_color_boundaries(&square, &ColoringConfig::default());
        assert_eq!(boundaries.len(), 4);
        assert!(boundaries.iter().all(|b| b.kind == BoundaryKind::Corner));
    }

    #[test]
    fn test_shallow_turn_is_not_a_corner() {
        // 5 degree bend: below the default threshold of ~8 degrees.
        let bend = 5f64.to_radians();
        let contour = Contour::from_segments([
            EdgeSegment::line(dvec2(0.0, 0.0), dvec2(1.0, 0.0)),
            EdgeSegment::line(dvec2(1.0, 0.0), dvec2(1.0 + bend.cos(), bend.sin())),
            EdgeSegment::line(dvec2(1.0 + bend.cos(), bend.sin()), dvec2(0.0, 0.0)),
        ]);
        let boundaries = find_color_boundaries(&contour, &ColoringConfig::default());
        assert!(!boundaries.iter().any(|b| b.edge == 1));
        assert!(boundaries.iter().any(|b| b.edge == 0));
        assert!(boundaries.iter().any(|b| b.edge == 2));
    }

    #[test]
    fn test_acute_threshold_keeps_obtuse_vertex_smooth() {
        // Isosceles triangle: 100 degrees at the start of edge 1, 40 at the others.
        let apex = DVec2::from_angle(100f64.to_radians());
        let triangle = Contour::from_segments([
            EdgeSegment::line(dvec2(1.0, 0.0), DVec2::ZERO),
            EdgeSegment::line(DVec2::ZERO, apex),
            EdgeSegment::line(apex, dvec2(1.0, 0.0)),
        ]);
        let edges = |config: &ColoringConfig| {
            find_color_boundaries(&triangle, config)
                .iter()
                .map(|b| b.edge)
                .collect::<Vec<_>>()
        };

        let acute = ColoringConfig::default().with_corner_angle_threshold(1.0);
        assert!(acute.validate().is_ok());
        assert_eq!(edges(&acute), vec![0, 2]);
        assert_eq!(
            edges(&ColoringConfig::default().with_corner_angle_threshold(1.9)),
            vec![0, 1, 2]
        );
        assert_eq!(edges(&ColoringConfig::default()), vec![0, 1, 2]);
    }

    #[test]
    fn test_s_curve_gets_boundary_at_inflection() {
        let contour = wave_contour();
        let points = boundary_points(&contour, &ColoringConfig::default());

        let inflections: Vec<DVec2> = points
            .iter()
            .filter(|(_, kind)| *kind == BoundaryKind::Inflection)
            .map(|(p, _)| *p)
            .collect();
        assert_eq!(inflections.len(), 1, "boundaries: {points:?}");
        assert!((inflections[0] - em(300.0, 400.0)).length() < 1e-12);

        let corners = points
            .iter()
            .filter(|(_, kind)| *kind == BoundaryKind::Corner)
            .count();
        assert_eq!(corners, 4);
    }

    #[test]
    fn test_s_curve_colors_differ_across_inflection() {
        for mode in [ColoringMode::Simple, ColoringMode::DistanceBased] {
            let config = ColoringConfig::default().with_mode(mode).with_seed(11);
            let mut shape = Shape::from_contours(vec![wave_contour()]);
            color_shape(&mut shape, &config);
            let contour = &shape.contours[0];
            let n = contour.len();
            let at = contour
                .edges
                .iter()
                .position(|e| (e.segment.start() - em(300.0, 400.0)).length() < 1e-12)
                .unwrap();
            assert_ne!(contour.edges[at].color, contour.edges[(at + n - 1) % n].color);
            assert_valid_coloring(contour, &config);
        }
    }

    #[test]
    fn test_straight_piece_does_not_mask_inflection() {
        // Curve, short straight run, opposite curve: the reversal is reported
        // at the start of the second curve.
        let mut shape = Shape::from_contours(vec![Contour::from_segments([
            EdgeSegment::line(em(0.0, 0.0), em(0.0, 400.0)),
            EdgeSegment::quadratic(em(0.0, 400.0), em(150.0, 200.0), em(300.0, 400.0)),
            EdgeSegment::line(em(300.0, 400.0), em(330.0, 440.0)),
            EdgeSegment::quadratic(em(330.0, 440.0), em(480.0, 640.0), em(630.0, 440.0)),
            EdgeSegment::line(em(630.0, 440.0), em(630.0, 0.0)),
            EdgeSegment::line(em(630.0, 0.0), em(0.0, 0.0)),
        ])]);
        shape.normalize();
        let contour = &shape.contours[0];
        let inflections: Vec<DVec2> = boundary_points(contour, &ColoringConfig::default())
            .into_iter()
            .filter(|(_, kind)| *kind == BoundaryKind::Inflection)
            .map(|(p, _)| p)
            .collect();
        assert_eq!(inflections.len(), 1);
        // Reversed orientation walks the wave right to left.
        assert!((inflections[0] - em(300.0, 400.0)).length() < 1e-12);
    }

    #[test]
    fn test_lookback_window_limits_memory() {
        // Two opposite curves joined by `gap` straight pieces along their
        // shared tangent, closed by a box underneath.
        let contour_with_gap = |gap: usize| {
            let along = |i: usize| dvec2(1.0 + 0.1 * i as f64, -0.1 * i as f64);
            let mut segments = vec![EdgeSegment::quadratic(
                dvec2(0.0, 0.0),
                dvec2(0.5, 0.5),
                dvec2(1.0, 0.0),
            )];
            for i in 0..gap {
                segments.push(EdgeSegment::line(along(i), along(i + 1)));
            }
            let p = along(gap);
            segments.push(EdgeSegment::quadratic(
                p,
                p + dvec2(0.5, -0.5),
                p + dvec2(1.0, 0.0),
            ));
            segments.push(EdgeSegment::line(p + dvec2(1.0, 0.0), dvec2(p.x + 1.0, -5.0)));
            segments.push(EdgeSegment::line(dvec2(p.x + 1.0, -5.0), dvec2(0.0, -5.0)));
            segments.push(EdgeSegment::line(dvec2(0.0, -5.0), dvec2(0.0, 0.0)));
            Contour::from_segments(segments)
        };

        let config = ColoringConfig::default();
        let inflection_count = |gap: usize| {
            find_color_boundaries(&contour_with_gap(gap), &config)
                .iter()
                .filter(|b| b.kind == BoundaryKind::Inflection)
                .count()
        };
        assert_eq!(inflection_count(0), 1);
        assert_eq!(inflection_count(4), 1);
        assert_eq!(inflection_count(5), 0, "curved edge is forgotten after the window");
        assert_eq!(
            find_color_boundaries(&contour_with_gap(5), &config.with_inflection_window(6))
                .iter()
                .filter(|b| b.kind == BoundaryKind::Inflection)
                .count(),
            1
        );
    }

    #[test]
    fn test_noise_level_curvature_does_not_trigger() {
        let contour = Contour::from_segments([
            EdgeSegment::quadratic(dvec2(0.0, 0.0), dvec2(0.5, 1e-4), dvec2(1.0, 0.0)),
            EdgeSegment::quadratic(dvec2(1.0, 0.0), dvec2(1.5, -1e-4), dvec2(2.0, 0.0)),
            EdgeSegment::line(dvec2(2.0, 0.0), dvec2(2.0, -1.0)),
            EdgeSegment::line(dvec2(2.0, -1.0), dvec2(0.0, -1.0)),
            EdgeSegment::line(dvec2(0.0, -1.0), dvec2(0.0, 0.0)),
        ]);
        let boundaries = find_color_boundaries(&contour, &ColoringConfig::default());
        assert!(
            boundaries.iter().all(|b| b.kind == BoundaryKind::Corner),
            "{boundaries:?}"
        );
    }

    #[test]
    fn test_negligible_reversal_next_to_strong_curve_is_ignored() {
        // A 90 degree quadratic followed, tangent-continuous, by one that bends
        // back by a fraction of a percent of that.
        let leg = dvec2(0.5, -0.5);
        let joint = dvec2(1.0, 0.0);
        let weak_end = joint + leg + DVec2::from_angle(0.005).rotate(leg);
        let contour = Contour::from_segments([
            EdgeSegment::quadratic(DVec2::ZERO, dvec2(0.5, 0.5), joint),
            EdgeSegment::quadratic(joint, joint + leg, weak_end),
            EdgeSegment::line(weak_end, dvec2(weak_end.x, -5.0)),
            EdgeSegment::line(dvec2(weak_end.x, -5.0), dvec2(0.0, -5.0)),
            EdgeSegment::line(dvec2(0.0, -5.0), DVec2::ZERO),
        ]);
        assert!(contour.edges[0].segment.curvature() < -0.99);
        let weak = contour.edges[1].segment.curvature();
        assert!(weak > 0.001 && weak < 0.01, "weak curvature {weak}");

        let inflections = |config: &ColoringConfig| {
            find_color_boundaries(&contour, config)
                .iter()
                .filter(|b| b.kind == BoundaryKind::Inflection)
                .map(|b| b.edge)
                .collect::<Vec<_>>()
        };
        let config = ColoringConfig::default().with_inflection_significance(0.001);
        assert!(inflections(&config).is_empty());
        assert_eq!(
            inflections(&config.with_inflection_relative_significance(0.0)),
            vec![1]
        );
    }

    #[test]
    fn test_simple_mode_cycles_palette() {
        let mut shape = Shape::from_contours(vec![polygon(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
        ])]);
        color_shape(&mut shape, &ColoringConfig::default());
        let colors: Vec<EdgeColor> = shape.contours[0].edges.iter().map(|e| e.color).collect();
        assert_eq!(
            colors,
            vec![
                EdgeColor::CYAN,
                EdgeColor::MAGENTA,
                EdgeColor::YELLOW,
                EdgeColor::MAGENTA
            ]
        );
    }

    #[test]
    fn test_smooth_contour_is_split_into_two_colors() {
        let circle = |r: f64| {
            let k = 4.0 / 3.0 * (2f64.sqrt() - 1.0) * r;
            Contour::from_segments([
                EdgeSegment::cubic(dvec2(r, 0.0), dvec2(r, k), dvec2(k, r), dvec2(0.0, r)),
                EdgeSegment::cubic(dvec2(0.0, r), dvec2(-k, r), dvec2(-r, k), dvec2(-r, 0.0)),
                EdgeSegment::cubic(dvec2(-r, 0.0), dvec2(-r, -k), dvec2(-k, -r), dvec2(0.0, -r)),
                EdgeSegment::cubic(dvec2(0.0, -r), dvec2(k, -r), dvec2(r, -k), dvec2(r, 0.0)),
            ])
        };
        for mode in [ColoringMode::Simple, ColoringMode::DistanceBased] {
            let config = ColoringConfig::default().with_mode(mode);
            assert!(find_color_boundaries(&circle(1.0), &config).is_empty());

            let mut shape = Shape::from_contours(vec![circle(1.0)]);
            color_shape(&mut shape, &config);
            let contour = &shape.contours[0];
            assert_eq!(contour.len(), 5);
            assert!(contour.is_closed(1e-12));
            assert_valid_coloring(contour, &config);
        }
    }

    #[test]
    fn test_teardrop_with_few_edges() {
        // A looped cubic meets itself at a single corner.
        let drop = Contour::from_segments([
            EdgeSegment::cubic(
                dvec2(0.0, 0.0),
                dvec2(2.0, 1.0),
                dvec2(2.0, -1.0),
                dvec2(0.0, 0.0),
            ),
        ]);
        let config = ColoringConfig::default();
        assert_eq!(find_color_boundaries(&drop, &config).len(), 1);

        let mut shape = Shape::from_contours(vec![drop]);
        color_shape(&mut shape, &config);
        let contour = &shape.contours[0];
        assert_eq!(contour.len(), 3);
        assert_eq!(contour.edges[1].color, EdgeColor::WHITE);
        assert_ne!(contour.edges[0].color, contour.edges[2].color);
        assert!(contour.is_closed(1e-9));
    }

    #[test]
    fn test_teardrop_slot_formula() {
        let mut contour = Contour::from_segments([
            EdgeSegment::cubic(
                dvec2(0.0, 0.0),
                dvec2(2.0, 1.0),
                dvec2(2.0, -1.0),
                dvec2(0.0, 0.0),
            ),
        ]);
        let parts = contour.edges[0].segment.split_in_thirds();
        contour.edges = parts.into_iter().map(Edge::new).collect();
        let (a, b) = contour.edges[2].segment.split_at(0.5);
        contour.edges[2] = Edge::new(a);
        contour.edges.push(Edge::new(b));

        let mut picker = ColorPicker::Cycle { start: 0 };
        color_teardrop(&mut contour, 0, &mut picker);
        let colors: Vec<EdgeColor> = contour.edges.iter().map(|e| e.color).collect();
        assert_eq!(
            colors,
            vec![
                EdgeColor::CYAN,
                EdgeColor::WHITE,
                EdgeColor::WHITE,
                EdgeColor::MAGENTA
            ]
        );
    }

    #[test]
    fn test_distance_based_merges_nearby_inflections() {
        let contour = Contour::from_segments([
            EdgeSegment::line(dvec2(0.0, 0.0), dvec2(1.0, 0.0)),
            EdgeSegment::line(dvec2(1.0, 0.0), dvec2(1.0, 1.0)),
            EdgeSegment::line(dvec2(1.0, 1.0), dvec2(0.0, 1.0)),
            EdgeSegment::line(dvec2(0.0, 1.0), dvec2(0.0, 0.0)),
        ]);
        let boundaries = vec![
            ColorBoundary {
                edge: 0,
                kind: BoundaryKind::Corner,
            },
            ColorBoundary {
                edge: 1,
                kind: BoundaryKind::Inflection,
            },
            ColorBoundary {
                edge: 2,
                kind: BoundaryKind::Inflection,
            },
            ColorBoundary {
                edge: 3,
                kind: BoundaryKind::Corner,
            },
        ];
        // Everything is within reach: inflections vanish, corners stay.
        let merged = merge_close_boundaries(&contour, &boundaries, 2.0);
        assert_eq!(
            merged.iter().map(|b| b.edge).collect::<Vec<_>>(),
            vec![0, 3]
        );
        // Nothing is within reach.
        assert_eq!(merge_close_boundaries(&contour, &boundaries, 0.5), boundaries);
    }

    #[test]
    fn test_coloring_is_deterministic() {
        let config = ColoringConfig::default()
            .with_mode(ColoringMode::DistanceBased)
            .with_seed(1234);
        let mut a = Shape::from_contours(vec![wave_contour()]);
        let mut b = a.clone();
        color_shape(&mut a, &config);
        color_shape(&mut b, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_config_validation() {
        assert!(ColoringConfig::default().validate().is_ok());
        assert!(
            ColoringConfig::default()
                .with_corner_angle_threshold(0.0)
                .validate()
                .is_err()
        );
        assert!(
            ColoringConfig::default()
                .with_inflection_window(0)
                .validate()
                .is_err()
        );
        assert!(
            ColoringConfig::default()
                .with_distance_threshold(f64::NAN)
                .validate()
                .is_err()
        );
        assert!(
            ColoringConfig::default()
                .with_inflection_relative_significance(1.5)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_for_glyph_changes_seed_per_codepoint() {
        let config = ColoringConfig::default().with_seed(7);
        assert_ne!(config.for_glyph('A').seed, config.for_glyph('B').seed);
        assert_eq!(config.for_glyph('A'), config.for_glyph('A'));
        assert_eq!(config.for_glyph('A').mode, config.mode);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: ColoringConfig =
            serde_json::from_str(r#"{"mode":"distance_based","seed":3}"#).unwrap();
        assert_eq!(config.mode, ColoringMode::DistanceBased);
        assert_eq!(config.seed, 3);
        assert_eq!(config.inflection_window, 5);
    }
}
