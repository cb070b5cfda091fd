//! Same-winding overlap correction.
//!
//! Fonts built from overlapping strokes carry contours that share a winding
//! and cover each other. Where such contours cross, edges of the same colour
//! from both contours fight over the same channel, and an edge buried inside
//! the union still pulls the plain per-channel minimum towards "outside".
//!
//! Correction is best-effort and never fails:
//! * a contour lying entirely inside the fill of the others is dropped;
//! * otherwise the later contour of each overlapping pair gets the channel
//!   permutation that leaves the fewest same-coloured edges facing each
//!   other in the overlap region.
//!
//! Pairs that still collide are reported in [`OverlapReport`]. Rasterising
//! with the overlap-aware combiner handles the inside/outside sign.

use astrelis_core::math::DVec2;
use astrelis_core::profiling::profile_function;

use crate::contour::{Contour, Shape, polyline_winding_number};
use crate::edge::{Bounds, Edge, EdgeSegment};

/// Every ordering of the three channels, identity first.
const PERMUTATIONS: [[usize; 3]; 6] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
];

const SAMPLES_PER_EDGE: usize = 8;

/// Outcome of overlap correction for one glyph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapReport {
    /// Same-winding contour pairs whose bounds overlap.
    pub overlapping_pairs: usize,
    /// Colliding edge pairs across all overlapping pairs before any recolouring.
    pub initial_collisions: usize,
    /// Indices (into the uncorrected shape) of contours dropped as redundant.
    pub removed_contours: Vec<usize>,
    /// Indices (into the uncorrected shape) of contours whose colours were permuted.
    pub recolored_contours: Vec<usize>,
    /// Pairs whose colours still collide near the overlap.
    pub unresolved_pairs: Vec<(usize, usize)>,
}

impl OverlapReport {
    pub fn has_overlaps(&self) -> bool {
        self.overlapping_pairs > 0
    }

    pub fn is_fully_corrected(&self) -> bool {
        self.unresolved_pairs.is_empty()
    }
}

/// Corrects same-winding overlaps in an already coloured `shape`.
///
/// `reach` is the em distance over which the distance field is resolved
/// (the pixel range divided by the pixels-per-em scale); only edges that cross
/// or come this close to each other inside the overlap region count as
/// colliding.
pub fn correct_overlaps(shape: &mut Shape, reach: f64) -> OverlapReport {
    profile_function!();

    let mut report = OverlapReport::default();
    let count = shape.contours.len();
    if count < 2 {
        return report;
    }

    let windings: Vec<i32> = shape.contours.iter().map(Contour::winding).collect();
    let bounds: Vec<Bounds> = shape.contours.iter().map(Contour::bounds).collect();
    let polylines: Vec<Vec<DVec2>> = shape.contours.iter().map(Contour::flatten).collect();

    let mut pairs = Vec::new();
    for i in 0..count {
        for j in i + 1..count {
            if windings[i] != 0 && windings[i] == windings[j] && bounds[i].overlaps(&bounds[j]) {
                pairs.push((i, j));
            }
        }
    }
    report.overlapping_pairs = pairs.len();
    if pairs.is_empty() {
        return report;
    }

    let mut removed = vec![false; count];
    for &(i, j) in &pairs {
        for candidate in [j, i] {
            if !removed[candidate] && is_buried(candidate, &polylines, &removed) {
                removed[candidate] = true;
                tracing::debug!(contour = candidate, "dropping redundant overlapping contour");
                break;
            }
        }
    }

    let mut recolored = vec![false; count];
    for &(i, j) in &pairs {
        if removed[i] || removed[j] {
            continue;
        }
        let region = bounds[i].intersection(&bounds[j]).expanded(reach);
        let fixed = &shape.contours[i].edges;
        let moving = &shape.contours[j].edges;

        let scores: Vec<([usize; 3], usize)> = PERMUTATIONS
            .iter()
            .map(|permutation| {
                (
                    *permutation,
                    count_collisions(fixed, moving, *permutation, &region, reach),
                )
            })
            .collect();
        report.initial_collisions += scores[0].1;
        let (best, collisions) = scores
            .iter()
            .copied()
            .min_by_key(|(_, collisions)| *collisions)
            .unwrap_or((PERMUTATIONS[0], 0));

        if best != PERMUTATIONS[0] {
            for edge in &mut shape.contours[j].edges {
                edge.color = edge.color.permuted(best);
            }
            recolored[j] = true;
        }
        if collisions > 0 {
            report.unresolved_pairs.push((i, j));
        }
    }

    report.removed_contours = (0..count).filter(|i| removed[*i]).collect();
    report.recolored_contours = (0..count).filter(|i| recolored[*i]).collect();

    let mut index = 0;
    shape.contours.retain(|_| {
        let keep = !removed[index];
        index += 1;
        keep
    });

    report
}

/// Whether every point of contour `index` lies inside the fill of the other
/// remaining contours.
fn is_buried(index: usize, polylines: &[Vec<DVec2>], removed: &[bool]) -> bool {
    let others = |p: DVec2| {
        polylines
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != index && !removed[*k])
            .map(|(_, line)| polyline_winding_number(line, p))
            .sum::<i32>()
            != 0
    };
    !polylines[index].is_empty() && polylines[index].iter().all(|p| others(*p))
}

/// Evenly spaced points along `segment`, both ends included.
fn sample_points(segment: &EdgeSegment) -> Vec<DVec2> {
    (0..=SAMPLES_PER_EDGE)
        .map(|i| segment.point_at(i as f64 / SAMPLES_PER_EDGE as f64))
        .collect()
}

/// Crossing point of segments `a0..a1` and `b0..b1`, if any.
fn crossing(a0: DVec2, a1: DVec2, b0: DVec2, b1: DVec2) -> Option<DVec2> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denominator = da.perp_dot(db);
    if denominator.abs() < 1e-15 {
        return None;
    }
    let offset = b0 - a0;
    let t = offset.perp_dot(db) / denominator;
    let u = offset.perp_dot(da) / denominator;
    ((0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)).then(|| a0 + da * t)
}

/// Whether two edges, given with their sample points, cross or come within
/// `reach` of each other inside `region`.
fn edges_collide(
    a: (&EdgeSegment, &[DVec2]),
    b: (&EdgeSegment, &[DVec2]),
    region: &Bounds,
    reach: f64,
) -> bool {
    let near = |points: &[DVec2], other: &EdgeSegment| {
        points
            .iter()
            .filter(|p| region.contains(**p))
            .any(|p| other.signed_distance(*p).0.distance.abs() < reach)
    };
    if near(a.1, b.0) || near(b.1, a.0) {
        return true;
    }
    a.1.windows(2).any(|u| {
        b.1.windows(2).any(|v| {
            crossing(u[0], u[1], v[0], v[1]).is_some_and(|p| region.contains(p))
        })
    })
}

/// Same-coloured edge pairs that collide inside `region`, with `permutation`
/// applied to the moving contour.
fn count_collisions(
    fixed: &[Edge],
    moving: &[Edge],
    permutation: [usize; 3],
    region: &Bounds,
    reach: f64,
) -> usize {
    let fixed_samples: Vec<(&Edge, Vec<DVec2>)> = fixed
        .iter()
        .map(|edge| (edge, sample_points(&edge.segment)))
        .collect();

    let mut collisions = 0;
    for edge in moving {
        let color = edge.color.permuted(permutation);
        let samples = sample_points(&edge.segment);
        for (other, other_samples) in &fixed_samples {
            if other.color != color {
                continue;
            }
            if edges_collide(
                (&edge.segment, samples.as_slice()),
                (&other.segment, other_samples.as_slice()),
                region,
                reach,
            ) {
                collisions += 1;
            }
        }
    }
    collisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::EdgeColor;
    use crate::coloring::{ColoringConfig, color_shape};
    use crate::contour::tests::polygon;

    fn rect(left: f64, bottom: f64, right: f64, top: f64) -> Contour {
        polygon(&[(left, bottom), (right, bottom), (right, top), (left, top)])
    }

    fn hole(left: f64, bottom: f64, right: f64, top: f64) -> Contour {
        polygon(&[(left, bottom), (left, top), (right, top), (right, bottom)])
    }

    fn colored(contours: Vec<Contour>) -> Shape {
        let mut shape = Shape::from_contours(contours);
        shape.normalize();
        color_shape(&mut shape, &ColoringConfig::default());
        shape
    }

    #[test]
    fn test_disjoint_and_nested_hole_are_not_overlaps() {
        let mut shape = colored(vec![rect(0.0, 0.0, 0.3, 0.3), rect(0.5, 0.0, 0.8, 0.3)]);
        let report = correct_overlaps(&mut shape, 0.05);
        assert!(!report.has_overlaps());

        // Ring: outer and hole have opposite windings.
        let mut ring = colored(vec![rect(0.0, 0.0, 1.0, 1.0), hole(0.2, 0.2, 0.8, 0.8)]);
        let report = correct_overlaps(&mut ring, 0.05);
        assert!(!report.has_overlaps());
        assert_eq!(ring.contours.len(), 2);
    }

    fn is_horizontal(edge: &Edge) -> bool {
        (edge.segment.start().y - edge.segment.end().y).abs() < 1e-12
    }

    #[test]
    fn test_crossing_bars_get_distinct_colors() {
        // A plus sign drawn as two overlapping bars. The long sides of both
        // bars start out cyan and cross inside the overlap.
        let mut shape =
            Shape::from_contours(vec![rect(0.05, 0.3, 0.65, 0.4), rect(0.3, 0.05, 0.4, 0.65)]);
        shape.normalize();
        for edge in &mut shape.contours[0].edges {
            edge.color = if is_horizontal(edge) {
                EdgeColor::CYAN
            } else {
                EdgeColor::YELLOW
            };
        }
        for edge in &mut shape.contours[1].edges {
            edge.color = if is_horizontal(edge) {
                EdgeColor::MAGENTA
            } else {
                EdgeColor::CYAN
            };
        }

        let report = correct_overlaps(&mut shape, 0.08);
        assert_eq!(report.overlapping_pairs, 1);
        assert_eq!(report.initial_collisions, 4);
        assert!(report.removed_contours.is_empty());
        assert_eq!(report.recolored_contours, vec![1]);
        assert!(report.is_fully_corrected(), "{report:?}");
        assert_eq!(shape.contours.len(), 2);
        for edge in shape.contours[1].edges.iter().filter(|e| !is_horizontal(e)) {
            assert_ne!(edge.color, EdgeColor::CYAN);
        }
    }

    #[test]
    fn test_straight_edges_crossing_between_samples_collide() {
        // The crossing near (0.53, 0.53) falls between sample points, and no
        // sample is within reach of the other line.
        let a = EdgeSegment::line(DVec2::new(0.0, 0.0), DVec2::new(1.0, 1.0));
        let b = EdgeSegment::line(DVec2::new(0.0, 0.9), DVec2::new(1.0, 0.2));
        let (sa, sb) = (sample_points(&a), sample_points(&b));
        assert_eq!(sa.len(), SAMPLES_PER_EDGE + 1);
        let (a, b) = ((&a, sa.as_slice()), (&b, sb.as_slice()));

        let square = |size: f64| Bounds {
            left: 0.0,
            bottom: 0.0,
            right: size,
            top: size,
        };
        assert!(edges_collide(a, b, &square(1.0), 1e-3));
        assert!(!edges_collide(a, b, &square(0.2), 1e-3));
    }

    #[test]
    fn test_buried_contour_is_removed() {
        let mut shape = colored(vec![rect(0.0, 0.0, 1.0, 1.0), rect(0.3, 0.3, 0.6, 0.6)]);
        // Same winding as the outer contour: a redundant island.
        assert_eq!(shape.contours[1].winding(), 1);
        let report = correct_overlaps(&mut shape, 0.05);
        assert_eq!(report.overlapping_pairs, 1);
        assert_eq!(report.removed_contours, vec![1]);
        assert_eq!(shape.contours.len(), 1);
    }

    #[test]
    fn test_island_inside_hole_is_kept() {
        let mut shape = colored(vec![
            rect(0.0, 0.0, 1.0, 1.0),
            hole(0.1, 0.1, 0.9, 0.9),
            rect(0.4, 0.4, 0.6, 0.6),
        ]);
        let windings: Vec<i32> = shape.contours.iter().map(Contour::winding).collect();
        assert_eq!(windings, vec![1, -1, 1]);

        let report = correct_overlaps(&mut shape, 0.05);
        assert_eq!(report.overlapping_pairs, 1);
        assert!(report.removed_contours.is_empty());
        assert!(report.is_fully_corrected());
        assert_eq!(shape.contours.len(), 3);
    }

    #[test]
    fn test_white_edges_cannot_be_corrected() {
        let mut shape =
            Shape::from_contours(vec![rect(0.0, 0.0, 0.6, 0.6), rect(0.4, 0.4, 1.0, 1.0)]);
        shape.normalize();
        for contour in &mut shape.contours {
            for edge in &mut contour.edges {
                edge.color = EdgeColor::WHITE;
            }
        }
        let report = correct_overlaps(&mut shape, 0.1);
        assert!(report.initial_collisions > 0);
        assert_eq!(report.unresolved_pairs, vec![(0, 1)]);
        assert!(!report.is_fully_corrected());
        assert!(report.recolored_contours.is_empty());
    }
}
