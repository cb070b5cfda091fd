//! Contours and glyph shapes.

use astrelis_core::math::DVec2;

use crate::edge::{Bounds, Edge, EdgeSegment};

/// Polyline resolution used for winding and area queries.
const FLATTEN_STEPS: usize = 16;

/// Offset of the inside/outside probes used to orient contours, in em.
const ORIENTATION_PROBE: f64 = 1e-3;

/// Closed loop of edges. The end of each edge is the start of the next, and
/// the last edge ends where the first one starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    pub edges: Vec<Edge>,
}

impl Contour {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: impl IntoIterator<Item = EdgeSegment>) -> Self {
        Self {
            edges: segments.into_iter().map(Edge::new).collect(),
        }
    }

    pub fn push(&mut self, segment: EdgeSegment) {
        self.edges.push(Edge::new(segment));
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether consecutive edges meet within `tolerance`, wrapping around.
    pub fn is_closed(&self, tolerance: f64) -> bool {
        let n = self.edges.len();
        (0..n).all(|i| {
            let next = &self.edges[(i + 1) % n];
            self.edges[i].segment.end().distance(next.segment.start()) <= tolerance
        })
    }

    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::EMPTY;
        for edge in &self.edges {
            edge.segment.extend_bounds(&mut bounds);
        }
        bounds
    }

    /// Closed polyline approximation; the first point is not repeated.
    pub fn flatten(&self) -> Vec<DVec2> {
        let mut points = Vec::with_capacity(self.edges.len() * FLATTEN_STEPS);
        if let Some(last) = self.edges.last() {
            points.push(last.segment.end());
        }
        for edge in &self.edges {
            edge.segment.flatten_into(FLATTEN_STEPS, &mut points);
        }
        points.pop();
        points
    }

    /// Shoelace area; positive for counter-clockwise contours.
    pub fn signed_area(&self) -> f64 {
        let points = self.flatten();
        let n = points.len();
        if n < 3 {
            return 0.0;
        }
        0.5 * (0..n)
            .map(|i| points[i].perp_dot(points[(i + 1) % n]))
            .sum::<f64>()
    }

    /// `1` for counter-clockwise, `-1` for clockwise, `0` for degenerate.
    pub fn winding(&self) -> i32 {
        let area = self.signed_area();
        if area > 0.0 {
            1
        } else if area < 0.0 {
            -1
        } else {
            0
        }
    }

    pub fn winding_number(&self, p: DVec2) -> i32 {
        polyline_winding_number(&self.flatten(), p)
    }

    pub fn reverse(&mut self) {
        self.edges.reverse();
        for edge in &mut self.edges {
            edge.segment = edge.segment.reversed();
        }
    }

    /// Splits cubic edges at internal inflection points whose turning on
    /// either side reaches `significance`.
    pub fn split_cubic_inflections(&mut self, significance: f64) {
        if !self
            .edges
            .iter()
            .any(|edge| matches!(edge.segment, EdgeSegment::Cubic(_)))
        {
            return;
        }

        let mut edges = Vec::with_capacity(self.edges.len() + 2);
        for edge in &self.edges {
            let mut remaining = edge.segment;
            let mut consumed = 0.0;
            for t in edge.segment.inflection_params() {
                let local = (t - consumed) / (1.0 - consumed);
                let (left, right) = remaining.split_at(local);
                let (k_left, k_right) = (left.curvature(), right.curvature());
                if k_left * k_right < 0.0 && k_left.abs().max(k_right.abs()) >= significance {
                    edges.push(Edge::with_color(left, edge.color));
                    remaining = right;
                    consumed = t;
                }
            }
            edges.push(Edge::with_color(remaining, edge.color));
        }
        self.edges = edges;
    }
}

/// A glyph outline: zero or more contours in em space, y up.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub contours: Vec<Contour>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_contours(contours: Vec<Contour>) -> Self {
        Self { contours }
    }

    /// True when the shape has no edges at all (a space, for instance).
    pub fn is_empty(&self) -> bool {
        self.contours.iter().all(Contour::is_empty)
    }

    pub fn edge_count(&self) -> usize {
        self.contours.iter().map(Contour::len).sum()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.contours.iter().flat_map(|contour| contour.edges.iter())
    }

    pub fn bounds(&self) -> Bounds {
        self.contours
            .iter()
            .fold(Bounds::EMPTY, |acc, contour| acc.union(&contour.bounds()))
    }

    pub fn is_closed(&self, tolerance: f64) -> bool {
        self.contours.iter().all(|c| c.is_closed(tolerance))
    }

    /// Non-zero winding number of `p` against every contour.
    pub fn winding_number(&self, p: DVec2) -> i32 {
        self.contours.iter().map(|c| c.winding_number(p)).sum()
    }

    pub fn contains(&self, p: DVec2) -> bool {
        self.winding_number(p) != 0
    }

    /// True Euclidean distance to the outline, negative inside.
    pub fn signed_distance(&self, p: DVec2) -> f64 {
        let nearest = self
            .edges()
            .map(|edge| edge.segment.signed_distance(p).0.distance.abs())
            .fold(f64::MAX, f64::min);
        if self.contains(p) { -nearest } else { nearest }
    }

    /// Drops degenerate edges and empty contours, then orients every contour
    /// so the filled region lies on its left.
    pub fn normalize(&mut self) {
        for contour in &mut self.contours {
            contour.edges.retain(|edge| !edge.segment.is_degenerate());
        }
        self.contours.retain(|contour| !contour.is_empty());
        self.orient_contours();
    }

    /// Reverses contours whose filled side is on the right.
    ///
    /// Each contour is probed on both sides of its longest edges against the
    /// non-zero fill of the shape as extracted. The first edge that separates
    /// filled from unfilled space decides; contours buried entirely inside
    /// other fill are left as they are.
    pub fn orient_contours(&mut self) {
        let polylines: Vec<Vec<DVec2>> = self.contours.iter().map(Contour::flatten).collect();
        let fill = |p: DVec2| {
            polylines
                .iter()
                .map(|line| polyline_winding_number(line, p))
                .sum::<i32>()
                != 0
        };

        let mut reverse = vec![false; self.contours.len()];
        for (index, contour) in self.contours.iter().enumerate() {
            let mut order: Vec<usize> = (0..contour.len()).collect();
            let lengths: Vec<f64> = contour.edges.iter().map(|e| e.segment.length()).collect();
            order.sort_by(|a, b| lengths[*b].total_cmp(&lengths[*a]));

            for edge_index in order {
                let segment = &contour.edges[edge_index].segment;
                let Some(dir) = segment.direction(0.5).try_normalize() else {
                    continue;
                };
                let normal = dir.perp();
                let mid = segment.point_at(0.5);
                let left = fill(mid + normal * ORIENTATION_PROBE);
                let right = fill(mid - normal * ORIENTATION_PROBE);
                if left != right {
                    reverse[index] = right;
                    break;
                }
            }
        }

        for (contour, reverse) in self.contours.iter_mut().zip(reverse) {
            if reverse {
                contour.reverse();
            }
        }
    }
}

/// Crossing-number winding of a closed polyline around `p`.
pub(crate) fn polyline_winding_number(points: &[DVec2], p: DVec2) -> i32 {
    let n = points.len();
    let mut winding = 0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let side = (b - a).perp_dot(p - a);
        if a.y <= p.y {
            if b.y > p.y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= p.y && side < 0.0 {
            winding -= 1;
        }
    }
    winding
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use astrelis_core::math::dvec2;

    pub(crate) fn polygon(points: &[(f64, f64)]) -> Contour {
        let n = points.len();
        Contour::from_segments((0..n).map(|i| {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % n];
            EdgeSegment::line(dvec2(x0, y0), dvec2(x1, y1))
        }))
    }

    /// Square ring in TrueType orientation: clockwise outer, counter-clockwise hole.
    fn clockwise_ring() -> Shape {
        Shape::from_contours(vec![
            polygon(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]),
            polygon(&[(0.25, 0.25), (0.75, 0.25), (0.75, 0.75), (0.25, 0.75)]),
        ])
    }

    #[test]
    fn test_signed_area_and_winding() {
        let ccw = polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!((ccw.signed_area() - 1.0).abs() < 1e-12);
        assert_eq!(ccw.winding(), 1);

        let mut cw = ccw.clone();
        cw.reverse();
        assert_eq!(cw.winding(), -1);
        assert!(cw.is_closed(1e-12));
    }

    #[test]
    fn test_orientation_puts_fill_on_the_left() {
        let mut shape = clockwise_ring();
        shape.normalize();
        assert_eq!(shape.contours[0].winding(), 1, "outer becomes counter-clockwise");
        assert_eq!(shape.contours[1].winding(), -1, "hole becomes clockwise");

        // Already-oriented shapes are left alone.
        let before = shape.clone();
        shape.normalize();
        assert_eq!(shape, before);
    }

    #[test]
    fn test_winding_and_contains() {
        let shape = clockwise_ring();
        assert!(shape.contains(dvec2(0.1, 0.5)));
        assert!(!shape.contains(dvec2(0.5, 0.5)), "hole is empty");
        assert!(!shape.contains(dvec2(1.5, 0.5)));
    }

    #[test]
    fn test_shape_signed_distance() {
        let mut shape = clockwise_ring();
        shape.normalize();
        assert!((shape.signed_distance(dvec2(0.1, 0.5)) + 0.1).abs() < 1e-9);
        assert!((shape.signed_distance(dvec2(0.5, 0.5)) - 0.25).abs() < 1e-9);
        assert!((shape.signed_distance(dvec2(1.5, 0.5)) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_edge_distance_sign_after_orientation() {
        let mut shape = clockwise_ring();
        shape.normalize();
        let inside = dvec2(0.1, 0.5);
        let outside = dvec2(-0.1, 0.5);
        let nearest = |p: DVec2| {
            shape
                .edges()
                .map(|e| e.segment.signed_distance(p).0)
                .fold(crate::edge::SignedDistance::FAR, |best, d| {
                    if d.is_closer_than(&best) { d } else { best }
                })
        };
        assert!(nearest(inside).distance < 0.0);
        assert!(nearest(outside).distance > 0.0);
    }

    #[test]
    fn test_normalize_drops_degenerate_edges() {
        let mut contour = polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        contour.push(EdgeSegment::line(dvec2(0.0, 0.0), dvec2(0.0, 0.0)));
        let mut shape = Shape::from_contours(vec![contour, Contour::new()]);
        shape.normalize();
        assert_eq!(shape.contours.len(), 1);
        assert_eq!(shape.edge_count(), 4);
    }

    #[test]
    fn test_bounds_of_empty_shape() {
        let shape = Shape::new();
        assert!(shape.is_empty());
        assert!(shape.bounds().is_empty());
        assert_eq!(shape.bounds().width(), 0.0);
    }

    #[test]
    fn test_split_cubic_inflections() {
        let mut contour = Contour::from_segments([
            EdgeSegment::cubic(
                dvec2(0.0, 0.0),
                dvec2(1.0, 1.0),
                dvec2(2.0, -1.0),
                dvec2(3.0, 0.0),
            ),
            EdgeSegment::line(dvec2(3.0, 0.0), dvec2(3.0, -2.0)),
            EdgeSegment::line(dvec2(3.0, -2.0), dvec2(0.0, 0.0)),
        ]);
        contour.split_cubic_inflections(0.01);
        assert_eq!(contour.len(), 4);
        assert_eq!(contour.edges[0].segment.curvature_sign(), -1);
        assert_eq!(contour.edges[1].segment.curvature_sign(), 1);
        assert!(contour.is_closed(1e-12));

        let mut shallow = contour.clone();
        shallow.split_cubic_inflections(2.0);
        assert_eq!(shallow.len(), 4, "already split");
    }
}
