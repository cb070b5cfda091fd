//! Edge segment model.
//!
//! Segments are evaluated in double precision in em space (y up). Signed
//! distances follow the "filled on the left" orientation every contour is
//! normalised to after extraction: points on the right of an edge are
//! outside the glyph and get a positive distance.

use astrelis_core::math::{DVec2, mix, non_zero_sign};

use crate::color::EdgeColor;
use crate::equations::{solve_cubic, solve_quadratic};

/// Below this magnitude a curvature value counts as straight.
pub const CURVATURE_EPSILON: f64 = 1e-6;

/// Distances closer than this are compared by orthogonality instead.
const DISTANCE_TIE_EPSILON: f64 = 1e-12;

const LEG_EPSILON: f64 = 1e-12;

const CUBIC_SEARCH_STARTS: usize = 4;
const CUBIC_SEARCH_STEPS: usize = 4;

/// Distance from a query point to an edge.
///
/// `orthogonality` is 1.0 when the query lies on the edge normal and falls
/// towards 0.0 as it approaches the edge's tangent line past an endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignedDistance {
    pub distance: f64,
    pub orthogonality: f64,
}

impl SignedDistance {
    /// Farther than anything; stands in for channels that have no edges.
    pub const FAR: SignedDistance = SignedDistance {
        distance: f64::MAX,
        orthogonality: 0.0,
    };

    pub fn new(distance: f64, orthogonality: f64) -> Self {
        Self {
            distance,
            orthogonality,
        }
    }

    /// Smaller magnitude wins; near ties go to the more orthogonal hit.
    pub fn is_closer_than(&self, other: &SignedDistance) -> bool {
        let a = self.distance.abs();
        let b = other.distance.abs();
        if (a - b).abs() <= DISTANCE_TIE_EPSILON {
            self.orthogonality > other.orthogonality
        } else {
            a < b
        }
    }
}

impl Default for SignedDistance {
    fn default() -> Self {
        Self::FAR
    }
}

/// Axis-aligned bounds in em space, y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        left: f64::INFINITY,
        bottom: f64::INFINITY,
        right: f64::NEG_INFINITY,
        top: f64::NEG_INFINITY,
    };

    pub fn include(&mut self, p: DVec2) {
        self.left = self.left.min(p.x);
        self.bottom = self.bottom.min(p.y);
        self.right = self.right.max(p.x);
        self.top = self.top.max(p.y);
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            left: self.left.min(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left > self.right || self.bottom > self.top
    }

    pub fn width(&self) -> f64 {
        if self.is_empty() { 0.0 } else { self.right - self.left }
    }

    pub fn height(&self) -> f64 {
        if self.is_empty() { 0.0 } else { self.top - self.bottom }
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.left < other.right
            && other.left < self.right
            && self.bottom < other.top
            && other.bottom < self.top
    }

    pub fn intersection(&self, other: &Bounds) -> Bounds {
        Bounds {
            left: self.left.max(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.min(other.right),
            top: self.top.min(other.top),
        }
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.bottom && p.y <= self.top
    }

    /// Grows every side by `amount`.
    pub fn expanded(&self, amount: f64) -> Bounds {
        Bounds {
            left: self.left - amount,
            bottom: self.bottom - amount,
            right: self.right + amount,
            top: self.top + amount,
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// A line, quadratic or cubic Bezier segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeSegment {
    Linear([DVec2; 2]),
    Quadratic([DVec2; 3]),
    Cubic([DVec2; 4]),
}

impl EdgeSegment {
    pub fn line(p0: DVec2, p1: DVec2) -> Self {
        EdgeSegment::Linear([p0, p1])
    }

    pub fn quadratic(p0: DVec2, p1: DVec2, p2: DVec2) -> Self {
        EdgeSegment::Quadratic([p0, p1, p2])
    }

    pub fn cubic(p0: DVec2, p1: DVec2, p2: DVec2, p3: DVec2) -> Self {
        EdgeSegment::Cubic([p0, p1, p2, p3])
    }

    pub fn control_points(&self) -> &[DVec2] {
        match self {
            EdgeSegment::Linear(p) => p,
            EdgeSegment::Quadratic(p) => p,
            EdgeSegment::Cubic(p) => p,
        }
    }

    pub fn start(&self) -> DVec2 {
        self.control_points()[0]
    }

    pub fn end(&self) -> DVec2 {
        match self {
            EdgeSegment::Linear(p) => p[1],
            EdgeSegment::Quadratic(p) => p[2],
            EdgeSegment::Cubic(p) => p[3],
        }
    }

    pub fn point_at(&self, t: f64) -> DVec2 {
        match *self {
            EdgeSegment::Linear([p0, p1]) => mix(p0, p1, t),
            EdgeSegment::Quadratic([p0, p1, p2]) => mix(mix(p0, p1, t), mix(p1, p2, t), t),
            EdgeSegment::Cubic([p0, p1, p2, p3]) => {
                let p12 = mix(p1, p2, t);
                mix(
                    mix(mix(p0, p1, t), p12, t),
                    mix(p12, mix(p2, p3, t), t),
                    t,
                )
            }
        }
    }

    /// Tangent direction at `t` (not normalised).
    ///
    /// Falls back to a chord when the derivative vanishes at a coincident
    /// control point.
    pub fn direction(&self, t: f64) -> DVec2 {
        match *self {
            EdgeSegment::Linear([p0, p1]) => p1 - p0,
            EdgeSegment::Quadratic([p0, p1, p2]) => {
                let tangent = mix(p1 - p0, p2 - p1, t);
                if tangent == DVec2::ZERO {
                    p2 - p0
                } else {
                    tangent
                }
            }
            EdgeSegment::Cubic([p0, p1, p2, p3]) => {
                let tangent = mix(mix(p1 - p0, p2 - p1, t), mix(p2 - p1, p3 - p2, t), t);
                if tangent == DVec2::ZERO {
                    if t == 0.0 {
                        return p2 - p0;
                    }
                    if t == 1.0 {
                        return p3 - p1;
                    }
                }
                tangent
            }
        }
    }

    /// Signed distance from `origin` to the segment and the curve parameter
    /// of the nearest point. The parameter lies outside `[0, 1]` when the
    /// nearest point is an endpoint approached from beyond the segment.
    pub fn signed_distance(&self, origin: DVec2) -> (SignedDistance, f64) {
        match *self {
            EdgeSegment::Linear([p0, p1]) => {
                let aq = origin - p0;
                let ab = p1 - p0;
                let param = aq.dot(ab) / ab.dot(ab);
                let eq = if param > 0.5 { p1 } else { p0 } - origin;
                let endpoint_distance = eq.length();
                if param > 0.0 && param < 1.0 {
                    let ortho_distance = orthonormal_right(ab).dot(aq);
                    if ortho_distance.abs() < endpoint_distance {
                        return (SignedDistance::new(ortho_distance, 1.0), param);
                    }
                }
                let distance = non_zero_sign(aq.perp_dot(ab)) * endpoint_distance;
                let cos = normalize_or_zero(ab).dot(normalize_or_zero(eq)).abs();
                (SignedDistance::new(distance, 1.0 - cos), param)
            }
            EdgeSegment::Quadratic([p0, p1, p2]) => {
                let qa = p0 - origin;
                let ab = p1 - p0;
                let br = p2 - p1 - ab;
                let a = br.dot(br);
                let b = 3.0 * ab.dot(br);
                let c = 2.0 * ab.dot(ab) + qa.dot(br);
                let d = qa.dot(ab);
                let roots = solve_cubic(a, b, c, d);

                let mut ep_dir = self.direction(0.0);
                let mut min_distance = non_zero_sign(ep_dir.perp_dot(qa)) * qa.length();
                let mut param = -qa.dot(ep_dir) / ep_dir.dot(ep_dir);
                {
                    ep_dir = self.direction(1.0);
                    let distance = (p2 - origin).length();
                    if distance < min_distance.abs() {
                        min_distance = non_zero_sign(ep_dir.perp_dot(p2 - origin)) * distance;
                        param = (origin - p1).dot(ep_dir) / ep_dir.dot(ep_dir);
                    }
                }
                for &t in roots.as_slice() {
                    if t > 0.0 && t < 1.0 {
                        let qe = qa + 2.0 * t * ab + t * t * br;
                        let distance = qe.length();
                        if distance <= min_distance.abs() {
                            min_distance = non_zero_sign((ab + t * br).perp_dot(qe)) * distance;
                            param = t;
                        }
                    }
                }
                (self.finish_distance(min_distance, param, origin), param)
            }
            EdgeSegment::Cubic([p0, p1, p2, p3]) => {
                let qa = p0 - origin;
                let ab = p1 - p0;
                let br = p2 - p1 - ab;
                let as_ = (p3 - p2) - (p2 - p1) - br;

                let mut ep_dir = self.direction(0.0);
                let mut min_distance = non_zero_sign(ep_dir.perp_dot(qa)) * qa.length();
                let mut param = -qa.dot(ep_dir) / ep_dir.dot(ep_dir);
                {
                    ep_dir = self.direction(1.0);
                    let distance = (p3 - origin).length();
                    if distance < min_distance.abs() {
                        min_distance = non_zero_sign(ep_dir.perp_dot(p3 - origin)) * distance;
                        param = (ep_dir - (p3 - origin)).dot(ep_dir) / ep_dir.dot(ep_dir);
                    }
                }

                // Newton iterations from evenly spaced starting parameters.
                for i in 0..=CUBIC_SEARCH_STARTS {
                    let mut t = i as f64 / CUBIC_SEARCH_STARTS as f64;
                    let mut qe = qa + 3.0 * t * ab + 3.0 * t * t * br + t * t * t * as_;
                    let mut d1 = 3.0 * ab + 6.0 * t * br + 3.0 * t * t * as_;
                    let mut d2 = 6.0 * br + 6.0 * t * as_;
                    let mut improved = t - qe.dot(d1) / (d1.dot(d1) + qe.dot(d2));
                    if improved > 0.0 && improved < 1.0 {
                        let mut remaining = CUBIC_SEARCH_STEPS;
                        loop {
                            t = improved;
                            qe = qa + 3.0 * t * ab + 3.0 * t * t * br + t * t * t * as_;
                            d1 = 3.0 * ab + 6.0 * t * br + 3.0 * t * t * as_;
                            remaining -= 1;
                            if remaining == 0 {
                                break;
                            }
                            d2 = 6.0 * br + 6.0 * t * as_;
                            improved = t - qe.dot(d1) / (d1.dot(d1) + qe.dot(d2));
                            if !(improved > 0.0 && improved < 1.0) {
                                break;
                            }
                        }
                        let distance = qe.length();
                        if distance < min_distance.abs() {
                            min_distance = non_zero_sign(d1.perp_dot(qe)) * distance;
                            param = t;
                        }
                    }
                }
                (self.finish_distance(min_distance, param, origin), param)
            }
        }
    }

    fn finish_distance(&self, distance: f64, param: f64, origin: DVec2) -> SignedDistance {
        if (0.0..=1.0).contains(&param) {
            return SignedDistance::new(distance, 1.0);
        }
        let (dir, endpoint) = if param < 0.5 {
            (self.direction(0.0), self.start())
        } else {
            (self.direction(1.0), self.end())
        };
        let cos = normalize_or_zero(dir)
            .dot(normalize_or_zero(endpoint - origin))
            .abs();
        SignedDistance::new(distance, 1.0 - cos)
    }

    /// Replaces an endpoint distance by the perpendicular distance to the
    /// edge's tangent line extended past that endpoint, when the query lies
    /// beyond it and the pseudo-distance is no larger.
    pub fn distance_to_pseudo_distance(
        &self,
        distance: &mut SignedDistance,
        origin: DVec2,
        param: f64,
    ) {
        if param < 0.0 {
            let dir = normalize_or_zero(self.direction(0.0));
            let aq = origin - self.start();
            if aq.dot(dir) < 0.0 {
                let pseudo = aq.perp_dot(dir);
                if pseudo.abs() <= distance.distance.abs() {
                    *distance = SignedDistance::new(pseudo, 1.0);
                }
            }
        } else if param > 1.0 {
            let dir = normalize_or_zero(self.direction(1.0));
            let bq = origin - self.end();
            if bq.dot(dir) > 0.0 {
                let pseudo = bq.perp_dot(dir);
                if pseudo.abs() <= distance.distance.abs() {
                    *distance = SignedDistance::new(pseudo, 1.0);
                }
            }
        }
    }

    /// Extends `bounds` to cover the segment, curve extrema included.
    pub fn extend_bounds(&self, bounds: &mut Bounds) {
        bounds.include(self.start());
        bounds.include(self.end());
        match *self {
            EdgeSegment::Linear(_) => {}
            EdgeSegment::Quadratic([p0, p1, p2]) => {
                let bot = (p1 - p0) - (p2 - p1);
                if bot.x != 0.0 {
                    let t = (p1.x - p0.x) / bot.x;
                    if t > 0.0 && t < 1.0 {
                        bounds.include(self.point_at(t));
                    }
                }
                if bot.y != 0.0 {
                    let t = (p1.y - p0.y) / bot.y;
                    if t > 0.0 && t < 1.0 {
                        bounds.include(self.point_at(t));
                    }
                }
            }
            EdgeSegment::Cubic([p0, p1, p2, p3]) => {
                let a0 = p1 - p0;
                let a1 = 2.0 * (p2 - p1 - a0);
                let a2 = p3 - 3.0 * p2 + 3.0 * p1 - p0;
                for roots in [
                    solve_quadratic(a2.x, a1.x, a0.x),
                    solve_quadratic(a2.y, a1.y, a0.y),
                ] {
                    for &t in roots.as_slice() {
                        if t > 0.0 && t < 1.0 {
                            bounds.include(self.point_at(t));
                        }
                    }
                }
            }
        }
    }

    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::EMPTY;
        self.extend_bounds(&mut bounds);
        bounds
    }

    pub fn reversed(&self) -> Self {
        match *self {
            EdgeSegment::Linear([p0, p1]) => EdgeSegment::Linear([p1, p0]),
            EdgeSegment::Quadratic([p0, p1, p2]) => EdgeSegment::Quadratic([p2, p1, p0]),
            EdgeSegment::Cubic([p0, p1, p2, p3]) => EdgeSegment::Cubic([p3, p2, p1, p0]),
        }
    }

    /// De Casteljau subdivision at `t`.
    pub fn split_at(&self, t: f64) -> (Self, Self) {
        match *self {
            EdgeSegment::Linear([p0, p1]) => {
                let m = mix(p0, p1, t);
                (EdgeSegment::Linear([p0, m]), EdgeSegment::Linear([m, p1]))
            }
            EdgeSegment::Quadratic([p0, p1, p2]) => {
                let a = mix(p0, p1, t);
                let b = mix(p1, p2, t);
                let m = mix(a, b, t);
                (
                    EdgeSegment::Quadratic([p0, a, m]),
                    EdgeSegment::Quadratic([m, b, p2]),
                )
            }
            EdgeSegment::Cubic([p0, p1, p2, p3]) => {
                let a = mix(p0, p1, t);
                let b = mix(p1, p2, t);
                let c = mix(p2, p3, t);
                let ab = mix(a, b, t);
                let bc = mix(b, c, t);
                let m = mix(ab, bc, t);
                (
                    EdgeSegment::Cubic([p0, a, ab, m]),
                    EdgeSegment::Cubic([m, bc, c, p3]),
                )
            }
        }
    }

    pub fn split_in_thirds(&self) -> [Self; 3] {
        let (first, rest) = self.split_at(1.0 / 3.0);
        let (second, third) = rest.split_at(0.5);
        [first, second, third]
    }

    /// Curvature of the control polygon at the start of the segment: the
    /// signed sine of the turn between the first two control legs.
    pub fn start_curvature(&self) -> f64 {
        match *self {
            EdgeSegment::Linear(_) => 0.0,
            EdgeSegment::Quadratic([p0, p1, p2]) => leg_curvature(p1 - p0, p2 - p1),
            EdgeSegment::Cubic([p0, p1, p2, p3]) => {
                if is_short(p1 - p0) {
                    leg_curvature(p2 - p0, p3 - p2)
                } else if is_short(p2 - p1) {
                    leg_curvature(p1 - p0, p3 - p1)
                } else {
                    leg_curvature(p1 - p0, p2 - p1)
                }
            }
        }
    }

    /// Curvature of the control polygon at the end of the segment.
    pub fn end_curvature(&self) -> f64 {
        match *self {
            EdgeSegment::Linear(_) => 0.0,
            EdgeSegment::Quadratic(_) => self.start_curvature(),
            EdgeSegment::Cubic([p0, p1, p2, p3]) => {
                if is_short(p3 - p2) {
                    leg_curvature(p1 - p0, p3 - p1)
                } else if is_short(p2 - p1) {
                    leg_curvature(p2 - p0, p3 - p2)
                } else {
                    leg_curvature(p2 - p1, p3 - p2)
                }
            }
        }
    }

    /// Signed curvature of the whole segment.
    ///
    /// Lines and near-straight curves give 0. A cubic whose two ends turn in
    /// opposite directions has no single curvature and also gives 0; such
    /// cubics are split at their inflection before colouring.
    pub fn curvature(&self) -> f64 {
        match self {
            EdgeSegment::Linear(_) => 0.0,
            EdgeSegment::Quadratic(_) => self.start_curvature(),
            EdgeSegment::Cubic(_) => {
                let start = self.start_curvature();
                let end = self.end_curvature();
                if start * end < 0.0 {
                    0.0
                } else if start.abs() >= end.abs() {
                    start
                } else {
                    end
                }
            }
        }
    }

    pub fn curvature_sign(&self) -> i8 {
        let k = self.curvature();
        if k > 0.0 {
            1
        } else if k < 0.0 {
            -1
        } else {
            0
        }
    }

    /// Parameters strictly inside `(0, 1)` where a cubic changes its turning
    /// direction. Empty for lines and quadratics.
    pub fn inflection_params(&self) -> Vec<f64> {
        let EdgeSegment::Cubic([p0, p1, p2, p3]) = *self else {
            return Vec::new();
        };
        let a = p1 - p0;
        let b = p2 - p1 - a;
        let c = (p3 - p2) - (p2 - p1) - b;
        // B'(t) x B''(t) is proportional to this quadratic in t.
        let roots = solve_quadratic(b.perp_dot(c), a.perp_dot(c), a.perp_dot(b));
        let mut params: Vec<f64> = roots
            .as_slice()
            .iter()
            .copied()
            .filter(|t| *t > 1e-3 && *t < 1.0 - 1e-3)
            .collect();
        params.sort_by(|a, b| a.total_cmp(b));
        params.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
        params
    }

    /// Appends points along the segment, excluding its start point: the end
    /// point for a line, `steps` evenly spaced points for a curve.
    pub fn flatten_into(&self, steps: usize, out: &mut Vec<DVec2>) {
        match self {
            EdgeSegment::Linear(_) => out.push(self.end()),
            _ => {
                let steps = steps.max(1);
                for i in 1..=steps {
                    out.push(self.point_at(i as f64 / steps as f64));
                }
            }
        }
    }

    /// Arc length, approximated by a polyline for curves.
    pub fn length(&self) -> f64 {
        match *self {
            EdgeSegment::Linear([p0, p1]) => p0.distance(p1),
            _ => {
                let mut points = vec![self.start()];
                self.flatten_into(16, &mut points);
                points.windows(2).map(|w| w[0].distance(w[1])).sum()
            }
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.control_points()
            .iter()
            .all(|p| p.distance_squared(self.start()) < LEG_EPSILON * LEG_EPSILON)
    }

    pub fn map_points(&self, f: impl Fn(DVec2) -> DVec2) -> Self {
        match *self {
            EdgeSegment::Linear([p0, p1]) => EdgeSegment::Linear([f(p0), f(p1)]),
            EdgeSegment::Quadratic([p0, p1, p2]) => EdgeSegment::Quadratic([f(p0), f(p1), f(p2)]),
            EdgeSegment::Cubic([p0, p1, p2, p3]) => {
                EdgeSegment::Cubic([f(p0), f(p1), f(p2), f(p3)])
            }
        }
    }
}

/// A segment together with its assigned channel colour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub segment: EdgeSegment,
    pub color: EdgeColor,
}

impl Edge {
    pub fn new(segment: EdgeSegment) -> Self {
        Self {
            segment,
            color: EdgeColor::WHITE,
        }
    }

    pub fn with_color(segment: EdgeSegment, color: EdgeColor) -> Self {
        Self { segment, color }
    }
}

impl From<EdgeSegment> for Edge {
    fn from(segment: EdgeSegment) -> Self {
        Edge::new(segment)
    }
}

fn is_short(v: DVec2) -> bool {
    v.length_squared() < LEG_EPSILON * LEG_EPSILON
}

fn leg_curvature(l1: DVec2, l2: DVec2) -> f64 {
    let denominator = l1.length() * l2.length();
    if denominator < LEG_EPSILON {
        return 0.0;
    }
    let k = l1.perp_dot(l2) / denominator;
    if k.abs() < CURVATURE_EPSILON { 0.0 } else { k }
}

fn orthonormal_right(v: DVec2) -> DVec2 {
    let len = v.length();
    if len == 0.0 {
        DVec2::new(0.0, -1.0)
    } else {
        DVec2::new(v.y / len, -v.x / len)
    }
}

fn normalize_or_zero(v: DVec2) -> DVec2 {
    v.try_normalize().unwrap_or(DVec2::ZERO)
}
