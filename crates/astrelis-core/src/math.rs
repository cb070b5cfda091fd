//! Math types for the atlas pipeline, re-exported from [`glam`].
//!
//! Outline geometry is evaluated in double precision, so the pipeline works
//! with [`DVec2`] throughout.
//!
//! ```
//! use astrelis_core::math::DVec2;
//!
//! let incoming = DVec2::new(1.0, 0.0);
//! let outgoing = DVec2::new(0.0, 1.0);
//! // Positive cross product: the path turns counter-clockwise.
//! assert!(incoming.perp_dot(outgoing) > 0.0);
//! ```
//!
//! [`glam`]: https://docs.rs/glam

pub use glam::{DVec2, dvec2};

/// Sign of `value` as `-1.0` or `1.0`; zero counts as positive.
#[inline]
pub fn non_zero_sign(value: f64) -> f64 {
    if value < 0.0 { -1.0 } else { 1.0 }
}

/// Median of three values.
#[inline]
pub fn median(a: f64, b: f64, c: f64) -> f64 {
    a.min(b).max(a.max(b).min(c))
}

/// Linear interpolation between two points.
#[inline]
pub fn mix(a: DVec2, b: DVec2, t: f64) -> DVec2 {
    a + (b - a) * t
}
