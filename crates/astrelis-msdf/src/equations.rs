//! Closed-form polynomial root solvers used by the segment distance queries.

use std::f64::consts::PI;

/// Real roots of a polynomial of degree three or lower.
#[derive(Debug, Clone, Copy, Default)]
pub struct Roots {
    values: [f64; 3],
    len: usize,
}

impl Roots {
    fn push(&mut self, value: f64) {
        self.values[self.len] = value;
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Solves `a*x^2 + b*x + c = 0`.
///
/// Degenerates to the linear case when `a` is negligible next to `b`.
/// An identically zero polynomial yields no roots.
pub fn solve_quadratic(a: f64, b: f64, c: f64) -> Roots {
    let mut roots = Roots::default();

    if a == 0.0 || b.abs() > 1e12 * a.abs() {
        if b != 0.0 {
            roots.push(-c / b);
        }
        return roots;
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant > 0.0 {
        let root = discriminant.sqrt();
        roots.push((-b + root) / (2.0 * a));
        roots.push((-b - root) / (2.0 * a));
    } else if discriminant == 0.0 {
        roots.push(-b / (2.0 * a));
    }
    roots
}

/// Solves the monic cubic `x^3 + a*x^2 + b*x + c = 0`.
fn solve_cubic_normed(a: f64, b: f64, c: f64) -> Roots {
    let mut roots = Roots::default();

    let a2 = a * a;
    let q = (a2 - 3.0 * b) / 9.0;
    let r = (a * (2.0 * a2 - 9.0 * b) + 27.0 * c) / 54.0;
    let r2 = r * r;
    let q3 = q * q * q;
    let shift = a / 3.0;

    if r2 < q3 {
        let t = (r / q3.sqrt()).clamp(-1.0, 1.0).acos();
        let m = -2.0 * q.sqrt();
        roots.push(m * (t / 3.0).cos() - shift);
        roots.push(m * ((t + 2.0 * PI) / 3.0).cos() - shift);
        roots.push(m * ((t - 2.0 * PI) / 3.0).cos() - shift);
        return roots;
    }

    let sign = if r < 0.0 { 1.0 } else { -1.0 };
    let u = sign * (r.abs() + (r2 - q3).sqrt()).cbrt();
    let v = if u == 0.0 { 0.0 } else { q / u };
    roots.push((u + v) - shift);
    if u == v || (u - v).abs() < 1e-12 * (u + v).abs() {
        roots.push(-0.5 * (u + v) - shift);
    }
    roots
}

/// Solves `a*x^3 + b*x^2 + c*x + d = 0`, falling back to the quadratic
/// solver when the leading coefficient is negligible.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> Roots {
    if a != 0.0 {
        let bn = b / a;
        if bn.abs() < 1e6 {
            return solve_cubic_normed(bn, c / a, d / a);
        }
    }
    solve_quadratic(b, c, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(roots: Roots) -> Vec<f64> {
        let mut values = roots.as_slice().to_vec();
        values.sort_by(|a, b| a.total_cmp(b));
        values
    }

    #[test]
    fn test_quadratic_two_roots() {
        let roots = sorted(solve_quadratic(1.0, -3.0, 2.0));
        assert_eq!(roots.len(), 2);
        assert!((roots[0] - 1.0).abs() < 1e-12);
        assert!((roots[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_quadratic_degenerate_cases() {
        let linear = solve_quadratic(0.0, 2.0, -1.0);
        assert_eq!(linear.as_slice(), &[0.5]);
        assert!(solve_quadratic(0.0, 0.0, 1.0).is_empty());
        assert!(solve_quadratic(0.0, 0.0, 0.0).is_empty());
        assert!(solve_quadratic(1.0, 0.0, 1.0).is_empty());
        assert_eq!(solve_quadratic(1.0, -2.0, 1.0).len(), 1);
    }

    #[test]
    fn test_cubic_three_roots() {
        // (x - 1)(x - 2)(x - 3)
        let roots = sorted(solve_cubic(1.0, -6.0, 11.0, -6.0));
        assert_eq!(roots.len(), 3);
        for (root, expected) in roots.iter().zip([1.0, 2.0, 3.0]) {
            assert!((root - expected).abs() < 1e-9, "{root} != {expected}");
        }
    }

    #[test]
    fn test_cubic_single_real_root() {
        // (x - 2)(x^2 + 1)
        let roots = solve_cubic(1.0, -2.0, 1.0, -2.0);
        assert_eq!(roots.len(), 1);
        assert!((roots.as_slice()[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_cubic_falls_back_to_quadratic() {
        let roots = sorted(solve_cubic(0.0, 1.0, -3.0, 2.0));
        assert_eq!(roots, vec![1.0, 2.0]);
    }
}
