//! Natural cubic interpolating splines.
//!
//! The spline passes through every knot and has zero second derivative at
//! both ends. Besides evaluation it exposes the pieces the likelihoods need:
//!
//! - first derivative
//! - stationary points of the spline (roots of the derivative)
//! - exact definite integrals
//!
//! Outside the knot range the spline and its derivatives evaluate to zero.

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    // Per-segment polynomial coefficients in t = x - x_i.
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

impl CubicSpline {
    /// Fit a natural cubic spline through `(x, y)`.
    ///
    /// `x` must be strictly increasing with at least two knots.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        let n = x.len();
        if n != y.len() {
            return Err(Error::Computation(format!(
                "spline knots/values length mismatch ({n} vs {})",
                y.len()
            )));
        }
        if n < 2 {
            return Err(Error::Computation("spline needs at least two knots".to_string()));
        }
        if x.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(Error::Computation("spline knots must be strictly increasing".to_string()));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(Error::Computation("spline input contains non-finite values".to_string()));
        }

        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let m = second_derivatives(&h, y);

        let segments = n - 1;
        let mut a = Vec::with_capacity(segments);
        let mut b = Vec::with_capacity(segments);
        let mut c = Vec::with_capacity(segments);
        let mut d = Vec::with_capacity(segments);
        for i in 0..segments {
            let hi = h[i];
            a.push(y[i]);
            b.push((y[i + 1] - y[i]) / hi - hi * (2.0 * m[i] + m[i + 1]) / 6.0);
            c.push(m[i] / 2.0);
            d.push((m[i + 1] - m[i]) / (6.0 * hi));
        }

        Ok(Self {
            x: x.to_vec(),
            a,
            b,
            c,
            d,
        })
    }

    pub fn x_min(&self) -> f64 {
        self.x[0]
    }

    pub fn x_max(&self) -> f64 {
        self.x[self.x.len() - 1]
    }

    fn outside(&self, x: f64) -> bool {
        x < self.x_min() || x > self.x_max() || x.is_nan()
    }

    fn segment(&self, x: f64) -> usize {
        let idx = self.x.partition_point(|&k| k <= x);
        idx.saturating_sub(1).min(self.a.len() - 1)
    }

    pub fn eval(&self, x: f64) -> f64 {
        if self.outside(x) {
            return 0.0;
        }
        let i = self.segment(x);
        let t = x - self.x[i];
        self.a[i] + t * (self.b[i] + t * (self.c[i] + t * self.d[i]))
    }

    /// First derivative.
    pub fn derivative(&self, x: f64) -> f64 {
        if self.outside(x) {
            return 0.0;
        }
        let i = self.segment(x);
        let t = x - self.x[i];
        self.b[i] + t * (2.0 * self.c[i] + 3.0 * t * self.d[i])
    }

    /// Second derivative.
    pub fn second_derivative(&self, x: f64) -> f64 {
        if self.outside(x) {
            return 0.0;
        }
        let i = self.segment(x);
        let t = x - self.x[i];
        2.0 * self.c[i] + 6.0 * t * self.d[i]
    }

    /// Interior points where the first derivative vanishes, in increasing
    /// order. Stationary points exactly on the outer knots are not reported.
    pub fn derivative_roots(&self) -> Vec<f64> {
        let mut roots = Vec::new();
        let x_lo = self.x_min();
        let x_hi = self.x_max();
        for i in 0..self.a.len() {
            let h = self.x[i + 1] - self.x[i];
            // 3d t^2 + 2c t + b = 0 on [0, h)
            let qa = 3.0 * self.d[i];
            let qb = 2.0 * self.c[i];
            let qc = self.b[i];
            let mut seg_roots = solve_quadratic(qa, qb, qc, h);
            seg_roots.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            for t in seg_roots {
                let r = self.x[i] + t;
                if r > x_lo && r < x_hi && roots.last().is_none_or(|&last: &f64| r > last) {
                    roots.push(r);
                }
            }
        }
        roots
    }

    /// Exact integral of the spline over `[lo, hi]`.
    ///
    /// Parts of the interval outside the knots contribute nothing.
    pub fn integral(&self, lo: f64, hi: f64) -> f64 {
        if hi < lo {
            return -self.integral(hi, lo);
        }
        let lo = lo.max(self.x_min());
        let hi = hi.min(self.x_max());
        if !(hi > lo) {
            return 0.0;
        }

        let first = self.segment(lo);
        let last = self.segment(hi);
        let mut total = 0.0;
        for i in first..=last {
            let seg_lo = if i == first { lo } else { self.x[i] };
            let seg_hi = if i == last { hi } else { self.x[i + 1] };
            total += self.antiderivative(i, seg_hi - self.x[i])
                - self.antiderivative(i, seg_lo - self.x[i]);
        }
        total
    }

    fn antiderivative(&self, i: usize, t: f64) -> f64 {
        t * (self.a[i] + t * (self.b[i] / 2.0 + t * (self.c[i] / 3.0 + t * self.d[i] / 4.0)))
    }
}

/// Solve the tridiagonal system for the knot second derivatives of a natural
/// spline (Thomas algorithm).
fn second_derivatives(h: &[f64], y: &[f64]) -> Vec<f64> {
    let n = y.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    let k = n - 2;
    let mut diag = vec![0.0; k];
    let mut upper = vec![0.0; k];
    let mut rhs = vec![0.0; k];
    for j in 0..k {
        let i = j + 1;
        diag[j] = 2.0 * (h[i - 1] + h[i]);
        upper[j] = h[i];
        rhs[j] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
    }

    // Forward sweep; the sub-diagonal of row j is h[j].
    for j in 1..k {
        let w = h[j] / diag[j - 1];
        diag[j] -= w * upper[j - 1];
        rhs[j] -= w * rhs[j - 1];
    }

    let mut sol = vec![0.0; k];
    sol[k - 1] = rhs[k - 1] / diag[k - 1];
    for j in (0..k - 1).rev() {
        sol[j] = (rhs[j] - upper[j] * sol[j + 1]) / diag[j];
    }

    m[1..(k + 1)].copy_from_slice(&sol);
    m
}

/// Real roots of `a t^2 + b t + c` lying in `[0, h)`.
fn solve_quadratic(a: f64, b: f64, c: f64, h: f64) -> Vec<f64> {
    let in_range = |t: f64| t.is_finite() && t >= 0.0 && t < h;
    let scale = a.abs().max(b.abs()).max(c.abs());
    if scale == 0.0 {
        return Vec::new();
    }

    if a.abs() <= 1e-12 * scale {
        if b == 0.0 {
            return Vec::new();
        }
        let t = -c / b;
        return if in_range(t) { vec![t] } else { Vec::new() };
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let sq = disc.sqrt();
    // Numerically stable form.
    let q = -0.5 * (b + b.signum() * sq);
    let mut out = Vec::with_capacity(2);
    let t1 = q / a;
    if in_range(t1) {
        out.push(t1);
    }
    if q != 0.0 {
        let t2 = c / q;
        if in_range(t2) && (out.is_empty() || (t2 - t1).abs() > 0.0) {
            out.push(t2);
        }
    } else if in_range(0.0) && out.is_empty() {
        out.push(0.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linspace;

    #[test]
    fn interpolates_knots_exactly() {
        let x = [0.0, 1.0, 2.5, 4.0];
        let y = [1.0, 3.0, -2.0, 0.5];
        let s = CubicSpline::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert!((s.eval(*xi) - yi).abs() < 1e-12);
        }
    }

    #[test]
    fn reproduces_linear_functions() {
        let x = linspace(0.0, 10.0, 11);
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v - 1.0).collect();
        let s = CubicSpline::new(&x, &y).unwrap();
        assert!((s.eval(3.3) - 5.6).abs() < 1e-12);
        assert!((s.derivative(7.7) - 2.0).abs() < 1e-12);
        assert!((s.integral(0.0, 10.0) - 90.0).abs() < 1e-10);
    }

    #[test]
    fn zero_boundary_outside_knots() {
        let s = CubicSpline::new(&[1.0, 2.0, 3.0], &[1.0, 4.0, 9.0]).unwrap();
        assert_eq!(s.eval(0.5), 0.0);
        assert_eq!(s.eval(3.5), 0.0);
        assert_eq!(s.derivative(3.5), 0.0);
        // Integral outside the knots contributes nothing.
        assert!((s.integral(0.0, 5.0) - s.integral(1.0, 3.0)).abs() < 1e-12);
    }

    #[test]
    fn integral_of_smooth_function_is_accurate() {
        let x = linspace(0.0, std::f64::consts::PI, 200);
        let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
        let s = CubicSpline::new(&x, &y).unwrap();
        assert!((s.integral(0.0, std::f64::consts::PI) - 2.0).abs() < 1e-6);
        assert!((s.integral(0.5, 1.5) - (0.5f64.cos() - 1.5f64.cos())).abs() < 1e-6);
    }

    #[test]
    fn finds_interior_maximum() {
        // f(x) = x exp(-x) peaks at x = 1.
        let x = linspace(0.01, 5.0, 400);
        let y: Vec<f64> = x.iter().map(|v| v * (-v).exp()).collect();
        let s = CubicSpline::new(&x, &y).unwrap();
        let roots = s.derivative_roots();
        assert!(!roots.is_empty());
        assert!((roots[0] - 1.0).abs() < 1e-3, "root at {}", roots[0]);
        assert!(s.second_derivative(roots[0]) < 0.0);
    }

    #[test]
    fn monotone_function_has_no_interior_roots() {
        let x = linspace(0.1, 2.0, 50);
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let s = CubicSpline::new(&x, &y).unwrap();
        assert!(s.derivative_roots().is_empty());
    }

    #[test]
    fn rejects_unsorted_knots() {
        assert!(CubicSpline::new(&[0.0, 0.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(CubicSpline::new(&[0.0], &[1.0]).is_err());
    }
}
