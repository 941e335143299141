//! Piecewise-linear interpolation.
//!
//! All helpers assume `xp` is increasing.

/// Outside-the-table behaviour for [`interp_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutOfRange {
    /// Hold the first/last table value (numpy `interp` default).
    Clamp,
    /// Return a constant.
    Fill(f64),
    /// Continue the first/last segment linearly.
    Extrapolate,
}

/// Linear interpolation of a single point.
pub fn interp_with(x: f64, xp: &[f64], fp: &[f64], mode: OutOfRange) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return match mode {
            OutOfRange::Fill(v) => v,
            _ => f64::NAN,
        };
    }
    if n == 1 {
        return fp[0];
    }

    if x < xp[0] || x > xp[n - 1] {
        let (i0, i1) = if x < xp[0] { (0, 1) } else { (n - 2, n - 1) };
        return match mode {
            OutOfRange::Clamp => {
                if x < xp[0] {
                    fp[0]
                } else {
                    fp[n - 1]
                }
            }
            OutOfRange::Fill(v) => v,
            OutOfRange::Extrapolate => line(x, xp[i0], fp[i0], xp[i1], fp[i1]),
        };
    }

    let idx = xp[..n].partition_point(|&k| k <= x);
    let i1 = idx.clamp(1, n - 1);
    let i0 = i1 - 1;
    line(x, xp[i0], fp[i0], xp[i1], fp[i1])
}

/// numpy-style `interp`: clamp outside the table.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    interp_with(x, xp, fp, OutOfRange::Clamp)
}

/// Interpolate many points.
pub fn interp_all(xs: &[f64], xp: &[f64], fp: &[f64], mode: OutOfRange) -> Vec<f64> {
    xs.iter().map(|&x| interp_with(x, xp, fp, mode)).collect()
}

fn line(x: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    if (x1 - x0).abs() < f64::EPSILON * x0.abs().max(1.0) {
        return y0;
    }
    let u = (x - x0) / (x1 - x0);
    y0 + u * (y1 - y0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_points_are_linear() {
        let xp = [0.0, 1.0, 3.0];
        let fp = [0.0, 2.0, 6.0];
        assert!((interp(0.5, &xp, &fp) - 1.0).abs() < 1e-12);
        assert!((interp(2.0, &xp, &fp) - 4.0).abs() < 1e-12);
        assert!((interp(3.0, &xp, &fp) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_modes() {
        let xp = [1.0, 2.0];
        let fp = [10.0, 20.0];
        assert_eq!(interp_with(0.0, &xp, &fp, OutOfRange::Clamp), 10.0);
        assert_eq!(interp_with(3.0, &xp, &fp, OutOfRange::Fill(0.0)), 0.0);
        assert!((interp_with(3.0, &xp, &fp, OutOfRange::Extrapolate) - 30.0).abs() < 1e-12);
        assert!((interp_with(0.0, &xp, &fp, OutOfRange::Extrapolate) - 0.0).abs() < 1e-12);
    }
}
