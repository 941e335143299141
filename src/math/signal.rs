//! Quadrature and convolution on sampled grids.

/// Trapezoid rule on an arbitrary grid.
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yw, xw)| 0.5 * (xw[1] - xw[0]) * (yw[0] + yw[1]))
        .sum()
}

/// Trapezoid rule on a uniform grid with spacing `dx`.
pub fn trapezoid_uniform(y: &[f64], dx: f64) -> f64 {
    y.windows(2).map(|w| 0.5 * dx * (w[0] + w[1])).sum()
}

/// Discrete linear convolution returning the central part of the full
/// convolution, with length `max(a.len(), v.len())` (numpy's `"same"` mode).
pub fn convolve_same(a: &[f64], v: &[f64]) -> Vec<f64> {
    let (long, short) = if a.len() >= v.len() { (a, v) } else { (v, a) };
    let n_long = long.len();
    let n_short = short.len();
    if n_short == 0 {
        return vec![0.0; n_long];
    }

    let offset = (n_short - 1) - n_short / 2;
    let mut out = vec![0.0; n_long];
    for (k, slot) in out.iter_mut().enumerate() {
        // full[k + offset] = sum_j long[k + offset - j] * short[j]
        let idx = k + offset;
        let j_lo = idx.saturating_sub(n_long - 1);
        let j_hi = idx.min(n_short - 1);
        let mut acc = 0.0;
        for j in j_lo..=j_hi {
            acc += long[idx - j] * short[j];
        }
        *slot = acc;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linspace;

    #[test]
    fn trapezoid_integrates_linear_exactly() {
        let x = linspace(0.0, 2.0, 7);
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v + 1.0).collect();
        assert!((trapezoid(&y, &x) - 8.0).abs() < 1e-12);
        assert!((trapezoid_uniform(&y, x[1] - x[0]) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn convolve_same_matches_numpy() {
        // np.convolve([1, 2, 3], [0, 1, 0.5], 'same') == [1, 2.5, 4]
        let out = convolve_same(&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.5]);
        assert_eq!(out, vec![1.0, 2.5, 4.0]);

        // np.convolve([1, 2, 3, 4], [1, 1], 'same') == [1, 3, 5, 7]
        let out = convolve_same(&[1.0, 2.0, 3.0, 4.0], &[1.0, 1.0]);
        assert_eq!(out, vec![1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn centred_delta_kernel_is_identity() {
        let signal = [0.0, 1.0, 4.0, 2.0, 0.5];
        let kernel = [0.0, 0.0, 1.0, 0.0, 0.0];
        assert_eq!(convolve_same(&signal, &kernel), signal.to_vec());
    }
}
