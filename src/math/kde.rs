//! Two-dimensional Gaussian kernel density estimate.
//!
//! Bandwidth follows Scott's rule (`n^(-1/6)` in 2-D) applied to the sample
//! covariance, as `scipy.stats.gaussian_kde` does by default.

use nalgebra::{Matrix2, Vector2};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct GaussianKde2 {
    points: Vec<Vector2<f64>>,
    inv_cov: Matrix2<f64>,
    /// Kernel variance of the first coordinate (for the marginal).
    var_x: f64,
    norm: f64,
    y_range: (f64, f64),
}

impl GaussianKde2 {
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(Error::Computation("KDE coordinate length mismatch".to_string()));
        }
        let n = xs.len();
        if n < 3 {
            return Err(Error::Computation(format!("KDE needs at least 3 points, got {n}")));
        }

        let points: Vec<Vector2<f64>> =
            xs.iter().zip(ys.iter()).map(|(&x, &y)| Vector2::new(x, y)).collect();

        let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p) / n as f64;
        let mut cov = Matrix2::zeros();
        for p in &points {
            let d = p - mean;
            cov += d * d.transpose();
        }
        cov /= (n - 1) as f64;

        let factor = (n as f64).powf(-1.0 / 6.0);
        let kernel_cov = cov * (factor * factor);
        let det = kernel_cov.determinant();
        let inv_cov = kernel_cov
            .try_inverse()
            .filter(|_| det.is_finite() && det > 0.0)
            .ok_or_else(|| Error::Computation("KDE covariance is singular".to_string()))?;

        let norm = 1.0 / (2.0 * std::f64::consts::PI * det.sqrt() * n as f64);

        let y_min = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let y_max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            points,
            inv_cov,
            var_x: kernel_cov[(0, 0)],
            norm,
            y_range: (y_min, y_max),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Min/max of the second coordinate of the samples.
    pub fn y_range(&self) -> (f64, f64) {
        self.y_range
    }

    /// Joint density at `(x, y)`.
    pub fn pdf(&self, x: f64, y: f64) -> f64 {
        let q = Vector2::new(x, y);
        let sum: f64 = self
            .points
            .iter()
            .map(|p| {
                let d = q - p;
                let m = (d.transpose() * self.inv_cov * d)[(0, 0)];
                (-0.5 * m).exp()
            })
            .sum();
        sum * self.norm
    }

    /// Marginal density of the first coordinate at `x`.
    pub fn marginal_x(&self, x: f64) -> f64 {
        let n = self.points.len() as f64;
        let sd = self.var_x.sqrt();
        let sum: f64 = self
            .points
            .iter()
            .map(|p| {
                let z = (x - p.x) / sd;
                (-0.5 * z * z).exp()
            })
            .sum();
        sum / (n * sd * (2.0 * std::f64::consts::PI).sqrt())
    }

    /// Conditional density of `y` given `x`.
    pub fn conditional(&self, x: f64, y: f64) -> f64 {
        let marginal = self.marginal_x(x);
        if !(marginal > 0.0) {
            return 0.0;
        }
        self.pdf(x, y) / marginal
    }
}
