//! Gaussian helpers shared by the likelihood components.

/// Natural log of `sqrt(2π)`.
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// Normal PDF `N(x; mu, sigma)`.
pub fn gaussian(x: f64, sigma: f64, mu: f64) -> f64 {
    let z = (x - mu) / sigma;
    (-0.5 * z * z - sigma.ln() - LN_SQRT_2PI).exp()
}

/// Gaussian log-likelihood of observations against model predictions,
/// dropping the `ln(2π)` constant:
///
/// `-0.5 * Σ [ (obs - model)^2 / err^2 + ln(err^2) ]`
pub fn gaussian_loglik(obs: &[f64], model: &[f64], err: &[f64]) -> f64 {
    obs.iter()
        .zip(model.iter())
        .zip(err.iter())
        .map(|((&o, &m), &e)| {
            let var = e * e;
            (o - m) * (o - m) / var + var.ln()
        })
        .sum::<f64>()
        * -0.5
}
