//! Model confidence intervals from a posterior chain.
//!
//! A random subset of chain samples is turned into models (in parallel), each
//! model's profiles are resampled onto one radius grid, and per-radius
//! quantiles give the bands.

use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::data::Observations;
use crate::domain::Theta;
use crate::error::{Error, Result};
use crate::math::{OutOfRange, interp_all, log_space};
use crate::models::{Model, ModelBuilder};

#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceSettings {
    /// Chain samples turned into models.
    pub n_samples: usize,
    /// Points on the shared radius grid.
    pub n_radii: usize,
    /// Innermost radius of the grid (pc).
    pub r_min_pc: f64,
    /// Quantiles reported per radius, in increasing order.
    pub quantiles: Vec<f64>,
    pub seed: u64,
}

impl Default for ConfidenceSettings {
    fn default() -> Self {
        Self {
            n_samples: 100,
            n_radii: 100,
            r_min_pc: 0.01,
            // median and the 1σ / 2σ intervals
            quantiles: vec![0.02275, 0.158_655, 0.5, 0.841_345, 0.97725],
            seed: 42,
        }
    }
}

/// Quantile bands of one profile: `values[q][i]` is quantile `q` at radius `i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    pub quantiles: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelBands {
    /// Shared radius grid (pc).
    pub r: Vec<f64>,
    /// Line-of-sight dispersion (km/s).
    pub los: Band,
    /// Total proper-motion dispersion (km/s).
    pub pm_tot: Band,
    /// Number surface density (1/pc²).
    pub number_density: Band,
    /// Models that were built; non-convergent samples are skipped.
    pub n_models: usize,
}

/// Profiles of one model on the shared grid.
struct Sampled {
    los: Vec<f64>,
    pm_tot: Vec<f64>,
    number_density: Vec<f64>,
}

pub fn model_confidence(
    builder: &ModelBuilder,
    observations: Option<&Observations>,
    chain: &[Theta],
    settings: &ConfidenceSettings,
) -> Result<ModelBands> {
    if chain.is_empty() {
        return Err(Error::Validation("chain is empty".to_string()));
    }
    if settings.n_samples == 0 || settings.n_radii < 2 {
        return Err(Error::Validation("need at least one sample and two radii".to_string()));
    }
    if settings.quantiles.iter().any(|q| !(0.0..=1.0).contains(q))
        || settings.quantiles.windows(2).any(|w| w[0] > w[1])
    {
        return Err(Error::Validation(format!("invalid quantiles {:?}", settings.quantiles)));
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let draws: Vec<Theta> = (0..settings.n_samples)
        .map(|_| chain[rng.gen_range(0..chain.len())])
        .collect();

    let built: Vec<Result<Model>> = draws.par_iter().map(|theta| builder.build(theta, observations)).collect();
    let mut models = Vec::with_capacity(built.len());
    for result in built {
        match result {
            Ok(model) => models.push(model),
            Err(Error::NonConvergentModel(reason)) => log::debug!("skipping sample: {reason}"),
            Err(e) => return Err(e),
        }
    }
    if models.is_empty() {
        return Err(Error::Computation("no chain sample produced a model".to_string()));
    }
    if models.len() < draws.len() {
        log::warn!("{} of {} samples did not converge", draws.len() - models.len(), draws.len());
    }

    let r_max = models.iter().map(Model::rt).fold(0.0, f64::max);
    let r = log_space(settings.r_min_pc, r_max, settings.n_radii)?;

    let sampled = models
        .par_iter()
        .map(|model| sample_profiles(model, &r))
        .collect::<Result<Vec<Sampled>>>()?;

    let los_rows: Vec<&[f64]> = sampled.iter().map(|s| s.los.as_slice()).collect();
    let pm_rows: Vec<&[f64]> = sampled.iter().map(|s| s.pm_tot.as_slice()).collect();
    let nd_rows: Vec<&[f64]> = sampled.iter().map(|s| s.number_density.as_slice()).collect();
    let los = quantile_band(&los_rows, &settings.quantiles, r.len());
    let pm_tot = quantile_band(&pm_rows, &settings.quantiles, r.len());
    let number_density = quantile_band(&nd_rows, &settings.quantiles, r.len());

    log::info!("confidence bands from {} models", models.len());
    Ok(ModelBands {
        r,
        los,
        pm_tot,
        number_density,
        n_models: models.len(),
    })
}

/// Profiles of the heaviest stellar bin, zero beyond the model's edge.
fn sample_profiles(model: &Model, r: &[f64]) -> Result<Sampled> {
    let bin = model.default_stellar_bin();
    let grid = model.r();
    let mj = model.mj()[bin];

    let v2p = model.v2pj().bin(bin)?;
    let v2t = model.v2tj().bin(bin)?;
    let v2r = model.v2rj().bin(bin)?;
    let sigma = model.sigmaj().bin(bin)?;

    let los: Vec<f64> = v2p.iter().map(|v| v.sqrt()).collect();
    let pm_tot: Vec<f64> = v2t.iter().zip(v2r).map(|(t, r)| (0.5 * (t + r)).sqrt()).collect();
    let number: Vec<f64> = sigma.iter().map(|s| s / mj).collect();

    let at = |values: &[f64]| interp_all(r, grid, values, OutOfRange::Fill(0.0));
    Ok(Sampled {
        los: at(&los),
        pm_tot: at(&pm_tot),
        number_density: at(&number),
    })
}

fn quantile_band(rows: &[&[f64]], quantiles: &[f64], n: usize) -> Band {
    let mut values = vec![vec![0.0; n]; quantiles.len()];
    let mut column = Vec::with_capacity(rows.len());
    for i in 0..n {
        column.clear();
        column.extend(rows.iter().map(|row| row[i]));
        column.sort_by(f64::total_cmp);
        for (q_idx, &q) in quantiles.iter().enumerate() {
            values[q_idx][i] = quantile_sorted(&column, q);
        }
    }
    Band {
        quantiles: quantiles.to_vec(),
        values,
    }
}

/// Linearly interpolated quantile of sorted data.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let t = pos - lo as f64;
            sorted[lo] + t * (sorted[hi] - sorted[lo])
        }
    }
}
