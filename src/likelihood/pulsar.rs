//! Pulsar timing likelihood.
//!
//! For each pulsar the observed `Pdot / P` is the sum of
//!
//! - the cluster acceleration (a distribution, see [`cluster_component`])
//! - the intrinsic spin-down, drawn from the Galactic field population
//! - measurement error
//! - deterministic Shklovskii and Galactic-potential offsets
//!
//! The three random terms are convolved on the cluster's `Pdot / P` grid,
//! the deterministic ones shift the grid, and the resulting density is read
//! off at the measured value.

use std::f64::consts::LN_10;
use std::sync::Arc;

use crate::data::{Dataset, FieldCatalogue};
use crate::domain::Unit;
use crate::error::{Error, Result};
use crate::likelihood::acceleration::{cluster_component, galactic_component, shklovskii_component};
use crate::math::{GaussianKde2, OutOfRange, convolve_same, gaussian, interp_with};
use crate::models::Model;

/// Fixed inputs of the pulsar likelihood, computed once per observation set.
#[derive(Debug, Clone)]
pub struct PulsarContext {
    /// KDE of `(log10 P, log10 Pdot_int)` for field pulsars.
    pub kde: Arc<GaussianKde2>,
    /// Cluster proper motion (mas/yr).
    pub pm: f64,
    /// Galactic latitude (degrees).
    pub b: f64,
    /// Galactic longitude (degrees).
    pub l: f64,
}

/// KDE of field-pulsar period against intrinsic period derivative.
///
/// The Shklovskii-corrected `Pdot` has the Galactic-potential contribution
/// removed; rows where that leaves a non-positive value are dropped.
pub fn field_pdot_kde(catalogue: &FieldCatalogue) -> Result<GaussianKde2> {
    let mut log_p = Vec::with_capacity(catalogue.pulsars.len());
    let mut log_pdot = Vec::with_capacity(catalogue.pulsars.len());
    for p in &catalogue.pulsars {
        let gal = galactic_component(p.b_deg, p.l_deg, p.distance_kpc) * p.period;
        let x = p.period.log10();
        let y = (p.pdot_pm - gal).log10();
        if x.is_finite() && y.is_finite() {
            log_p.push(x);
            log_pdot.push(y);
        }
    }
    let dropped = catalogue.pulsars.len() - log_p.len();
    if dropped > 0 {
        log::debug!("dropped {dropped} field pulsars with non-positive intrinsic Pdot");
    }
    GaussianKde2::new(&log_p, &log_pdot)
}

/// Gaussian error kernel on `domain`, normalised on the grid. A width that
/// the grid cannot resolve collapses to a discrete delta.
fn measurement_kernel(domain: &[f64], width: f64, da: f64) -> Vec<f64> {
    let mid = domain.len() / 2;
    let mut kernel: Vec<f64> = if width > 0.0 && width.is_finite() {
        domain.iter().map(|&q| gaussian(q, width, 0.0)).collect()
    } else {
        vec![0.0; domain.len()]
    };
    let sum: f64 = kernel.iter().sum::<f64>() * da;
    if sum > 0.0 && sum.is_finite() {
        for k in kernel.iter_mut() {
            *k /= sum;
        }
    } else {
        kernel.iter_mut().for_each(|k| *k = 0.0);
        kernel[mid] = 1.0 / da;
    }
    kernel
}

/// Density of intrinsic `Pdot / P` at period `period` on `domain`.
fn spin_down_kernel(kde: &GaussianKde2, domain: &[f64], period: f64) -> Vec<f64> {
    let log_p = period.log10();
    domain
        .iter()
        .map(|&q| {
            if q > 0.0 {
                // change of variables from log10(Pdot) to Pdot / P
                kde.conditional(log_p, (q * period).log10()) / (q * LN_10)
            } else {
                0.0
            }
        })
        .collect()
}

/// Probability density of one pulsar's measured `Pdot / P`.
#[allow(clippy::too_many_arguments)]
fn pulsar_probability(
    model: &Model,
    context: &PulsarContext,
    r_pc: f64,
    period: f64,
    period_err: f64,
    pdot: f64,
    pdot_err: f64,
    mass_bin: usize,
    eps: f64,
) -> Result<f64> {
    let cluster = match cluster_component(model, r_pc, mass_bin, eps) {
        Ok(dist) => dist,
        Err(Error::OutOfBoundsRadius { radius, rt }) => {
            log::debug!("pulsar at {radius:.3} pc lies outside rt = {rt:.3} pc");
            return Ok(0.0);
        }
        Err(e) => return Err(e),
    };
    let domain = &cluster.domain;
    let da = domain[1] - domain[0];

    let width = ((pdot_err / period).powi(2) + (period_err * pdot / (period * period)).powi(2)).sqrt();
    let err_kernel = measurement_kernel(domain, width, da);
    let field_kernel = spin_down_kernel(&context.kde, domain, period);

    let conv1: Vec<f64> = convolve_same(&err_kernel, &cluster.density)
        .into_iter()
        .map(|v| v * da)
        .collect();
    let conv2: Vec<f64> = convolve_same(&conv1, &field_kernel)
        .into_iter()
        .map(|v| v * da)
        .collect();

    let d = model.d();
    let offset = shklovskii_component(context.pm, d) + galactic_component(context.b, context.l, d);
    let shifted: Vec<f64> = domain.iter().map(|q| q + offset).collect();

    Ok(interp_with(pdot / period, &shifted, &conv2, OutOfRange::Fill(0.0)))
}

/// Sum of log-probabilities of every pulsar in `dataset`.
///
/// A pulsar outside the model's truncation radius has zero probability, so
/// the whole term becomes `-inf`.
pub fn likelihood_pulsar(
    model: &Model,
    dataset: &Dataset,
    context: &PulsarContext,
    mass_bin: Option<usize>,
    eps: f64,
) -> Result<f64> {
    let bin = match (mass_bin, dataset.mass()) {
        (None, None) => {
            log::debug!("no mass bin provided for pulsars, using the final bin");
            model.default_pulsar_bin()
        }
        _ => model.mass_bin_for(dataset, mass_bin, model.default_pulsar_bin())?,
    };
    let d = model.d();

    let r = dataset.values_in("r", Unit::Parsec, d)?;
    let period = dataset.values_in("P", Unit::Second, d)?;
    let period_err = dataset.uncertainty("P", &period, Unit::Second, d)?;
    let pdot = dataset.values_in("Pdot", Unit::Dimensionless, d)?;
    let pdot_err = dataset.uncertainty("Pdot", &pdot, Unit::Dimensionless, d)?;

    let mut total = 0.0;
    for i in 0..r.len() {
        let prob = pulsar_probability(
            model,
            context,
            r[i],
            period[i],
            period_err[i],
            pdot[i],
            pdot_err[i],
            bin,
            eps,
        )?;
        if !(prob > 0.0) {
            return Ok(f64::NEG_INFINITY);
        }
        total += prob.ln();
    }
    Ok(total)
}
