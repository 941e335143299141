//! Velocity dispersion likelihoods: line-of-sight and the four proper-motion
//! variants.
//!
//! The model profile is converted into the units the data were observed in
//! (radii to the dataset's `r` unit, velocities to km/s or mas/yr as stored),
//! interpolated at the observed radii, and compared with a Gaussian
//! likelihood.

use crate::data::Dataset;
use crate::domain::{Unit, convert_all};
use crate::error::Result;
use crate::math::{OutOfRange, gaussian_loglik, interp_all};
use crate::models::Model;

/// Gaussian log-likelihood of dataset variable `name` against a model
/// profile sampled on the model radius grid.
///
/// `model_unit` is the unit of `model_values`; `None` means dimensionless.
pub(crate) fn profile_loglik(
    model: &Model,
    dataset: &Dataset,
    name: &str,
    model_values: &[f64],
    model_unit: Option<Unit>,
) -> Result<f64> {
    let d = model.d();

    let r_unit = dataset.unit_of("r")?;
    let obs_r = dataset.values_in("r", r_unit, d)?;
    let model_r = convert_all(model.r(), model.r_unit(), r_unit, d)?;

    let (obs, model_in_obs_units, unit) = match model_unit {
        Some(from) => {
            let unit = dataset.unit_of(name)?;
            (
                dataset.values_in(name, unit, d)?,
                convert_all(model_values, from, unit, d)?,
                unit,
            )
        }
        None => (
            dataset.values_in(name, Unit::Dimensionless, d)?,
            model_values.to_vec(),
            Unit::Dimensionless,
        ),
    };

    let interpolated = interp_all(&obs_r, &model_r, &model_in_obs_units, OutOfRange::Clamp);
    let err = dataset.uncertainty(name, &interpolated, unit, d)?;

    Ok(gaussian_loglik(&obs, &interpolated, &err))
}

/// Line-of-sight velocity dispersion (`σ`).
pub fn likelihood_los(model: &Model, dataset: &Dataset, mass_bin: Option<usize>) -> Result<f64> {
    let bin = model.mass_bin_for(dataset, mass_bin, model.default_stellar_bin())?;
    let v2p = model.v2pj();
    let sigma: Vec<f64> = v2p.bin(bin)?.iter().map(|v| v.sqrt()).collect();
    profile_loglik(model, dataset, "σ", &sigma, Some(Unit::KmPerSecond))
}

/// Total proper-motion dispersion, `sqrt((v2T + v2R) / 2)`.
pub fn likelihood_pm_tot(model: &Model, dataset: &Dataset, mass_bin: Option<usize>) -> Result<f64> {
    let bin = model.mass_bin_for(dataset, mass_bin, model.default_stellar_bin())?;
    let t = model.v2tj().bin(bin)?;
    let r = model.v2rj().bin(bin)?;
    let tot: Vec<f64> = t.iter().zip(r).map(|(t, r)| (0.5 * (t + r)).sqrt()).collect();
    profile_loglik(model, dataset, "PM_tot", &tot, Some(Unit::KmPerSecond))
}

/// Anisotropy ratio `sqrt(v2T / v2R)` (dimensionless).
pub fn likelihood_pm_ratio(model: &Model, dataset: &Dataset, mass_bin: Option<usize>) -> Result<f64> {
    let bin = model.mass_bin_for(dataset, mass_bin, model.default_stellar_bin())?;
    let t = model.v2tj().bin(bin)?;
    let r = model.v2rj().bin(bin)?;
    let ratio: Vec<f64> = t.iter().zip(r).map(|(t, r)| (t / r).sqrt()).collect();
    profile_loglik(model, dataset, "PM_ratio", &ratio, None)
}

/// Radial proper-motion dispersion.
pub fn likelihood_pm_r(model: &Model, dataset: &Dataset, mass_bin: Option<usize>) -> Result<f64> {
    let bin = model.mass_bin_for(dataset, mass_bin, model.default_stellar_bin())?;
    let radial: Vec<f64> = model.v2rj().bin(bin)?.iter().map(|v| v.sqrt()).collect();
    profile_loglik(model, dataset, "PM_R", &radial, Some(Unit::KmPerSecond))
}

/// Tangential proper-motion dispersion.
pub fn likelihood_pm_t(model: &Model, dataset: &Dataset, mass_bin: Option<usize>) -> Result<f64> {
    let bin = model.mass_bin_for(dataset, mass_bin, model.default_stellar_bin())?;
    let tangential: Vec<f64> = model.v2tj().bin(bin)?.iter().map(|v| v.sqrt()).collect();
    profile_loglik(model, dataset, "PM_T", &tangential, Some(Unit::KmPerSecond))
}
