//! Number density profile likelihood.
//!
//! Only the *shape* of the profile is fitted: the model number density is
//! rescaled by the least-squares amplitude
//!
//! `K = Σ(obs · model / err²) / Σ(model² / err²)`
//!
//! and a nuisance variance `s2` is added to the errors, which keeps the
//! background-dominated outer points from driving the fit.

use crate::data::Dataset;
use crate::domain::{Unit, convert_all};
use crate::error::Result;
use crate::math::{OutOfRange, gaussian_loglik, interp_all};
use crate::models::Model;

/// Observed densities at or below this value are ignored.
const SIGMA_FLOOR: f64 = 0.1;

/// Least-squares amplitude matching `model` to `obs` under errors `err`.
pub fn scaling_factor(obs: &[f64], model: &[f64], err: &[f64]) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for ((&o, &m), &e) in obs.iter().zip(model).zip(err) {
        let w = 1.0 / (e * e);
        num += o * m * w;
        den += m * m * w;
    }
    num / den
}

pub fn likelihood_number_density(model: &Model, dataset: &Dataset, mass_bin: Option<usize>) -> Result<f64> {
    let bin = model.mass_bin_for(dataset, mass_bin, model.default_stellar_bin())?;
    let d = model.d();

    let r_unit = dataset.unit_of("r")?;
    let sigma_unit = dataset.unit_of("Σ")?;

    let obs_r = dataset.values_in("r", r_unit, d)?;
    let obs_sigma = dataset.values_in("Σ", sigma_unit, d)?;
    // The model is only scaled to the data further down, so asymmetric errors
    // are picked against the observations themselves: always the lower error.
    let obs_err = dataset.uncertainty("Σ", &obs_sigma, sigma_unit, d)?;

    // number surface density: mass surface density over mean stellar mass
    let mj = model.mj()[bin];
    let number: Vec<f64> = model.sigmaj().bin(bin)?.iter().map(|s| s / mj).collect();
    let model_r = convert_all(model.r(), model.r_unit(), r_unit, d)?;
    let model_sigma = match sigma_unit {
        // surface-brightness style data without a physical unit
        Unit::Dimensionless => number,
        unit => convert_all(&number, Unit::PerPc2, unit, d)?,
    };

    let (mut obs, mut radii, mut err) = (Vec::new(), Vec::new(), Vec::new());
    for i in 0..obs_sigma.len() {
        if obs_sigma[i] > SIGMA_FLOOR {
            obs.push(obs_sigma[i]);
            radii.push(obs_r[i]);
            err.push(obs_err[i]);
        }
    }
    if obs.is_empty() {
        log::debug!("{}: no points above the density floor", dataset.name());
        return Ok(0.0);
    }

    let mut interpolated = interp_all(&radii, &model_r, &model_sigma, OutOfRange::Clamp);
    let k = scaling_factor(&obs, &interpolated, &err);
    for v in interpolated.iter_mut() {
        *v *= k;
    }

    let s2 = model.s2();
    let yerr: Vec<f64> = err.iter().map(|e| (e * e + s2).sqrt()).collect();

    Ok(gaussian_loglik(&obs, &interpolated, &yerr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Variable;
    use crate::domain::Theta;
    use crate::fixtures::{builder_with, plummer_builder};

    fn dataset() -> Dataset {
        Dataset::new("number_density")
            .with_variable("r", Variable::new(vec![0.5, 1.0, 2.0, 3.0, 8.0], Some(Unit::Parsec)))
            .with_variable("Σ", Variable::new(vec![20.0, 10.0, 5.0, 2.0, 0.05], Some(Unit::PerPc2)))
            .with_variable("ΔΣ", Variable::new(vec![2.0, 1.0, 1.0, 1.0, 0.5], Some(Unit::PerPc2)))
    }

    #[test]
    fn scaling_factor_recovers_amplitude() {
        let model = [1.0, 2.0, 4.0];
        let obs: Vec<f64> = model.iter().map(|m| 3.5 * m).collect();
        let k = scaling_factor(&obs, &model, &[1.0, 0.5, 2.0]);
        assert!((k - 3.5).abs() < 1e-12);
    }

    #[test]
    fn invariant_to_model_amplitude() {
        let theta = Theta::default();
        let base = plummer_builder().build(&theta, None).unwrap();
        let scaled = builder_with(|s| s.sigma_scale = 37.0).build(&theta, None).unwrap();

        let ds = dataset();
        let a = likelihood_number_density(&base, &ds, None).unwrap();
        let b = likelihood_number_density(&scaled, &ds, None).unwrap();
        assert!((a - b).abs() < 1e-9 * a.abs().max(1.0), "{a} vs {b}");
    }

    #[test]
    fn faint_points_are_ignored() {
        let model = plummer_builder().build(&Theta::default(), None).unwrap();
        let with_faint = likelihood_number_density(&model, &dataset(), None).unwrap();

        let trimmed = Dataset::new("number_density")
            .with_variable("r", Variable::new(vec![0.5, 1.0, 2.0, 3.0], Some(Unit::Parsec)))
            .with_variable("Σ", Variable::new(vec![20.0, 10.0, 5.0, 2.0], Some(Unit::PerPc2)))
            .with_variable("ΔΣ", Variable::new(vec![2.0, 1.0, 1.0, 1.0], Some(Unit::PerPc2)));
        let without = likelihood_number_density(&model, &trimmed, None).unwrap();
        assert_eq!(with_faint, without);
    }

    #[test]
    fn asymmetric_errors_use_the_lower_side() {
        let model = plummer_builder().build(&Theta::default(), None).unwrap();
        let r = vec![0.5, 1.0, 2.0, 3.0];
        let sigma = vec![20.0, 10.0, 5.0, 2.0];
        let down = vec![2.0, 1.0, 1.0, 1.0];

        let asymmetric = Dataset::new("number_density")
            .with_variable("r", Variable::new(r.clone(), Some(Unit::Parsec)))
            .with_variable("Σ", Variable::new(sigma.clone(), Some(Unit::PerPc2)))
            .with_variable("ΔΣ,up", Variable::new(vec![9.0, 7.0, 5.0, 3.0], Some(Unit::PerPc2)))
            .with_variable("ΔΣ,down", Variable::new(down.clone(), Some(Unit::PerPc2)));
        let lower_only = Dataset::new("number_density")
            .with_variable("r", Variable::new(r, Some(Unit::Parsec)))
            .with_variable("Σ", Variable::new(sigma, Some(Unit::PerPc2)))
            .with_variable("ΔΣ", Variable::new(down, Some(Unit::PerPc2)));

        let a = likelihood_number_density(&model, &asymmetric, None).unwrap();
        let b = likelihood_number_density(&model, &lower_only, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn nuisance_variance_widens_errors() {
        let ds = dataset();
        let tight = Theta { s2: 0.01, ..Theta::default() };
        let loose = Theta { s2: 5.0, ..Theta::default() };
        let builder = plummer_builder();
        let lt = likelihood_number_density(&builder.build(&tight, None).unwrap(), &ds, None).unwrap();
        let ll = likelihood_number_density(&builder.build(&loose, None).unwrap(), &ds, None).unwrap();
        assert!(lt != ll);
        assert!(lt.is_finite() && ll.is_finite());
    }
}
