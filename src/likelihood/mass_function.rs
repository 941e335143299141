//! Mass function likelihood.
//!
//! Star counts are observed in radial annuli, each split into mass bins. For
//! every annulus the model's per-bin surface density is integrated over the
//! annulus (`∫ 2πr Σ_j(r) dr`) and turned into a number per unit mass. An
//! interpolant in mean stellar mass then gives the model count at each
//! observed mass bin.

use crate::data::Dataset;
use crate::domain::{Unit, arcsec2pc};
use crate::error::{Error, Result};
use crate::math::{CubicSpline, OutOfRange, gaussian_loglik, interp_all};
use crate::models::Model;

/// One radial annulus and the data rows observed in it.
#[derive(Debug, Clone, PartialEq)]
struct Annulus {
    r1: f64,
    r2: f64,
    rows: Vec<usize>,
}

/// Group rows into annuli (pc), in order of first appearance.
///
/// Explicit `r1`/`r2` columns take precedence; otherwise the integer `bin`
/// column indexes annuli of fixed angular width.
fn annuli(dataset: &Dataset, d: f64, width_arcmin: f64) -> Result<Vec<Annulus>> {
    let keys: Vec<(f64, f64)> = if dataset.contains("r1") && dataset.contains("r2") {
        let r1 = dataset.values_in("r1", Unit::Parsec, d)?;
        let r2 = dataset.values_in("r2", Unit::Parsec, d)?;
        r1.into_iter().zip(r2).collect()
    } else {
        dataset
            .values("bin")?
            .iter()
            .map(|&b| {
                let lo = arcsec2pc(60.0 * width_arcmin * b, d);
                let hi = arcsec2pc(60.0 * width_arcmin * (b + 1.0), d);
                (lo, hi)
            })
            .collect()
    };

    let mut out: Vec<Annulus> = Vec::new();
    for (i, (r1, r2)) in keys.into_iter().enumerate() {
        match out.iter_mut().find(|a| a.r1 == r1 && a.r2 == r2) {
            Some(a) => a.rows.push(i),
            None => out.push(Annulus { r1, r2, rows: vec![i] }),
        }
    }
    Ok(out)
}

/// Model star counts per unit mass, per stellar bin, within `[r1, r2]` pc.
fn binned_counts(model: &Model, r1: f64, r2: f64) -> Result<Vec<f64>> {
    let r = model.r();
    let sigmaj = model.sigmaj();
    let mut counts = Vec::with_capacity(model.nms());
    for j in 0..model.nms() {
        let integrand: Vec<f64> = r
            .iter()
            .zip(sigmaj.bin(j)?)
            .map(|(&ri, &s)| 2.0 * std::f64::consts::PI * ri * s)
            .collect();
        let spline = CubicSpline::new(r, &integrand)?;
        let width = model
            .mes_widths()
            .get(j)
            .copied()
            .ok_or_else(|| Error::Computation(format!("no mass-bin width for stellar bin {j}")))?;
        counts.push(spline.integral(r1, r2) / (model.mj()[j] * width));
    }
    Ok(counts)
}

pub fn likelihood_mass_function(model: &Model, dataset: &Dataset, annulus_width_arcmin: f64) -> Result<f64> {
    let d = model.d();
    let nms = model.nms();

    let n = dataset.values("N")?;
    let dn = dataset.values("ΔN")?;
    let mbin_mean = dataset.values_in("mbin_mean", Unit::SolarMass, d)?;
    let mbin_width = dataset.values_in("mbin_width", Unit::SolarMass, d)?;

    let stellar_mj = &model.mj()[..nms];
    let mut total = 0.0;

    for annulus in annuli(dataset, d, annulus_width_arcmin)? {
        let counts = binned_counts(model, annulus.r1, annulus.r2)?;

        let means: Vec<f64> = annulus.rows.iter().map(|&i| mbin_mean[i]).collect();
        let n_model = interp_all(&means, stellar_mj, &counts, OutOfRange::Extrapolate);

        let n_data: Vec<f64> = annulus.rows.iter().map(|&i| n[i] / mbin_width[i]).collect();
        let err: Vec<f64> = annulus
            .rows
            .iter()
            .zip(n_model.iter())
            .map(|(&i, &nm)| {
                let poisson = dn[i] / mbin_width[i];
                (poisson * poisson + (model.f() * nm).powi(2)).sqrt()
            })
            .collect();

        total += gaussian_loglik(&n_data, &n_model, &err);
    }

    Ok(total)
}
