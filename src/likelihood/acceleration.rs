//! Line-of-sight acceleration of pulsars, expressed as `Pdot / P`.
//!
//! Three terms contribute to an observed `Pdot / P`:
//!
//! - the cluster potential, which is a *distribution* because the depth of
//!   the pulsar along the line of sight is unknown ([`cluster_component`])
//! - the Shklovskii effect from the cluster's transverse motion
//!   ([`shklovskii_component`])
//! - the Galactic potential ([`galactic_component`])

use crate::domain::{C_M_PER_S, M_PER_PC};
use crate::error::{Error, Result};
use crate::math::{CubicSpline, linspace, log_space, trapezoid_uniform};
use crate::models::Model;

/// Sun's galactocentric radius (kpc).
const R0_KPC: f64 = 8.178;
/// Flat Galactic rotation speed (km/s).
const VC_KMS: f64 = 220.0;
const C_KMS: f64 = 299_792.458;
const KM_PER_KPC: f64 = 3.086e16;

/// Probability density of the cluster's `Pdot / P` contribution.
#[derive(Debug, Clone)]
pub struct AccelerationDistribution {
    /// Symmetric, evenly spaced `Pdot / P` grid (1/s).
    pub domain: Vec<f64>,
    /// Density per unit `Pdot / P` on `domain`, integrating to 1.
    pub density: Vec<f64>,
    /// Two-sided area of the truncated distribution before it was
    /// renormalised (ideally 2).
    pub area: f64,
    /// Whether the cumulative area reached 2 within tolerance.
    pub converged: bool,
    /// Whether `a(z)` peaks before the cluster boundary, so two depths
    /// contribute to each acceleration above the boundary value.
    pub interior_peak: bool,
}

/// Result of cutting the mirrored distribution down to its populated core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Truncation {
    /// Trapezoid steps retained on each side of the centre.
    pub kept_steps: usize,
    pub area: f64,
    pub converged: bool,
}

/// Distribution of cluster-induced `Pdot / P` for a pulsar at projected
/// radius `r_proj` (pc) in mass bin `mass_bin`.
///
/// The acceleration along the line of sight at depth `z` is
/// `a(z) = G M(r) z / r^3` with `r^2 = R^2 + z^2`. Pulling the stellar
/// density at `z` back through `a(z)` gives `P(a) = rho(z(a)) / |da/dz|`,
/// summed over both branches of the (single-peaked) `a(z)` curve.
///
/// Each grid value is the line-of-sight mass falling in the acceleration cell
/// around it, divided by the cell width. The inverse square-root spike at the
/// peak acceleration is integrated this way instead of sampled, so the
/// one-sided area is 1 up to rounding.
///
/// The mirrored distribution is cut where its two-sided cumulative area first
/// reaches 2 within `eps`; if a step overshoots 2 the cut moves one step
/// inwards. If 2 is never reached the whole domain is kept and a warning is
/// logged. The result is then renormalised to unit area.
pub fn cluster_component(
    model: &Model,
    r_proj: f64,
    mass_bin: usize,
    eps: f64,
) -> Result<AccelerationDistribution> {
    let rt = model.rt();
    if !(r_proj < rt) {
        return Err(Error::OutOfBoundsRadius { radius: r_proj, rt });
    }

    let r_grid = model.r();
    let nz = r_grid.len();

    // deepest point along this line of sight
    let zt = (rt * rt - r_proj * r_proj).sqrt();
    let z_start = match r_grid.get(1) {
        Some(&r1) if r1 > 0.0 => r1.min(zt * 1e-3),
        _ => zt * 1e-3,
    };
    let z = log_space(z_start, zt, nz)?;
    let r_edge = r_grid[nz - 1];
    let radii: Vec<f64> = z
        .iter()
        .map(|&zi| (r_proj * r_proj + zi * zi).sqrt().min(r_edge))
        .collect();

    let mass_spl = CubicSpline::new(r_grid, model.mc().values())?;
    // (km/s)^2 / pc -> m/s^2
    let to_si = 1e6 / M_PER_PC;
    let az: Vec<f64> = z
        .iter()
        .zip(radii.iter())
        .map(|(&zi, &ri)| model.g_const() * mass_spl.eval(ri) * zi / ri.powi(3) * to_si)
        .collect();
    let az_spl = CubicSpline::new(&z, &az)?;

    let rho_spl = CubicSpline::new(r_grid, model.rhoj().bin(mass_bin)?)?;
    let rhoz: Vec<f64> = radii.iter().map(|&ri| rho_spl.eval(ri)).collect();
    let rhoz_spl = CubicSpline::new(&z, &rhoz)?;

    // First maximum of a(z) inside the boundary, if any.
    let zmax = az_spl
        .derivative_roots()
        .into_iter()
        .find(|&root| az_spl.second_derivative(root) < 0.0);

    let nr = nz;
    let (z_peak, near_branch, far_branch) = match zmax {
        Some(zm) => {
            let z1 = linspace(z[0], zm, nr);
            let mut z2 = linspace(zm, zt, nr);
            z2.reverse();
            (zm, inverse_branch(&az_spl, &z1)?, Some(inverse_branch(&az_spl, &z2)?))
        }
        None => {
            log::debug!("acceleration peaks at the boundary for R = {r_proj:.4} pc");
            let z1 = linspace(z[0], zt, nr);
            (zt, inverse_branch(&az_spl, &z1)?, None)
        }
    };

    let az_max = az_spl.eval(z_peak);
    let a_domain = linspace(0.0, az_max, 6 * nr);
    let da = a_domain[1] - a_domain[0];
    let n = a_domain.len();

    // Cell edges sit halfway between grid points; the first and last cells
    // are half cells ending on the grid.
    let mut edges = Vec::with_capacity(n + 1);
    edges.push(0.0);
    edges.extend(a_domain.windows(2).map(|w| 0.5 * (w[0] + w[1])));
    edges.push(az_max);

    // Line-of-sight mass with acceleration below each edge.
    let mut cumulative: Vec<f64> = edges
        .iter()
        .map(|&a| {
            let near = rhoz_spl.integral(z[0], branch_depth(&near_branch, a, z[0], z_peak));
            let far = far_branch
                .as_ref()
                .map_or(0.0, |far| rhoz_spl.integral(branch_depth(far, a, zt, z_peak), zt));
            near + far
        })
        .collect();
    for k in 1..cumulative.len() {
        cumulative[k] = cumulative[k].max(cumulative[k - 1]);
    }

    let column = cumulative[n];
    if !(column > 0.0) {
        return Err(Error::Computation(format!(
            "no density along the line of sight at R = {r_proj:.4} pc (mass bin {mass_bin})"
        )));
    }

    let one_sided: Vec<f64> = (0..n)
        .map(|i| {
            let mass = (cumulative[i + 1] - cumulative[i]) / column;
            if i == 0 || i == n - 1 { 2.0 * mass / da } else { mass / da }
        })
        .collect();

    // Mirror about zero.
    let mut density = Vec::with_capacity(2 * n - 1);
    density.extend(one_sided[1..].iter().rev());
    density.extend_from_slice(&one_sided);
    let mut domain = Vec::with_capacity(2 * n - 1);
    domain.extend(a_domain[1..].iter().rev().map(|a| -a));
    domain.extend_from_slice(&a_domain);

    let cut = truncate_two_sided(&mut density, da, eps)?;

    // m/s^2 -> 1/s, keeping unit area
    for a in domain.iter_mut() {
        *a /= C_M_PER_S;
    }
    for p in density.iter_mut() {
        *p *= C_M_PER_S;
    }

    Ok(AccelerationDistribution {
        domain,
        density,
        area: cut.area,
        converged: cut.converged,
        interior_peak: far_branch.is_some(),
    })
}

/// Depth on `branch` where the acceleration equals `a`, held at `at_low`
/// below the branch's acceleration range and at `at_high` above it.
fn branch_depth(branch: &CubicSpline, a: f64, at_low: f64, at_high: f64) -> f64 {
    if a <= branch.x_min() {
        return at_low;
    }
    if a >= branch.x_max() {
        return at_high;
    }
    branch.eval(a).clamp(at_low.min(at_high), at_low.max(at_high))
}

/// Spline `z(a)` for one monotonic branch of `a(z)`.
///
/// `z_samples` must be ordered so that `a` increases along it. Points where
/// `a` fails to increase strictly (flat spline sections) are skipped.
fn inverse_branch(az_spl: &CubicSpline, z_samples: &[f64]) -> Result<CubicSpline> {
    let mut a = Vec::with_capacity(z_samples.len());
    let mut z = Vec::with_capacity(z_samples.len());
    for &zi in z_samples {
        let ai = az_spl.eval(zi);
        if a.last().is_none_or(|&last: &f64| ai > last) {
            a.push(ai);
            z.push(zi);
        }
    }
    CubicSpline::new(&a, &z)
}

/// Cut the mirrored distribution (odd length, centred on index `len / 2`)
/// once its cumulative two-sided area reaches 2, zero everything outside the
/// cut, and rescale the remainder to unit area.
pub(crate) fn truncate_two_sided(density: &mut [f64], da: f64, eps: f64) -> Result<Truncation> {
    let mid = density.len() / 2;
    let mut norm = 0.0;
    let mut outcome = None;

    for ind in 0..mid {
        let step = 0.5 * da * (density[mid + ind] + density[mid + ind + 1])
            + 0.5 * da * (density[mid - ind] + density[mid - ind - 1]);
        norm += step;

        if (2.0 - norm).abs() <= eps {
            outcome = Some((ind + 1, true));
            break;
        }
        if norm > 2.0 {
            // back up to the last step still below the target
            log::warn!(
                "acceleration distribution overshot 2 at step {ind}, area {norm:.6}; cutting at area {:.6}",
                norm - step
            );
            outcome = Some((ind.max(1), false));
            break;
        }
    }

    let (kept_steps, converged) = match outcome {
        Some(o) => o,
        None => {
            log::warn!("acceleration distribution failed to integrate to 1.0, area: {:.6}", norm / 2.0);
            (mid, false)
        }
    };

    let lo = mid - kept_steps;
    let hi = mid + kept_steps;
    for (i, p) in density.iter_mut().enumerate() {
        if i < lo || i > hi {
            *p = 0.0;
        }
    }

    let area = trapezoid_uniform(&density[lo..=hi], da);
    if !(area > 0.0 && area.is_finite()) {
        return Err(Error::Computation(format!(
            "acceleration distribution has unusable area {area}"
        )));
    }
    for p in density.iter_mut() {
        *p /= area;
    }

    Ok(Truncation {
        kept_steps,
        area,
        converged: converged || (2.0 - area).abs() <= eps,
    })
}

/// Apparent `Pdot / P` (1/s) from transverse motion `pm` (mas/yr) at
/// distance `d` (kpc).
pub fn shklovskii_component(pm: f64, d: f64) -> f64 {
    // mas/yr -> rad/s
    let pm_rad = pm * 4.84e-9 / 31_557_600.0;
    // kpc -> m
    let d_m = d / 3.24078e-20;
    pm_rad * pm_rad * d_m / C_M_PER_S
}

/// `Pdot / P` (1/s) from the Galactic potential for an object at Galactic
/// latitude `b` and longitude `l` (degrees) and distance `d` (kpc), assuming
/// a flat rotation curve.
pub fn galactic_component(b: f64, l: f64, d: f64) -> f64 {
    let delta = R0_KPC / d;
    let a = VC_KMS * VC_KMS / (C_KMS * R0_KPC * KM_PER_KPC);
    let proj = b.to_radians().cos() * l.to_radians().cos();
    -a * (proj + (delta - proj) / (1.0 + delta - 2.0 * proj))
}
