//! Analytic stand-ins for the numerical services, shared by unit tests.
//!
//! `PlummerSolver` answers every profile request with a Plummer sphere split
//! across mass bins in proportion to their total mass. `PowerLawEvolver`
//! returns a broken power-law mass function with a fixed set of remnants.

use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::config::EvolutionSettings;
use crate::data::{FieldCatalogue, FieldPulsar};
use crate::domain::G_PC_KMS2_PER_MSUN;
use crate::error::Result;
use crate::math::log_space;
use crate::models::{
    EvolvedMassFunction, MassFunctionEvolver, MassFunctionRequest, ModelBuilder, ProfileRequest, ProfileSolver,
    SolvedProfiles, SolverFailure,
};

/// Half-mass radius of a Plummer sphere in units of its scale length.
const PLUMMER_RH_OVER_A: f64 = 1.305;
const GRID_POINTS: usize = 200;

pub(crate) struct PlummerSolver {
    /// Requests with `phi0` above this fail to converge.
    pub fail_above_w0: Option<f64>,
    /// Multiplies every surface density profile.
    pub sigma_scale: f64,
    pub calls: AtomicUsize,
}

impl Default for PlummerSolver {
    fn default() -> Self {
        Self {
            fail_above_w0: None,
            sigma_scale: 1.0,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ProfileSolver for PlummerSolver {
    fn solve(&self, req: &ProfileRequest) -> std::result::Result<SolvedProfiles, SolverFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_above_w0 {
            if req.phi0 > limit {
                return Err(SolverFailure(format!("W0 = {} did not converge", req.phi0)));
            }
        }

        let g = G_PC_KMS2_PER_MSUN;
        let m = req.mass;
        let a = req.rh / PLUMMER_RH_OVER_A;
        let a2 = a * a;
        let rt = 20.0 * a;

        let mut r = vec![0.0];
        r.extend(log_space(1e-3 * a, rt, GRID_POINTS - 1).map_err(|e| SolverFailure(e.to_string()))?);

        let mc: Vec<f64> = r.iter().map(|&x| m * x.powi(3) / (x * x + a2).powf(1.5)).collect();
        let rho: Vec<f64> = r
            .iter()
            .map(|&x| 3.0 * m / (4.0 * PI * a.powi(3)) * (1.0 + x * x / a2).powf(-2.5))
            .collect();
        let sigma: Vec<f64> = r
            .iter()
            .map(|&x| self.sigma_scale * m * a2 / (PI * (a2 + x * x).powi(2)))
            .collect();
        let v2r: Vec<f64> = r.iter().map(|&x| g * m / (6.0 * (x * x + a2).sqrt())).collect();
        let ra2 = req.ra * req.ra;
        let v2t: Vec<f64> = r.iter().zip(&v2r).map(|(&x, &v)| v * ra2 / (ra2 + x * x)).collect();
        let v2p: Vec<f64> = r
            .iter()
            .map(|&x| 3.0 * PI * g * m / (64.0 * (x * x + a2).sqrt()))
            .collect();

        let total: f64 = req.mj_total.iter().sum();
        let scaled = |profile: &[f64], frac: f64| profile.iter().map(|v| v * frac).collect::<Vec<f64>>();
        let fractions: Vec<f64> = req.mj_total.iter().map(|mt| mt / total).collect();

        Ok(SolvedProfiles {
            rt,
            rh: req.rh,
            ra: req.ra,
            g_const: g,
            mc,
            rhoj: fractions.iter().map(|&f| scaled(&rho, f)).collect(),
            sigmaj: fractions.iter().map(|&f| scaled(&sigma, f)).collect(),
            v2tj: fractions.iter().map(|_| v2t.clone()).collect(),
            v2rj: fractions.iter().map(|_| v2r.clone()).collect(),
            v2pj: fractions.iter().map(|_| v2p.clone()).collect(),
            r,
        })
    }
}

/// Broken power-law IMF; the two heaviest stellar bins come back empty.
pub(crate) struct PowerLawEvolver;

impl MassFunctionEvolver for PowerLawEvolver {
    fn evolve(&self, req: &MassFunctionRequest) -> Result<EvolvedMassFunction> {
        let mut mes = vec![req.m_breaks[0]];
        for seg in 0..3 {
            let edges = log_space(req.m_breaks[seg], req.m_breaks[seg + 1], req.n_bins[seg] + 1)?;
            mes.extend_from_slice(&edges[1..]);
        }

        // continuous dN/dm across the breaks
        let mut coeff = [1.0; 3];
        for seg in 1..3 {
            let mb = req.m_breaks[seg];
            coeff[seg] = coeff[seg - 1] * mb.powf(req.slopes[seg - 1] - req.slopes[seg]);
        }

        let n_min = 1.0;
        let mut ms = Vec::new();
        let mut ns = Vec::new();
        let mut seg_start = 0;
        for seg in 0..3 {
            for k in seg_start..seg_start + req.n_bins[seg] {
                let (lo, hi) = (mes[k], mes[k + 1]);
                let mid = (lo * hi).sqrt();
                ms.push(mid);
                ns.push(coeff[seg] * mid.powf(req.slopes[seg]) * (hi - lo));
            }
            seg_start += req.n_bins[seg];
        }
        let norm: f64 = ns.iter().sum();
        for n in ns.iter_mut() {
            *n *= req.n0 / norm;
        }
        let last = ns.len();
        for n in ns[last.saturating_sub(2)..].iter_mut() {
            *n = n_min;
        }
        let ms_total = ms.iter().zip(&ns).map(|(m, n)| m * n).collect();

        let mr = vec![0.6, 1.4, 10.0];
        let nr = vec![5e4, 1000.0 * req.ns_ret, 200.0 * req.bh_ret_dyn];
        let mr_total = mr.iter().zip(&nr).map(|(m, n)| m * n).collect();

        Ok(EvolvedMassFunction {
            ms,
            ms_total,
            ns,
            mr,
            mr_total,
            nr,
            mes,
            n_min,
        })
    }
}

pub(crate) fn plummer_parts_with(configure: impl FnOnce(&mut PlummerSolver)) -> (ModelBuilder, Arc<PlummerSolver>) {
    let mut solver = PlummerSolver::default();
    configure(&mut solver);
    let solver = Arc::new(solver);
    let builder = ModelBuilder::new(
        Arc::new(PowerLawEvolver),
        Arc::clone(&solver) as Arc<dyn ProfileSolver>,
        EvolutionSettings::default(),
    );
    (builder, solver)
}

pub(crate) fn plummer_parts() -> (ModelBuilder, Arc<PlummerSolver>) {
    plummer_parts_with(|_| {})
}

pub(crate) fn builder_with(configure: impl FnOnce(&mut PlummerSolver)) -> ModelBuilder {
    plummer_parts_with(configure).0
}

pub(crate) fn plummer_builder() -> ModelBuilder {
    plummer_parts().0
}

/// Synthetic field population: 40 spun-up pulsars plus three rows whose
/// corrected `Pdot` is negative.
pub(crate) fn field_catalogue() -> FieldCatalogue {
    let mut rng = StdRng::seed_from_u64(11);
    let mut pulsars = Vec::new();
    for _ in 0..40 {
        let period = 10f64.powf(rng.gen_range(0.002f64.log10()..0.008f64.log10()));
        let pdot_pm = 10f64.powf(rng.gen_range(-21.0..3e-20f64.log10()));
        pulsars.push(FieldPulsar {
            period,
            pdot: pdot_pm * 1.2,
            pdot_pm,
            b_deg: rng.gen_range(-30.0..30.0),
            l_deg: rng.gen_range(0.0..60.0),
            distance_kpc: rng.gen_range(0.5..3.0),
        });
    }
    for (period, pdot_pm) in [(0.003, -2e-20), (0.005, -4e-20), (0.007, -3e-20)] {
        pulsars.push(FieldPulsar {
            period,
            pdot: 1e-20,
            pdot_pm,
            b_deg: 5.0,
            l_deg: 20.0,
            distance_kpc: 1.0,
        });
    }
    FieldCatalogue {
        pulsars,
        row_errors: Vec::new(),
    }
}
