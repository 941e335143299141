//! θ + observations → [`Model`].
//!
//! Construction runs the mass-function evolution, drops numerically empty
//! bins, appends one tracer bin per dataset carrying an `m` metadata value,
//! and solves for the radial profiles. A solver failure is reported as
//! [`Error::NonConvergentModel`], which callers turn into a zero-probability
//! result.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::EvolutionSettings;
use crate::data::Observations;
use crate::domain::{Theta, Unit};
use crate::error::{Error, Result};
use crate::models::{
    BinnedProfile, EvolvedMassFunction, MassFunctionEvolver, MassFunctionRequest, Model, Profile,
    ProfileRequest, ProfileSolver, SolvedProfiles,
};

/// Owns the two numerical services a model is built from.
#[derive(Clone)]
pub struct ModelBuilder {
    evolver: Arc<dyn MassFunctionEvolver>,
    solver: Arc<dyn ProfileSolver>,
    settings: EvolutionSettings,
}

impl ModelBuilder {
    pub fn new(
        evolver: Arc<dyn MassFunctionEvolver>,
        solver: Arc<dyn ProfileSolver>,
        settings: EvolutionSettings,
    ) -> Self {
        Self {
            evolver,
            solver,
            settings,
        }
    }

    pub fn settings(&self) -> &EvolutionSettings {
        &self.settings
    }

    /// Build from a fixed-order parameter slice.
    pub fn build_from_slice(&self, values: &[f64], observations: Option<&Observations>) -> Result<Model> {
        self.build(&Theta::from_slice(values)?, observations)
    }

    /// Build from a name → value mapping.
    pub fn build_from_map(
        &self,
        values: &BTreeMap<String, f64>,
        observations: Option<&Observations>,
    ) -> Result<Model> {
        self.build(&Theta::from_map(values)?, observations)
    }

    pub fn build(&self, theta: &Theta, observations: Option<&Observations>) -> Result<Model> {
        let request = self.mass_function_request(theta, observations);
        let mf = self.evolver.evolve(&request)?;
        check_mass_function(&mf)?;

        // Bins below the threshold are numerically empty.
        let threshold = self.settings.empty_factor * mf.n_min;
        let mut mj = Vec::new();
        let mut mj_total = Vec::new();
        for i in 0..mf.ms.len() {
            if mf.ns[i] > threshold {
                mj.push(mf.ms[i]);
                mj_total.push(mf.ms_total[i]);
            }
        }
        let nms = mj.len();
        for i in 0..mf.mr.len() {
            if mf.nr[i] > threshold {
                mj.push(mf.mr[i]);
                mj_total.push(mf.mr_total[i]);
            }
        }

        // Tracers go last so stellar indices are unaffected.
        match observations {
            Some(obs) => {
                for m in obs.tracer_masses() {
                    mj.push(m);
                    mj_total.push(self.settings.tracer_mass);
                }
            }
            None => log::warn!("no observations given, no tracer masses added"),
        }

        if nms == 0 {
            return Err(Error::NonConvergentModel(
                "evolved mass function has no populated stellar bins".to_string(),
            ));
        }

        let profile_request = ProfileRequest {
            phi0: theta.w0,
            g: theta.g,
            mass: theta.m * 1e6,
            rh: theta.rh,
            ra: 10f64.powf(theta.ra),
            delta: theta.delta,
            mj: mj.clone(),
            mj_total: mj_total.clone(),
            project: true,
        };

        let profiles = self.solver.solve(&profile_request).map_err(|failure| {
            log::debug!("model did not converge with {theta:?}: {failure}");
            Error::NonConvergentModel(failure.0)
        })?;
        check_profiles(&profiles, mj.len())?;

        let mes_widths: Vec<f64> = mf.mes.windows(2).map(|w| w[1] - w[0]).collect();

        let SolvedProfiles {
            r,
            rt,
            rh,
            ra,
            g_const,
            mc,
            rhoj,
            sigmaj,
            v2tj,
            v2rj,
            v2pj,
        } = profiles;

        Ok(Model {
            theta: *theta,
            r: Profile::new(r, Unit::Parsec),
            rt,
            rh,
            ra,
            g_const,
            mj,
            mj_total,
            mc: Profile::new(mc, Unit::SolarMass),
            rhoj: BinnedProfile::new(rhoj, Unit::SolarMassPerPc3),
            sigmaj: BinnedProfile::new(sigmaj, Unit::SolarMassPerPc2),
            v2tj: BinnedProfile::new(v2tj, Unit::KmSquaredPerSecondSquared),
            v2rj: BinnedProfile::new(v2rj, Unit::KmSquaredPerSecondSquared),
            v2pj: BinnedProfile::new(v2pj, Unit::KmSquaredPerSecondSquared),
            nms,
            mes_widths,
        })
    }

    fn mass_function_request(&self, theta: &Theta, observations: Option<&Observations>) -> MassFunctionRequest {
        let s = &self.settings;

        let feh = match observations.and_then(|o| o.mdata_f64("FeHe")) {
            Some(v) => v,
            None => {
                log::warn!("no cluster FeHe stored, defaulting to {}", s.default_feh);
                s.default_feh
            }
        };
        let ndot = match observations.and_then(|o| o.mdata_f64("Ndot")) {
            Some(v) => v,
            None => {
                log::warn!("no cluster Ndot stored, defaulting to {}", s.default_ndot);
                s.default_ndot
            }
        };

        MassFunctionRequest {
            slopes: [-theta.a1, -theta.a2, -theta.a3],
            m_breaks: s.m_breaks,
            n_bins: s.n_bins,
            age_myr: s.age_myr,
            n0: s.n0,
            ndot,
            tcc: s.tcc,
            ns_ret: s.ns_ret,
            bh_ret_init: s.bh_ret_init,
            bh_ret_dyn: theta.bh_ret / 100.0,
            feh,
        }
    }
}

fn check_mass_function(mf: &EvolvedMassFunction) -> Result<()> {
    if mf.ms.len() != mf.ms_total.len() || mf.ms.len() != mf.ns.len() {
        return Err(Error::Computation("stellar mass-function arrays differ in length".to_string()));
    }
    if mf.mr.len() != mf.mr_total.len() || mf.mr.len() != mf.nr.len() {
        return Err(Error::Computation("remnant mass-function arrays differ in length".to_string()));
    }
    Ok(())
}

fn check_profiles(p: &SolvedProfiles, n_bins: usize) -> Result<()> {
    let n_r = p.r.len();
    if n_r < 2 {
        return Err(Error::Computation(format!("profile grid has {n_r} radii")));
    }
    if p.mc.len() != n_r {
        return Err(Error::Computation("enclosed-mass profile does not match radius grid".to_string()));
    }
    let binned = [
        ("rhoj", &p.rhoj),
        ("sigmaj", &p.sigmaj),
        ("v2tj", &p.v2tj),
        ("v2rj", &p.v2rj),
        ("v2pj", &p.v2pj),
    ];
    for (name, rows) in binned {
        if rows.len() != n_bins || rows.iter().any(|row| row.len() != n_r) {
            return Err(Error::Computation(format!(
                "{name} must have {n_bins} rows of {n_r} radii"
            )));
        }
    }
    Ok(())
}
