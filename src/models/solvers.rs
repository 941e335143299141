//! Contracts for the two external numerical services a model is built from.
//!
//! Neither service is implemented in this crate. Callers plug in a stellar
//! mass-function evolution code and a lowered-isothermal profile solver by
//! implementing these traits. Both must be `Send + Sync` so a single
//! instance can serve concurrent posterior evaluations.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Input of a mass-function evolution run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassFunctionRequest {
    /// IMF power-law slopes, one per segment (already negated: `-a1, -a2, -a3`).
    pub slopes: [f64; 3],
    /// Segment breakpoints (Msun).
    pub m_breaks: [f64; 4],
    /// Mass bins per segment.
    pub n_bins: [usize; 3],
    /// Output time (Myr).
    pub age_myr: f64,
    pub n0: f64,
    /// Low-mass depletion rate.
    pub ndot: f64,
    pub tcc: f64,
    pub ns_ret: f64,
    pub bh_ret_init: f64,
    pub bh_ret_dyn: f64,
    /// Metallicity [Fe/H].
    pub feh: f64,
}

/// Mass function at the requested age.
///
/// Stellar arrays have one entry per stellar bin, remnant arrays one per
/// remnant bin. `mes` holds the stellar bin edges.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvolvedMassFunction {
    /// Mean stellar mass per bin (Msun).
    pub ms: Vec<f64>,
    /// Total stellar mass per bin (Msun).
    pub ms_total: Vec<f64>,
    /// Number of stars per bin.
    pub ns: Vec<f64>,
    /// Mean remnant mass per bin (Msun).
    pub mr: Vec<f64>,
    pub mr_total: Vec<f64>,
    pub nr: Vec<f64>,
    /// Stellar mass bin edges (Msun).
    pub mes: Vec<f64>,
    /// Smallest meaningful bin population.
    pub n_min: f64,
}

pub trait MassFunctionEvolver: Send + Sync {
    fn evolve(&self, request: &MassFunctionRequest) -> Result<EvolvedMassFunction>;
}

/// Input of a multimass profile solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRequest {
    /// Central dimensionless potential (W0).
    pub phi0: f64,
    /// Truncation sharpness.
    pub g: f64,
    /// Total mass (Msun).
    pub mass: f64,
    /// Half-mass radius (pc).
    pub rh: f64,
    /// Anisotropy radius (pc).
    pub ra: f64,
    /// Mass-segregation exponent.
    pub delta: f64,
    /// Mean mass per bin (Msun).
    pub mj: Vec<f64>,
    /// Total mass per bin (Msun).
    pub mj_total: Vec<f64>,
    /// Whether projected profiles are required.
    pub project: bool,
}

/// Radial profiles returned by the solver, in pc, Msun and km/s units.
///
/// Per-bin arrays are indexed `[bin][radius]` and share the radius grid `r`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SolvedProfiles {
    pub r: Vec<f64>,
    pub rt: f64,
    pub rh: f64,
    pub ra: f64,
    /// Gravitational constant, pc (km/s)^2 / Msun.
    pub g_const: f64,
    /// Total enclosed mass.
    pub mc: Vec<f64>,
    /// Mass density (Msun/pc^3).
    pub rhoj: Vec<Vec<f64>>,
    /// Projected mass density (Msun/pc^2).
    pub sigmaj: Vec<Vec<f64>>,
    pub v2tj: Vec<Vec<f64>>,
    pub v2rj: Vec<Vec<f64>>,
    /// Projected line-of-sight velocity dispersion squared.
    pub v2pj: Vec<Vec<f64>>,
}

/// The profile solver could not find a self-consistent model.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverFailure(pub String);

impl fmt::Display for SolverFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for SolverFailure {}

pub trait ProfileSolver: Send + Sync {
    fn solve(&self, request: &ProfileRequest) -> std::result::Result<SolvedProfiles, SolverFailure>;
}
