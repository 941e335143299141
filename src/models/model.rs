//! The per-θ cluster model.
//!
//! A `Model` is built once for a parameter vector by
//! [`ModelBuilder::build`](crate::models::ModelBuilder::build) and never changes afterwards. Profile
//! arrays carry their unit so likelihood code can convert them into whatever
//! unit a dataset was observed in.

use crate::data::Dataset;
use crate::domain::{Theta, Unit};
use crate::error::{Error, Result};

/// A radial profile with its unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    values: Vec<f64>,
    unit: Unit,
}

impl Profile {
    pub fn new(values: Vec<f64>, unit: Unit) -> Self {
        Self { values, unit }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }
}

/// One radial profile per mass bin, sharing a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedProfile {
    rows: Vec<Vec<f64>>,
    unit: Unit,
}

impl BinnedProfile {
    pub fn new(rows: Vec<Vec<f64>>, unit: Unit) -> Self {
        Self { rows, unit }
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn n_bins(&self) -> usize {
        self.rows.len()
    }

    /// Profile of one mass bin.
    pub fn bin(&self, j: usize) -> Result<&[f64]> {
        self.rows
            .get(j)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Computation(format!("mass bin {j} out of range ({})", self.rows.len())))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub(crate) theta: Theta,
    pub(crate) r: Profile,
    pub(crate) rt: f64,
    pub(crate) rh: f64,
    pub(crate) ra: f64,
    pub(crate) g_const: f64,
    pub(crate) mj: Vec<f64>,
    pub(crate) mj_total: Vec<f64>,
    pub(crate) mc: Profile,
    pub(crate) rhoj: BinnedProfile,
    pub(crate) sigmaj: BinnedProfile,
    pub(crate) v2tj: BinnedProfile,
    pub(crate) v2rj: BinnedProfile,
    pub(crate) v2pj: BinnedProfile,
    pub(crate) nms: usize,
    pub(crate) mes_widths: Vec<f64>,
}

impl Model {
    pub fn theta(&self) -> &Theta {
        &self.theta
    }

    /// Heliocentric distance (kpc).
    pub fn d(&self) -> f64 {
        self.theta.d
    }

    /// Mass-function nuisance fraction.
    pub fn f(&self) -> f64 {
        self.theta.f
    }

    /// Number-density nuisance variance.
    pub fn s2(&self) -> f64 {
        self.theta.s2
    }

    /// Radius grid (pc).
    pub fn r(&self) -> &[f64] {
        self.r.values()
    }

    pub fn r_unit(&self) -> Unit {
        self.r.unit()
    }

    /// Truncation radius (pc).
    pub fn rt(&self) -> f64 {
        self.rt
    }

    pub fn rh(&self) -> f64 {
        self.rh
    }

    pub fn ra(&self) -> f64 {
        self.ra
    }

    /// Gravitational constant in model units, pc (km/s)^2 / Msun.
    pub fn g_const(&self) -> f64 {
        self.g_const
    }

    /// Mean mass per bin (Msun): stellar, remnant, then tracer bins.
    pub fn mj(&self) -> &[f64] {
        &self.mj
    }

    pub fn mj_total(&self) -> &[f64] {
        &self.mj_total
    }

    pub fn n_bins(&self) -> usize {
        self.mj.len()
    }

    /// Total enclosed mass (Msun).
    pub fn mc(&self) -> &Profile {
        &self.mc
    }

    pub fn rhoj(&self) -> &BinnedProfile {
        &self.rhoj
    }

    pub fn sigmaj(&self) -> &BinnedProfile {
        &self.sigmaj
    }

    pub fn v2tj(&self) -> &BinnedProfile {
        &self.v2tj
    }

    pub fn v2rj(&self) -> &BinnedProfile {
        &self.v2rj
    }

    pub fn v2pj(&self) -> &BinnedProfile {
        &self.v2pj
    }

    /// Number of stellar (main-sequence) bins.
    pub fn nms(&self) -> usize {
        self.nms
    }

    /// Widths of the evolved stellar mass bins (Msun).
    pub fn mes_widths(&self) -> &[f64] {
        &self.mes_widths
    }

    /// Resolve which mass bin a dataset is compared against.
    ///
    /// An explicit bin wins. Otherwise the dataset's `m` metadata must equal
    /// one entry of `mj` exactly. Datasets without `m` use `default`.
    pub fn mass_bin_for(&self, dataset: &Dataset, explicit: Option<usize>, default: usize) -> Result<usize> {
        let bin = match (explicit, dataset.mass()) {
            (Some(j), _) => j,
            (None, Some(m)) => self.mj.iter().position(|&mj| mj == m).ok_or_else(|| {
                Error::Validation(format!("{}: tracer mass {m} is not a model mass bin", dataset.name()))
            })?,
            (None, None) => default,
        };
        if bin >= self.mj.len() {
            return Err(Error::Computation(format!(
                "mass bin {bin} out of range ({} bins)",
                self.mj.len()
            )));
        }
        Ok(bin)
    }

    /// Default bin for ordinary datasets: the heaviest stellar bin.
    pub fn default_stellar_bin(&self) -> usize {
        self.nms.saturating_sub(1)
    }

    /// Default bin for pulsars: the final appended bin.
    pub fn default_pulsar_bin(&self) -> usize {
        self.mj.len().saturating_sub(1)
    }
}
