//! Run configuration.
//!
//! Everything here has a sensible default; `FitConfig::from_env` overrides the
//! data location and acceleration tolerance from the environment (a `.env`
//! file is honoured).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings handed to the mass-function evolution service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionSettings {
    /// IMF slope breakpoints (Msun).
    pub m_breaks: [f64; 4],
    /// Mass bins per IMF segment.
    pub n_bins: [usize; 3],
    /// Output time (Myr).
    pub age_myr: f64,
    /// Initial number of stars.
    pub n0: f64,
    /// Core-collapse time (Myr).
    pub tcc: f64,
    /// Initial neutron star retention fraction.
    pub ns_ret: f64,
    /// Initial black hole retention fraction.
    pub bh_ret_init: f64,
    /// Used when the cluster has no `FeHe` metadata.
    pub default_feh: f64,
    /// Used when the cluster has no `Ndot` metadata.
    pub default_ndot: f64,
    /// Total mass given to each appended tracer bin (Msun).
    pub tracer_mass: f64,
    /// Bins with fewer than `empty_factor * Nmin` stars are dropped.
    pub empty_factor: f64,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self {
            m_breaks: [0.1, 0.5, 1.0, 100.0],
            n_bins: [5, 5, 20],
            age_myr: 11_000.0,
            n0: 5e5,
            tcc: 0.0,
            ns_ret: 0.1,
            bh_ret_init: 1.0,
            default_feh: -1.02,
            default_ndot: 0.0,
            tracer_mass: 0.1,
            empty_factor: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Directory holding cluster documents and the field-pulsar catalogue.
    pub data_dir: PathBuf,
    /// Field-pulsar catalogue file name, relative to `data_dir`.
    pub field_catalogue: String,
    /// Tolerance on the two-sided area of the acceleration distribution.
    pub accel_eps: f64,
    /// Annulus width (arcmin) for mass-function data without `r1`/`r2`.
    pub annulus_width_arcmin: f64,
    pub evolution: EvolutionSettings,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            field_catalogue: "field_msp.dat".to_string(),
            accel_eps: 1e-3,
            annulus_width_arcmin: 0.4,
            evolution: EvolutionSettings::default(),
        }
    }
}

impl FitConfig {
    /// Defaults, overridden by `GCFIT_DIR` and `GCFIT_ACCEL_EPS`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("GCFIT_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var("GCFIT_ACCEL_EPS") {
            config.accel_eps = parse_eps(&raw)?;
        }
        Ok(config)
    }

    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: FitConfig = serde_json::from_str(text)?;
        if !(config.accel_eps > 0.0) {
            return Err(Error::Validation(format!(
                "accel_eps must be positive, got {}",
                config.accel_eps
            )));
        }
        Ok(config)
    }

    pub fn cluster_path(&self, cluster: &str) -> PathBuf {
        self.data_dir.join("clusters").join(format!("{cluster}.json"))
    }

    pub fn field_catalogue_path(&self) -> PathBuf {
        self.data_dir.join(&self.field_catalogue)
    }
}

fn parse_eps(raw: &str) -> Result<f64> {
    let eps: f64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::Validation(format!("GCFIT_ACCEL_EPS is not a number: '{raw}'")))?;
    if !(eps > 0.0) {
        return Err(Error::Validation(format!("GCFIT_ACCEL_EPS must be positive, got {eps}")));
    }
    Ok(eps)
}
