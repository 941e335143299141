//! Physical units and distance-dependent conversions.
//!
//! Angular sizes and proper motions only map onto physical lengths and
//! velocities once a cluster distance is known, so every conversion takes the
//! heliocentric distance `d` in kpc.
//!
//! Conventions:
//! - model radii are in pc, velocities in km/s
//! - observed radii are usually arcsec/arcmin, proper motions mas/yr

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Arcseconds per radian.
pub const ARCSEC_PER_RAD: f64 = 180.0 * 3600.0 / std::f64::consts::PI;

/// Seconds per (Julian-ish) year, as used for km/s <-> mas/yr.
pub const SECONDS_PER_YEAR: f64 = 3.154e7;

/// Parsecs per kilometre.
pub const PC_PER_KM: f64 = 3.24078e-14;

/// Metres per parsec.
pub const M_PER_PC: f64 = 3.0857e16;

/// Speed of light in m/s.
pub const C_M_PER_S: f64 = 299_792_458.0;

/// Gravitational constant in `pc (km/s)^2 / Msun`.
pub const G_PC_KMS2_PER_MSUN: f64 = 0.004_302_09;

/// Convert `r` from pc to arcsec at distance `d` (kpc).
pub fn pc2arcsec(r: f64, d: f64) -> f64 {
    let d = d * 1000.0;
    ARCSEC_PER_RAD * 2.0 * (r / (2.0 * d)).atan()
}

/// Convert `theta` from arcsec to pc at distance `d` (kpc).
pub fn arcsec2pc(theta: f64, d: f64) -> f64 {
    let d = d * 1000.0;
    (theta / ARCSEC_PER_RAD / 2.0).tan() * 2.0 * d
}

/// Convert a velocity in km/s to a proper motion in mas/yr at distance `d` (kpc).
pub fn kms2masyr(kms: f64, d: f64) -> f64 {
    let pc_per_yr = kms * SECONDS_PER_YEAR * PC_PER_KM;
    1000.0 * pc2arcsec(pc_per_yr, d)
}

/// Convert a proper motion in mas/yr to a velocity in km/s at distance `d` (kpc).
pub fn masyr2kms(masyr: f64, d: f64) -> f64 {
    let pc_per_yr = arcsec2pc(masyr / 1000.0, d);
    pc_per_yr / PC_PER_KM / SECONDS_PER_YEAR
}

/// Physical dimension of a [`Unit`]; conversions only happen within a
/// dimension, or across the distance-linked pairs (length/angle and
/// velocity/proper-motion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Dimensionless,
    Length,
    Angle,
    Velocity,
    ProperMotion,
    Mass,
    Time,
    Acceleration,
    VelocitySquared,
    MassDensity,
    SurfaceDensity,
    NumberSurfaceDensity,
    AngularNumberDensity,
    Gravitational,
}

/// Unit tag carried by variables and model profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Dimensionless,
    Parsec,
    Kiloparsec,
    Arcsec,
    Arcmin,
    Degree,
    KmPerSecond,
    MasPerYear,
    SolarMass,
    Second,
    MeterPerSecondSquared,
    /// `(km/s)^2`, the unit of velocity-dispersion profiles.
    KmSquaredPerSecondSquared,
    SolarMassPerPc3,
    SolarMassPerPc2,
    PerPc2,
    PerArcsec2,
    PerArcmin2,
    /// `pc (km/s)^2 / Msun`, the unit of G in model units.
    PcKms2PerSolarMass,
}

impl Unit {
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Dimensionless => Dimension::Dimensionless,
            Unit::Parsec | Unit::Kiloparsec => Dimension::Length,
            Unit::Arcsec | Unit::Arcmin | Unit::Degree => Dimension::Angle,
            Unit::KmPerSecond => Dimension::Velocity,
            Unit::MasPerYear => Dimension::ProperMotion,
            Unit::SolarMass => Dimension::Mass,
            Unit::Second => Dimension::Time,
            Unit::MeterPerSecondSquared => Dimension::Acceleration,
            Unit::KmSquaredPerSecondSquared => Dimension::VelocitySquared,
            Unit::SolarMassPerPc3 => Dimension::MassDensity,
            Unit::SolarMassPerPc2 => Dimension::SurfaceDensity,
            Unit::PerPc2 => Dimension::NumberSurfaceDensity,
            Unit::PerArcsec2 | Unit::PerArcmin2 => Dimension::AngularNumberDensity,
            Unit::PcKms2PerSolarMass => Dimension::Gravitational,
        }
    }

    /// Canonical unit string.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Dimensionless => "",
            Unit::Parsec => "pc",
            Unit::Kiloparsec => "kpc",
            Unit::Arcsec => "arcsec",
            Unit::Arcmin => "arcmin",
            Unit::Degree => "deg",
            Unit::KmPerSecond => "km/s",
            Unit::MasPerYear => "mas/yr",
            Unit::SolarMass => "Msun",
            Unit::Second => "s",
            Unit::MeterPerSecondSquared => "m/s2",
            Unit::KmSquaredPerSecondSquared => "km2/s2",
            Unit::SolarMassPerPc3 => "Msun/pc3",
            Unit::SolarMassPerPc2 => "Msun/pc2",
            Unit::PerPc2 => "1/pc2",
            Unit::PerArcsec2 => "1/arcsec2",
            Unit::PerArcmin2 => "1/arcmin2",
            Unit::PcKms2PerSolarMass => "pc km2/(s2 Msun)",
        }
    }

    /// Multiplicative factor to this dimension's reference unit
    /// (pc, arcsec, km/s, mas/yr, ...).
    fn linear_factor(self) -> f64 {
        match self {
            Unit::Kiloparsec => 1000.0,
            Unit::Arcmin => 60.0,
            Unit::Degree => 3600.0,
            Unit::PerArcmin2 => 1.0 / 3600.0,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Unit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let unit = match normalized.as_str() {
            "" | "dimensionless" | "s/s" => Unit::Dimensionless,
            "pc" => Unit::Parsec,
            "kpc" => Unit::Kiloparsec,
            "arcsec" | "as" => Unit::Arcsec,
            "arcmin" | "am" => Unit::Arcmin,
            "deg" | "degree" => Unit::Degree,
            "km/s" | "km / s" => Unit::KmPerSecond,
            "mas/yr" | "mas / yr" => Unit::MasPerYear,
            "Msun" | "solMass" => Unit::SolarMass,
            "s" => Unit::Second,
            "m/s2" | "m / s2" => Unit::MeterPerSecondSquared,
            "km2/s2" | "km2 / s2" => Unit::KmSquaredPerSecondSquared,
            "Msun/pc3" | "solMass / pc3" => Unit::SolarMassPerPc3,
            "Msun/pc2" | "solMass / pc2" => Unit::SolarMassPerPc2,
            "1/pc2" | "pc-2" => Unit::PerPc2,
            "1/arcsec2" | "arcsec-2" => Unit::PerArcsec2,
            "1/arcmin2" | "arcmin-2" => Unit::PerArcmin2,
            other => {
                return Err(Error::Validation(format!("unrecognised unit '{other}'")));
            }
        };
        Ok(unit)
    }
}

/// Convert a single value between units. `d` is the distance in kpc and is
/// only used for the length<->angle and velocity<->proper-motion pairs.
pub fn convert(value: f64, from: Unit, to: Unit, d: f64) -> Result<f64> {
    if from == to {
        return Ok(value);
    }
    use Dimension::*;
    let v = value * from.linear_factor();
    let out = match (from.dimension(), to.dimension()) {
        (a, b) if a == b => v,
        (Length, Angle) => pc2arcsec(v, d),
        (Angle, Length) => arcsec2pc(v, d),
        (Velocity, ProperMotion) => kms2masyr(v, d),
        (ProperMotion, Velocity) => masyr2kms(v, d),
        (NumberSurfaceDensity, AngularNumberDensity) => v / pc2arcsec(1.0, d).powi(2),
        (AngularNumberDensity, NumberSurfaceDensity) => v * pc2arcsec(1.0, d).powi(2),
        _ => {
            return Err(Error::UnitMismatch {
                from: from.symbol().to_string(),
                to: to.symbol().to_string(),
            });
        }
    };
    Ok(out / to.linear_factor())
}

/// Convert a slice of values between units.
pub fn convert_all(values: &[f64], from: Unit, to: Unit, d: f64) -> Result<Vec<f64>> {
    if from == to {
        return Ok(values.to_vec());
    }
    values.iter().map(|&v| convert(v, from, to, d)).collect()
}
