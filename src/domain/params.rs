//! Model parameters, their canonical ordering, and prior bounds.
//!
//! The ordering of [`Param::ALL`] is the one and only parameter-vector layout
//! used by the model builder, the posterior and any serialized chains. Bump
//! [`PARAMETER_ORDER_VERSION`] if it ever changes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Version of the canonical parameter ordering.
pub const PARAMETER_ORDER_VERSION: u32 = 1;

/// Number of model parameters.
pub const N_PARAMS: usize = 13;

/// One model parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Param {
    /// Central potential depth.
    W0,
    /// Total mass, in 1e6 Msun.
    M,
    /// Half-mass radius (pc).
    Rh,
    /// log10 of the anisotropy radius (pc).
    Ra,
    /// Truncation parameter.
    G,
    /// Mass-dependent velocity scaling.
    Delta,
    /// Nuisance variance on number density.
    S2,
    /// Nuisance fraction on mass function counts.
    F,
    /// IMF slopes.
    A1,
    A2,
    A3,
    /// Dynamical black hole retention (%).
    BhRet,
    /// Heliocentric distance (kpc).
    D,
}

impl Param {
    pub const ALL: [Param; N_PARAMS] = [
        Param::W0,
        Param::M,
        Param::Rh,
        Param::Ra,
        Param::G,
        Param::Delta,
        Param::S2,
        Param::F,
        Param::A1,
        Param::A2,
        Param::A3,
        Param::BhRet,
        Param::D,
    ];

    /// Name used in stored initials and θ mappings.
    pub fn name(self) -> &'static str {
        match self {
            Param::W0 => "W0",
            Param::M => "M",
            Param::Rh => "rh",
            Param::Ra => "ra",
            Param::G => "g",
            Param::Delta => "delta",
            Param::S2 => "s2",
            Param::F => "F",
            Param::A1 => "a1",
            Param::A2 => "a2",
            Param::A3 => "a3",
            Param::BhRet => "BHret",
            Param::D => "d",
        }
    }

    pub fn from_name(name: &str) -> Option<Param> {
        Param::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Position in the canonical ordering.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Exclusive uniform prior bounds `(low, high)`.
    pub fn prior_bounds(self) -> (f64, f64) {
        match self {
            Param::W0 => (3.0, 20.0),
            Param::M => (0.01, 10.0),
            Param::Rh => (0.5, 15.0),
            Param::Ra => (0.0, 5.0),
            Param::G => (0.0, 2.3),
            Param::Delta => (0.3, 0.5),
            Param::S2 => (0.0, 10.0),
            Param::F => (0.1, 0.5),
            Param::A1 | Param::A2 | Param::A3 => (-2.0, 6.0),
            Param::BhRet => (0.0, 100.0),
            Param::D => (4.0, 8.0),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Default parameter values, in canonical order.
pub const DEFAULT_INITIALS: [(Param, f64); N_PARAMS] = [
    (Param::W0, 6.0),
    (Param::M, 0.69),
    (Param::Rh, 2.88),
    (Param::Ra, 1.23),
    (Param::G, 0.75),
    (Param::Delta, 0.45),
    (Param::S2, 0.1),
    (Param::F, 0.45),
    (Param::A1, 0.5),
    (Param::A2, 1.3),
    (Param::A3, 2.5),
    (Param::BhRet, 0.5),
    (Param::D, 6.405),
];

/// A full parameter vector θ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Theta {
    pub w0: f64,
    pub m: f64,
    pub rh: f64,
    pub ra: f64,
    pub g: f64,
    pub delta: f64,
    pub s2: f64,
    pub f: f64,
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub bh_ret: f64,
    pub d: f64,
}

impl Default for Theta {
    fn default() -> Self {
        let mut values = [0.0; N_PARAMS];
        for (p, v) in DEFAULT_INITIALS {
            values[p.index()] = v;
        }
        Theta::from_array(values)
    }
}

impl Theta {
    pub fn from_array(v: [f64; N_PARAMS]) -> Self {
        Theta {
            w0: v[0],
            m: v[1],
            rh: v[2],
            ra: v[3],
            g: v[4],
            delta: v[5],
            s2: v[6],
            f: v[7],
            a1: v[8],
            a2: v[9],
            a3: v[10],
            bh_ret: v[11],
            d: v[12],
        }
    }

    /// Unpack a fixed-order sequence (canonical ordering).
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        let array: [f64; N_PARAMS] = values.try_into().map_err(|_| {
            let missing: Vec<&str> = Param::ALL
                .iter()
                .skip(values.len())
                .map(|p| p.name())
                .collect();
            if missing.is_empty() {
                Error::Validation(format!(
                    "θ has {} values, expected {N_PARAMS}",
                    values.len()
                ))
            } else {
                Error::MissingParameter(missing.join(", "))
            }
        })?;
        Ok(Theta::from_array(array))
    }

    /// Unpack a name -> value mapping. Extra names are ignored.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self> {
        let mut values = [0.0; N_PARAMS];
        let mut missing = Vec::new();
        for p in Param::ALL {
            match map.get(p.name()) {
                Some(&v) => values[p.index()] = v,
                None => missing.push(p.name()),
            }
        }
        if !missing.is_empty() {
            return Err(Error::MissingParameter(missing.join(", ")));
        }
        Ok(Theta::from_array(values))
    }

    pub fn to_array(&self) -> [f64; N_PARAMS] {
        [
            self.w0, self.m, self.rh, self.ra, self.g, self.delta, self.s2, self.f, self.a1,
            self.a2, self.a3, self.bh_ret, self.d,
        ]
    }

    pub fn get(&self, param: Param) -> f64 {
        self.to_array()[param.index()]
    }

    pub fn set(&mut self, param: Param, value: f64) {
        let mut values = self.to_array();
        values[param.index()] = value;
        *self = Theta::from_array(values);
    }

    /// Whether every parameter lies strictly inside its prior bounds.
    pub fn within_prior_bounds(&self) -> bool {
        Param::ALL.iter().all(|&p| {
            let (lo, hi) = p.prior_bounds();
            let v = self.get(p);
            lo < v && v < hi
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_matches_indices() {
        for (i, p) in Param::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
            assert_eq!(Param::from_name(p.name()), Some(*p));
        }
    }

    #[test]
    fn defaults_are_within_prior_bounds() {
        assert!(Theta::default().within_prior_bounds());
        assert_eq!(Theta::default().d, 6.405);
    }

    #[test]
    fn from_map_reports_missing_names() {
        let mut map = BTreeMap::new();
        for (p, v) in DEFAULT_INITIALS.iter().take(11) {
            map.insert(p.name().to_string(), *v);
        }
        let err = Theta::from_map(&map).unwrap_err();
        match err {
            Error::MissingParameter(names) => assert_eq!(names, "BHret, d"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn from_slice_round_trips() {
        let theta = Theta::default();
        let back = Theta::from_slice(&theta.to_array()).unwrap();
        assert_eq!(theta, back);
        assert!(matches!(
            Theta::from_slice(&[1.0, 2.0]),
            Err(Error::MissingParameter(_))
        ));
    }

    #[test]
    fn bounds_are_exclusive() {
        let mut theta = Theta::default();
        theta.set(Param::W0, 3.0);
        assert!(!theta.within_prior_bounds());
        theta.set(Param::W0, 3.0001);
        assert!(theta.within_prior_bounds());
    }
}
