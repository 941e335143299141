//! Dataset classification by key.
//!
//! Dataset keys are matched against a fixed registry of substrings, checked in
//! order. The first hit decides the kind; unmatched keys are ignored by both
//! validation and likelihood dispatch.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    Pulsar,
    VelocityDispersion,
    NumberDensity,
    ProperMotion,
    MassFunction,
}

/// Registry of key patterns, in match priority order.
pub const KIND_REGISTRY: [(&str, DatasetKind); 5] = [
    ("pulsar", DatasetKind::Pulsar),
    ("velocity_dispersion", DatasetKind::VelocityDispersion),
    ("number_density", DatasetKind::NumberDensity),
    ("proper_motion", DatasetKind::ProperMotion),
    ("mass_function", DatasetKind::MassFunction),
];

impl DatasetKind {
    /// Classify a dataset key such as `proper_motion/high_mass`.
    pub fn classify(key: &str) -> Option<DatasetKind> {
        KIND_REGISTRY
            .iter()
            .find(|(pattern, _)| key.contains(pattern))
            .map(|&(_, kind)| kind)
    }

    pub fn pattern(self) -> &'static str {
        match self {
            DatasetKind::Pulsar => "pulsar",
            DatasetKind::VelocityDispersion => "velocity_dispersion",
            DatasetKind::NumberDensity => "number_density",
            DatasetKind::ProperMotion => "proper_motion",
            DatasetKind::MassFunction => "mass_function",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}
