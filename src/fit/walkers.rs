//! Starting positions for an ensemble sampler.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Param, Theta};
use crate::error::{Error, Result};

/// Redraws allowed per walker before giving up.
const MAX_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkerSettings {
    pub n_walkers: usize,
    /// Scatter as a fraction of each parameter's prior width.
    pub scale: f64,
    pub seed: u64,
}

impl Default for WalkerSettings {
    fn default() -> Self {
        Self {
            n_walkers: 32,
            scale: 1e-2,
            seed: 42,
        }
    }
}

/// Gaussian ball of walkers around `initials`, over the `free` parameters.
///
/// Each coordinate is redrawn until it lies strictly inside its prior, so
/// every walker starts with a finite prior.
pub fn initial_walkers(initials: &Theta, free: &[Param], settings: &WalkerSettings) -> Result<Vec<Vec<f64>>> {
    if settings.n_walkers == 0 {
        return Err(Error::Validation("walker count must be > 0".to_string()));
    }
    if !(settings.scale.is_finite() && settings.scale > 0.0) {
        return Err(Error::Validation(format!("invalid walker scatter {}", settings.scale)));
    }
    for &p in free {
        let (lo, hi) = p.prior_bounds();
        let v = initials.get(p);
        if !(lo < v && v < hi) {
            return Err(Error::Validation(format!(
                "initial {} = {v} lies outside its prior ({lo}, {hi})",
                p.name()
            )));
        }
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| Error::Computation(format!("scatter distribution: {e}")))?;

    let mut walkers = Vec::with_capacity(settings.n_walkers);
    for _ in 0..settings.n_walkers {
        let mut position = Vec::with_capacity(free.len());
        for &p in free {
            let (lo, hi) = p.prior_bounds();
            let sigma = settings.scale * (hi - lo);
            let centre = initials.get(p);
            let mut attempts = 0;
            let value = loop {
                let v = centre + sigma * rng.sample(normal);
                if lo < v && v < hi {
                    break v;
                }
                attempts += 1;
                if attempts >= MAX_ATTEMPTS {
                    return Err(Error::Computation(format!(
                        "could not place a walker inside the prior of {}",
                        p.name()
                    )));
                }
            };
            position.push(value);
        }
        walkers.push(position);
    }

    log::debug!("initialised {} walkers over {} parameters", walkers.len(), free.len());
    Ok(walkers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walkers_start_inside_the_prior() {
        let settings = WalkerSettings {
            n_walkers: 64,
            scale: 0.2,
            seed: 7,
        };
        let walkers = initial_walkers(&Theta::default(), &Param::ALL, &settings).unwrap();
        assert_eq!(walkers.len(), 64);
        for w in &walkers {
            let theta = Theta::from_slice(w).unwrap();
            assert!(theta.within_prior_bounds(), "{theta:?}");
        }
    }

    #[test]
    fn seeded_and_scattered() {
        let settings = WalkerSettings::default();
        let free = [Param::W0, Param::M, Param::Rh];
        let a = initial_walkers(&Theta::default(), &free, &settings).unwrap();
        let b = initial_walkers(&Theta::default(), &free, &settings).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|w| w.len() == 3));
        assert_ne!(a[0], a[1]);

        let c = initial_walkers(&Theta::default(), &free, &WalkerSettings { seed: 1, ..settings }).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn initials_outside_the_prior_are_rejected() {
        let theta = Theta { d: 9.0, ..Theta::default() };
        let err = initial_walkers(&theta, &[Param::D], &WalkerSettings::default()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
