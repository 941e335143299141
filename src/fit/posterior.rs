//! The log-posterior handed to samplers.
//!
//! `Posterior::evaluate` takes the free parameters in canonical order,
//! merges them with the fixed initials, checks the uniform priors, builds the
//! model and sums the likelihood components. Out-of-prior and non-convergent
//! θ give `-inf` for the total and for every component; only schema or
//! caller errors are returned as `Err`.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::FitConfig;
use crate::data::Observations;
use crate::domain::{Param, Theta};
use crate::error::{Error, Result};
use crate::likelihood::Component;
use crate::models::ModelBuilder;

/// Total log-probability plus one entry per component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosteriorValue {
    pub total: f64,
    pub components: Vec<f64>,
}

impl PosteriorValue {
    fn impossible(n: usize) -> Self {
        Self {
            total: f64::NEG_INFINITY,
            components: vec![f64::NEG_INFINITY; n],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.total.is_finite()
    }
}

pub struct Posterior {
    observations: Arc<Observations>,
    components: Vec<Component>,
    builder: ModelBuilder,
    config: FitConfig,
    free: Vec<Param>,
}

impl Posterior {
    /// Every parameter free.
    pub fn new(
        observations: Arc<Observations>,
        components: Vec<Component>,
        builder: ModelBuilder,
        config: FitConfig,
    ) -> Self {
        Self {
            observations,
            components,
            builder,
            config,
            free: Param::ALL.to_vec(),
        }
    }

    /// Hold `fixed` at the observations' initial values.
    pub fn with_fixed(mut self, fixed: &[Param]) -> Self {
        self.free = Param::ALL.into_iter().filter(|p| !fixed.contains(p)).collect();
        self
    }

    /// Free parameters, in canonical order.
    pub fn free_params(&self) -> &[Param] {
        &self.free
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn observations(&self) -> &Observations {
        &self.observations
    }

    /// Merge free values (canonical order) with the fixed initials.
    pub fn full_theta(&self, theta_free: &[f64]) -> Result<Theta> {
        if theta_free.len() < self.free.len() {
            let missing: Vec<&str> = self.free[theta_free.len()..].iter().map(|p| p.name()).collect();
            return Err(Error::MissingParameter(missing.join(", ")));
        }
        if theta_free.len() > self.free.len() {
            return Err(Error::Validation(format!(
                "{} free values given, expected {}",
                theta_free.len(),
                self.free.len()
            )));
        }
        let mut theta = *self.observations.initials();
        for (&param, &value) in self.free.iter().zip(theta_free) {
            theta.set(param, value);
        }
        Ok(theta)
    }

    pub fn evaluate(&self, theta_free: &[f64]) -> Result<PosteriorValue> {
        let theta = self.full_theta(theta_free)?;
        let n = self.components.len();

        if !theta.within_prior_bounds() {
            return Ok(PosteriorValue::impossible(n));
        }

        let model = match self.builder.build(&theta, Some(&self.observations)) {
            Ok(model) => model,
            Err(Error::NonConvergentModel(reason)) => {
                log::debug!("non-convergent model: {reason}");
                return Ok(PosteriorValue::impossible(n));
            }
            Err(e) => return Err(e),
        };

        let components = self
            .components
            .iter()
            .map(|c| c.evaluate(&model, &self.observations, &self.config))
            .collect::<Result<Vec<f64>>>()?;
        let total = components.iter().sum();

        Ok(PosteriorValue { total, components })
    }

    /// Total log-probability only.
    pub fn log_prob(&self, theta_free: &[f64]) -> Result<f64> {
        Ok(self.evaluate(theta_free)?.total)
    }

    /// Evaluate many θ in parallel; results keep the input order.
    pub fn evaluate_batch(&self, thetas: &[Vec<f64>]) -> Vec<Result<PosteriorValue>> {
        thetas.par_iter().map(|theta| self.evaluate(theta)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::data::{Dataset, Variable};
    use crate::domain::Unit;
    use crate::fixtures::{plummer_parts, plummer_parts_with};
    use crate::likelihood::determine_components;
    use crate::math::interp;

    fn number_density_obs() -> Arc<Observations> {
        let ds = Dataset::new("number_density")
            .with_variable("r", Variable::new(vec![1.0, 2.0, 3.0], Some(Unit::Parsec)))
            .with_variable("Σ", Variable::new(vec![10.0, 5.0, 2.0], Some(Unit::PerPc2)))
            .with_variable("ΔΣ", Variable::new(vec![1.0, 1.0, 1.0], Some(Unit::PerPc2)));
        Arc::new(Observations::new("TEST", vec![ds], BTreeMap::new(), Theta::default()))
    }

    fn posterior(obs: Arc<Observations>, builder: ModelBuilder) -> Posterior {
        let comps = determine_components(&obs, None).unwrap();
        Posterior::new(obs, comps, builder, FitConfig::default())
    }

    #[test]
    fn number_density_end_to_end() {
        let obs = number_density_obs();
        let (builder, _) = plummer_parts();
        let post = posterior(Arc::clone(&obs), builder.clone());

        let theta = Theta::default();
        let value = post.evaluate(&theta.to_array()).unwrap();
        assert!(value.total.is_finite());
        assert_eq!(value.components.len(), 1);

        // independent computation with the K-scaling formula
        let model = builder.build(&theta, Some(&obs)).unwrap();
        let bin = model.nms() - 1;
        let mj = model.mj()[bin];
        let number: Vec<f64> = model.sigmaj().bin(bin).unwrap().iter().map(|s| s / mj).collect();
        let obs_s = [10.0, 5.0, 2.0];
        let err = [1.0f64, 1.0, 1.0];
        let m: Vec<f64> = [1.0, 2.0, 3.0].iter().map(|&r| interp(r, model.r(), &number)).collect();
        let k = (0..3).map(|i| obs_s[i] * m[i] / (err[i] * err[i])).sum::<f64>()
            / (0..3).map(|i| m[i] * m[i] / (err[i] * err[i])).sum::<f64>();
        let expected: f64 = (0..3)
            .map(|i| {
                let yerr2 = err[i] * err[i] + theta.s2;
                (obs_s[i] - k * m[i]).powi(2) / yerr2 + yerr2.ln()
            })
            .sum::<f64>()
            * -0.5;

        assert!((value.components[0] - expected).abs() < 1e-9, "{} vs {expected}", value.components[0]);
        assert_eq!(value.total, value.components[0]);
    }

    #[test]
    fn prior_violation_skips_the_solver() {
        let (builder, solver) = plummer_parts();
        let post = posterior(number_density_obs(), builder);

        let mut theta = Theta::default();
        theta.w0 = 25.0;
        let value = post.evaluate(&theta.to_array()).unwrap();
        assert_eq!(value.total, f64::NEG_INFINITY);
        assert_eq!(value.components, vec![f64::NEG_INFINITY]);
        assert_eq!(solver.calls.load(Ordering::SeqCst), 0);

        post.evaluate(&Theta::default().to_array()).unwrap();
        assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn prior_bounds_are_exclusive() {
        let (builder, solver) = plummer_parts();
        let post = posterior(number_density_obs(), builder);
        let mut theta = Theta::default();
        theta.delta = 0.5;
        assert_eq!(post.log_prob(&theta.to_array()).unwrap(), f64::NEG_INFINITY);
        assert_eq!(solver.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn non_convergence_is_negative_infinity() {
        let (builder, _) = plummer_parts_with(|s| s.fail_above_w0 = Some(5.0));
        let post = posterior(number_density_obs(), builder);
        let value = post.evaluate(&Theta::default().to_array()).unwrap();
        assert_eq!(value.total, f64::NEG_INFINITY);
        assert_eq!(value.components.len(), 1);
        assert!(!value.is_finite());

        let mut theta = Theta::default();
        theta.w0 = 4.0;
        assert!(post.evaluate(&theta.to_array()).unwrap().is_finite());
    }

    #[test]
    fn fixed_parameters_come_from_initials() {
        let (builder, _) = plummer_parts();
        let post = posterior(number_density_obs(), builder).with_fixed(&[Param::D, Param::BhRet, Param::S2]);
        assert_eq!(post.free_params().len(), 10);
        assert!(!post.free_params().contains(&Param::D));

        let free: Vec<f64> = post.free_params().iter().map(|&p| Theta::default().get(p)).collect();
        let theta = post.full_theta(&free).unwrap();
        assert_eq!(theta, Theta::default());

        assert!(matches!(post.full_theta(&free[..4]), Err(Error::MissingParameter(_))));
        let mut long = free.clone();
        long.push(1.0);
        assert!(matches!(post.full_theta(&long), Err(Error::Validation(_))));
    }

    #[test]
    fn batch_matches_serial() {
        let (builder, _) = plummer_parts();
        let post = posterior(number_density_obs(), builder);
        let thetas: Vec<Vec<f64>> = [5.0, 6.0, 7.0, 30.0]
            .iter()
            .map(|&w0| {
                let mut t = Theta::default();
                t.w0 = w0;
                t.rh = 2.0 + w0 / 10.0;
                t.to_array().to_vec()
            })
            .collect();

        let batch = post.evaluate_batch(&thetas);
        for (theta, got) in thetas.iter().zip(batch) {
            assert_eq!(got.unwrap(), post.evaluate(theta).unwrap());
        }
    }
}
