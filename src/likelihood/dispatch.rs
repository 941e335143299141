//! Map datasets to likelihood components.
//!
//! Dispatch happens once per observation set. Each dataset key is classified
//! through [`DatasetKind::classify`]; a kind then yields one or more
//! components. Expensive fixed inputs (the field-pulsar KDE) are built here,
//! once, and shared by every pulsar component.

use std::fmt;
use std::sync::Arc;

use crate::config::FitConfig;
use crate::data::{DatasetKind, FieldCatalogue, Observations};
use crate::error::{Error, Result};
use crate::likelihood::{
    PulsarContext, field_pdot_kde, likelihood_los, likelihood_mass_function, likelihood_number_density,
    likelihood_pm_r, likelihood_pm_ratio, likelihood_pm_t, likelihood_pm_tot, likelihood_pulsar,
};
use crate::math::GaussianKde2;
use crate::models::Model;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikelihoodKind {
    Pulsar,
    Los,
    NumberDensity,
    PmTot,
    PmRatio,
    PmR,
    PmT,
    MassFunction,
}

impl LikelihoodKind {
    pub fn name(self) -> &'static str {
        match self {
            LikelihoodKind::Pulsar => "likelihood_pulsar",
            LikelihoodKind::Los => "likelihood_los",
            LikelihoodKind::NumberDensity => "likelihood_number_density",
            LikelihoodKind::PmTot => "likelihood_pm_tot",
            LikelihoodKind::PmRatio => "likelihood_pm_ratio",
            LikelihoodKind::PmR => "likelihood_pm_r",
            LikelihoodKind::PmT => "likelihood_pm_t",
            LikelihoodKind::MassFunction => "likelihood_mass_function",
        }
    }
}

impl fmt::Display for LikelihoodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Proper-motion sub-likelihoods and the variable each one needs.
const PM_COMPONENTS: [(&str, LikelihoodKind); 4] = [
    ("PM_tot", LikelihoodKind::PmTot),
    ("PM_ratio", LikelihoodKind::PmRatio),
    ("PM_R", LikelihoodKind::PmR),
    ("PM_T", LikelihoodKind::PmT),
];

/// One likelihood term: which dataset, which function, and any fixed inputs.
#[derive(Debug, Clone)]
pub struct Component {
    pub key: String,
    pub kind: LikelihoodKind,
    pub pulsar: Option<PulsarContext>,
}

impl Component {
    fn plain(key: &str, kind: LikelihoodKind) -> Self {
        Self {
            key: key.to_string(),
            kind,
            pulsar: None,
        }
    }

    /// Log-likelihood of this component's dataset under `model`.
    pub fn evaluate(&self, model: &Model, observations: &Observations, config: &FitConfig) -> Result<f64> {
        let dataset = observations.dataset(&self.key)?;
        match self.kind {
            LikelihoodKind::Pulsar => {
                let context = self.pulsar.as_ref().ok_or_else(|| {
                    Error::Computation(format!("pulsar component '{}' has no field context", self.key))
                })?;
                likelihood_pulsar(model, dataset, context, None, config.accel_eps)
            }
            LikelihoodKind::Los => likelihood_los(model, dataset, None),
            LikelihoodKind::NumberDensity => likelihood_number_density(model, dataset, None),
            LikelihoodKind::PmTot => likelihood_pm_tot(model, dataset, None),
            LikelihoodKind::PmRatio => likelihood_pm_ratio(model, dataset, None),
            LikelihoodKind::PmR => likelihood_pm_r(model, dataset, None),
            LikelihoodKind::PmT => likelihood_pm_t(model, dataset, None),
            LikelihoodKind::MassFunction => {
                likelihood_mass_function(model, dataset, config.annulus_width_arcmin)
            }
        }
    }
}

/// Components for every recognised dataset, in dataset iteration order.
///
/// `field` is only needed when the observations contain pulsar data.
pub fn determine_components(
    observations: &Observations,
    field: Option<&FieldCatalogue>,
) -> Result<Vec<Component>> {
    let mut components = Vec::new();
    let mut kde: Option<Arc<GaussianKde2>> = None;

    for (key, dataset) in observations.datasets() {
        let Some(kind) = DatasetKind::classify(key) else {
            log::debug!("no likelihood for dataset '{key}'");
            continue;
        };

        match kind {
            DatasetKind::Pulsar => {
                let shared = match &kde {
                    Some(k) => Arc::clone(k),
                    None => {
                        let catalogue = field.ok_or_else(|| {
                            Error::Validation(format!("dataset '{key}' needs the field pulsar catalogue"))
                        })?;
                        let built = Arc::new(field_pdot_kde(catalogue)?);
                        kde = Some(Arc::clone(&built));
                        built
                    }
                };
                let context = PulsarContext {
                    kde: shared,
                    pm: observations.require_mdata("μ")?,
                    b: observations.require_mdata("b")?,
                    l: observations.require_mdata("l")?,
                };
                components.push(Component {
                    key: key.clone(),
                    kind: LikelihoodKind::Pulsar,
                    pulsar: Some(context),
                });
            }
            DatasetKind::VelocityDispersion => components.push(Component::plain(key, LikelihoodKind::Los)),
            DatasetKind::NumberDensity => {
                components.push(Component::plain(key, LikelihoodKind::NumberDensity))
            }
            DatasetKind::ProperMotion => {
                for (variable, pm_kind) in PM_COMPONENTS {
                    if dataset.contains(variable) {
                        components.push(Component::plain(key, pm_kind));
                    }
                }
            }
            DatasetKind::MassFunction => {
                components.push(Component::plain(key, LikelihoodKind::MassFunction))
            }
        }
    }

    log::debug!(
        "{}: {} likelihood components",
        observations.cluster(),
        components.len()
    );
    Ok(components)
}
