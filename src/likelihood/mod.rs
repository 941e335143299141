//! Per-dataset log-likelihoods and their dispatch.
//!
//! Every component is a pure function of `(model, dataset, fixed inputs)` and
//! returns a log-likelihood. Comparisons are made in the units the data were
//! observed in.

pub mod acceleration;
pub mod density;
pub mod dispatch;
pub mod kinematics;
pub mod mass_function;
pub mod pulsar;

pub use acceleration::{AccelerationDistribution, cluster_component, galactic_component, shklovskii_component};
pub use density::*;
pub use dispatch::*;
pub use kinematics::{likelihood_los, likelihood_pm_r, likelihood_pm_ratio, likelihood_pm_t, likelihood_pm_tot};
pub use mass_function::*;
pub use pulsar::*;
