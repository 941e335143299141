//! Cluster models: the external solver contracts, the immutable per-θ
//! [`Model`], and the builder that ties them together.

pub mod builder;
pub mod model;
pub mod solvers;

pub use builder::*;
pub use model::*;
pub use solvers::*;
