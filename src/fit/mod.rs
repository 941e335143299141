//! Fitting support.
//!
//! Responsibilities:
//!
//! - evaluate the log-posterior of a θ (and batches of θ, in parallel)
//! - place sampler walkers inside the prior
//! - turn a posterior chain into model confidence bands

pub mod confidence;
pub mod posterior;
pub mod walkers;

pub use confidence::*;
pub use posterior::*;
pub use walkers::*;
