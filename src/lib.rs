//! `gc-fit` library crate.
//!
//! Fits multimass globular cluster models to heterogeneous observations:
//!
//! - `data` loads and validates cluster observations and the field-pulsar catalogue
//! - `models` turns a parameter vector into an immutable cluster [`models::Model`]
//! - `likelihood` scores a model against each dataset
//! - `fit` combines them into a log-posterior and derived products
//!
//! The mass-function evolution and profile solving are external services,
//! plugged in through the traits in [`models::solvers`].

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod likelihood;
pub mod math;
pub mod models;

#[cfg(test)]
pub(crate) mod fixtures;
