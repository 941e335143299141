//! Error taxonomy for model construction and likelihood evaluation.
//!
//! Only two variants are expected during normal sampling:
//!
//! - [`Error::NonConvergentModel`]: the profile solver gave up for this θ. The
//!   posterior turns it into `-inf`.
//! - [`Error::OutOfBoundsRadius`]: a pulsar sits at or beyond the truncation
//!   radius of the current model. The pulsar likelihood turns it into a zero
//!   probability for that pulsar.
//!
//! Everything else signals a schema or programmer error and is meant to halt
//! the run.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// θ is missing one of the canonical parameters.
    #[error("missing required parameter(s): {0}")]
    MissingParameter(String),

    /// The structural profile solver did not converge for this θ.
    #[error("model did not converge: {0}")]
    NonConvergentModel(String),

    /// Projected radius lies at or outside the model truncation radius.
    #[error("projected radius {radius:.4} pc is outside the cluster bound (rt = {rt:.4} pc)")]
    OutOfBoundsRadius { radius: f64, rt: f64 },

    /// A physical variable has neither `ΔX` nor `ΔX,up`/`ΔX,down`.
    #[error("no uncertainties (Δ) associated with '{variable}' in dataset '{dataset}'")]
    MissingUncertainty { dataset: String, variable: String },

    #[error("required variable '{variable}' not in dataset '{dataset}'")]
    MissingVariable { dataset: String, variable: String },

    #[error("variable '{variable}' in dataset '{dataset}' has no resolvable unit")]
    MissingUnit { dataset: String, variable: String },

    #[error("required metadata '{0}' is missing")]
    MissingMetadata(String),

    #[error("cannot convert from '{from}' to '{to}'")]
    UnitMismatch { from: String, to: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("computation error: {0}")]
    Computation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is an expected outcome of exploring parameter space
    /// (as opposed to bad data or a caller bug).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NonConvergentModel(_) | Error::OutOfBoundsRadius { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
