//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the canonical parameter set and prior bounds (`Param`, `Theta`)
//! - unit tags and distance-dependent unit conversions (`Unit`)

pub mod params;
pub mod units;

pub use params::*;
pub use units::*;
