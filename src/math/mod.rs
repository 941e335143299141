//! Numerical primitives: grids, splines, interpolation, quadrature,
//! convolution and kernel density estimation.

pub mod grid;
pub mod interp;
pub mod kde;
pub mod signal;
pub mod spline;
pub mod stats;

pub use grid::*;
pub use interp::*;
pub use kde::*;
pub use signal::*;
pub use spline::*;
pub use stats::*;
