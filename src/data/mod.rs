//! Observational data: in-memory model, cluster document ingest, and the
//! field-pulsar catalogue.

pub mod field;
pub mod ingest;
pub mod kind;
pub mod observations;

pub use field::*;
pub use ingest::*;
pub use kind::*;
pub use observations::*;
