//! Input/output helpers.
//!
//! - CSV dataset ingest (`ingest`)
//! - model spec JSON (`spec`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;
pub mod spec;

pub use export::*;
pub use ingest::*;
pub use spec::*;
