//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the model description handed to the renderer (`ModelSpec`, `ParameterDef`, `Prior`, `DataBinding`)
//! - the numeric input table (`Dataset`)
//! - fit outputs (`FitResult`, `ParameterEstimate`, `Trajectory`, etc.)

pub mod types;

pub use types::*;
