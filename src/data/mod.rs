//! Synthetic data generation.

pub mod simulate;

pub use simulate::{SimulationConfig, simulate, surplus_production_spec};
