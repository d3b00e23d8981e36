//! `admb-bridge` library crate.
//!
//! Fits statistical models with the ADMB toolchain from a typed description:
//!
//! - [`render`] turns a [`domain::ModelSpec`] and [`domain::Dataset`] into engine input text
//! - [`engine`] compiles and runs the model in an isolated run directory
//! - [`parse`] reads the engine's report files back into typed values
//! - [`report`] exposes the outcome as a [`report::FittedModel`]
//!
//! The binary (`admb-bridge`) is a thin wrapper around [`app::run`].

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod parse;
pub mod render;
pub mod report;

pub use app::pipeline::{BatchJob, BatchOutcome, fit, fit_batch};
pub use engine::EngineConfig;
pub use error::FitError;
pub use report::FittedModel;
