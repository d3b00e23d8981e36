//! Engine configuration.
//!
//! The library never reads the environment on its own: every run gets an
//! explicit [`EngineConfig`]. [`EngineConfig::from_env`] exists for the CLI,
//! which resolves `.env` and process variables once at startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_GRADIENT_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Compiler command. Bare names are looked up in `search_paths`.
    pub compiler: PathBuf,
    pub search_paths: Vec<PathBuf>,
    /// Arguments passed to the compiled executable.
    pub run_args: Vec<String>,
    /// Budget for each subprocess (compile and run separately).
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Parent directory for per-run temporary directories (system temp dir if `None`).
    pub scratch_root: Option<PathBuf>,
    /// Keep the run directory on disk instead of removing it.
    pub keep_workdir: bool,
    /// Largest final gradient component that still counts as converged.
    pub gradient_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from("admb"),
            search_paths: Vec::new(),
            run_args: vec!["-nox".to_string()],
            timeout: DEFAULT_TIMEOUT,
            poll_interval: Duration::from_millis(20),
            scratch_root: None,
            keep_workdir: false,
            gradient_tolerance: DEFAULT_GRADIENT_TOLERANCE,
        }
    }
}

impl EngineConfig {
    /// Build a config from `.env` and the process environment.
    ///
    /// - `ADMB_COMPILER`: compiler command or path
    /// - `ADMB_HOME`: install root; `$ADMB_HOME/bin` is searched first
    /// - `PATH`: appended to the search paths
    /// - `ADMB_TIMEOUT_SECS`: per-subprocess timeout
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(compiler) = std::env::var("ADMB_COMPILER") {
            config.compiler = PathBuf::from(compiler);
        }
        if let Ok(home) = std::env::var("ADMB_HOME") {
            config.search_paths.push(PathBuf::from(home).join("bin"));
        }
        if let Some(path) = std::env::var_os("PATH") {
            config.search_paths.extend(std::env::split_paths(&path));
        }
        if let Ok(raw) = std::env::var("ADMB_TIMEOUT_SECS") {
            config.timeout = parse_timeout_secs(&raw)?;
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Whole seconds, at least 1.
fn parse_timeout_secs(raw: &str) -> Result<Duration, AppError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(AppError::new(2, "ADMB_TIMEOUT_SECS must be at least 1 second.")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(AppError::new(2, format!("Invalid ADMB_TIMEOUT_SECS '{raw}'."))),
    }
}
