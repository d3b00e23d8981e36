//! Synthetic catch/survey data from a Schaefer surplus production model.
//!
//! Useful for smoke-testing an engine install: fitting the generated data
//! with the built-in surplus production template should recover `r` and `K`
//! roughly.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DataBinding, DataRole, Dataset, ModelKind, ModelSpec, ParameterDef};
use crate::error::FitError;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub years: usize,
    pub start_year: i64,
    pub r: f64,
    pub k: f64,
    /// Survey catchability.
    pub q: f64,
    /// Log-scale observation error of the survey index.
    pub sigma: f64,
    /// Harvest rate ramps linearly from `harvest_start` to `harvest_end`.
    pub harvest_start: f64,
    pub harvest_end: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            years: 20,
            start_year: 1990,
            r: 0.5,
            k: 10_000.0,
            q: 1e-4,
            sigma: 0.1,
            harvest_start: 0.05,
            harvest_end: 0.3,
            seed: 42,
        }
    }
}

/// Generate a `year,catch,cpue` table.
pub fn simulate(config: &SimulationConfig) -> Result<Dataset, FitError> {
    if config.years < 2 {
        return Err(FitError::spec("simulation", "need at least 2 years"));
    }
    let positive = [config.r, config.k, config.q];
    if positive.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
        return Err(FitError::spec("simulation", "r, K and q must be finite and > 0"));
    }
    for h in [config.harvest_start, config.harvest_end] {
        if !(0.0..1.0).contains(&h) {
            return Err(FitError::spec("simulation", "harvest rates must lie in [0, 1)"));
        }
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.sigma)
        .map_err(|e| FitError::spec("simulation", format!("invalid sigma: {e}")))?;

    let mut rows = Vec::with_capacity(config.years);
    let mut biomass = config.k;
    for i in 0..config.years {
        let u = i as f64 / (config.years as f64 - 1.0);
        let harvest = config.harvest_start + u * (config.harvest_end - config.harvest_start);
        let catch = harvest * biomass;
        let cpue = config.q * biomass * noise.sample(&mut rng).exp();
        rows.push(vec![(config.start_year + i as i64) as f64, round_to(catch, 2), round_to(cpue, 8)]);

        biomass = (biomass + config.r * biomass * (1.0 - biomass / config.k) - catch).max(1e-3);
    }

    Ok(Dataset {
        columns: vec!["year".to_string(), "catch".to_string(), "cpue".to_string()],
        rows,
    })
}

/// A surplus production spec matching [`simulate`]'s column names.
pub fn surplus_production_spec(name: &str, config: &SimulationConfig) -> ModelSpec {
    let r0 = config.r.clamp(0.05, 1.5);
    ModelSpec {
        name: name.to_string(),
        kind: ModelKind::SurplusProduction,
        parameters: vec![
            ParameterDef::bounded("r", r0, 0.01, 2.0),
            ParameterDef::bounded("K", config.k, config.k * 0.25, config.k * 4.0),
        ],
        bindings: vec![
            DataBinding::new("year", DataRole::Time),
            DataBinding::new("catch", DataRole::Catch),
            DataBinding::new("cpue", DataRole::SurveyIndex),
        ],
    }
}

fn round_to(v: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (v * scale).round() / scale
}
