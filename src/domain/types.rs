//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - loaded from JSON model descriptions
//! - exported to JSON/CSV after a fit
//! - reloaded later for display or comparisons

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Which estimation procedure the rendered template contains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelKind {
    /// Schaefer surplus production fitted to a survey index.
    ///
    /// Requires parameters `r` and `K` and one binding each for the `time`,
    /// `catch` and `survey_index` roles. Catchability and observation error are
    /// concentrated out of the likelihood, so they are not parameters.
    SurplusProduction,
    /// Caller-supplied engine code.
    ///
    /// `locals` lines go into the parameter section after the declared
    /// parameters, `procedure` lines form the procedure section body (which
    /// must assign the objective `f`), `report` lines are appended to the
    /// report section.
    Custom {
        #[serde(default)]
        locals: Vec<String>,
        procedure: Vec<String>,
        #[serde(default)]
        report: Vec<String>,
    },
}

impl ModelKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::SurplusProduction => "surplus production (Schaefer)",
            ModelKind::Custom { .. } => "custom",
        }
    }
}

/// Prior distribution attached to a parameter.
///
/// Rendered as a negative log-density penalty on the objective.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Prior {
    /// Flat over the bound interval (no penalty).
    #[default]
    Uniform,
    Normal {
        mean: f64,
        sd: f64,
    },
    /// Normal on `ln(value)`.
    LogNormal {
        log_mean: f64,
        log_sd: f64,
    },
}

fn default_phase() -> i32 {
    1
}

/// One estimated quantity of the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub initial: f64,
    pub lower: f64,
    pub upper: f64,
    #[serde(default)]
    pub prior: Prior,
    /// Estimation phase. Negative phases keep the parameter fixed at `initial`.
    #[serde(default = "default_phase")]
    pub phase: i32,
}

impl ParameterDef {
    /// Bounded parameter with a flat prior, estimated in phase 1.
    pub fn bounded(name: impl Into<String>, initial: f64, lower: f64, upper: f64) -> Self {
        Self {
            name: name.into(),
            initial,
            lower,
            upper,
            prior: Prior::Uniform,
            phase: default_phase(),
        }
    }

    pub fn with_prior(mut self, prior: Prior) -> Self {
        self.prior = prior;
        self
    }

    pub fn with_phase(mut self, phase: i32) -> Self {
        self.phase = phase;
        self
    }

    /// Whether `value` sits on (or numerically at) either bound.
    pub fn is_at_bound(&self, value: f64) -> bool {
        let eps = (self.upper - self.lower).abs() * BOUND_EPS;
        (value - self.lower).abs() <= eps || (self.upper - value).abs() <= eps
    }
}

/// Relative distance (in bound widths) under which an estimate counts as on its bound.
pub const BOUND_EPS: f64 = 1e-6;

/// What a data column means to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataRole {
    Time,
    Catch,
    SurveyIndex,
    Effort,
    Covariate,
}

impl DataRole {
    pub fn label(self) -> &'static str {
        match self {
            DataRole::Time => "time",
            DataRole::Catch => "catch",
            DataRole::SurveyIndex => "survey index",
            DataRole::Effort => "effort",
            DataRole::Covariate => "covariate",
        }
    }
}

/// Binds a dataset column to a model role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBinding {
    pub column: String,
    pub role: DataRole,
}

impl DataBinding {
    pub fn new(column: impl Into<String>, role: DataRole) -> Self {
        Self {
            column: column.into(),
            role,
        }
    }
}

/// A complete estimation problem.
///
/// Built by the caller before execution; the pipeline only ever borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub kind: ModelKind,
    pub parameters: Vec<ParameterDef>,
    pub bindings: Vec<DataBinding>,
}

impl ModelSpec {
    pub fn parameter(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Column bound to `role`, if exactly one binding has it.
    pub fn column_for(&self, role: DataRole) -> Option<&str> {
        let mut it = self.bindings.iter().filter(|b| b.role == role);
        match (it.next(), it.next()) {
            (Some(b), None) => Some(b.column.as_str()),
            _ => None,
        }
    }
}

/// Numeric input table (one row per time step).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Dataset {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Values of a column, top to bottom. `None` if absent or if a row is too short.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.rows.iter().map(|row| row.get(idx).copied()).collect()
    }
}

/// Outcome classification of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Converged,
    MaxIterations,
    NumericalFailure,
    ExternalToolMissing,
}

impl FitStatus {
    pub fn display_name(self) -> &'static str {
        match self {
            FitStatus::Converged => "converged",
            FitStatus::MaxIterations => "max iterations",
            FitStatus::NumericalFailure => "numerical failure",
            FitStatus::ExternalToolMissing => "external tool missing",
        }
    }
}

/// One estimated quantity as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEstimate {
    pub name: String,
    pub estimate: f64,
    /// `None` when the engine produced no standard error (e.g. the Hessian
    /// could not be inverted).
    pub std_error: Option<f64>,
    pub at_bound: bool,
}

/// A time-indexed series written by the report section (e.g. biomass by year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub name: String,
    pub points: Vec<(i64, f64)>,
}

/// Parameter correlation matrix from the engine's `.cor` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub names: Vec<String>,
    pub matrix: DMatrix<f64>,
}

/// Structured outcome of one estimation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub model: String,
    pub status: FitStatus,
    /// In model-spec parameter order.
    pub estimates: Vec<ParameterEstimate>,
    pub objective: Option<f64>,
    pub max_gradient: Option<f64>,
    /// Reported quantities with standard errors that are not parameters.
    pub derived: Vec<ParameterEstimate>,
    /// Scalar sections of the report file.
    pub reference_values: BTreeMap<String, f64>,
    pub trajectories: Vec<Trajectory>,
    pub correlation: Option<Correlation>,
    pub log_det_hessian: Option<f64>,
    pub diagnostics: String,
    pub exit_code: Option<i32>,
    pub finished_at: DateTime<Utc>,
}

impl FitResult {
    /// A result with no estimates, for runs that never produced a report.
    pub fn empty(model: impl Into<String>, status: FitStatus, diagnostics: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            status,
            estimates: Vec::new(),
            objective: None,
            max_gradient: None,
            derived: Vec::new(),
            reference_values: BTreeMap::new(),
            trajectories: Vec::new(),
            correlation: None,
            log_det_hessian: None,
            diagnostics: diagnostics.into(),
            exit_code: None,
            finished_at: Utc::now(),
        }
    }

    pub fn estimate(&self, name: &str) -> Option<&ParameterEstimate> {
        self.estimates.iter().find(|e| e.name == name)
    }
}
