//! Result façade: read-only accessors over a [`FitResult`].
//!
//! Nothing here computes or validates; it only reshapes what the parser
//! already produced.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{FitResult, FitStatus, ParameterEstimate};

pub mod format;

pub use format::{format_batch, format_summary, format_table};

/// One row of the estimate table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateRow {
    pub parameter: String,
    pub estimate: f64,
    pub std_error: Option<f64>,
    pub at_bound: bool,
}

impl From<&ParameterEstimate> for EstimateRow {
    fn from(e: &ParameterEstimate) -> Self {
        Self {
            parameter: e.name.clone(),
            estimate: e.estimate,
            std_error: e.std_error,
            at_bound: e.at_bound,
        }
    }
}

/// Convergence status plus headline values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub model: String,
    pub status: FitStatus,
    pub objective: Option<f64>,
    pub max_gradient: Option<f64>,
    /// Report scalars merged with derived quantities (derived wins on name clash).
    pub reference_values: BTreeMap<String, f64>,
}

/// Iterator over `(time, value)` pairs of one trajectory.
///
/// `Clone` restarts iteration from the current position; call
/// [`FittedModel::trajectory`] again to start over.
#[derive(Debug, Clone)]
pub struct TrajectoryIter<'a> {
    points: std::slice::Iter<'a, (i64, f64)>,
}

impl Iterator for TrajectoryIter<'_> {
    type Item = (i64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        self.points.next().copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.points.size_hint()
    }
}

impl ExactSizeIterator for TrajectoryIter<'_> {}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    result: FitResult,
}

impl FittedModel {
    pub fn new(result: FitResult) -> Self {
        Self { result }
    }

    pub fn result(&self) -> &FitResult {
        &self.result
    }

    pub fn into_inner(self) -> FitResult {
        self.result
    }

    pub fn status(&self) -> FitStatus {
        self.result.status
    }

    /// Parameter estimates in model order.
    pub fn table(&self) -> Vec<EstimateRow> {
        self.result.estimates.iter().map(EstimateRow::from).collect()
    }

    /// Reported quantities that are not parameters.
    pub fn derived_table(&self) -> Vec<EstimateRow> {
        self.result.derived.iter().map(EstimateRow::from).collect()
    }

    pub fn summary(&self) -> Summary {
        let mut reference_values = self.result.reference_values.clone();
        for d in &self.result.derived {
            reference_values.insert(d.name.clone(), d.estimate);
        }
        Summary {
            model: self.result.model.clone(),
            status: self.result.status,
            objective: self.result.objective,
            max_gradient: self.result.max_gradient,
            reference_values,
        }
    }

    pub fn trajectory_names(&self) -> impl Iterator<Item = &str> {
        self.result.trajectories.iter().map(|t| t.name.as_str())
    }

    /// Points of trajectory `name`, or an empty iterator when absent.
    pub fn trajectory(&self, name: &str) -> TrajectoryIter<'_> {
        let points: &[(i64, f64)] = self
            .result
            .trajectories
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.points.as_slice())
            .unwrap_or(&[]);
        TrajectoryIter { points: points.iter() }
    }

    /// Correlation between two estimated quantities, if the engine wrote one.
    pub fn correlation(&self, a: &str, b: &str) -> Option<f64> {
        let c = self.result.correlation.as_ref()?;
        let i = c.names.iter().position(|n| n == a)?;
        let j = c.names.iter().position(|n| n == b)?;
        c.matrix.get((i, j)).copied()
    }
}

impl From<FitResult> for FittedModel {
    fn from(result: FitResult) -> Self {
        Self::new(result)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use nalgebra::DMatrix;

    use crate::domain::{Correlation, FitResult, FitStatus, ParameterEstimate, Trajectory};

    pub fn converged_result() -> FitResult {
        let mut result = FitResult::empty("schaefer", FitStatus::Converged, "");
        result.estimates = vec![
            ParameterEstimate {
                name: "r".to_string(),
                estimate: 0.41,
                std_error: Some(0.03),
                at_bound: false,
            },
            ParameterEstimate {
                name: "K".to_string(),
                estimate: 11_850.0,
                std_error: None,
                at_bound: false,
            },
        ];
        result.derived = vec![ParameterEstimate {
            name: "MSY".to_string(),
            estimate: 1214.6,
            std_error: Some(87.0),
            at_bound: false,
        }];
        result.objective = Some(-12.5);
        result.max_gradient = Some(3.1e-5);
        result.reference_values.insert("q".to_string(), 1.2e-4);
        result.trajectories = vec![Trajectory {
            name: "biomass".to_string(),
            points: vec![(1990, 11_850.0), (1991, 11_400.0), (1992, 11_020.0)],
        }];
        result.correlation = Some(Correlation {
            names: vec!["r".to_string(), "K".to_string()],
            matrix: DMatrix::from_row_slice(2, 2, &[1.0, -0.9, -0.9, 1.0]),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::converged_result;
    use super::*;

    #[test]
    fn table_preserves_order_and_missing_errors() {
        let fit = FittedModel::new(converged_result());
        let rows = fit.table();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].parameter, "r");
        assert_eq!(rows[1].std_error, None);
    }

    #[test]
    fn summary_merges_reference_values() {
        let summary = FittedModel::new(converged_result()).summary();
        assert_eq!(summary.status, FitStatus::Converged);
        assert_eq!(summary.reference_values.get("q"), Some(&1.2e-4));
        assert_eq!(summary.reference_values.get("MSY"), Some(&1214.6));
    }

    #[test]
    fn trajectory_is_restartable() {
        let fit = FittedModel::new(converged_result());
        let it = fit.trajectory("biomass");
        let first: Vec<_> = it.clone().collect();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
        assert_eq!(first[0], (1990, 11_850.0));
        assert_eq!(fit.trajectory("biomass").len(), 3);
    }

    #[test]
    fn absent_trajectory_is_empty() {
        let fit = FittedModel::new(converged_result());
        assert_eq!(fit.trajectory("recruits").count(), 0);
    }

    #[test]
    fn correlation_lookup() {
        let fit = FittedModel::new(converged_result());
        assert_eq!(fit.correlation("r", "K"), Some(-0.9));
        assert_eq!(fit.correlation("r", "q"), None);
    }
}
