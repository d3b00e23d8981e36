//! Shared fit pipeline used by the CLI commands and library callers.
//!
//! Render → Execute → Parse → Wrap, strictly in sequence. Independent fits
//! can run in parallel ([`fit_batch`]): each owns its own run directory and
//! nothing is shared between them.

use chrono::Utc;
use rayon::prelude::*;
use slog::{Logger, info, o};

use crate::domain::{Dataset, FitResult, FitStatus, ModelSpec};
use crate::engine::{Driver, EngineConfig, RunBundle, process};
use crate::error::FitError;
use crate::parse::{ParseOptions, ReportSources, parse};
use crate::render::render;
use crate::report::FittedModel;

/// Lines of estimator output copied into a result's diagnostics.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Fit one model. The timeout and tool paths come from `config`.
pub fn fit(spec: &ModelSpec, data: &Dataset, config: &EngineConfig, log: &Logger) -> Result<FittedModel, FitError> {
    let log = log.new(o!("model" => spec.name.clone()));

    let rendered = render(spec, data)?;
    info!(log, "rendered template"; "parameters" => spec.parameters.len(), "rows" => data.n_rows());

    let driver = Driver::new(config.clone(), log.clone());
    let bundle = driver.execute(&rendered)?;

    let opts = ParseOptions {
        gradient_tolerance: config.gradient_tolerance,
    };
    let result = assemble(spec, &bundle, &opts)?;
    info!(log, "parsed reports";
        "status" => result.status.display_name(),
        "estimates" => result.estimates.len()
    );

    // The run directory is removed here, after everything has been read.
    drop(bundle);
    Ok(FittedModel::new(result))
}

fn assemble(spec: &ModelSpec, bundle: &RunBundle, opts: &ParseOptions) -> Result<FitResult, FitError> {
    let sources = ReportSources::load(&bundle.reports, bundle.exit_code)?;
    let parsed = parse(spec, &sources, opts)?;

    let mut diagnostics = parsed.notes.join("\n");
    let output = if bundle.stderr.trim().is_empty() {
        &bundle.stdout
    } else {
        &bundle.stderr
    };
    if parsed.status != FitStatus::Converged && !output.trim().is_empty() {
        if !diagnostics.is_empty() {
            diagnostics.push('\n');
        }
        diagnostics.push_str(&process::tail(output, DIAGNOSTIC_TAIL_LINES));
    }

    Ok(FitResult {
        model: spec.name.clone(),
        status: parsed.status,
        estimates: parsed.estimates,
        objective: parsed.objective,
        max_gradient: parsed.max_gradient,
        derived: parsed.derived,
        reference_values: parsed.reference_values,
        trajectories: parsed.trajectories,
        correlation: parsed.correlation,
        log_det_hessian: parsed.log_det_hessian,
        diagnostics,
        exit_code: bundle.exit_code,
        finished_at: Utc::now(),
    })
}

/// One independent fit request.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub spec: ModelSpec,
    pub data: Dataset,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub model: String,
    pub result: Result<FittedModel, FitError>,
}

/// Fit every job in parallel, returning outcomes in job order.
///
/// A missing engine is reported per job as a result with status
/// [`FitStatus::ExternalToolMissing`]; all other failures stay errors.
pub fn fit_batch(jobs: &[BatchJob], config: &EngineConfig, log: &Logger) -> Vec<BatchOutcome> {
    jobs.par_iter()
        .map(|job| {
            let result = match fit(&job.spec, &job.data, config, log) {
                Err(err @ FitError::ToolNotFound { .. }) => Ok(FittedModel::new(FitResult::empty(
                    job.spec.name.clone(),
                    FitStatus::ExternalToolMissing,
                    err.to_string(),
                ))),
                other => other,
            };
            BatchOutcome {
                model: job.spec.name.clone(),
                result,
            }
        })
        .collect()
}
