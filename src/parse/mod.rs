//! Report parser: engine output files → estimates and a convergence status.
//!
//! Parsing works on in-memory text ([`ReportSources`]) and is pure: the same
//! bytes always give the same [`ParsedReport`]. Sections are matched by label,
//! never by line offset, so small layout changes between engine versions are
//! tolerated.
//!
//! Tolerated: missing standard errors (estimates carry `std_error = None`),
//! trailing data after the expected sections. Rejected with
//! [`FitError::ReportParse`]: truncated sections, missing headers.

use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::{Correlation, FitStatus, ModelSpec, ParameterEstimate, Trajectory};
use crate::engine::{ReportFiles, config::DEFAULT_GRADIENT_TOLERANCE};
use crate::error::FitError;

pub mod cor;
pub mod par;
pub mod rep;
pub mod std_file;

/// Raw report text plus the estimator's exit code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportSources {
    pub par: Option<String>,
    pub std: Option<String>,
    pub cor: Option<String>,
    pub rep: Option<String>,
    pub exit_code: Option<i32>,
}

impl ReportSources {
    pub fn load(files: &ReportFiles, exit_code: Option<i32>) -> Result<Self, FitError> {
        fn read(path: Option<&Path>) -> Result<Option<String>, FitError> {
            path.map(|p| {
                std::fs::read(p)
                    .map(|b| String::from_utf8_lossy(&b).into_owned())
                    .map_err(|e| FitError::io(p, e))
            })
            .transpose()
        }
        Ok(Self {
            par: read(files.par.as_deref())?,
            std: read(files.std.as_deref())?,
            cor: read(files.cor.as_deref())?,
            rep: read(files.rep.as_deref())?,
            exit_code,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub gradient_tolerance: f64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            gradient_tolerance: DEFAULT_GRADIENT_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    pub status: FitStatus,
    pub estimates: Vec<ParameterEstimate>,
    pub objective: Option<f64>,
    pub max_gradient: Option<f64>,
    pub derived: Vec<ParameterEstimate>,
    pub reference_values: BTreeMap<String, f64>,
    pub trajectories: Vec<Trajectory>,
    pub correlation: Option<Correlation>,
    pub log_det_hessian: Option<f64>,
    /// Human-readable remarks (e.g. why standard errors are missing).
    pub notes: Vec<String>,
}

impl ParsedReport {
    fn failed(note: String) -> Self {
        Self {
            status: FitStatus::NumericalFailure,
            estimates: Vec::new(),
            objective: None,
            max_gradient: None,
            derived: Vec::new(),
            reference_values: BTreeMap::new(),
            trajectories: Vec::new(),
            correlation: None,
            log_det_hessian: None,
            notes: vec![note],
        }
    }
}

/// Parse all available reports for a run of `spec`.
pub fn parse(spec: &ModelSpec, sources: &ReportSources, opts: &ParseOptions) -> Result<ParsedReport, FitError> {
    let Some(par_text) = sources.par.as_deref() else {
        return match sources.exit_code {
            Some(0) => Err(FitError::parse("par", "estimator exited cleanly but wrote no .par file")),
            code => Ok(ParsedReport::failed(format!(
                "estimator exited with code {code:?} without writing a .par file"
            ))),
        };
    };

    let par = par::parse_par(par_text)?;
    let std_rows = sources.std.as_deref().map(std_file::parse_std).transpose()?;
    let cor = sources.cor.as_deref().map(cor::parse_cor).transpose()?;
    let rep = sources.rep.as_deref().map(rep::parse_rep).transpose()?.unwrap_or_default();

    let mut notes = Vec::new();
    let se_rows = match (&std_rows, &cor) {
        (Some(rows), _) => Some(rows.as_slice()),
        (None, Some(c)) => {
            notes.push("standard errors taken from .cor (no .std file)".to_string());
            Some(c.rows.as_slice())
        }
        (None, None) => {
            notes.push("no .std file: standard errors unavailable (Hessian not inverted?)".to_string());
            None
        }
    };
    let std_error_of = |name: &str| -> Option<f64> {
        se_rows?
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.std_dev)
            .filter(|v| v.is_finite())
    };

    let estimates: Vec<ParameterEstimate> = par
        .sections
        .iter()
        .map(|(name, values)| {
            let estimate = values.first().copied().unwrap_or(f64::NAN);
            ParameterEstimate {
                name: name.clone(),
                estimate,
                std_error: std_error_of(name),
                at_bound: spec.parameter(name).is_some_and(|p| p.is_at_bound(estimate)),
            }
        })
        .collect();

    let derived = std_rows
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|r| !par.sections.iter().any(|(n, _)| *n == r.name))
        .map(|r| ParameterEstimate {
            name: r.name.clone(),
            estimate: r.value,
            std_error: r.std_dev.filter(|v| v.is_finite()),
            at_bound: false,
        })
        .collect();

    let status = classify(par.objective, par.max_gradient, opts.gradient_tolerance);
    if let Some(code) = sources.exit_code.filter(|c| *c != 0) {
        notes.push(format!("estimator exit code {code}"));
    }
    for e in estimates.iter().filter(|e| e.at_bound) {
        notes.push(format!("parameter `{}` is at a bound", e.name));
    }

    if status == FitStatus::Converged {
        for p in &spec.parameters {
            let count = estimates.iter().filter(|e| e.name == p.name).count();
            if count != 1 {
                return Err(FitError::parse(
                    &p.name,
                    format!("converged run reports {count} estimates for this parameter"),
                ));
            }
        }
    }

    let (correlation, log_det_hessian) = match cor {
        Some(c) => (Some(c.correlation), c.log_det_hessian),
        None => (None, None),
    };

    Ok(ParsedReport {
        status,
        estimates,
        objective: Some(par.objective),
        max_gradient: Some(par.max_gradient),
        derived,
        reference_values: rep.scalars,
        trajectories: rep.trajectories,
        correlation,
        log_det_hessian,
        notes,
    })
}

/// Convergence status from the final objective and gradient.
pub fn classify(objective: f64, max_gradient: f64, tolerance: f64) -> FitStatus {
    if !(objective.is_finite() && max_gradient.is_finite()) {
        FitStatus::NumericalFailure
    } else if max_gradient.abs() <= tolerance {
        FitStatus::Converged
    } else {
        FitStatus::MaxIterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fixtures::schaefer_spec;
    use proptest::prelude::*;

    const PAR: &str = "# Number of parameters = 2  Objective function value = -12.5  Maximum gradient component = 3.1e-05\n# r:\n0.4123\n# K:\n20000\n";
    const STD: &str = " index   name   value      std.dev\n     1   r     4.1230e-01 3.2101e-02\n     2   K     2.0000e+04 1.1002e+03\n     3   MSY   2.0615e+03 8.7e+01\n";

    fn sources() -> ReportSources {
        ReportSources {
            par: Some(PAR.to_string()),
            std: Some(STD.to_string()),
            cor: None,
            rep: Some("# q\n0.0001\n# biomass\n1990 20000\n1991 19000\n".to_string()),
            exit_code: Some(0),
        }
    }

    #[test]
    fn converged_report() {
        let out = parse(&schaefer_spec(), &sources(), &ParseOptions::default()).unwrap();
        assert_eq!(out.status, FitStatus::Converged);
        assert_eq!(out.estimates.len(), 2);
        assert_eq!(out.estimates[0].std_error, Some(3.2101e-2));
        assert!(out.estimates[1].at_bound);
        assert_eq!(out.derived.len(), 1);
        assert_eq!(out.derived[0].name, "MSY");
        assert_eq!(out.reference_values.get("q"), Some(&0.0001));
        assert_eq!(out.trajectories[0].points.len(), 2);
    }

    #[test]
    fn missing_std_marks_errors_unavailable() {
        let mut src = sources();
        src.std = None;
        let out = parse(&schaefer_spec(), &src, &ParseOptions::default()).unwrap();
        assert_eq!(out.estimates.len(), 2);
        assert!(out.estimates.iter().all(|e| e.std_error.is_none()));
        assert!(out.notes.iter().any(|n| n.contains("standard errors unavailable")));
    }

    #[test]
    fn large_gradient_is_not_converged() {
        let mut src = sources();
        src.par = Some(PAR.replace("3.1e-05", "0.5"));
        let out = parse(&schaefer_spec(), &src, &ParseOptions::default()).unwrap();
        assert_eq!(out.status, FitStatus::MaxIterations);
    }

    #[test]
    fn converged_requires_every_parameter() {
        let mut src = sources();
        src.par = Some(
            "# Number of parameters = 1  Objective function value = 1  Maximum gradient component = 0\n# r:\n0.4\n"
                .to_string(),
        );
        match parse(&schaefer_spec(), &src, &ParseOptions::default()).unwrap_err() {
            FitError::ReportParse { section, .. } => assert_eq!(section, "K"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fixed_parameter_still_gets_an_estimate() {
        let mut spec = schaefer_spec();
        spec.parameters[1] = spec.parameters[1].clone().with_phase(-1);
        let mut src = sources();
        src.par = Some(
            "# Number of parameters = 1  Objective function value = 3.5  Maximum gradient component = 1e-06\n# r:\n0.41\n# K:\n10000\n"
                .to_string(),
        );
        let out = parse(&spec, &src, &ParseOptions::default()).unwrap();
        assert_eq!(out.status, FitStatus::Converged);
        assert_eq!(out.estimates.len(), 2);
        assert_eq!(out.estimates[1].name, "K");
        assert_eq!(out.estimates[1].estimate, 10000.0);
    }

    #[test]
    fn missing_par_depends_on_exit_code() {
        let failed = ReportSources {
            exit_code: Some(1),
            ..ReportSources::default()
        };
        let out = parse(&schaefer_spec(), &failed, &ParseOptions::default()).unwrap();
        assert_eq!(out.status, FitStatus::NumericalFailure);
        assert!(out.estimates.is_empty());

        let clean = ReportSources {
            exit_code: Some(0),
            ..ReportSources::default()
        };
        assert!(matches!(
            parse(&schaefer_spec(), &clean, &ParseOptions::default()),
            Err(FitError::ReportParse { .. })
        ));
    }

    #[test]
    fn classify_thresholds() {
        assert_eq!(classify(1.0, 1e-5, 1e-4), FitStatus::Converged);
        assert_eq!(classify(1.0, 1e-3, 1e-4), FitStatus::MaxIterations);
        assert_eq!(classify(f64::NAN, 0.0, 1e-4), FitStatus::NumericalFailure);
        assert_eq!(classify(1.0, f64::INFINITY, 1e-4), FitStatus::NumericalFailure);
    }

    proptest! {
        #[test]
        fn estimate_count_matches_sections(values in proptest::collection::vec(-1e6f64..1e6, 1..8)) {
            let mut text = format!(
                "# Number of parameters = {}  Objective function value = 1  Maximum gradient component = 1\n",
                values.len()
            );
            for (i, v) in values.iter().enumerate() {
                text.push_str(&format!("# p{i}:\n{v}\n"));
            }
            text.push_str("trailing\n");
            let src = ReportSources { par: Some(text), exit_code: Some(0), ..ReportSources::default() };
            let a = parse(&schaefer_spec(), &src, &ParseOptions::default()).unwrap();
            let b = parse(&schaefer_spec(), &src.clone(), &ParseOptions::default()).unwrap();
            prop_assert_eq!(a.estimates.len(), values.len());
            prop_assert_eq!(a, b);
        }
    }
}
