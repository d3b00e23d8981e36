//! Template renderer: `ModelSpec` + `Dataset` → engine input files.
//!
//! Rendering is a pure function. The same spec and data always produce
//! byte-identical text, so rendered inputs can be diffed or content-hashed.
//! Writing the files is the driver's job.
//!
//! Three files are produced:
//! - `<name>.tpl`: the model template (data, parameter, procedure and report sections)
//! - `<name>.dat`: bound data columns
//! - `<name>.pin`: initial parameter values

use crate::domain::{Dataset, ModelSpec};
use crate::error::FitError;

mod template;
pub mod validate;

pub use validate::validate;

/// Engine input text for one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedModel {
    /// File stem shared by all inputs and outputs of the run.
    pub name: String,
    pub tpl: String,
    pub dat: String,
    pub pin: String,
}

impl RenderedModel {
    pub fn tpl_file(&self) -> String {
        format!("{}.tpl", self.name)
    }

    pub fn dat_file(&self) -> String {
        format!("{}.dat", self.name)
    }

    pub fn pin_file(&self) -> String {
        format!("{}.pin", self.name)
    }
}

/// Validate `spec` against `data` and render the engine inputs.
pub fn render(spec: &ModelSpec, data: &Dataset) -> Result<RenderedModel, FitError> {
    let layout = validate(spec, data)?;

    Ok(RenderedModel {
        name: spec.name.clone(),
        tpl: template::render_tpl(spec, &layout),
        dat: template::render_dat(data, &layout),
        pin: template::render_pin(spec),
    })
}

/// Recover the declared parameter names from a rendered template, in order.
///
/// Only `init_*` declarations inside the parameter section count; locals and
/// reported quantities are skipped.
pub fn parameter_names(tpl: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut in_params = false;

    for line in tpl.lines() {
        if !line.starts_with(char::is_whitespace) && !line.trim().is_empty() {
            in_params = line.trim() == "PARAMETER_SECTION";
            continue;
        }
        if !in_params {
            continue;
        }
        let decl = line.trim();
        let Some((kind, rest)) = decl.split_once(char::is_whitespace) else {
            continue;
        };
        if !kind.starts_with("init_") {
            continue;
        }
        let name: String = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if !name.is_empty() {
            names.push(name);
        }
    }

    names
}

/// Format a float for engine input.
///
/// Uses the shortest representation that round-trips, which keeps output
/// deterministic and lossless.
pub(crate) fn fmt_num(v: f64) -> String {
    format!("{v}")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::domain::{DataBinding, DataRole, Dataset, ModelKind, ModelSpec, ParameterDef};

    /// Two-parameter Schaefer spec bound to `year`, `catch`, `cpue`.
    pub fn schaefer_spec() -> ModelSpec {
        ModelSpec {
            name: "schaefer".to_string(),
            kind: ModelKind::SurplusProduction,
            parameters: vec![
                ParameterDef::bounded("r", 0.5, 0.2, 0.8),
                ParameterDef::bounded("K", 10_000.0, 5_000.0, 20_000.0),
            ],
            bindings: vec![
                DataBinding::new("year", DataRole::Time),
                DataBinding::new("catch", DataRole::Catch),
                DataBinding::new("cpue", DataRole::SurveyIndex),
            ],
        }
    }

    pub fn catch_survey(n: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| {
                let t = i as f64;
                vec![1990.0 + t, 400.0 + 10.0 * t, 2.0 - 0.0625 * t]
            })
            .collect();
        Dataset {
            columns: vec!["year".to_string(), "catch".to_string(), "cpue".to_string()],
            rows,
        }
    }
}
