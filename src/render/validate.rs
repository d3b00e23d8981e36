//! Spec validation.
//!
//! Everything the renderer needs to reject happens here, before any text is
//! produced. A successful validation yields the [`DataLayout`]: which engine
//! vector each bound column becomes.

use std::collections::HashSet;

use crate::domain::{DataRole, Dataset, ModelKind, ModelSpec, ParameterDef, Prior};
use crate::error::FitError;

/// Names the generated template declares itself.
const ENGINE_NAMES: &[&str] = &[
    "f", "nobs", "biomass", "pred_index", "q", "sigma", "MSY", "Bmsy", "report", "t",
];

/// C++ keywords and common math functions the template code may call.
const RESERVED: &[&str] = &[
    "auto", "bool", "break", "case", "catch", "char", "class", "const", "continue", "default",
    "delete", "do", "double", "else", "enum", "exp", "extern", "float", "for", "goto", "if",
    "int", "log", "long", "new", "norm2", "operator", "pow", "private", "public", "return",
    "short", "signed", "sizeof", "sqrt", "square", "static", "struct", "sum", "switch",
    "template", "this", "throw", "try", "typedef", "union", "unsigned", "void", "volatile",
    "while",
];

/// One bound column as an engine data vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataVector {
    /// Identifier used in the template (e.g. `obs_catch`).
    pub ident: String,
    /// Source column in the dataset.
    pub column: String,
    pub role: DataRole,
}

/// Validated binding layout, in binding order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    pub vectors: Vec<DataVector>,
}

impl DataLayout {
    pub fn ident_for(&self, role: DataRole) -> Option<&str> {
        self.vectors
            .iter()
            .find(|v| v.role == role)
            .map(|v| v.ident.as_str())
    }
}

/// Whether `s` is usable as an engine identifier.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check `spec` against `data` and resolve the data layout.
pub fn validate(spec: &ModelSpec, data: &Dataset) -> Result<DataLayout, FitError> {
    if !is_identifier(&spec.name) {
        return Err(FitError::spec(
            "name",
            format!("model name `{}` is not a valid identifier", spec.name),
        ));
    }
    if spec.parameters.is_empty() {
        return Err(FitError::spec("parameters", "at least one parameter is required"));
    }
    if data.n_rows() == 0 {
        return Err(FitError::spec("dataset", "dataset has no rows"));
    }
    if let Some((i, row)) = data.rows.iter().enumerate().find(|(_, r)| r.len() != data.columns.len()) {
        return Err(FitError::spec(
            "dataset",
            format!("row {} has {} values for {} columns", i + 1, row.len(), data.columns.len()),
        ));
    }

    let layout = resolve_layout(spec, data)?;

    let data_idents: HashSet<&str> = layout.vectors.iter().map(|v| v.ident.as_str()).collect();
    let mut seen = HashSet::new();
    for p in &spec.parameters {
        validate_parameter(p)?;
        if !seen.insert(p.name.as_str()) {
            return Err(FitError::spec(&p.name, "duplicate parameter name"));
        }
        if data_idents.contains(p.name.as_str()) {
            return Err(FitError::spec(&p.name, "parameter name collides with a data vector"));
        }
    }

    validate_kind(spec, data, &layout)?;

    Ok(layout)
}

fn validate_parameter(p: &ParameterDef) -> Result<(), FitError> {
    if !is_identifier(&p.name) {
        return Err(FitError::spec(&p.name, "parameter name is not a valid identifier"));
    }
    if RESERVED.contains(&p.name.as_str()) || ENGINE_NAMES.contains(&p.name.as_str()) {
        return Err(FitError::spec(&p.name, "parameter name is reserved by the engine"));
    }
    if !(p.lower.is_finite() && p.upper.is_finite()) || p.lower >= p.upper {
        return Err(FitError::spec(
            &p.name,
            format!("invalid bounds [{}, {}]", p.lower, p.upper),
        ));
    }
    if !p.initial.is_finite() || p.initial < p.lower || p.initial > p.upper {
        return Err(FitError::spec(
            &p.name,
            format!(
                "initial value {} lies outside bounds [{}, {}]",
                p.initial, p.lower, p.upper
            ),
        ));
    }
    match p.prior {
        Prior::Uniform => {}
        Prior::Normal { mean, sd } => {
            if !(mean.is_finite() && sd.is_finite() && sd > 0.0) {
                return Err(FitError::spec(&p.name, "normal prior needs a finite mean and sd > 0"));
            }
        }
        Prior::LogNormal { log_mean, log_sd } => {
            if !(log_mean.is_finite() && log_sd.is_finite() && log_sd > 0.0) {
                return Err(FitError::spec(
                    &p.name,
                    "log-normal prior needs a finite log_mean and log_sd > 0",
                ));
            }
            if p.lower <= 0.0 {
                return Err(FitError::spec(
                    &p.name,
                    "log-normal prior requires a strictly positive lower bound",
                ));
            }
        }
    }
    Ok(())
}

fn resolve_layout(spec: &ModelSpec, data: &Dataset) -> Result<DataLayout, FitError> {
    let mut vectors: Vec<DataVector> = Vec::with_capacity(spec.bindings.len());

    for b in &spec.bindings {
        if !data.has_column(&b.column) {
            return Err(FitError::spec(
                &b.column,
                format!("{} binding references a column absent from the data", b.role.label()),
            ));
        }
        if vectors.iter().any(|v| v.column == b.column) {
            return Err(FitError::spec(&b.column, "column is bound more than once"));
        }

        let ident = match b.role {
            DataRole::Time => "obs_time".to_string(),
            DataRole::Catch => "obs_catch".to_string(),
            DataRole::SurveyIndex => "obs_index".to_string(),
            DataRole::Effort => "obs_effort".to_string(),
            DataRole::Covariate => {
                if !is_identifier(&b.column) {
                    return Err(FitError::spec(
                        &b.column,
                        "covariate column names must be valid identifiers",
                    ));
                }
                format!("cov_{}", b.column)
            }
        };
        if vectors.iter().any(|v| v.ident == ident) {
            return Err(FitError::spec(
                &b.column,
                format!("more than one column bound to the {} role", b.role.label()),
            ));
        }

        vectors.push(DataVector {
            ident,
            column: b.column.clone(),
            role: b.role,
        });
    }

    for v in &vectors {
        let values = data.column(&v.column).unwrap_or_default();
        if let Some(bad) = values.iter().position(|x| !x.is_finite()) {
            return Err(FitError::spec(
                &v.column,
                format!("non-finite value in row {}", bad + 1),
            ));
        }
    }

    Ok(DataLayout { vectors })
}

fn validate_kind(spec: &ModelSpec, data: &Dataset, layout: &DataLayout) -> Result<(), FitError> {
    match &spec.kind {
        ModelKind::SurplusProduction => {
            for role in [DataRole::Time, DataRole::Catch, DataRole::SurveyIndex] {
                if layout.ident_for(role).is_none() {
                    return Err(FitError::spec(
                        "bindings",
                        format!("surplus production needs a {} binding", role.label()),
                    ));
                }
            }
            for name in ["r", "K"] {
                if spec.parameter(name).is_none() {
                    return Err(FitError::spec(
                        name,
                        "surplus production needs parameters `r` and `K`",
                    ));
                }
            }
            if let Some(col) = spec.column_for(DataRole::SurveyIndex) {
                let index = data.column(col).unwrap_or_default();
                if index.iter().any(|&v| v <= 0.0) {
                    return Err(FitError::spec(col, "survey index values must be > 0"));
                }
            }
        }
        ModelKind::Custom { procedure, .. } => {
            if procedure.iter().all(|l| l.trim().is_empty()) {
                return Err(FitError::spec("procedure", "custom procedure is empty"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataBinding, ParameterDef};
    use crate::render::fixtures::{catch_survey, schaefer_spec};

    fn subject(err: FitError) -> String {
        match err {
            FitError::SpecValidation { subject, .. } => subject,
            other => panic!("expected SpecValidation, got {other:?}"),
        }
    }

    #[test]
    fn accepts_valid_spec() {
        let layout = validate(&schaefer_spec(), &catch_survey(20)).unwrap();
        let idents: Vec<_> = layout.vectors.iter().map(|v| v.ident.as_str()).collect();
        assert_eq!(idents, vec!["obs_time", "obs_catch", "obs_index"]);
    }

    #[test]
    fn initial_outside_bounds_names_parameter() {
        let mut spec = schaefer_spec();
        spec.parameters[1] = ParameterDef::bounded("K", 25_000.0, 5_000.0, 20_000.0);
        assert_eq!(subject(validate(&spec, &catch_survey(20)).unwrap_err()), "K");
    }

    #[test]
    fn initial_on_bound_is_allowed() {
        let mut spec = schaefer_spec();
        spec.parameters[0] = ParameterDef::bounded("r", 0.8, 0.2, 0.8);
        assert!(validate(&spec, &catch_survey(20)).is_ok());
    }

    #[test]
    fn duplicate_parameter_rejected() {
        let mut spec = schaefer_spec();
        spec.parameters.push(ParameterDef::bounded("r", 0.3, 0.1, 0.9));
        assert_eq!(subject(validate(&spec, &catch_survey(20)).unwrap_err()), "r");
    }

    #[test]
    fn missing_column_rejected() {
        let mut spec = schaefer_spec();
        spec.bindings.push(DataBinding::new("effort", DataRole::Effort));
        assert_eq!(subject(validate(&spec, &catch_survey(20)).unwrap_err()), "effort");
    }

    #[test]
    fn reserved_and_invalid_names_rejected() {
        for bad in ["catch", "f", "2r", "r-1"] {
            let mut spec = schaefer_spec();
            spec.parameters.push(ParameterDef::bounded(bad, 1.0, 0.0, 2.0));
            assert_eq!(subject(validate(&spec, &catch_survey(5)).unwrap_err()), bad);
        }
    }

    #[test]
    fn prior_scale_must_be_positive() {
        let mut spec = schaefer_spec();
        spec.parameters[0] = ParameterDef::bounded("r", 0.5, 0.2, 0.8)
            .with_prior(Prior::Normal { mean: 0.5, sd: 0.0 });
        assert_eq!(subject(validate(&spec, &catch_survey(5)).unwrap_err()), "r");
    }

    #[test]
    fn surplus_production_requires_roles() {
        let mut spec = schaefer_spec();
        spec.bindings.retain(|b| b.role != DataRole::Catch);
        assert_eq!(subject(validate(&spec, &catch_survey(5)).unwrap_err()), "bindings");
    }

    #[test]
    fn non_positive_index_rejected() {
        let mut data = catch_survey(5);
        data.rows[2][2] = 0.0;
        assert_eq!(subject(validate(&schaefer_spec(), &data).unwrap_err()), "cpue");
    }

    #[test]
    fn empty_dataset_rejected() {
        let data = Dataset {
            columns: vec!["year".into(), "catch".into(), "cpue".into()],
            rows: vec![],
        };
        assert_eq!(subject(validate(&schaefer_spec(), &data).unwrap_err()), "dataset");
    }

    #[test]
    fn ragged_dataset_rejected() {
        let mut data = catch_survey(5);
        data.rows[3].pop();
        let err = validate(&schaefer_spec(), &data).unwrap_err();
        assert_eq!(subject(err), "dataset");
        assert!(crate::render::render(&schaefer_spec(), &data).is_err());
    }
}
