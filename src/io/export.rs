//! Export fit results.
//!
//! - estimate table as CSV (spreadsheets, downstream scripts)
//! - full result as JSON (reloadable with [`read_result_json`])

use std::fs::File;
use std::path::Path;

use crate::domain::FitResult;
use crate::error::FitError;
use crate::report::FittedModel;

/// Write parameter and derived estimates to CSV. Missing standard errors are `NA`.
pub fn write_estimates_csv(path: &Path, fit: &FittedModel) -> Result<(), FitError> {
    let label = path.display().to_string();
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| FitError::data(&label, format!("failed to create export CSV: {e}")))?;
    let to_err = |e: csv::Error| FitError::data(&label, format!("failed to write export CSV: {e}"));

    writer
        .write_record(["model", "kind", "name", "estimate", "std_error", "at_bound"])
        .map_err(to_err)?;

    let model = &fit.result().model;
    let groups = [("parameter", fit.table()), ("derived", fit.derived_table())];
    for (kind, rows) in &groups {
        for r in rows {
            writer
                .write_record([
                    model.clone(),
                    kind.to_string(),
                    r.parameter.clone(),
                    format!("{:.10}", r.estimate),
                    r.std_error.map(|v| format!("{v:.10}")).unwrap_or_else(|| "NA".to_string()),
                    r.at_bound.to_string(),
                ])
                .map_err(to_err)?;
        }
    }

    writer.flush().map_err(|e| FitError::io(path, e))?;
    Ok(())
}

pub fn write_result_json(path: &Path, result: &FitResult) -> Result<(), FitError> {
    let file = File::create(path).map_err(|e| FitError::io(path, e))?;
    serde_json::to_writer_pretty(file, result)
        .map_err(|e| FitError::data(path.display().to_string(), format!("failed to write result JSON: {e}")))
}

pub fn read_result_json(path: &Path) -> Result<FitResult, FitError> {
    let file = File::open(path).map_err(|e| FitError::io(path, e))?;
    serde_json::from_reader(file)
        .map_err(|e| FitError::data(path.display().to_string(), format!("invalid result JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::converged_result;

    #[test]
    fn csv_has_one_row_per_estimate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("est.csv");
        write_estimates_csv(&path, &FittedModel::new(converged_result())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("schaefer,parameter,K,"));
        assert!(lines[2].contains(",NA,"));
        assert!(lines[3].starts_with("schaefer,derived,MSY,"));
    }

    #[test]
    fn json_reload_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        let result = converged_result();
        write_result_json(&path, &result).unwrap();
        assert_eq!(read_result_json(&path).unwrap(), result);
    }
}
