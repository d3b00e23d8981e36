//! Model spec JSON files.

use std::fs::File;
use std::path::Path;

use crate::domain::ModelSpec;
use crate::error::FitError;

pub fn read_spec_json(path: &Path) -> Result<ModelSpec, FitError> {
    let file = File::open(path).map_err(|e| FitError::io(path, e))?;
    serde_json::from_reader(file)
        .map_err(|e| FitError::data(path.display().to_string(), format!("invalid model spec JSON: {e}")))
}

pub fn write_spec_json(path: &Path, spec: &ModelSpec) -> Result<(), FitError> {
    let file = File::create(path).map_err(|e| FitError::io(path, e))?;
    serde_json::to_writer_pretty(file, spec)
        .map_err(|e| FitError::data(path.display().to_string(), format!("failed to write model spec JSON: {e}")))
}
