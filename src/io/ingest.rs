//! CSV ingest for model data.
//!
//! The input is a plain numeric table: one header row, one row per time step.
//! Ingest is strict. Any empty or non-numeric cell fails the whole load with
//! its line number, because dropping rows would silently change the fit.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::Dataset;
use crate::error::FitError;

/// Load a dataset from a CSV file.
pub fn load_dataset(path: &Path) -> Result<Dataset, FitError> {
    let file = File::open(path).map_err(|e| FitError::io(path, e))?;
    read_dataset(file, &path.display().to_string())
}

/// Read a dataset from any CSV source. `source_name` labels errors.
pub fn read_dataset<R: Read>(reader: R, source_name: &str) -> Result<Dataset, FitError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| FitError::data(source_name, format!("failed to read CSV headers: {e}")))?
        .clone();
    let columns = normalize_headers(&headers);

    if columns.is_empty() || columns.iter().any(String::is_empty) {
        return Err(FitError::data(source_name, "header row has empty column names"));
    }
    for (i, c) in columns.iter().enumerate() {
        if columns[..i].contains(c) {
            return Err(FitError::data(source_name, format!("duplicate column `{c}`")));
        }
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // +2: records start after the header and lines are 1-based.
        let line = idx + 2;
        let record =
            record.map_err(|e| FitError::data(source_name, format!("line {line}: CSV parse error: {e}")))?;
        if record.len() != columns.len() {
            return Err(FitError::data(
                source_name,
                format!("line {line}: expected {} fields, found {}", columns.len(), record.len()),
            ));
        }
        let row = record
            .iter()
            .zip(&columns)
            .map(|(cell, col)| parse_cell(cell, col, line, source_name))
            .collect::<Result<Vec<f64>, _>>()?;
        rows.push(row);
    }

    Ok(Dataset { columns, rows })
}

/// Write a dataset as CSV.
pub fn write_dataset(path: &Path, data: &Dataset) -> Result<(), FitError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| FitError::data(path.display().to_string(), format!("failed to create CSV: {e}")))?;
    let to_err = |e: csv::Error| FitError::data(path.display().to_string(), format!("failed to write CSV: {e}"));

    writer.write_record(&data.columns).map_err(to_err)?;
    for row in &data.rows {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(to_err)?;
    }
    writer.flush().map_err(|e| FitError::io(path, e))?;
    Ok(())
}

fn normalize_headers(headers: &StringRecord) -> Vec<String> {
    // Strip a leading BOM from the first header.
    headers
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect()
}

fn parse_cell(cell: &str, column: &str, line: usize, source_name: &str) -> Result<f64, FitError> {
    if cell.is_empty() {
        return Err(FitError::data(
            source_name,
            format!("line {line}: missing value in column `{column}`"),
        ));
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(FitError::data(
            source_name,
            format!("line {line}: invalid number '{cell}' in column `{column}`"),
        )),
    }
}
