//! `.rep` files written by the template's report section.
//!
//! Sections start with `# <label>`. A section holding one number is a
//! reference value; a section of `<time> <value>` rows (or bare values,
//! indexed from 1) is a trajectory.

use std::collections::BTreeMap;

use crate::domain::Trajectory;
use crate::error::FitError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepFile {
    pub scalars: BTreeMap<String, f64>,
    pub trajectories: Vec<Trajectory>,
}

pub fn parse_rep(text: &str) -> Result<RepFile, FitError> {
    let mut out = RepFile::default();

    let mut current: Option<(String, Vec<Vec<f64>>, bool)> = None;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(label) = line.strip_prefix('#') {
            if let Some((name, rows, _)) = current.take() {
                finish_section(&mut out, name, rows)?;
            }
            current = Some((label.trim().to_string(), Vec::new(), false));
            continue;
        }

        // Text before the first section is ignored.
        let Some((_, rows, closed)) = current.as_mut() else {
            continue;
        };
        if *closed {
            continue;
        }
        match line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<f64>, _>>()
        {
            Ok(values) => rows.push(values),
            // Anything non-numeric ends the section's data.
            Err(_) => *closed = true,
        }
    }
    if let Some((name, rows, _)) = current.take() {
        finish_section(&mut out, name, rows)?;
    }

    Ok(out)
}

fn finish_section(out: &mut RepFile, name: String, rows: Vec<Vec<f64>>) -> Result<(), FitError> {
    if rows.is_empty() {
        return Err(FitError::parse(name, "section has no rows"));
    }
    if out.scalars.contains_key(&name) || out.trajectories.iter().any(|t| t.name == name) {
        return Ok(());
    }

    let width = rows[0].len();
    if rows.iter().any(|r| r.len() != width) {
        return Err(FitError::parse(name, "rows have inconsistent widths"));
    }

    match (rows.len(), width) {
        (1, 1) => {
            out.scalars.insert(name, rows[0][0]);
        }
        (_, 1) => {
            let points = rows.iter().enumerate().map(|(i, r)| (i as i64 + 1, r[0])).collect();
            out.trajectories.push(Trajectory { name, points });
        }
        (_, 2) => {
            let mut points = Vec::with_capacity(rows.len());
            for r in &rows {
                let t = r[0];
                if !(t.is_finite() && t.fract() == 0.0) {
                    return Err(FitError::parse(name, format!("time index {t} is not an integer")));
                }
                points.push((t as i64, r[1]));
            }
            out.trajectories.push(Trajectory { name, points });
        }
        // Matrices are not part of the result model.
        _ => {}
    }
    Ok(())
}
