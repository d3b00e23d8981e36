//! `.std` files: estimates with standard errors for parameters and
//! reported quantities.
//!
//! ```text
//!  index   name   value      std.dev
//!      1   r     4.1230e-01 3.2101e-02
//!      2   K     1.1850e+04 1.1002e+03
//!      3   MSY   1.2214e+03 8.7e+01
//! ```

use std::collections::HashMap;

use crate::error::FitError;

#[derive(Debug, Clone, PartialEq)]
pub struct StdRow {
    pub name: String,
    pub value: f64,
    pub std_dev: Option<f64>,
}

/// Column positions located from the header labels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Columns {
    pub index: Option<usize>,
    pub name: usize,
    pub value: usize,
    pub std_dev: Option<usize>,
}

impl Columns {
    pub(crate) fn from_header(line: &str) -> Option<Self> {
        let labels: Vec<String> = line.split_whitespace().map(|t| t.to_ascii_lowercase()).collect();
        let find = |names: &[&str]| labels.iter().position(|l| names.contains(&l.as_str()));
        Some(Self {
            index: find(&["index"]),
            name: find(&["name"])?,
            value: find(&["value", "estimate"])?,
            std_dev: find(&["std.dev", "std_dev", "stddev", "std", "se"]),
        })
    }
}

/// Parse a `.std` table. Repeated names (vector quantities) are suffixed
/// `name[1]`, `name[2]`, ...
pub fn parse_std(text: &str) -> Result<Vec<StdRow>, FitError> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| FitError::parse("std header", "file is empty"))?;
    let cols = Columns::from_header(header)
        .ok_or_else(|| FitError::parse("std header", "missing `name` or `value` column"))?;

    let mut rows = Vec::new();
    for line in lines {
        let toks: Vec<&str> = line.split_whitespace().collect();
        if let Some(i) = cols.index {
            if toks.get(i).and_then(|t| t.parse::<usize>().ok()).is_none() {
                break;
            }
        }
        let (Some(name), Some(raw_value)) = (toks.get(cols.name), toks.get(cols.value)) else {
            break;
        };
        let value = raw_value
            .parse::<f64>()
            .map_err(|_| FitError::parse(*name, format!("invalid value '{raw_value}' in std table")))?;
        let std_dev = cols
            .std_dev
            .and_then(|i| toks.get(i))
            .and_then(|t| t.parse::<f64>().ok());
        rows.push(StdRow {
            name: name.to_string(),
            value,
            std_dev,
        });
    }

    number_repeats(&mut rows);
    Ok(rows)
}

fn number_repeats(rows: &mut [StdRow]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for r in rows.iter() {
        *counts.entry(r.name.clone()).or_default() += 1;
    }
    let mut seen: HashMap<String, usize> = HashMap::new();
    for r in rows.iter_mut() {
        if counts.get(&r.name).copied().unwrap_or(0) > 1 {
            let k = seen.entry(r.name.clone()).or_default();
            *k += 1;
            r.name = format!("{}[{}]", r.name, k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_with_std_dev() {
        let text = " index   name   value      std.dev\n     1   r     4.1230e-01 3.2101e-02\n     2   K     1.1850e+04 1.1002e+03\n";
        let rows = parse_std(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "K");
        assert_eq!(rows[1].std_dev, Some(1.1002e3));
    }

    #[test]
    fn missing_std_dev_column_gives_none() {
        let text = "index name value\n1 r 0.41\n2 K 11850\n";
        let rows = parse_std(text).unwrap();
        assert!(rows.iter().all(|r| r.std_dev.is_none()));
    }

    #[test]
    fn columns_found_by_label_not_position() {
        let text = "name std.dev value index\nr 0.03 0.41 1\n";
        let rows = parse_std(text).unwrap();
        assert_eq!(rows[0].value, 0.41);
        assert_eq!(rows[0].std_dev, Some(0.03));
    }

    #[test]
    fn vector_quantities_are_numbered() {
        let text = "index name value std.dev\n1 r 0.4 0.1\n2 B 10 1\n3 B 11 1\n";
        let names: Vec<_> = parse_std(text).unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["r", "B[1]", "B[2]"]);
    }

    #[test]
    fn trailing_text_stops_the_table() {
        let text = "index name value std.dev\n1 r 0.4 0.1\n\nnote: hessian ok\n";
        assert_eq!(parse_std(text).unwrap().len(), 1);
    }
}
