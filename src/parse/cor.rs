//! `.cor` files: log-determinant of the Hessian and the lower-triangular
//! correlation matrix of the estimated quantities.
//!
//! ```text
//!  The logarithm of the determinant of the hessian = 8.4122
//!  index   name   value      std.dev       1       2
//!      1   r     4.1230e-01 3.2101e-02  1.0000
//!      2   K     1.1850e+04 1.1002e+03 -0.9120  1.0000
//! ```

use nalgebra::DMatrix;

use super::std_file::{Columns, StdRow};
use crate::domain::Correlation;
use crate::error::FitError;

#[derive(Debug, Clone, PartialEq)]
pub struct CorFile {
    pub log_det_hessian: Option<f64>,
    /// Estimates and standard deviations repeated from the table.
    pub rows: Vec<StdRow>,
    pub correlation: Correlation,
}

pub fn parse_cor(text: &str) -> Result<CorFile, FitError> {
    let mut log_det_hessian = None;
    let mut columns = None;
    let mut rows = Vec::new();
    let mut lower: Vec<Vec<f64>> = Vec::new();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let Some(cols) = columns else {
            let lowered = line.to_ascii_lowercase();
            if lowered.contains("hessian") {
                log_det_hessian = line
                    .rsplit_once('=')
                    .and_then(|(_, v)| v.trim().parse::<f64>().ok());
            } else if let Some(c) = Columns::from_header(line) {
                columns = Some(c);
            }
            continue;
        };

        let toks: Vec<&str> = line.split_whitespace().collect();
        let first_corr = cols.std_dev.unwrap_or(cols.value) + 1;
        let idx = cols
            .index
            .and_then(|i| toks.get(i))
            .and_then(|t| t.parse::<usize>().ok());
        let Some(idx) = idx else { break };
        if idx != rows.len() + 1 {
            return Err(FitError::parse("cor", format!("row index {idx} out of sequence")));
        }

        let name = toks.get(cols.name).copied().unwrap_or_default();
        let value = toks
            .get(cols.value)
            .and_then(|t| t.parse::<f64>().ok())
            .ok_or_else(|| FitError::parse("cor", format!("row {idx} has no value")))?;
        let std_dev = cols.std_dev.and_then(|i| toks.get(i)).and_then(|t| t.parse::<f64>().ok());

        let corr = toks
            .iter()
            .skip(first_corr)
            .take(idx)
            .map(|t| t.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|_| FitError::parse("cor", format!("row {idx} has a non-numeric correlation")))?;
        if corr.len() != idx {
            return Err(FitError::parse(
                "cor",
                format!("row {idx} has {} correlations, expected {idx}", corr.len()),
            ));
        }

        rows.push(StdRow {
            name: name.to_string(),
            value,
            std_dev,
        });
        lower.push(corr);
    }

    if columns.is_none() {
        return Err(FitError::parse("cor header", "no `index name value std.dev` header"));
    }

    let n = lower.len();
    let matrix = DMatrix::from_fn(n, n, |i, j| {
        let (hi, lo) = if i >= j { (i, j) } else { (j, i) };
        lower[hi][lo]
    });

    Ok(CorFile {
        log_det_hessian,
        correlation: Correlation {
            names: rows.iter().map(|r| r.name.clone()).collect(),
            matrix,
        },
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const COR: &str = " The logarithm of the determinant of the hessian = 8.4122\n index   name   value      std.dev       1       2\n     1   r     4.1230e-01 3.2101e-02  1.0000\n     2   K     1.1850e+04 1.1002e+03 -0.9120  1.0000\n";

    #[test]
    fn parses_symmetric_matrix() {
        let cor = parse_cor(COR).unwrap();
        assert_relative_eq!(cor.log_det_hessian.unwrap(), 8.4122);
        assert_eq!(cor.correlation.names, vec!["r", "K"]);
        let m = &cor.correlation.matrix;
        assert_eq!(m.shape(), (2, 2));
        assert_relative_eq!(m[(0, 1)], -0.912);
        assert_relative_eq!(m[(1, 0)], -0.912);
        assert_relative_eq!(m[(1, 1)], 1.0);
        assert_eq!(cor.rows[0].std_dev, Some(3.2101e-2));
    }

    #[test]
    fn short_row_is_an_error() {
        let text = "index name value std.dev 1 2\n1 r 0.4 0.03 1.0\n2 K 1e4 1e3 -0.9\n";
        assert!(matches!(parse_cor(text), Err(FitError::ReportParse { .. })));
    }

    #[test]
    fn out_of_sequence_index_is_an_error() {
        for text in [
            "index name value std.dev 1\n0 r 0.4 0.03\n",
            "index name value std.dev 1 2\n1 r 0.4 0.03 1.0\n1 K 1e4 1e3 1.0\n",
            "index name value std.dev 1 2\n2 K 1e4 1e3 -0.9 1.0\n",
        ] {
            match parse_cor(text) {
                Err(FitError::ReportParse { section, reason }) => {
                    assert_eq!(section, "cor");
                    assert!(reason.contains("out of sequence"), "{reason}");
                }
                other => panic!("expected ReportParse, got {other:?}"),
            }
        }
    }

    #[test]
    fn missing_header_is_an_error() {
        assert!(matches!(
            parse_cor("hessian = 1.0\n"),
            Err(FitError::ReportParse { .. })
        ));
    }
}
