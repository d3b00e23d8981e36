//! `.par` files: objective header plus one labeled section per parameter.
//!
//! ```text
//! # Number of parameters = 2  Objective function value = -12.5  Maximum gradient component = 3.1e-05
//! # r:
//! 0.4123
//! # K:
//! 11850.2
//! ```

use crate::error::FitError;

#[derive(Debug, Clone, PartialEq)]
pub struct ParFile {
    pub n_params: usize,
    pub objective: f64,
    pub max_gradient: f64,
    /// `(name, values)` in file order.
    pub sections: Vec<(String, Vec<f64>)>,
}

pub fn parse_par(text: &str) -> Result<ParFile, FitError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();

    let header = lines
        .next()
        .ok_or_else(|| FitError::parse("par header", "file is empty"))?;
    let (n_params, objective, max_gradient) = parse_header(header)?;

    // The header count covers active parameters only; fixed ones still have a section.
    let mut sections = Vec::with_capacity(n_params);
    while let Some(line) = lines.next() {
        let Some(name) = section_label(line) else {
            break;
        };

        let has_values = lines.peek().is_some_and(|next| section_label(next).is_none());
        if !has_values {
            return Err(FitError::parse(name, "section has no value line"));
        }
        let values_line = lines.next().unwrap_or_default();
        let values = values_line
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| FitError::parse(name, format!("invalid value '{tok}'")))
            })
            .collect::<Result<Vec<f64>, _>>()?;
        sections.push((name.to_string(), values));
    }
    if sections.len() < n_params {
        return Err(FitError::parse(
            "parameters",
            format!("expected {n_params} parameter sections, found {}", sections.len()),
        ));
    }

    Ok(ParFile {
        n_params,
        objective,
        max_gradient,
        sections,
    })
}

/// `# name:` → `name`.
fn section_label(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('#')?.trim();
    let name = inner.strip_suffix(':')?.trim();
    (!name.is_empty() && !name.contains(char::is_whitespace)).then_some(name)
}

/// Read `label = value` pairs from the header, matching labels by keyword.
fn parse_header(line: &str) -> Result<(usize, f64, f64), FitError> {
    let body = line
        .strip_prefix('#')
        .ok_or_else(|| FitError::parse("par header", "first line is not a comment header"))?;

    let mut n_params = None;
    let mut objective = None;
    let mut gradient = None;

    let mut label: Vec<&str> = Vec::new();
    let mut tokens = body.split_whitespace();
    while let Some(tok) = tokens.next() {
        if tok != "=" {
            label.push(tok);
            continue;
        }
        let key = label.join(" ").to_ascii_lowercase();
        label.clear();
        let Some(raw) = tokens.next() else { break };

        if key.contains("parameters") {
            n_params = raw.parse::<usize>().ok();
        } else if key.contains("objective") {
            objective = Some(raw.parse::<f64>().unwrap_or(f64::NAN));
        } else if key.contains("gradient") {
            gradient = Some(raw.parse::<f64>().unwrap_or(f64::NAN));
        }
    }

    match (n_params, objective, gradient) {
        (Some(n), Some(obj), Some(g)) => Ok((n, obj, g)),
        _ => Err(FitError::parse(
            "par header",
            "missing parameter count, objective value or maximum gradient",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAR: &str = "# Number of parameters = 2  Objective function value = -12.5  Maximum gradient component = 3.1e-05\n# r:\n0.4123\n# K:\n11850.2\n";

    fn section(err: FitError) -> String {
        match err {
            FitError::ReportParse { section, .. } => section,
            other => panic!("expected ReportParse, got {other:?}"),
        }
    }

    #[test]
    fn parses_header_and_sections() {
        let par = parse_par(PAR).unwrap();
        assert_eq!(par.n_params, 2);
        assert_eq!(par.objective, -12.5);
        assert_eq!(par.max_gradient, 3.1e-5);
        assert_eq!(par.sections[0], ("r".to_string(), vec![0.4123]));
        assert_eq!(par.sections[1], ("K".to_string(), vec![11850.2]));
    }

    #[test]
    fn header_labels_in_any_order() {
        let text = "# Maximum gradient component = 1e-6 Number of parameters = 1 Objective function value = 4\n# a:\n1\n";
        let par = parse_par(text).unwrap();
        assert_eq!(par.n_params, 1);
        assert_eq!(par.objective, 4.0);
    }

    #[test]
    fn trailing_text_ends_the_sections() {
        let text = format!("{PAR}some trailing junk\n# after:\n1\n");
        assert_eq!(parse_par(&text).unwrap().sections.len(), 2);
    }

    #[test]
    fn sections_beyond_the_active_count_are_kept() {
        let text = "# Number of parameters = 1  Objective function value = 2  Maximum gradient component = 1e-06\n# a:\n1\n# b:\n2\n";
        let par = parse_par(text).unwrap();
        assert_eq!(par.n_params, 1);
        assert_eq!(par.sections.len(), 2);
        assert_eq!(par.sections[1], ("b".to_string(), vec![2.0]));
    }

    #[test]
    fn truncated_section_names_parameter() {
        let text = "# Number of parameters = 2  Objective function value = 1  Maximum gradient component = 0\n# r:\n0.4\n# K:\n";
        assert_eq!(section(parse_par(text).unwrap_err()), "K");
    }

    #[test]
    fn missing_sections_reported() {
        let text = "# Number of parameters = 3  Objective function value = 1  Maximum gradient component = 0\n# r:\n0.4\n";
        assert_eq!(section(parse_par(text).unwrap_err()), "parameters");
    }

    #[test]
    fn missing_header_reported() {
        assert_eq!(section(parse_par("# r:\n0.4\n").unwrap_err()), "par header");
        assert_eq!(section(parse_par("").unwrap_err()), "par header");
    }

    #[test]
    fn nan_objective_survives_parsing() {
        let text = "# Number of parameters = 1  Objective function value = nan  Maximum gradient component = nan\n# r:\n0.4\n";
        let par = parse_par(text).unwrap();
        assert!(par.objective.is_nan());
    }
}
