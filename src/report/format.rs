//! Formatted terminal output.
//!
//! We keep formatting code in one place so the parser and façade stay free of
//! presentation details.

use super::{EstimateRow, FittedModel};
use crate::app::pipeline::BatchOutcome;

/// Status, objective, gradient, reference values and notes.
pub fn format_summary(fit: &FittedModel) -> String {
    let summary = fit.summary();
    let result = fit.result();
    let mut out = String::new();

    out.push_str(&format!("=== admb-bridge: {} ===\n", summary.model));
    out.push_str(&format!("Status: {}\n", summary.status.display_name()));
    out.push_str(&format!("Objective: {}\n", fmt_opt(summary.objective)));
    out.push_str(&format!("Max gradient: {}\n", fmt_opt(summary.max_gradient)));
    if let Some(code) = result.exit_code {
        out.push_str(&format!("Exit code: {code}\n"));
    }
    if let Some(ld) = result.log_det_hessian {
        out.push_str(&format!("log|H|: {ld:.4}\n"));
    }

    if !summary.reference_values.is_empty() {
        out.push_str("\nReference values:\n");
        for (name, value) in &summary.reference_values {
            out.push_str(&format!("- {name:<16} {}\n", fmt_num(*value)));
        }
    }

    let names: Vec<&str> = fit.trajectory_names().collect();
    if !names.is_empty() {
        out.push_str(&format!("\nTrajectories: {}\n", names.join(", ")));
    }

    if !result.diagnostics.trim().is_empty() {
        out.push_str("\nDiagnostics:\n");
        for line in result.diagnostics.lines() {
            out.push_str(&format!("  {line}\n"));
        }
    }

    out
}

/// Parameter table (and derived quantities, if any).
pub fn format_table(fit: &FittedModel) -> String {
    let mut out = String::new();
    out.push_str("Parameters:\n");
    out.push_str(&table(&fit.table()));
    let derived = fit.derived_table();
    if !derived.is_empty() {
        out.push_str("\nDerived quantities:\n");
        out.push_str(&table(&derived));
    }
    out
}

fn table(rows: &[EstimateRow]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<16} {:>14} {:>14} {:<6}", "name", "estimate", "std_error", "bound").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<14} {:-<14} {:-<6}", "", "", "", "").trim_end());
    out.push('\n');
    for r in rows {
        out.push_str(
            format!(
                "{:<16} {:>14} {:>14} {:<6}",
                truncate(&r.parameter, 16),
                fmt_num(r.estimate),
                r.std_error.map(fmt_num).unwrap_or_else(|| "n/a".to_string()),
                if r.at_bound { "yes" } else { "" },
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// One line per batch job.
pub fn format_batch(outcomes: &[BatchOutcome]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<24} {:<22} {:>14}", "model", "status", "objective").trim_end());
    out.push('\n');
    for o in outcomes {
        let line = match &o.result {
            Ok(fit) => format!(
                "{:<24} {:<22} {:>14}",
                truncate(&o.model, 24),
                fit.status().display_name(),
                fmt_opt(fit.result().objective)
            ),
            Err(e) => format!("{:<24} error: {e}", truncate(&o.model, 24)),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn fmt_num(v: f64) -> String {
    if v != 0.0 && (v.abs() >= 1e6 || v.abs() < 1e-3) {
        format!("{v:.4e}")
    } else {
        format!("{v:.4}")
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(fmt_num).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::converged_result;

    #[test]
    fn table_marks_unavailable_errors() {
        let text = format_table(&FittedModel::new(converged_result()));
        let k_line = text.lines().find(|l| l.starts_with("K ")).unwrap();
        assert!(k_line.contains("11850.0000"));
        assert!(k_line.contains("n/a"));
        assert!(text.contains("Derived quantities:"));
    }

    #[test]
    fn summary_lists_status_and_trajectories() {
        let text = format_summary(&FittedModel::new(converged_result()));
        assert!(text.contains("Status: converged"));
        assert!(text.contains("Trajectories: biomass"));
        assert!(text.contains("MSY"));
    }

    #[test]
    fn small_values_use_scientific_notation() {
        assert_eq!(fmt_num(3.1e-5), "3.1000e-5");
        assert_eq!(fmt_num(0.0), "0.0000");
        assert_eq!(truncate("abcdef", 4), "abc.");
    }
}
