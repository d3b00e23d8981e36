//! Section writers for the engine input files.

use std::fmt::Write;

use super::fmt_num;
use super::validate::DataLayout;
use crate::domain::{DataRole, Dataset, ModelKind, ModelSpec, Prior};

pub fn render_tpl(spec: &ModelSpec, layout: &DataLayout) -> String {
    let mut out = String::new();

    out.push_str("DATA_SECTION\n");
    out.push_str("  init_int nobs;\n");
    for v in &layout.vectors {
        line(&mut out, &format!("init_vector {}(1,nobs);", v.ident));
    }
    out.push('\n');

    out.push_str("PARAMETER_SECTION\n");
    for p in &spec.parameters {
        line(
            &mut out,
            &format!(
                "init_bounded_number {}({},{},{});",
                p.name,
                fmt_num(p.lower),
                fmt_num(p.upper),
                p.phase
            ),
        );
    }
    match &spec.kind {
        ModelKind::SurplusProduction => {
            line(&mut out, "vector biomass(1,nobs);");
            line(&mut out, "vector pred_index(1,nobs);");
            line(&mut out, "number q;");
            line(&mut out, "number sigma;");
            line(&mut out, "sdreport_number MSY;");
            line(&mut out, "sdreport_number Bmsy;");
        }
        ModelKind::Custom { locals, .. } => {
            for l in locals {
                line(&mut out, l);
            }
        }
    }
    line(&mut out, "objective_function_value f;");
    out.push('\n');

    out.push_str("PROCEDURE_SECTION\n");
    match &spec.kind {
        ModelKind::SurplusProduction => surplus_production_procedure(&mut out, layout),
        ModelKind::Custom { procedure, .. } => {
            for l in procedure {
                line(&mut out, l);
            }
        }
    }
    for p in &spec.parameters {
        match p.prior {
            Prior::Uniform => {}
            Prior::Normal { mean, sd } => line(
                &mut out,
                &format!("f += 0.5*square(({} - {})/{});", p.name, fmt_num(mean), fmt_num(sd)),
            ),
            Prior::LogNormal { log_mean, log_sd } => line(
                &mut out,
                &format!(
                    "f += 0.5*square((log({name}) - {})/{}) + log({name});",
                    fmt_num(log_mean),
                    fmt_num(log_sd),
                    name = p.name
                ),
            ),
        }
    }
    out.push('\n');

    out.push_str("REPORT_SECTION\n");
    line(&mut out, "report << \"# objective\" << endl << f << endl;");
    match &spec.kind {
        ModelKind::SurplusProduction => {
            let time = layout.ident_for(DataRole::Time).unwrap_or("obs_time");
            line(&mut out, "report << \"# q\" << endl << q << endl;");
            line(&mut out, "report << \"# sigma\" << endl << sigma << endl;");
            report_series(&mut out, "biomass", time);
            report_series(&mut out, "pred_index", time);
        }
        ModelKind::Custom { report, .. } => {
            for l in report {
                line(&mut out, l);
            }
        }
    }

    out
}

/// Schaefer dynamics with catchability and observation error concentrated out.
fn surplus_production_procedure(out: &mut String, layout: &DataLayout) {
    let catch = layout.ident_for(DataRole::Catch).unwrap_or("obs_catch");
    let index = layout.ident_for(DataRole::SurveyIndex).unwrap_or("obs_index");

    line(out, "biomass(1) = K;");
    line(out, "for (int t = 1; t < nobs; t++)");
    line(out, "{");
    line(
        out,
        &format!("  biomass(t+1) = biomass(t) + r*biomass(t)*(1.0 - biomass(t)/K) - {catch}(t);"),
    );
    line(out, "  if (biomass(t+1) < 1e-3) biomass(t+1) = 1e-3;");
    line(out, "}");
    line(out, &format!("q = exp(sum(log({index}) - log(biomass))/nobs);"));
    line(out, "pred_index = q*biomass;");
    line(out, &format!("sigma = sqrt(norm2(log({index}) - log(pred_index))/nobs);"));
    line(out, "f = nobs*log(sigma);");
    line(out, "MSY = r*K/4.0;");
    line(out, "Bmsy = K/2.0;");
}

fn report_series(out: &mut String, series: &str, time: &str) {
    line(out, &format!("report << \"# {series}\" << endl;"));
    line(out, "for (int t = 1; t <= nobs; t++)");
    line(out, &format!("  report << {time}(t) << \" \" << {series}(t) << endl;"));
}

pub fn render_dat(data: &Dataset, layout: &DataLayout) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# nobs");
    let _ = writeln!(out, "{}", data.n_rows());
    for v in &layout.vectors {
        let values = data.column(&v.column).unwrap_or_default();
        let joined: Vec<String> = values.into_iter().map(fmt_num).collect();
        let _ = writeln!(out, "# {} <- {}", v.ident, v.column);
        let _ = writeln!(out, "{}", joined.join(" "));
    }
    out
}

pub fn render_pin(spec: &ModelSpec) -> String {
    let mut out = String::new();
    for p in &spec.parameters {
        let _ = writeln!(out, "# {}", p.name);
        let _ = writeln!(out, "{}", fmt_num(p.initial));
    }
    out
}

fn line(out: &mut String, text: &str) {
    out.push_str("  ");
    out.push_str(text);
    out.push('\n');
}
