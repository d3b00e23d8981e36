//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves the engine configuration (environment, then flags)
//! - runs single or batch fits
//! - prints summaries and writes optional exports

use std::path::Path;
use std::time::Duration;

use clap::Parser;
use slog::{Logger, info};

use crate::cli::{BatchArgs, Command, EngineArgs, FitArgs, RenderArgs, ShowArgs, SimulateArgs};
use crate::data::{SimulationConfig, simulate, surplus_production_spec};
use crate::engine::EngineConfig;
use crate::error::{AppError, FitError};
use crate::report::FittedModel;

pub mod pipeline;

/// Entry point for the `admb-bridge` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    let log = crate::logging::terminal(cli.verbose);

    match cli.command {
        Command::Render(args) => handle_render(args, &log),
        Command::Fit(args) => handle_fit(args, &log),
        Command::Batch(args) => handle_batch(args, &log),
        Command::Show(args) => handle_show(args),
        Command::Simulate(args) => handle_simulate(args, &log),
    }
}

fn handle_render(args: RenderArgs, log: &Logger) -> Result<(), AppError> {
    let spec = crate::io::read_spec_json(&args.spec)?;
    let data = crate::io::load_dataset(&args.data)?;
    let rendered = crate::render::render(&spec, &data)?;

    std::fs::create_dir_all(&args.out).map_err(|e| FitError::io(&args.out, e))?;
    let files = [
        (rendered.tpl_file(), &rendered.tpl),
        (rendered.dat_file(), &rendered.dat),
        (rendered.pin_file(), &rendered.pin),
    ];
    for (name, contents) in files {
        let path = args.out.join(&name);
        std::fs::write(&path, contents).map_err(|e| FitError::io(&path, e))?;
        println!("{}", path.display());
    }
    info!(log, "rendered model"; "model" => &spec.name, "out" => args.out.display().to_string());
    Ok(())
}

fn handle_fit(args: FitArgs, log: &Logger) -> Result<(), AppError> {
    let config = engine_config(&args.engine)?;
    let spec = crate::io::read_spec_json(&args.spec)?;
    let data = crate::io::load_dataset(&args.data)?;

    let fit = pipeline::fit(&spec, &data, &config, log)?;
    print_fit(&fit);

    // Optional exports.
    if let Some(path) = &args.export_json {
        crate::io::write_result_json(path, fit.result())?;
    }
    if let Some(path) = &args.export_csv {
        crate::io::write_estimates_csv(path, &fit)?;
    }

    Ok(())
}

fn handle_batch(args: BatchArgs, log: &Logger) -> Result<(), AppError> {
    let config = engine_config(&args.engine)?;
    let data = crate::io::load_dataset(&args.data)?;
    let jobs = args
        .spec
        .iter()
        .map(|path| -> Result<pipeline::BatchJob, FitError> {
            Ok(pipeline::BatchJob {
                spec: crate::io::read_spec_json(path)?,
                data: data.clone(),
            })
        })
        .collect::<Result<Vec<_>, FitError>>()?;

    let outcomes = pipeline::fit_batch(&jobs, &config, log);
    print!("{}", crate::report::format_batch(&outcomes));

    let failed: Vec<&FitError> = outcomes.iter().filter_map(|o| o.result.as_ref().err()).collect();
    match failed.first() {
        None => Ok(()),
        Some(first) => Err(AppError::new(
            first.exit_code(),
            format!("{} of {} fits failed.", failed.len(), outcomes.len()),
        )),
    }
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let result = crate::io::read_result_json(&args.result)?;
    print_fit(&FittedModel::new(result));
    Ok(())
}

fn handle_simulate(args: SimulateArgs, log: &Logger) -> Result<(), AppError> {
    let config = SimulationConfig {
        years: args.years,
        start_year: args.start_year,
        r: args.r,
        k: args.k,
        sigma: args.sigma,
        seed: args.seed,
        ..SimulationConfig::default()
    };
    let data = simulate(&config)?;
    crate::io::write_dataset(&args.output, &data)?;

    if let Some(path) = &args.spec_out {
        let name = model_name_from(path);
        crate::io::write_spec_json(path, &surplus_production_spec(&name, &config))?;
    }
    info!(log, "simulated dataset"; "rows" => data.n_rows(), "seed" => args.seed);
    Ok(())
}

fn print_fit(fit: &FittedModel) {
    println!("{}", crate::report::format_summary(fit));
    println!("{}", crate::report::format_table(fit));
}

/// Environment first, then explicit flags.
pub fn engine_config(args: &EngineArgs) -> Result<EngineConfig, AppError> {
    let mut config = EngineConfig::from_env()?;
    if let Some(secs) = args.timeout {
        if secs == 0 {
            return Err(AppError::new(2, "--timeout must be at least 1 second."));
        }
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(compiler) = &args.compiler {
        config.compiler = compiler.clone();
    }
    if let Some(scratch) = &args.scratch {
        config.scratch_root = Some(scratch.clone());
    }
    config.keep_workdir = args.keep_workdir;
    Ok(config)
}

/// Model name for a spec written next to simulated data: the file stem, if it is usable.
fn model_name_from(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| crate::render::validate::is_identifier(s))
        .unwrap_or("simulated")
        .to_string()
}
