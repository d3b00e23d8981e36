//! Command-line parsing for the ADMB bridge.
//!
//! Argument parsing and command dispatch stay separate from the render,
//! engine and parse code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "admb-bridge", version, about = "Fit ADMB models from a typed model description")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write the template, data and initial-value files without running anything.
    Render(RenderArgs),
    /// Compile and run one model, then print its estimates.
    Fit(FitArgs),
    /// Fit several model specs against the same dataset in parallel.
    Batch(BatchArgs),
    /// Print a previously exported result JSON.
    Show(ShowArgs),
    /// Write a synthetic catch/survey dataset.
    Simulate(SimulateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Model spec (JSON).
    #[arg(long)]
    pub spec: PathBuf,

    /// Dataset (CSV with a header row).
    #[arg(long)]
    pub data: PathBuf,

    /// Output directory (created if missing).
    #[arg(long)]
    pub out: PathBuf,
}

/// Engine overrides shared by `fit` and `batch`.
#[derive(Debug, Args, Clone)]
pub struct EngineArgs {
    /// Per-subprocess timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Compiler command or path (defaults to `admb` or `ADMB_COMPILER`).
    #[arg(long)]
    pub compiler: Option<PathBuf>,

    /// Parent directory for run directories.
    #[arg(long)]
    pub scratch: Option<PathBuf>,

    /// Keep run directories on disk for inspection.
    #[arg(long)]
    pub keep_workdir: bool,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Model spec (JSON).
    #[arg(long)]
    pub spec: PathBuf,

    /// Dataset (CSV with a header row).
    #[arg(long)]
    pub data: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Export the full result to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,

    /// Export the estimate table to CSV.
    #[arg(long = "export-csv")]
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// Model specs (JSON), one fit each.
    #[arg(long, num_args = 1.., required = true)]
    pub spec: Vec<PathBuf>,

    /// Dataset shared by every spec.
    #[arg(long)]
    pub data: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Result JSON written by `fit --export-json`.
    #[arg(long)]
    pub result: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Number of years.
    #[arg(long, default_value_t = 20)]
    pub years: usize,

    /// First year of the series.
    #[arg(long, default_value_t = 1990)]
    pub start_year: i64,

    /// Random seed for the survey noise.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Intrinsic growth rate.
    #[arg(long, default_value_t = 0.5)]
    pub r: f64,

    /// Carrying capacity.
    #[arg(short = 'k', long = "k", default_value_t = 10_000.0)]
    pub k: f64,

    /// Log-scale survey noise.
    #[arg(long, default_value_t = 0.1)]
    pub sigma: f64,

    /// Output CSV.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also write a matching surplus production spec (JSON).
    #[arg(long = "spec-out")]
    pub spec_out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fit_with_overrides() {
        let cli = Cli::parse_from([
            "admb-bridge",
            "-vv",
            "fit",
            "--spec",
            "m.json",
            "--data",
            "d.csv",
            "--timeout",
            "5",
            "--keep-workdir",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.engine.timeout, Some(5));
        assert!(args.engine.keep_workdir);
        assert!(args.export_json.is_none());
    }

    #[test]
    fn batch_takes_several_specs() {
        let cli = Cli::parse_from(["admb-bridge", "batch", "--spec", "a.json", "b.json", "--data", "d.csv"]);
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.spec.len(), 2);
    }
}
