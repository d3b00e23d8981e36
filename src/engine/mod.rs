//! Process driver: compile the rendered template, then run the estimator.
//!
//! Each run owns a fresh temporary directory (see [`Workdir`]). The directory
//! lives inside the returned [`RunBundle`] and is removed when the bundle is
//! dropped, or immediately when any step fails. Nothing is retried.

use std::path::PathBuf;
use std::time::Instant;

use slog::{Logger, debug, info, warn};

use crate::error::{FitError, Stage};
use crate::render::RenderedModel;

pub mod config;
pub mod process;
pub mod workdir;

pub use config::EngineConfig;
pub use process::ProcessOutput;
pub use workdir::Workdir;

/// Lines of stderr kept in a compilation error.
const STDERR_TAIL_LINES: usize = 40;

/// Report files found after the estimator exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFiles {
    pub par: Option<PathBuf>,
    pub std: Option<PathBuf>,
    pub cor: Option<PathBuf>,
    pub rep: Option<PathBuf>,
}

impl ReportFiles {
    fn collect(workdir: &Workdir, stem: &str) -> Self {
        Self {
            par: workdir.existing(&format!("{stem}.par")),
            std: workdir.existing(&format!("{stem}.std")),
            cor: workdir.existing(&format!("{stem}.cor")),
            rep: workdir.existing(&format!("{stem}.rep")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.par.is_none() && self.std.is_none() && self.cor.is_none() && self.rep.is_none()
    }
}

/// Everything the estimator run produced.
///
/// Owns the run directory: report paths stay valid until the bundle is dropped.
#[derive(Debug)]
pub struct RunBundle {
    /// Estimator exit code, passed through untouched.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub reports: ReportFiles,
    /// Compiler output, kept for diagnostics.
    pub compile: ProcessOutput,
    workdir: Workdir,
}

impl RunBundle {
    pub fn workdir(&self) -> &std::path::Path {
        self.workdir.path()
    }
}

pub struct Driver {
    config: EngineConfig,
    log: Logger,
}

impl Driver {
    pub fn new(config: EngineConfig, log: Logger) -> Self {
        Self { config, log }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compile and run `model` in a fresh directory.
    pub fn execute(&self, model: &RenderedModel) -> Result<RunBundle, FitError> {
        let compiler = process::resolve_tool(&self.config.compiler, &self.config.search_paths)?;
        let compiler = std::fs::canonicalize(&compiler).unwrap_or(compiler);

        let workdir = Workdir::create(
            self.config.scratch_root.as_deref(),
            &model.name,
            self.config.keep_workdir,
        )?;
        let log = self.log.new(slog::o!(
            "model" => model.name.clone(),
            "workdir" => workdir.path().display().to_string()
        ));
        if workdir.is_kept() {
            info!(log, "keeping run directory");
        }

        workdir.write(&model.tpl_file(), &model.tpl)?;
        workdir.write(&model.dat_file(), &model.dat)?;
        workdir.write(&model.pin_file(), &model.pin)?;

        debug!(log, "compiling"; "compiler" => compiler.display().to_string());
        let compile = process::run_with_timeout(
            &compiler,
            &[model.tpl_file()],
            workdir.path(),
            "compile",
            Stage::Compile,
            self.config.timeout,
            self.config.poll_interval,
        )
        .inspect_err(|e| warn!(log, "compile step failed"; "error" => e.to_string()))?;

        if !compile.success() {
            warn!(log, "compilation rejected"; "exit_code" => compile.exit_code);
            let text = if compile.stderr.trim().is_empty() {
                &compile.stdout
            } else {
                &compile.stderr
            };
            return Err(FitError::Compilation {
                exit_code: compile.exit_code,
                stderr: process::tail(text, STDERR_TAIL_LINES),
            });
        }
        info!(log, "compiled"; "elapsed_ms" => compile.elapsed.as_millis() as u64);

        let executable = self.locate_executable(&workdir, &model.name)?;

        let started = Instant::now();
        let run = process::run_with_timeout(
            &executable,
            &self.config.run_args,
            workdir.path(),
            "run",
            Stage::Run,
            self.config.timeout,
            self.config.poll_interval,
        )
        .inspect_err(|e| warn!(log, "run step failed"; "error" => e.to_string()))?;

        let reports = ReportFiles::collect(&workdir, &model.name);
        info!(log, "estimator finished";
            "exit_code" => run.exit_code,
            "elapsed_ms" => started.elapsed().as_millis() as u64,
            "reports" => !reports.is_empty()
        );

        Ok(RunBundle {
            exit_code: run.exit_code,
            stdout: run.stdout,
            stderr: run.stderr,
            reports,
            compile,
            workdir,
        })
    }

    fn locate_executable(&self, workdir: &Workdir, stem: &str) -> Result<PathBuf, FitError> {
        let names = if cfg!(windows) {
            vec![format!("{stem}.exe"), stem.to_string()]
        } else {
            vec![stem.to_string()]
        };
        names
            .iter()
            .find_map(|n| workdir.existing(n))
            .ok_or_else(|| FitError::ToolNotFound {
                tool: stem.to_string(),
                searched: format!("compiled executable missing in {}", workdir.path().display()),
            })
    }
}
