//! Error types.
//!
//! - [`FitError`] is the library taxonomy. Every variant carries enough context
//!   (parameter name, stderr snippet, section label) to diagnose a failed run
//!   without re-running it.
//! - [`AppError`] is what the binary reports: a message plus a process exit code.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Which subprocess exceeded its time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Run,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Compile => write!(f, "compile"),
            Stage::Run => write!(f, "run"),
        }
    }
}

/// Failures of a single render → execute → parse run.
#[derive(Debug, Error)]
pub enum FitError {
    /// The model description is inconsistent. Never retried.
    #[error("invalid model spec ({subject}): {reason}")]
    SpecValidation { subject: String, reason: String },

    /// The compiler or compiled executable could not be located.
    #[error("external tool not found: {tool} (searched: {searched})")]
    ToolNotFound { tool: String, searched: String },

    /// The compiler rejected the generated template.
    #[error("compilation failed (exit code {exit_code:?}):\n{stderr}")]
    Compilation { exit_code: Option<i32>, stderr: String },

    /// A subprocess ran past its budget and was killed.
    #[error("{stage} step exceeded timeout of {timeout:?}")]
    ExecutionTimeout { stage: Stage, timeout: Duration },

    /// An engine report could not be interpreted.
    #[error("report parse error in section `{section}`: {reason}")]
    ReportParse { section: String, reason: String },

    /// Input data (CSV, JSON) could not be read.
    #[error("data error ({source_name}): {reason}")]
    Data { source_name: String, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FitError {
    pub(crate) fn spec(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        FitError::SpecValidation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(section: impl Into<String>, reason: impl Into<String>) -> Self {
        FitError::ReportParse {
            section: section.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn data(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        FitError::Data {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FitError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code used by the CLI for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::SpecValidation { .. } | FitError::Data { .. } => 2,
            FitError::ToolNotFound { .. } => 3,
            FitError::Compilation { .. }
            | FitError::ExecutionTimeout { .. }
            | FitError::ReportParse { .. } => 4,
            FitError::Io { .. } => 5,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(FitError::spec("r", "bad").exit_code(), 2);
        let missing = FitError::ToolNotFound {
            tool: "admb".to_string(),
            searched: String::new(),
        };
        assert_eq!(missing.exit_code(), 3);
        assert_eq!(FitError::parse("par header", "missing").exit_code(), 4);

        let app: AppError = FitError::parse("r", "no value line").into();
        assert_eq!(app.exit_code(), 4);
        assert!(app.to_string().contains("`r`"));
    }
}
