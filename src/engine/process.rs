//! Subprocess helpers: tool lookup and blocking runs with a timeout.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::{FitError, Stage};

/// Output of a finished subprocess.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Locate `tool` without spawning anything.
///
/// Paths with a directory component must exist as given; bare names are
/// searched in `search_paths` in order.
pub fn resolve_tool(tool: &Path, search_paths: &[PathBuf]) -> Result<PathBuf, FitError> {
    let has_dir = tool.components().count() > 1 || tool.is_absolute();
    if has_dir {
        if is_executable_file(tool) {
            return Ok(tool.to_path_buf());
        }
        return Err(FitError::ToolNotFound {
            tool: tool.display().to_string(),
            searched: tool.display().to_string(),
        });
    }

    for dir in search_paths {
        for candidate in candidates(dir, tool) {
            if is_executable_file(&candidate) {
                return Ok(candidate);
            }
        }
    }

    let searched: Vec<String> = search_paths.iter().map(|p| p.display().to_string()).collect();
    Err(FitError::ToolNotFound {
        tool: tool.display().to_string(),
        searched: if searched.is_empty() {
            "no search paths configured".to_string()
        } else {
            searched.join(", ")
        },
    })
}

fn candidates(dir: &Path, tool: &Path) -> Vec<PathBuf> {
    let base = dir.join(tool);
    if cfg!(windows) && base.extension().is_none() {
        vec![base.with_extension("exe"), base.with_extension("bat"), base]
    } else {
        vec![base]
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

/// Run `program` in `cwd`, killing it once `timeout` elapses.
///
/// stdout/stderr go to `<log_stem>.stdout` / `<log_stem>.stderr` inside `cwd`
/// so a chatty child can never block on a full pipe.
pub fn run_with_timeout(
    program: &Path,
    args: &[String],
    cwd: &Path,
    log_stem: &str,
    stage: Stage,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<ProcessOutput, FitError> {
    let stdout_path = cwd.join(format!("{log_stem}.stdout"));
    let stderr_path = cwd.join(format!("{log_stem}.stderr"));
    let stdout = File::create(&stdout_path).map_err(|e| FitError::io(&stdout_path, e))?;
    let stderr = File::create(&stderr_path).map_err(|e| FitError::io(&stderr_path, e))?;

    let start = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                FitError::ToolNotFound {
                    tool: program.display().to_string(),
                    searched: format!("spawn failed: {e}"),
                }
            }
            _ => FitError::io(program, e),
        })?;

    let status = loop {
        if let Some(status) = child.try_wait().map_err(|e| FitError::io(program, e))? {
            break status;
        }
        if start.elapsed() >= timeout {
            // The child may exit between the check and the kill; both are fine.
            let _ = child.kill();
            let _ = child.wait();
            return Err(FitError::ExecutionTimeout { stage, timeout });
        }
        std::thread::sleep(poll_interval);
    };

    Ok(ProcessOutput {
        exit_code: status.code(),
        stdout: read_lossy(&stdout_path),
        stderr: read_lossy(&stderr_path),
        elapsed: start.elapsed(),
    })
}

fn read_lossy(path: &Path) -> String {
    std::fs::read(path)
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

/// Last `max_lines` lines of `text`, for error messages.
pub fn tail(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_without_search_paths_is_missing() {
        let err = resolve_tool(Path::new("admb-definitely-missing"), &[]).unwrap_err();
        assert!(matches!(err, FitError::ToolNotFound { .. }));
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_tool(&dir.path().join("admb"), &[]).unwrap_err();
        assert!(matches!(err, FitError::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn finds_executable_in_search_path() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("admb");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let paths = [PathBuf::from("/nonexistent"), dir.path().to_path_buf()];
        let found = resolve_tool(Path::new("admb"), &paths).unwrap();
        assert_eq!(found, tool);
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\nd", 2), "c\nd");
        assert_eq!(tail("a", 5), "a");
    }
}
