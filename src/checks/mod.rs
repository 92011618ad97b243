//! Individual health checks and their shared result shape.

pub mod audit;
pub mod large_files;
pub mod outdated;
pub mod test_files;
pub mod unused;

use serde::Serialize;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Outcome of one check.
///
/// `data: None` with no error means the check ran clean. An error records
/// why data is missing (or partial, when both fields are set) and never
/// aborts the overall run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome<T> {
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> CheckOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn clean() -> Self {
        Self {
            data: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn partial(data: T, error: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            error: Some(error.into()),
        }
    }
}

/// Run an external query command and capture its stdout.
///
/// npm exits nonzero when it has findings, so a nonzero status with output
/// still counts as a successful query; only a silent failure is an error.
pub(crate) async fn capture_stdout(
    program: &str,
    args: &[&str],
    cwd: &Path,
) -> Result<String, String> {
    debug!(program, ?args, "running external query");
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if stdout.trim().is_empty() && !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            return Err(format!("{program} exited with {}", output.status));
        }
        return Err(format!("{program}: {stderr}"));
    }
    Ok(stdout)
}
