//! Process executor: run a guard-approved command line without a shell.
//! The line is split on whitespace into an argument vector, so no interpreter
//! ever sees it. Runs synchronously to completion; callers needing a deadline
//! must impose one externally.

use std::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("empty command")]
    Empty,
    #[error("failed to start command: {0}")]
    Spawn(std::io::Error),
    #[error("command failed: {0}")]
    Failed(String),
}

/// Run `line` as `program arg...` and capture output. On success returns
/// stdout; when stdout is empty but stderr is not, returns stderr (some tools
/// emit informational output there even on success). On non-zero exit the
/// error carries stderr when present, else the exit status.
pub fn run_command_line(line: &str) -> Result<String, ExecError> {
    let mut parts = line.split_whitespace();
    let program = parts.next().ok_or(ExecError::Empty)?;

    let output = Command::new(program)
        .args(parts)
        .output()
        .map_err(ExecError::Spawn)?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        if !stderr.trim().is_empty() {
            return Err(ExecError::Failed(stderr));
        }
        return Err(ExecError::Failed(format!("exit {}", output.status)));
    }

    if stdout.is_empty() && !stderr.is_empty() {
        return Ok(stderr);
    }
    Ok(stdout)
}
