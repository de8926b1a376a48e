// ABOUTME: Captured execution of external command-line tools (git, gsutil, gcloud).
// ABOUTME: Returns exit status and output instead of inheriting the terminal.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Output of a finished external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (None when killed by a signal).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Trimmed stderr, or stdout when stderr is empty.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Run `program` with `args`, capturing stdout and stderr.
///
/// Failing to spawn (missing binary) is an `Err`; a non-zero exit is returned
/// as a normal `CommandOutput` for the caller to interpret.
pub async fn run<I, S>(program: &str, args: I, cwd: Option<&Path>) -> std::io::Result<CommandOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    tracing::debug!(program, ?command, "running external command");
    let output = command.output().await?;

    let result = CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.success() {
        tracing::debug!(
            program,
            exit_code = ?result.exit_code,
            "command failed: {}",
            result.diagnostic()
        );
    }

    Ok(result)
}
