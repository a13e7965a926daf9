//! Process utilities: shell command execution and login-session detection

mod activity;

pub use activity::{ActivityDetector, WhoDetector};

use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use crate::errors::CommandError;

/// Runs operator-supplied command strings.
///
/// Exit status is the only signal: `Ok(())` for status 0, `Err` for any
/// non-zero status or launch failure. Output is discarded and no timeout is
/// applied, so a hanging command blocks its caller until it exits.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<(), CommandError>;
}

/// Executes commands through `sh -c` so pipes, redirection and `!` work.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    /// Use a different POSIX shell binary (e.g. `/bin/dash`).
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<(), CommandError> {
        trace!(shell = %self.shell, command, "Running command");

        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|source| CommandError::Launch {
                command: command.to_string(),
                source,
            })?;

        status_to_result(command, status)
    }
}

fn status_to_result(command: &str, status: ExitStatus) -> Result<(), CommandError> {
    if status.success() {
        return Ok(());
    }

    match status.code() {
        Some(code) => Err(CommandError::Exit {
            command: command.to_string(),
            code,
        }),
        None => Err(CommandError::Signaled {
            command: command.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let runner = ShellRunner::new();
        assert!(runner.run("exit 0").await.is_ok());
        assert!(runner.run("true").await.is_ok());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure_with_code() {
        let runner = ShellRunner::new();
        let err = runner.run("exit 3").await.unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
    }

    #[tokio::test]
    async fn test_shell_negation() {
        let runner = ShellRunner::new();
        assert!(runner.run("! false").await.is_ok());
        assert!(runner.run("! true").await.is_err());
    }

    #[tokio::test]
    async fn test_pipes_and_redirection() {
        let runner = ShellRunner::new();
        assert!(runner
            .run("echo healthy | grep -q healthy 2>/dev/null")
            .await
            .is_ok());
        assert!(runner.run("echo sick | grep -q healthy").await.is_err());
    }

    #[tokio::test]
    async fn test_output_is_not_interpreted() {
        let runner = ShellRunner::new();
        // Noisy stderr/stdout with a zero exit is still a success
        assert!(runner.run("echo oops >&2; echo fine; exit 0").await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_shell_is_launch_error() {
        let runner = ShellRunner::with_shell("/nonexistent/shell-binary");
        let err = runner.run("exit 0").await.unwrap_err();
        assert!(matches!(err, CommandError::Launch { .. }));
        assert_eq!(err.exit_code(), None);
    }
}
