//! Interactive login-session detection for Smart Pause

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::warn;

/// Reports whether an interactive user is logged in.
#[async_trait]
pub trait ActivityDetector: Send + Sync {
    async fn is_user_active(&self) -> bool;
}

/// Queries `who`; any output line means somebody is logged in.
///
/// A failed query reports "no active user" so monitoring keeps running.
#[derive(Debug, Clone)]
pub struct WhoDetector {
    program: String,
}

impl WhoDetector {
    pub fn new() -> Self {
        Self {
            program: "who".to_string(),
        }
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for WhoDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityDetector for WhoDetector {
    async fn is_user_active(&self) -> bool {
        let output = Command::new(&self.program)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => has_sessions(&output.stdout),
            Ok(output) => {
                warn!(
                    program = %self.program,
                    status = %output.status,
                    "Active user query failed, assuming no active user"
                );
                false
            }
            Err(e) => {
                warn!(
                    program = %self.program,
                    error = %e,
                    "Could not run active user query, assuming no active user"
                );
                false
            }
        }
    }
}

fn has_sessions(stdout: &[u8]) -> bool {
    String::from_utf8_lossy(stdout)
        .lines()
        .any(|line| !line.trim().is_empty())
}
