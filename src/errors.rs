//! Error types shared across the crate

use std::path::PathBuf;

use thiserror::Error;

/// Failure of a shell command run through a [`CommandRunner`](crate::process::CommandRunner).
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with status {code}")]
    Exit { command: String, code: i32 },

    #[error("`{command}` was terminated by a signal")]
    Signaled { command: String },
}

impl CommandError {
    /// Exit code when the command ran to completion with a non-zero status.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("No service with id {0}")]
    UnknownService(u64),

    #[error("Service already exists: {0}")]
    DuplicateName(String),

    #[error("Invalid service definition: {0}")]
    InvalidService(String),

    #[error("Failed to lock registry at {path}: {source}")]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt service registry: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config file: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Failed to write config file: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Registry task failed: {0}")]
    Task(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("cron expression is empty")]
    Empty,

    #[error("unknown cron shortcut `{0}`")]
    UnknownShortcut(String),

    #[error("expected 5 or 6 fields in `{expression}`, found {found}")]
    FieldCount { expression: String, found: usize },

    #[error("invalid day-of-week `{0}`")]
    InvalidDayOfWeek(String),

    #[error("invalid @every interval `{0}` (expected e.g. 30s, 5m, 1h30m)")]
    InvalidInterval(String),

    #[error("invalid cron expression `{expression}`: {reason}")]
    Invalid { expression: String, reason: String },
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;
