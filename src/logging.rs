//! Tracing subscriber setup
//!
//! CLI commands log to stderr. The daemon additionally writes to a rolling
//! `lsm.log` under the configured log directory.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::registry::{LogConfig, LogRotation};

const DEFAULT_FILTER: &str = "linux_service_manager=info";
const LOG_FILE_PREFIX: &str = "lsm";
const LOG_FILE_SUFFIX: &str = "log";

/// `RUST_LOG` wins over the built-in default.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Never => Rotation::NEVER,
    }
}

pub fn init_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Stdout plus a rolling file. Keep the returned guard alive for the life of
/// the daemon or buffered lines are lost on exit.
pub fn init_daemon(config: &LogConfig) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "Failed to create log directory {}",
            config.directory.display()
        )
    })?;

    let appender = build_appender(config)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn build_appender(config: &LogConfig) -> Result<RollingFileAppender> {
    let mut builder = RollingFileAppender::builder()
        .rotation(rotation(config.rotation))
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX);

    if config.max_files > 0 {
        builder = builder.max_log_files(config.max_files);
    }

    builder.build(&config.directory).with_context(|| {
        format!(
            "Failed to open log file in {}",
            config.directory.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_mapping() {
        assert_eq!(rotation(LogRotation::Daily), Rotation::DAILY);
        assert_eq!(rotation(LogRotation::Hourly), Rotation::HOURLY);
        assert_eq!(rotation(LogRotation::Never), Rotation::NEVER);
    }

    #[test]
    fn test_appender_creates_file_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            directory: dir.path().to_path_buf(),
            rotation: LogRotation::Never,
            max_files: 3,
        };

        let appender = build_appender(&config).unwrap();
        drop(appender);

        assert!(dir.path().join("lsm.log").exists());
    }
}
