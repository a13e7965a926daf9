//! Application configuration (`config.toml` in the data directory)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::RegistryResult;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pause: PauseConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Smart Pause: skip monitor ticks while an interactive user is logged in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseConfig {
    #[serde(default)]
    pub pause_on_active_user: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

impl std::str::FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "hourly" => Ok(Self::Hourly),
            "never" => Ok(Self::Never),
            other => Err(format!(
                "unknown rotation '{}' (expected daily, hourly or never)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Rotated files kept on disk
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            rotation: LogRotation::default(),
            max_files: default_max_files(),
        }
    }
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("/var/log/lsm")
}

fn default_max_files() -> usize {
    7
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound on check-and-restart units running at once
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_concurrent_checks: default_max_concurrent_checks(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn concurrency(&self) -> usize {
        self.max_concurrent_checks.max(1)
    }
}

fn default_interval_secs() -> u64 {
    10
}

fn default_max_concurrent_checks() -> usize {
    16
}

impl AppConfig {
    /// Missing file means all defaults.
    pub fn load(path: &Path) -> RegistryResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> RegistryResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
