//! Service registry: service definitions, app config and their storage

mod config;
mod memory;
mod storage;

pub use config::{AppConfig, LogConfig, LogRotation, MonitorConfig, PauseConfig};
pub use memory::MemoryRegistry;
pub use storage::{FileRegistry, ServiceUpdate};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{RegistryError, RegistryResult};

/// A supervised service, defined entirely by shell commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: u64,

    /// Unique, used as the lookup key
    pub name: String,

    pub restart_command: String,

    /// Exit status 0 means healthy
    pub check_command: String,

    /// Exit status 0 means running; gates scheduled restarts. Empty means
    /// no safety check is available.
    #[serde(default)]
    pub status_command: String,

    /// Cron expression for preventive restarts. Empty means not scheduled.
    #[serde(default)]
    pub cron_schedule: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_restarted: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl Service {
    /// An enabled, unscheduled service with no status command.
    pub fn new(
        name: impl Into<String>,
        check_command: impl Into<String>,
        restart_command: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            restart_command: restart_command.into(),
            check_command: check_command.into(),
            status_command: String::new(),
            cron_schedule: String::new(),
            enabled: true,
            last_checked: None,
            last_restarted: None,
        }
    }

    pub fn with_status(mut self, status_command: impl Into<String>) -> Self {
        self.status_command = status_command.into();
        self
    }

    pub fn with_schedule(mut self, cron_schedule: impl Into<String>) -> Self {
        self.cron_schedule = cron_schedule.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_scheduled(&self) -> bool {
        !self.cron_schedule.trim().is_empty()
    }

    pub fn has_status_check(&self) -> bool {
        !self.status_command.trim().is_empty()
    }
}

/// Storage interface consumed by the monitor loop and the restart scheduler.
///
/// Each call is an independent operation; callers never need multi-call
/// transactions.
pub trait ServiceRegistry: Send + Sync {
    /// Snapshot of every configured service.
    fn list_services(&self) -> RegistryResult<Vec<Service>>;

    /// Read fresh on every monitor tick.
    fn pause_config(&self) -> RegistryResult<PauseConfig>;

    fn record_checked(&self, id: u64, at: DateTime<Utc>) -> RegistryResult<()>;

    fn record_restarted(&self, id: u64, at: DateTime<Utc>) -> RegistryResult<()>;
}

/// Run a registry call on the blocking thread pool.
///
/// Registry calls may take file locks and do synchronous I/O, so async
/// callers go through here instead of calling the trait directly.
pub async fn offload<T, F>(registry: &Arc<dyn ServiceRegistry>, call: F) -> RegistryResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn ServiceRegistry) -> RegistryResult<T> + Send + 'static,
{
    let registry = Arc::clone(registry);
    tokio::task::spawn_blocking(move || call(registry.as_ref()))
        .await
        .unwrap_or_else(|e| Err(RegistryError::Task(e.to_string())))
}
