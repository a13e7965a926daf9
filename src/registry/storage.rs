//! File-backed registry: `services.json` plus `config.toml`
//!
//! Every access holds an advisory lock on `registry.lock` so the CLI and a
//! running daemon can share the data directory.

use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::{AppConfig, LogConfig, PauseConfig, Service, ServiceRegistry};
use crate::errors::{RegistryError, RegistryResult};

const SERVICES_FILE: &str = "services.json";
const CONFIG_FILE: &str = "config.toml";
const LOCK_FILE: &str = "registry.lock";

/// Field-wise edit of a stored service. `None` leaves a field untouched;
/// `Some("")` clears the optional status command or schedule.
#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub restart_command: Option<String>,
    pub check_command: Option<String>,
    pub status_command: Option<String>,
    pub cron_schedule: Option<String>,
}

impl ServiceUpdate {
    pub fn is_empty(&self) -> bool {
        self.restart_command.is_none()
            && self.check_command.is_none()
            && self.status_command.is_none()
            && self.cron_schedule.is_none()
    }
}

pub struct FileRegistry {
    data_dir: PathBuf,
    services_path: PathBuf,
    config_path: PathBuf,
    lock_path: PathBuf,
}

enum LockMode {
    Shared,
    Exclusive,
}

impl FileRegistry {
    /// Open (and create if needed) the registry in `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> RegistryResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        Ok(Self {
            services_path: data_dir.join(SERVICES_FILE),
            config_path: data_dir.join(CONFIG_FILE),
            lock_path: data_dir.join(LOCK_FILE),
            data_dir,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The lock is released when the returned file is dropped.
    fn lock(&self, mode: LockMode) -> RegistryResult<File> {
        // Readers open read-only so unprivileged `list` works on a root-owned dir
        let file = match mode {
            LockMode::Shared if self.lock_path.exists() => File::open(&self.lock_path)?,
            _ => OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&self.lock_path)?,
        };

        let locked = match mode {
            LockMode::Shared => FileExt::lock_shared(&file),
            LockMode::Exclusive => FileExt::lock_exclusive(&file),
        };
        locked.map_err(|source| RegistryError::Lock {
            path: self.lock_path.clone(),
            source,
        })?;
        Ok(file)
    }

    fn load(&self) -> RegistryResult<Vec<Service>> {
        if !self.services_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.services_path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let services: Vec<Service> = serde_json::from_str(&content)?;
        Ok(services)
    }

    fn save(&self, services: &[Service]) -> RegistryResult<()> {
        if self.services_path.exists() {
            let backup_path = self.services_path.with_extension("json.bak");
            if let Err(e) = fs::copy(&self.services_path, &backup_path) {
                warn!("Failed to create registry backup: {}", e);
            }
        }

        let content = serde_json::to_string_pretty(services)?;
        fs::write(&self.services_path, content)?;
        Ok(())
    }

    /// Load, edit and save under one exclusive lock.
    fn modify<T>(
        &self,
        edit: impl FnOnce(&mut Vec<Service>) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let _lock = self.lock(LockMode::Exclusive)?;
        let mut services = self.load()?;
        let result = edit(&mut services)?;
        self.save(&services)?;
        Ok(result)
    }

    fn modify_config(&self, edit: impl FnOnce(&mut AppConfig)) -> RegistryResult<()> {
        let _lock = self.lock(LockMode::Exclusive)?;
        let mut config = AppConfig::load(&self.config_path)?;
        edit(&mut config);
        config.save(&self.config_path)
    }

    /// Store a new, enabled service and return it with its assigned id.
    pub fn add_service(&self, mut service: Service) -> RegistryResult<Service> {
        validate(&service)?;

        self.modify(|services| {
            if services.iter().any(|s| s.name == service.name) {
                return Err(RegistryError::DuplicateName(service.name.clone()));
            }

            service.id = services.iter().map(|s| s.id).max().unwrap_or(0) + 1;
            service.enabled = true;
            service.last_checked = None;
            service.last_restarted = None;
            services.push(service.clone());
            Ok(service)
        })
    }

    pub fn get_service(&self, name: &str) -> RegistryResult<Service> {
        self.list_services()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| RegistryError::ServiceNotFound(name.to_string()))
    }

    pub fn update_service(&self, name: &str, update: ServiceUpdate) -> RegistryResult<Service> {
        self.modify(|services| {
            let service = find_mut(services, name)?;

            let mut edited = service.clone();
            if let Some(restart) = update.restart_command {
                edited.restart_command = restart;
            }
            if let Some(check) = update.check_command {
                edited.check_command = check;
            }
            if let Some(status) = update.status_command {
                edited.status_command = status;
            }
            if let Some(schedule) = update.cron_schedule {
                edited.cron_schedule = schedule;
            }
            validate(&edited)?;

            *service = edited.clone();
            Ok(edited)
        })
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> RegistryResult<()> {
        self.modify(|services| {
            find_mut(services, name)?.enabled = enabled;
            Ok(())
        })
    }

    /// Flip `enabled` and return the new state.
    pub fn toggle_service(&self, name: &str) -> RegistryResult<bool> {
        self.modify(|services| {
            let service = find_mut(services, name)?;
            service.enabled = !service.enabled;
            Ok(service.enabled)
        })
    }

    pub fn remove_service(&self, name: &str) -> RegistryResult<()> {
        self.modify(|services| {
            let before = services.len();
            services.retain(|s| s.name != name);
            if services.len() == before {
                return Err(RegistryError::ServiceNotFound(name.to_string()));
            }
            Ok(())
        })
    }

    pub fn app_config(&self) -> RegistryResult<AppConfig> {
        let _lock = self.lock(LockMode::Shared)?;
        AppConfig::load(&self.config_path)
    }

    pub fn set_pause_config(&self, pause: PauseConfig) -> RegistryResult<()> {
        self.modify_config(|config| config.pause = pause)
    }

    pub fn log_config(&self) -> RegistryResult<LogConfig> {
        Ok(self.app_config()?.log)
    }

    pub fn set_log_config(&self, log: LogConfig) -> RegistryResult<()> {
        self.modify_config(|config| config.log = log)
    }

    fn set_timestamp(
        &self,
        id: u64,
        apply: impl FnOnce(&mut Service),
    ) -> RegistryResult<()> {
        self.modify(|services| {
            let service = services
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or(RegistryError::UnknownService(id))?;
            apply(service);
            Ok(())
        })
    }
}

impl ServiceRegistry for FileRegistry {
    fn list_services(&self) -> RegistryResult<Vec<Service>> {
        let _lock = self.lock(LockMode::Shared)?;
        self.load()
    }

    fn pause_config(&self) -> RegistryResult<PauseConfig> {
        Ok(self.app_config()?.pause)
    }

    fn record_checked(&self, id: u64, at: DateTime<Utc>) -> RegistryResult<()> {
        self.set_timestamp(id, |s| s.last_checked = Some(at))
    }

    fn record_restarted(&self, id: u64, at: DateTime<Utc>) -> RegistryResult<()> {
        self.set_timestamp(id, |s| s.last_restarted = Some(at))
    }
}

fn find_mut<'a>(services: &'a mut [Service], name: &str) -> RegistryResult<&'a mut Service> {
    services
        .iter_mut()
        .find(|s| s.name == name)
        .ok_or_else(|| RegistryError::ServiceNotFound(name.to_string()))
}

fn validate(service: &Service) -> RegistryResult<()> {
    if service.name.trim().is_empty() {
        return Err(RegistryError::InvalidService(
            "name must not be empty".to_string(),
        ));
    }
    if service.check_command.trim().is_empty() {
        return Err(RegistryError::InvalidService(format!(
            "{}: check command must not be empty",
            service.name
        )));
    }
    if service.restart_command.trim().is_empty() {
        return Err(RegistryError::InvalidService(format!(
            "{}: restart command must not be empty",
            service.name
        )));
    }
    Ok(())
}
