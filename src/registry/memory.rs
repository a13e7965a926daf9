//! In-memory registry, for embedding and tests

use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

use super::{PauseConfig, Service, ServiceRegistry};
use crate::errors::{RegistryError, RegistryResult};

#[derive(Debug, Default)]
pub struct MemoryRegistry {
    services: Mutex<Vec<Service>>,
    pause: Mutex<PauseConfig>,
}

impl MemoryRegistry {
    /// Services keep their ids; zero ids are numbered from 1 in order.
    pub fn new(services: Vec<Service>) -> Self {
        let services = services
            .into_iter()
            .enumerate()
            .map(|(i, mut s)| {
                if s.id == 0 {
                    s.id = i as u64 + 1;
                }
                s
            })
            .collect();

        Self {
            services: Mutex::new(services),
            pause: Mutex::new(PauseConfig::default()),
        }
    }

    pub fn set_pause_on_active_user(&self, enabled: bool) {
        lock(&self.pause).pause_on_active_user = enabled;
    }

    pub fn service(&self, name: &str) -> Option<Service> {
        lock(&self.services)
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }

    pub fn remove(&self, name: &str) {
        lock(&self.services).retain(|s| s.name != name);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ServiceRegistry for MemoryRegistry {
    fn list_services(&self) -> RegistryResult<Vec<Service>> {
        Ok(lock(&self.services).clone())
    }

    fn pause_config(&self) -> RegistryResult<PauseConfig> {
        Ok(*lock(&self.pause))
    }

    fn record_checked(&self, id: u64, at: DateTime<Utc>) -> RegistryResult<()> {
        let mut services = lock(&self.services);
        let service = services
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RegistryError::UnknownService(id))?;
        service.last_checked = Some(at);
        Ok(())
    }

    fn record_restarted(&self, id: u64, at: DateTime<Utc>) -> RegistryResult<()> {
        let mut services = lock(&self.services);
        let service = services
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RegistryError::UnknownService(id))?;
        service.last_restarted = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigns_missing_ids() {
        let mut pinned = Service::new("pinned", "true", "true");
        pinned.id = 40;
        let registry = MemoryRegistry::new(vec![Service::new("web", "true", "true"), pinned]);

        assert_eq!(registry.service("web").unwrap().id, 1);
        assert_eq!(registry.service("pinned").unwrap().id, 40);
    }

    #[test]
    fn test_records_timestamps() {
        let registry = MemoryRegistry::new(vec![Service::new("web", "true", "true")]);
        let now = Utc::now();
        registry.record_checked(1, now).unwrap();
        assert_eq!(registry.service("web").unwrap().last_checked, Some(now));
        assert!(registry.record_restarted(9, now).is_err());
    }

    #[test]
    fn test_pause_toggle() {
        let registry = MemoryRegistry::default();
        assert!(!registry.pause_config().unwrap().pause_on_active_user);
        registry.set_pause_on_active_user(true);
        assert!(registry.pause_config().unwrap().pause_on_active_user);
    }
}
