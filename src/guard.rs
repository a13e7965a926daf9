//! Per-service mutual exclusion shared by the monitor loop and the scheduler
//!
//! Holding a service's guard means no other check-and-restart unit or
//! scheduled restart is running commands for that service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub type ServicePermit = OwnedMutexGuard<()>;

#[derive(Debug, Clone, Default)]
pub struct ServiceGuard {
    slots: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl ServiceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, service: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(slots.entry(service.to_string()).or_default())
    }

    /// `None` when another holder is working on the service.
    pub fn try_acquire(&self, service: &str) -> Option<ServicePermit> {
        self.slot(service).try_lock_owned().ok()
    }

    /// Wait until the service is free.
    pub async fn acquire(&self, service: &str) -> ServicePermit {
        self.slot(service).lock_owned().await
    }
}
