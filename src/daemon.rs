//! Daemon composition: the monitor loop and the restart scheduler sharing one
//! registry, one command runner and one per-service guard.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::guard::ServiceGuard;
use crate::monitor::HealthMonitor;
use crate::process::{ActivityDetector, CommandRunner, ShellRunner, WhoDetector};
use crate::registry::{MonitorConfig, ServiceRegistry};
use crate::schedule::RestartScheduler;

pub struct Daemon {
    monitor: HealthMonitor,
    scheduler: RestartScheduler,
    interval: Duration,
}

impl Daemon {
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        runner: Arc<dyn CommandRunner>,
        detector: Arc<dyn ActivityDetector>,
        config: &MonitorConfig,
    ) -> Self {
        let guard = ServiceGuard::new();
        let monitor = HealthMonitor::new(
            Arc::clone(&registry),
            Arc::clone(&runner),
            detector,
            guard.clone(),
        )
        .with_max_concurrent_checks(config.concurrency());
        let scheduler = RestartScheduler::new(registry, runner, guard);

        Self {
            monitor,
            scheduler,
            interval: config.interval(),
        }
    }

    /// Commands through `sh -c`, user activity through `who`.
    pub fn system(registry: Arc<dyn ServiceRegistry>, config: &MonitorConfig) -> Self {
        Self::new(
            registry,
            Arc::new(ShellRunner::new()),
            Arc::new(WhoDetector::new()),
            config,
        )
    }

    /// Override the monitor interval from the config.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn scheduler(&self) -> &RestartScheduler {
        &self.scheduler
    }

    /// Start both components, wait for `shutdown`, then stop both and wait
    /// for running commands to finish.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let jobs = self.scheduler.start();
        self.monitor.start(self.interval);
        info!(
            scheduled = jobs,
            interval_secs = self.interval.as_secs_f64(),
            "Service manager running"
        );

        shutdown.await;

        info!("Shutting down");
        self.monitor.stop();
        self.scheduler.stop();
        self.monitor.shutdown().await;
        self.scheduler.shutdown().await;
        info!("Shutdown complete");
    }
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MemoryRegistry, Service};

    #[tokio::test]
    async fn test_run_until_starts_and_stops_both_components() {
        let registry = Arc::new(MemoryRegistry::new(vec![
            Service::new("web", "exit 1", "exit 0"),
            Service::new("cache", "exit 0", "exit 0").with_schedule("@daily"),
        ]));
        let daemon = Daemon::new(
            registry.clone(),
            Arc::new(ShellRunner::new()),
            Arc::new(WhoDetector::with_program("false")),
            &MonitorConfig::default(),
        )
        .with_interval(Duration::from_millis(20));

        daemon
            .run_until(tokio::time::sleep(Duration::from_millis(300)))
            .await;

        assert!(!daemon.monitor().is_running());
        assert!(!daemon.scheduler().is_running());

        let web = registry.service("web").unwrap();
        assert!(web.last_checked.is_some());
        assert!(web.last_restarted.is_some());
    }
}
