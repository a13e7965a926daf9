//! Health monitor loop
//!
//! On a fixed interval, every enabled service's check command is run and the
//! restart command follows when the check fails. Smart Pause skips a whole
//! tick while an interactive user is logged in (when enabled).
//!
//! Each tick fans out one check-and-restart unit per enabled service. Units
//! are capped by a semaphore and serialised per service through the shared
//! [`ServiceGuard`], so a service whose commands are still running (a slow
//! unit from an earlier tick, or a scheduled restart) is skipped rather than
//! queued.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::guard::{ServiceGuard, ServicePermit};
use crate::process::{ActivityDetector, CommandRunner};
use crate::registry::{self, Service, ServiceRegistry};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 16;

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Smart Pause was active; nothing was checked
    Paused,
    /// The service list could not be read
    Skipped,
    /// Stop was requested before units were launched
    Stopped,
    Checked(TickSummary),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub healthy: usize,
    pub restarted: usize,
    pub restart_failed: usize,
    /// Enabled services skipped because their commands were already running
    pub busy: usize,
}

impl TickSummary {
    pub fn checked(&self) -> usize {
        self.healthy + self.restarted + self.restart_failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Healthy,
    Restarted,
    RestartFailed,
}

struct MonitorCore {
    registry: Arc<dyn ServiceRegistry>,
    runner: Arc<dyn CommandRunner>,
    detector: Arc<dyn ActivityDetector>,
    guard: ServiceGuard,
    limiter: Arc<Semaphore>,
}

struct RunHandle {
    token: CancellationToken,
    tracker: TaskTracker,
}

pub struct HealthMonitor {
    core: Arc<MonitorCore>,
    run: Mutex<Option<RunHandle>>,
}

impl HealthMonitor {
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        runner: Arc<dyn CommandRunner>,
        detector: Arc<dyn ActivityDetector>,
        guard: ServiceGuard,
    ) -> Self {
        Self {
            core: Arc::new(MonitorCore {
                registry,
                runner,
                detector,
                guard,
                limiter: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_CHECKS)),
            }),
            run: Mutex::new(None),
        }
    }

    /// Cap on concurrently running check-and-restart units (minimum 1).
    ///
    /// Must be called before [`start`](Self::start).
    pub fn with_max_concurrent_checks(mut self, limit: usize) -> Self {
        if let Some(core) = Arc::get_mut(&mut self.core) {
            core.limiter = Arc::new(Semaphore::new(limit.max(1)));
        }
        self
    }

    fn run_handle(&self) -> MutexGuard<'_, Option<RunHandle>> {
        self.run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.run_handle()
            .as_ref()
            .is_some_and(|run| !run.token.is_cancelled())
    }

    /// Start ticking every `interval`. The first tick comes one interval
    /// after start. Calling `start` on a running monitor is a no-op.
    pub fn start(&self, interval: Duration) {
        let mut run = self.run_handle();
        if run.as_ref().is_some_and(|r| !r.token.is_cancelled()) {
            warn!("Monitor loop already running");
            return;
        }

        let interval = interval.max(Duration::from_millis(1));
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();

        info!(
            interval_secs = interval.as_secs_f64(),
            "Starting monitoring loop"
        );

        let core = Arc::clone(&self.core);
        let loop_token = token.clone();
        let loop_tracker = tracker.clone();
        tracker.spawn(async move {
            core.run_loop(interval, loop_token, loop_tracker).await;
        });

        *run = Some(RunHandle { token, tracker });
    }

    /// Stop scheduling ticks. Units already launched keep running to
    /// completion. Safe to call when already stopped.
    pub fn stop(&self) {
        if let Some(run) = self.run_handle().as_ref() {
            if !run.token.is_cancelled() {
                info!("Stopping monitoring loop");
            }
            run.token.cancel();
            run.tracker.close();
        }
    }

    /// [`stop`](Self::stop), then wait for in-flight units to finish.
    pub async fn shutdown(&self) {
        self.stop();
        let run = self.run_handle().take();
        if let Some(run) = run {
            run.tracker.wait().await;
            debug!("Monitoring loop drained");
        }
    }

    /// Run one tick now and wait for all of its units.
    pub async fn tick(&self) -> TickOutcome {
        self.core.tick(&CancellationToken::new()).await
    }
}

impl MonitorCore {
    async fn run_loop(
        self: Arc<Self>,
        period: Duration,
        token: CancellationToken,
        tracker: TaskTracker,
    ) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    // Ticks run detached so a slow one never delays the timer
                    let core = Arc::clone(&self);
                    let tick_token = token.clone();
                    tracker.spawn(async move {
                        core.tick(&tick_token).await;
                    });
                }
            }
        }

        info!("Monitoring loop stopped");
    }

    async fn tick(self: &Arc<Self>, token: &CancellationToken) -> TickOutcome {
        debug!("Monitor tick");

        let pause = match registry::offload(&self.registry, |r| r.pause_config()).await {
            Ok(pause) => pause,
            Err(e) => {
                warn!(error = %e, "Error reading pause config, assuming disabled");
                Default::default()
            }
        };
        if pause.pause_on_active_user && self.detector.is_user_active().await {
            info!("[Smart Pause] Active user session detected. Skipping checks");
            return TickOutcome::Paused;
        }

        let services = match registry::offload(&self.registry, |r| r.list_services()).await {
            Ok(services) => services,
            Err(e) => {
                error!(error = %e, "Error listing services, skipping tick");
                return TickOutcome::Skipped;
            }
        };

        if token.is_cancelled() {
            return TickOutcome::Stopped;
        }

        let mut summary = TickSummary::default();
        let mut units = JoinSet::new();
        for service in services.into_iter().filter(|s| s.enabled) {
            let Some(permit) = self.guard.try_acquire(&service.name) else {
                debug!(
                    service = %service.name,
                    "Commands already running for service, skipping this tick"
                );
                summary.busy += 1;
                continue;
            };

            let core = Arc::clone(self);
            units.spawn(async move { core.check_and_restart(service, permit).await });
        }

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok(UnitOutcome::Healthy) => summary.healthy += 1,
                Ok(UnitOutcome::Restarted) => summary.restarted += 1,
                Ok(UnitOutcome::RestartFailed) => summary.restart_failed += 1,
                Err(e) => error!(error = %e, "Check-and-restart unit panicked"),
            }
        }

        TickOutcome::Checked(summary)
    }

    async fn check_and_restart(&self, service: Service, _permit: ServicePermit) -> UnitOutcome {
        // The semaphore is never closed, so acquire only fails on shutdown races
        let _slot = self.limiter.acquire().await.ok();

        let check = self.runner.run(&service.check_command).await;

        let (id, at) = (service.id, Utc::now());
        if let Err(e) =
            registry::offload(&self.registry, move |r| r.record_checked(id, at)).await
        {
            warn!(service = %service.name, error = %e, "Failed to record check time");
        }

        let Err(check_error) = check else {
            debug!(service = %service.name, "Service healthy");
            return UnitOutcome::Healthy;
        };

        warn!(
            service = %service.name,
            command = %service.check_command,
            error = %check_error,
            "[Monitor] Check failed, restarting"
        );

        match self.runner.run(&service.restart_command).await {
            Ok(()) => {
                info!(service = %service.name, "[Monitor] Successfully restarted service");
                let (id, at) = (service.id, Utc::now());
                if let Err(e) =
                    registry::offload(&self.registry, move |r| r.record_restarted(id, at)).await
                {
                    warn!(service = %service.name, error = %e, "Failed to record restart time");
                }
                UnitOutcome::Restarted
            }
            Err(e) => {
                error!(
                    service = %service.name,
                    command = %service.restart_command,
                    error = %e,
                    "[Monitor] Failed to restart service"
                );
                UnitOutcome::RestartFailed
            }
        }
    }
}
