//! Scheduled restart engine
//!
//! Loads the service list once at start and runs one trigger task per
//! enabled service with a cron schedule. Each firing performs a safe
//! restart: the status command (when present) must report the service as
//! running before the restart command is run.
//!
//! Triggers work on the snapshot taken at start. Edits to the registry are
//! picked up only after the engine is restarted.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, Utc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::cron::CronSchedule;
use crate::guard::ServiceGuard;
use crate::process::CommandRunner;
use crate::registry::{self, Service, ServiceRegistry};

/// Result of one scheduled firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Status command failed: service not running, nothing to restart
    NotRunning,
    Restarted,
    /// Restarted without a status check
    BlindRestarted,
    RestartFailed,
    /// Engine stopped while waiting for the service to be free
    Abandoned,
}

struct EngineCore {
    registry: Arc<dyn ServiceRegistry>,
    runner: Arc<dyn CommandRunner>,
    guard: ServiceGuard,
}

struct EngineRun {
    token: CancellationToken,
    tracker: TaskTracker,
    scheduled: Vec<String>,
}

pub struct RestartScheduler {
    core: Arc<EngineCore>,
    run: Mutex<Option<EngineRun>>,
}

impl RestartScheduler {
    pub fn new(
        registry: Arc<dyn ServiceRegistry>,
        runner: Arc<dyn CommandRunner>,
        guard: ServiceGuard,
    ) -> Self {
        Self {
            core: Arc::new(EngineCore {
                registry,
                runner,
                guard,
            }),
            run: Mutex::new(None),
        }
    }

    fn run_handle(&self) -> MutexGuard<'_, Option<EngineRun>> {
        self.run
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.run_handle()
            .as_ref()
            .is_some_and(|run| !run.token.is_cancelled())
    }

    /// Names of services with an active trigger.
    pub fn scheduled_services(&self) -> Vec<String> {
        self.run_handle()
            .as_ref()
            .filter(|run| !run.token.is_cancelled())
            .map(|run| run.scheduled.clone())
            .unwrap_or_default()
    }

    /// Load services and register their triggers. Returns the number of
    /// triggers registered. A failed load or a malformed schedule is logged
    /// and never fatal.
    pub fn start(&self) -> usize {
        let mut run = self.run_handle();
        if let Some(existing) = run.as_ref().filter(|r| !r.token.is_cancelled()) {
            warn!("[Scheduler] Already running");
            return existing.scheduled.len();
        }

        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let mut scheduled = Vec::new();

        match self.core.registry.list_services() {
            Ok(services) => {
                for service in services {
                    // Unscheduled services are left to the monitor loop
                    if !service.enabled || !service.is_scheduled() {
                        continue;
                    }

                    let schedule = match CronSchedule::parse(&service.cron_schedule) {
                        Ok(schedule) => schedule,
                        Err(e) => {
                            warn!(
                                service = %service.name,
                                schedule = %service.cron_schedule,
                                error = %e,
                                "[Scheduler] Failed to schedule service"
                            );
                            continue;
                        }
                    };

                    info!(
                        service = %service.name,
                        schedule = %schedule,
                        "[Scheduler] Scheduled restart"
                    );
                    scheduled.push(service.name.clone());

                    let core = Arc::clone(&self.core);
                    let trigger_token = token.clone();
                    tracker.spawn(async move {
                        core.run_trigger(service, schedule, trigger_token).await;
                    });
                }
            }
            Err(e) => {
                error!(error = %e, "[Scheduler] Failed to load jobs, nothing scheduled");
            }
        }

        info!(jobs = scheduled.len(), "[Scheduler] Started cron scheduler");
        let count = scheduled.len();
        *run = Some(EngineRun {
            token,
            tracker,
            scheduled,
        });
        count
    }

    /// Cancel all future firings. A firing already running completes.
    /// Safe to call when already stopped.
    pub fn stop(&self) {
        if let Some(run) = self.run_handle().as_ref() {
            if !run.token.is_cancelled() {
                info!("[Scheduler] Stopping cron scheduler");
            }
            run.token.cancel();
            run.tracker.close();
        }
    }

    /// [`stop`](Self::stop), then wait for in-flight firings to finish.
    pub async fn shutdown(&self) {
        self.stop();
        let run = self.run_handle().take();
        if let Some(run) = run {
            run.tracker.wait().await;
            debug!("[Scheduler] Drained");
        }
    }

    /// Run the safe-restart procedure for `service` immediately.
    pub async fn fire(&self, service: &Service) -> FireOutcome {
        self.core
            .safe_restart(service, &CancellationToken::new())
            .await
    }
}

impl EngineCore {
    async fn run_trigger(
        self: Arc<Self>,
        service: Service,
        schedule: CronSchedule,
        token: CancellationToken,
    ) {
        loop {
            let now = Local::now();
            let Some(next) = schedule.next_after(&now) else {
                info!(
                    service = %service.name,
                    schedule = %schedule,
                    "[Scheduler] Schedule has no future occurrences"
                );
                return;
            };

            let wait = (next - now).to_std().unwrap_or_default();
            debug!(service = %service.name, next = %next, "[Scheduler] Next restart");

            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(wait) => {}
            }

            self.safe_restart(&service, &token).await;
        }
    }

    async fn safe_restart(&self, service: &Service, token: &CancellationToken) -> FireOutcome {
        info!(service = %service.name, "[Scheduler] Triggered scheduled restart");

        let _permit = tokio::select! {
            permit = self.guard.acquire(&service.name) => permit,
            _ = token.cancelled() => {
                debug!(service = %service.name, "[Scheduler] Stopped while waiting for service");
                return FireOutcome::Abandoned;
            }
        };

        let blind = !service.has_status_check();
        if blind {
            warn!(
                service = %service.name,
                "[Scheduler] No status command, restarting blindly"
            );
        } else if let Err(e) = self.runner.run(&service.status_command).await {
            info!(
                service = %service.name,
                error = %e,
                "[Scheduler] Skipping restart: status check failed (not running?)"
            );
            return FireOutcome::NotRunning;
        }

        match self.runner.run(&service.restart_command).await {
            Ok(()) => {
                info!(service = %service.name, "[Scheduler] Successfully restarted");
                let (id, at) = (service.id, Utc::now());
                if let Err(e) =
                    registry::offload(&self.registry, move |r| r.record_restarted(id, at)).await
                {
                    warn!(service = %service.name, error = %e, "Failed to record restart time");
                }
                if blind {
                    FireOutcome::BlindRestarted
                } else {
                    FireOutcome::Restarted
                }
            }
            Err(e) => {
                error!(
                    service = %service.name,
                    command = %service.restart_command,
                    error = %e,
                    "[Scheduler] Failed to restart"
                );
                FireOutcome::RestartFailed
            }
        }
    }
}
