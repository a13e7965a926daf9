//! `lsm daemon` command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::daemon::{shutdown_signal, Daemon};
use crate::logging;
use crate::registry::FileRegistry;

#[derive(Args)]
pub struct DaemonArgs {
    /// Seconds between health checks (overrides [monitor] interval_secs)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,
}

pub async fn run(data_dir: &Path, args: DaemonArgs) -> Result<()> {
    let registry = FileRegistry::open(data_dir)
        .with_context(|| format!("Failed to open registry in {}", data_dir.display()))?;
    let config = registry.app_config()?;

    // Held until return so buffered log lines are flushed
    let _log_guard = match logging::init_daemon(&config.log) {
        Ok(guard) => Some(guard),
        Err(e) => {
            logging::init_stderr();
            tracing::warn!(error = %e, "File logging unavailable, logging to stderr only");
            None
        }
    };

    tracing::info!(data_dir = %data_dir.display(), "Starting lsm daemon");

    let mut daemon = Daemon::system(Arc::new(registry), &config.monitor);
    if let Some(secs) = args.interval {
        daemon = daemon.with_interval(Duration::from_secs(secs));
    }

    daemon.run_until(shutdown_signal()).await;
    Ok(())
}
