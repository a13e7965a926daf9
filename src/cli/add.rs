//! `lsm add` command implementation

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::registry::{FileRegistry, Service};

#[derive(Args)]
pub struct AddArgs {
    /// Unique service name
    #[arg(short, long)]
    name: String,

    /// Command that restarts the service
    #[arg(short, long)]
    restart: String,

    /// Health check command (exit 0 = healthy)
    #[arg(short, long)]
    check: String,

    /// Status command gating scheduled restarts (exit 0 = running)
    #[arg(short, long, default_value = "")]
    status: String,

    /// Cron expression for preventive restarts (e.g. "@daily", "0 4 * * *")
    #[arg(long, default_value = "")]
    schedule: String,
}

pub async fn run(data_dir: &Path, args: AddArgs) -> Result<()> {
    super::validate_schedule(&args.schedule)?;

    let registry = FileRegistry::open(data_dir)?;
    let service = Service::new(args.name, args.check, args.restart)
        .with_status(args.status)
        .with_schedule(args.schedule.trim());
    let service = registry.add_service(service)?;

    println!("✓ Added service: {} (id {})", service.name, service.id);
    if service.is_scheduled() {
        println!("  Schedule: {}", service.cron_schedule);
        if !service.has_status_check() {
            println!("  Warning: no status command, scheduled restarts will run blindly");
        }
    }
    super::print_restart_notice();

    Ok(())
}
