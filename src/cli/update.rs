//! `lsm update` command implementation

use anyhow::{bail, Result};
use clap::Args;
use std::path::Path;

use crate::registry::{FileRegistry, ServiceUpdate};

#[derive(Args)]
pub struct UpdateArgs {
    /// Service to change
    #[arg(short, long)]
    name: String,

    /// New restart command
    #[arg(short, long)]
    restart: Option<String>,

    /// New health check command
    #[arg(short, long)]
    check: Option<String>,

    /// New status command ("" removes it)
    #[arg(short, long)]
    status: Option<String>,

    /// New cron expression ("" unschedules the service)
    #[arg(long)]
    schedule: Option<String>,
}

impl UpdateArgs {
    fn into_update(self) -> (String, ServiceUpdate) {
        let update = ServiceUpdate {
            restart_command: self.restart,
            check_command: self.check,
            status_command: self.status,
            cron_schedule: self.schedule.map(|s| s.trim().to_string()),
        };
        (self.name, update)
    }
}

pub async fn run(data_dir: &Path, args: UpdateArgs) -> Result<()> {
    if let Some(schedule) = &args.schedule {
        super::validate_schedule(schedule)?;
    }

    let (name, update) = args.into_update();
    if update.is_empty() {
        bail!("Nothing to update. Pass at least one of --restart, --check, --status, --schedule");
    }

    let registry = FileRegistry::open(data_dir)?;
    let service = registry.update_service(&name, update)?;

    println!("✓ Updated service: {}", service.name);
    if service.is_scheduled() {
        println!("  Schedule: {}", service.cron_schedule);
    } else {
        println!("  Schedule: none");
    }
    super::print_restart_notice();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(argv: &[&str]) -> UpdateArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Update(args) => args,
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn test_empty_schedule_clears() {
        let args = parse(&["lsm", "update", "--name", "web", "--schedule", ""]);
        let (name, update) = args.into_update();
        assert_eq!(name, "web");
        assert_eq!(update.cron_schedule.as_deref(), Some(""));
        assert!(update.restart_command.is_none());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_no_fields_is_empty_update() {
        let (_, update) = parse(&["lsm", "update", "--name", "web"]).into_update();
        assert!(update.is_empty());
    }
}
