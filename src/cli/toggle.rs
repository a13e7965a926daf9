//! `lsm toggle` command implementation

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::registry::FileRegistry;

#[derive(Args)]
pub struct ToggleArgs {
    /// Service to enable or disable
    #[arg(short, long)]
    name: String,
}

pub async fn run(data_dir: &Path, args: ToggleArgs) -> Result<()> {
    let registry = FileRegistry::open(data_dir)?;
    let enabled = registry.toggle_service(&args.name)?;

    let state = if enabled { "enabled" } else { "disabled" };
    println!("✓ Service {} is now {}", args.name, state);
    super::print_restart_notice();

    Ok(())
}
