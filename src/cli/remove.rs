//! `lsm remove` command implementation

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::registry::FileRegistry;

#[derive(Args)]
pub struct RemoveArgs {
    /// Service to delete
    #[arg(short, long)]
    name: String,
}

pub async fn run(data_dir: &Path, args: RemoveArgs) -> Result<()> {
    let registry = FileRegistry::open(data_dir)?;
    registry.remove_service(&args.name)?;

    println!("✓ Removed service: {}", args.name);
    super::print_restart_notice();

    Ok(())
}
