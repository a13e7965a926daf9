//! `lsm config-log` and `lsm config-pause` command implementations

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use crate::registry::{FileRegistry, LogConfig, LogRotation, PauseConfig};

#[derive(Args)]
pub struct ConfigLogArgs {
    /// Directory for lsm.log
    #[arg(long)]
    directory: Option<PathBuf>,

    /// daily, hourly or never
    #[arg(long)]
    rotation: Option<LogRotation>,

    /// Rotated log files to keep (0 keeps all)
    #[arg(long)]
    max_files: Option<usize>,
}

impl ConfigLogArgs {
    fn apply(self, mut log: LogConfig) -> LogConfig {
        if let Some(directory) = self.directory {
            log.directory = directory;
        }
        if let Some(rotation) = self.rotation {
            log.rotation = rotation;
        }
        if let Some(max_files) = self.max_files {
            log.max_files = max_files;
        }
        log
    }
}

#[derive(Args)]
pub struct ConfigPauseArgs {
    /// Skip health checks while an interactive user is logged in
    #[arg(long, action = clap::ArgAction::Set)]
    enable: bool,
}

pub async fn run_log(data_dir: &Path, args: ConfigLogArgs) -> Result<()> {
    let registry = FileRegistry::open(data_dir)?;
    let log = args.apply(registry.log_config()?);
    registry.set_log_config(log.clone())?;

    println!("✓ Log configuration saved");
    println!("  Directory: {}", log.directory.display());
    println!("  Rotation:  {:?}", log.rotation);
    println!("  Max files: {}", log.max_files);
    println!("Note: restart the lsm daemon to apply log changes.");

    Ok(())
}

pub async fn run_pause(data_dir: &Path, args: ConfigPauseArgs) -> Result<()> {
    let registry = FileRegistry::open(data_dir)?;
    registry.set_pause_config(PauseConfig {
        pause_on_active_user: args.enable,
    })?;

    if args.enable {
        println!("✓ Smart Pause enabled: checks are skipped while a user is logged in");
    } else {
        println!("✓ Smart Pause disabled");
    }

    Ok(())
}
