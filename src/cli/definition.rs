//! Top-level `lsm` argument definitions

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use super::add::AddArgs;
use super::config::{ConfigLogArgs, ConfigPauseArgs};
use super::daemon::DaemonArgs;
use super::list::ListArgs;
use super::remove::RemoveArgs;
use super::toggle::ToggleArgs;
use super::update::UpdateArgs;

pub const DEFAULT_DATA_DIR: &str = "/var/lib/lsm";

#[derive(Parser)]
#[command(name = "lsm")]
#[command(about = "Linux service manager: health checks, auto-restart and scheduled restarts")]
#[command(version)]
pub struct Cli {
    /// Directory holding services.json and config.toml
    #[arg(long, global = true, env = "LSM_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the monitor loop and the restart scheduler until SIGINT/SIGTERM
    Daemon(DaemonArgs),

    /// Register a new service
    Add(AddArgs),

    /// Change the commands or schedule of a service
    Update(UpdateArgs),

    /// Delete a service
    #[command(alias = "rm")]
    Remove(RemoveArgs),

    /// Enable or disable a service
    Toggle(ToggleArgs),

    /// List services
    #[command(alias = "ls")]
    List(ListArgs),

    /// Configure daemon log output
    ConfigLog(ConfigLogArgs),

    /// Configure Smart Pause
    ConfigPause(ConfigPauseArgs),

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Commands {
    /// Read-only commands that an unprivileged user may run.
    pub fn needs_root(&self) -> bool {
        !matches!(self, Commands::List(_) | Commands::Completion { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_list_does_not_need_root() {
        let cli = Cli::try_parse_from(["lsm", "list", "--json"]).unwrap();
        assert!(!cli.command.needs_root());

        let cli = Cli::try_parse_from(["lsm", "toggle", "--name", "web"]).unwrap();
        assert!(cli.command.needs_root());
    }
}
