//! lsm - Linux service manager

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use linux_service_manager::cli::{self, Cli, Commands};
use linux_service_manager::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completion { shell } = cli.command {
        generate(shell, &mut Cli::command(), "lsm", &mut std::io::stdout());
        return Ok(());
    }

    if cli.command.needs_root() {
        cli::require_root()?;
    }

    // The daemon sets up its own file logging once the config is loaded
    if !matches!(cli.command, Commands::Daemon(_)) {
        logging::init_stderr();
    }

    let data_dir = cli.data_dir;
    match cli.command {
        Commands::Daemon(args) => cli::daemon::run(&data_dir, args).await,
        Commands::Add(args) => cli::add::run(&data_dir, args).await,
        Commands::Update(args) => cli::update::run(&data_dir, args).await,
        Commands::Remove(args) => cli::remove::run(&data_dir, args).await,
        Commands::Toggle(args) => cli::toggle::run(&data_dir, args).await,
        Commands::List(args) => cli::list::run(&data_dir, args).await,
        Commands::ConfigLog(args) => cli::config::run_log(&data_dir, args).await,
        Commands::ConfigPause(args) => cli::config::run_pause(&data_dir, args).await,
        Commands::Completion { .. } => Ok(()),
    }
}
