//! xtask - Development tasks for linux-service-manager
//!
//! Run from the repository root: `cargo run -p xtask -- gen-docs`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use linux_service_manager::cli::Cli;
use linux_service_manager::registry::AppConfig;
use std::fs;
use std::path::Path;

const DOCS_DIR: &str = "docs";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Development tasks for linux-service-manager")]
struct Xtask {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate docs/cli/lsm.md and docs/config.example.toml
    GenDocs,
}

fn main() -> Result<()> {
    let args = Xtask::parse();
    match args.command {
        Commands::GenDocs => {
            let docs = Path::new(DOCS_DIR);
            write_doc(&docs.join("cli").join("lsm.md"), &cli_reference())?;
            write_doc(&docs.join("config.example.toml"), &config_example()?)?;
        }
    }
    Ok(())
}

fn cli_reference() -> String {
    clap_markdown::help_markdown::<Cli>()
}

/// Every `config.toml` key with its default value.
fn config_example() -> Result<String> {
    let body = toml::to_string_pretty(&AppConfig::default())
        .context("Failed to serialize default config")?;
    Ok(format!(
        "# lsm config.toml (lives in the data directory, default /var/lib/lsm)\n\
         # Values shown are the defaults; every key may be omitted.\n\n{}",
        body
    ))
}

fn write_doc(path: &Path, content: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_reference_lists_commands() {
        let markdown = cli_reference();
        for command in ["daemon", "add", "update", "remove", "toggle", "list"] {
            assert!(
                markdown.contains(&format!("lsm {}", command)),
                "missing `{}` in CLI reference",
                command
            );
        }
    }

    #[test]
    fn test_config_example_parses_back_to_defaults() {
        let example = config_example().unwrap();
        assert!(example.starts_with("# lsm config.toml"));

        let parsed: AppConfig = toml::from_str(&example).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }
}
