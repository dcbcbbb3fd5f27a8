//! Configuration management CLI commands.

use std::path::Path;

use anyhow::Context;
use clap::{Args, Subcommand};

use crate::cli::common::{CliError, CliResult};
use crate::config::Config;

/// Configuration management commands
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Display the effective configuration (file plus environment)
    Show(ConfigShowArgs),
    /// Write a default configuration file
    Init(ConfigInitArgs),
}

/// Display the effective configuration
#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Write a default configuration file
#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Overwrite an existing file
    #[arg(long)]
    force: bool,
}

/// Loads and validates the configuration at `path`.
///
/// A missing file yields the defaults; unreadable, malformed or invalid
/// files are validation errors.
pub fn load_config(path: &Path) -> CliResult<Config> {
    Config::load_from(path)
        .with_context(|| format!("Invalid configuration in {}", path.display()))
        .map_err(|e| CliError::validation(format!("{e:#}")))
}

impl ConfigArgs {
    /// Execute config subcommand
    pub fn execute(&self, path: &Path) -> CliResult<()> {
        match &self.command {
            ConfigCommand::Show(args) => args.execute(path),
            ConfigCommand::Init(args) => args.execute(path),
        }
    }
}

impl ConfigShowArgs {
    fn execute(&self, path: &Path) -> CliResult<()> {
        let config = load_config(path)?;
        let text = if self.json {
            serde_json::to_string_pretty(&config)
                .map_err(|e| CliError::io(format!("Failed to serialize config: {e}")))?
        } else {
            toml::to_string_pretty(&config)
                .map_err(|e| CliError::io(format!("Failed to serialize config: {e}")))?
        };

        if !self.json {
            println!("# {}", path.display());
        }
        println!("{text}");
        Ok(())
    }
}

impl ConfigInitArgs {
    fn execute(&self, path: &Path) -> CliResult<()> {
        if path.exists() && !self.force {
            return Err(CliError::validation(format!(
                "{} already exists (use --force to overwrite)",
                path.display()
            )));
        }

        Config::new()
            .save_to(path)
            .map_err(|e| CliError::io(format!("{e:#}")))?;

        println!("✓ Wrote default configuration to: {}", path.display());
        Ok(())
    }
}
