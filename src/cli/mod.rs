//! Command-line interface for dcgen.
//!
//! # Available Commands
//!
//! - `generate` - resolve the configuration and write every target document
//! - `validate` - resolve and render without writing, listing every problem found
//! - `show` - print the resolved arguments (secrets masked), the expanded config,
//!   or the dependency tree of one variable
//!
//! # Global Options
//!
//! All commands accept:
//! - `--manifest <PATH>` - definitions manifest (`DCGEN_MANIFEST`, default `dcgen.toml`)
//! - `--config <PATH>` - user configuration (`DCGEN_CONFIG`, default `config.yaml`)
//! - `--set key=value` - override one user argument; repeatable, wins over the file
//! - `--verbose` / `--quiet` - log level
//!
//! # Example
//!
//! ```bash
//! # Generate into the default output directory
//! dcgen generate
//!
//! # Check a configuration in CI
//! dcgen --config staging.yaml --set cluster_name=staging validate --format json
//!
//! # What does bootstrap_id depend on?
//! dcgen show --tree bootstrap_id
//! ```

pub mod common;
mod generate;
mod show;
mod validate;

pub use common::CommandContext;
pub use generate::GenerateCommand;
pub use show::ShowCommand;
pub use validate::{OutputFormat, ValidateCommand, ValidationResults};

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::constants::{CONFIG_ENV, MANIFEST_ENV};

/// Runtime configuration derived from the global flags.
///
/// Kept separate from [`Cli`] so tests and embedders can drive commands without
/// going through argument parsing.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Filter directive for the subscriber; `None` keeps `RUST_LOG` or stays silent.
    pub log_level: Option<String>,
    /// Definitions manifest location.
    pub manifest_path: PathBuf,
    /// User configuration location.
    pub config_path: PathBuf,
    /// `--set` flags, in order.
    pub overrides: Vec<String>,
}

impl CliConfig {
    #[must_use]
    pub fn new(manifest_path: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            config_path: config_path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    #[must_use]
    pub fn with_override(mut self, flag: impl Into<String>) -> Self {
        self.overrides.push(flag.into());
        self
    }

    /// Installs the global tracing subscriber on stderr.
    ///
    /// `RUST_LOG` wins when set; otherwise `log_level` is used. With neither, nothing
    /// is installed. Calling this twice is harmless.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &self.log_level {
            EnvFilter::new(format!("dcgen_cli={level}"))
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "dcgen",
    about = "Cluster configuration generator - resolve configuration variables and render deployment templates",
    version,
    long_about = "dcgen composes variable definitions from a manifest, resolves them against a user configuration, and renders every target template with the result."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Definitions manifest
    #[arg(long, global = true, env = MANIFEST_ENV, default_value = "dcgen.toml")]
    manifest: PathBuf,

    /// User configuration (YAML)
    #[arg(short, long, global = true, env = CONFIG_ENV, default_value = "config.yaml")]
    config: PathBuf,

    /// Override a user argument (key=value); repeatable
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    set: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the configuration and write every target document
    Generate(GenerateCommand),

    /// Resolve and render without writing anything
    Validate(ValidateCommand),

    /// Print resolved values, the expanded config, or a dependency tree
    Show(ShowCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: Some(log_level.to_string()),
            manifest_path: self.manifest.clone(),
            config_path: self.config.clone(),
            overrides: self.set.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Generate(cmd) => cmd.execute(&config).await,
            Commands::Validate(cmd) => cmd.execute(&config).await,
            Commands::Show(cmd) => cmd.execute(&config),
        }
    }
}
