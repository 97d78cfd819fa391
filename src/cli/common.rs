//! Shared setup for the CLI commands.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use super::CliConfig;
use crate::catalog::Target;
use crate::config::{Definitions, load_definitions, load_user_arguments, parse_set_flag};
use crate::core::{ArgumentDictionary, GenError};
use crate::resolver::{Resolution, Resolver};

/// Everything a command needs before it can resolve: definitions and user arguments.
#[derive(Debug)]
pub struct CommandContext {
    pub manifest_path: PathBuf,
    pub resolver: Resolver,
    pub targets: Vec<Target>,
    /// User configuration with `--set` overrides applied
    pub user_arguments: ArgumentDictionary,
}

impl CommandContext {
    /// Loads the manifest and the user configuration named by `config`.
    ///
    /// # Errors
    ///
    /// - either file is missing or malformed
    /// - a `--set` flag has no `=`
    /// - the manifest's sources do not compose
    pub fn load(config: &CliConfig) -> Result<Self> {
        let manifest_path = &config.manifest_path;
        if !manifest_path.exists() {
            anyhow::bail!("Manifest file {} not found", manifest_path.display());
        }
        let Definitions {
            sources,
            targets,
        } = load_definitions(manifest_path)?;
        let resolver = Resolver::from_sources(&sources)
            .with_context(|| format!("Failed to compose sources from {}", manifest_path.display()))?;

        let mut user_arguments = if config.config_path.exists() {
            load_user_arguments(&config.config_path)?
        } else if config.overrides.is_empty() {
            anyhow::bail!("Configuration file {} not found", config.config_path.display());
        } else {
            tracing::debug!(
                "No configuration file at {}; using --set values only",
                config.config_path.display()
            );
            ArgumentDictionary::new()
        };
        for flag in &config.overrides {
            let (key, value) = parse_set_flag(flag)?;
            if user_arguments.insert(key.clone(), value).is_some() {
                tracing::debug!("--set overrides '{key}' from the configuration file");
            }
        }

        Ok(Self {
            manifest_path: manifest_path.clone(),
            resolver,
            targets,
            user_arguments,
        })
    }

    pub fn resolve(&self) -> Result<Resolution> {
        Ok(self.resolver.resolve(&self.user_arguments, &self.targets)?)
    }
}

/// Flattens an aggregate error into its individual problems.
#[must_use]
pub fn problems(error: &GenError) -> Vec<String> {
    match error {
        GenError::ValidationFailed {
            errors,
        } => errors.iter().flat_map(problems).collect(),
        other => vec![other.to_string()],
    }
}

/// Prints one line per problem to stdout.
pub fn print_problems(error: &anyhow::Error) {
    let lines = match error.downcast_ref::<GenError>() {
        Some(gen_error) => problems(gen_error),
        None => vec![format!("{error:#}")],
    };
    for line in lines {
        println!("{} {}", "✗".red(), line);
    }
}
