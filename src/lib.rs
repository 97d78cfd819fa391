//! dcgen - cluster configuration generator
//!
//! dcgen turns a small set of operator-supplied settings into the complete
//! configuration of a cluster and renders it into deployment documents
//! (cloud-config files, service configs). Variables are declared in composable
//! sources; each is supplied by the user, taken from a default, or computed from
//! other variables.
//!
//! # Architecture Overview
//!
//! A run goes through these stages:
//!
//! 1. **Compose** - sources are merged into one immutable [`catalog::Catalog`]
//! 2. **Resolve** - [`resolver::Resolver`] evaluates every variable the targets need,
//!    in dependency order, collecting every missing or invalid value
//! 3. **Project** - [`secrecy`] classifies secrets and synthesizes the configuration
//!    views (`user_arguments`, `config_yaml`, `expanded_config` and their full forms)
//! 4. **Late bind** - variables that read those views are evaluated in a second pass
//! 5. **Render** - [`templating`] substitutes the final dictionary into each target
//!
//! ## Key Properties
//!
//! - **Deterministic**: identical inputs give byte-identical documents
//! - **User wins**: a user-supplied value is never overridden by a default or a calculation
//! - **All problems at once**: missing and invalid values are reported together
//! - **No leaks**: masked views and logs never contain a secret value
//!
//! # Core Modules
//!
//! - [`catalog`] - variable definitions, calculators, validators, sources and targets
//! - [`resolver`] - dependency graph, first pass and late-binding pass
//! - [`secrecy`] - secret classification, masking and the synthesized views
//! - [`templating`] - Tera rendering of targets
//! - [`config`] - the `dcgen.toml` manifest and the `config.yaml` user configuration
//! - [`cli`] - the `dcgen` command line
//! - [`core`] - [`core::GenError`] and user-facing error reporting
//! - [`constants`] - reserved keys and markers
//! - [`utils`] - atomic document writes
//!
//! # Example
//!
//! ```rust,no_run
//! use dcgen_cli::config::{load_definitions, load_user_arguments};
//! use dcgen_cli::resolver::resolve;
//! use dcgen_cli::templating::render_all;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let definitions = load_definitions(Path::new("dcgen.toml"))?;
//! let user = load_user_arguments(Path::new("config.yaml"))?;
//!
//! let resolution = resolve(&user, &definitions.sources, &definitions.targets)?;
//! let documents = render_all(&definitions.targets, resolution.arguments())?;
//! for (name, body) in &documents {
//!     println!("{name}: {} bytes", body.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod resolver;
pub mod secrecy;
pub mod templating;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
