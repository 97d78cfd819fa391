//! Configuration loading for dcgen.
//!
//! dcgen reads two files:
//!
//! 1. **Definitions manifest** (`dcgen.toml`) - the sources that make up the variable
//!    catalog and the targets to render. Owned by whoever maintains the templates.
//! 2. **User configuration** (`config.yaml`) - the operator's values for one cluster.
//!
//! # Location Priority
//!
//! For each file:
//! 1. The command-line flag (`--manifest`, `--config`)
//! 2. The environment variable (`DCGEN_MANIFEST`, `DCGEN_CONFIG`)
//! 3. The default name in the current directory
//!
//! `--set key=value` flags are applied on top of the user configuration and win over it.
//!
//! # Modules
//!
//! - `manifest` - serde model of `dcgen.toml` and its conversion to sources and targets
//! - `parser` - generic TOML parsing with file context
//! - `user` - YAML user arguments and `--set` parsing
//!
//! # Example
//!
//! ```rust,no_run
//! use dcgen_cli::config::{load_definitions, load_user_arguments};
//! use dcgen_cli::resolver::resolve;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let definitions = load_definitions(Path::new("dcgen.toml"))?;
//! let user = load_user_arguments(Path::new("config.yaml"))?;
//! let resolution = resolve(&user, &definitions.sources, &definitions.targets)?;
//! println!("{} variables", resolution.arguments().len());
//! # Ok(())
//! # }
//! ```

mod manifest;
mod parser;
mod user;

pub use manifest::{
    CaseSpec, Definitions, Manifest, SourceSpec, TargetCaseSpec, TargetSpec, ValidatorList, VariableSpec,
    load_definitions,
};
pub use parser::parse_config;
pub use user::{load_user_arguments, parse_set_flag, parse_user_arguments};
