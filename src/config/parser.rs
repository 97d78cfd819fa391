//! Generic TOML parsing with file context.
//!
//! Read failures keep the I/O error as the cause and name the file; syntax and shape
//! failures become [`GenError::ManifestParse`] so the CLI can point at the manifest.
//!
//! ```rust,no_run
//! use dcgen_cli::config::parse_config;
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Deserialize)]
//! struct Settings {
//!     name: String,
//! }
//!
//! # fn example() -> anyhow::Result<()> {
//! let settings: Settings = parse_config(Path::new("settings.toml"))?;
//! println!("{}", settings.name);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::GenError;

/// Parse a TOML file into `T`.
///
/// # Errors
///
/// - the file cannot be read (the I/O error is kept as the cause)
/// - the content is not valid TOML or does not match `T`
///   ([`GenError::ManifestParse`])
pub fn parse_config<T>(path: &Path) -> Result<T>
where
    T: serde::de::DeserializeOwned,
{
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: T = toml::from_str(&content).map_err(|e| GenError::ManifestParse {
        file: path.display().to_string(),
        reason: e.to_string().trim_end().to_string(),
    })?;

    Ok(config)
}
