//! User configuration (`config.yaml`) and `--set` overrides.

use anyhow::{Context, Result, bail};
use serde_yaml::Value as YamlValue;
use std::path::Path;

use crate::core::{ArgumentDictionary, GenError};

/// Reads user arguments from a YAML mapping.
///
/// String values are taken as-is; any other value is JSON-encoded, so
/// `resolvers: [8.8.8.8]` arrives as `["8.8.8.8"]`. An empty file is an empty mapping.
///
/// # Errors
///
/// The file cannot be read, or its content is not a mapping of names to non-null
/// values ([`GenError::ConfigParse`]).
pub fn load_user_arguments(path: &Path) -> Result<ArgumentDictionary> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    Ok(parse_user_arguments(&content, &path.display().to_string())?)
}

/// Parses YAML user arguments; `file` is only used in error messages.
pub fn parse_user_arguments(content: &str, file: &str) -> std::result::Result<ArgumentDictionary, GenError> {
    let invalid = |reason: String| GenError::ConfigParse {
        file: file.to_string(),
        reason,
    };

    let document: YamlValue = serde_yaml::from_str(content).map_err(|e| invalid(e.to_string()))?;
    let mapping = match document {
        YamlValue::Null => return Ok(ArgumentDictionary::new()),
        YamlValue::Mapping(mapping) => mapping,
        other => return Err(invalid(format!("expected a mapping of variable names, found {}", kind_of(&other)))),
    };

    let mut arguments = ArgumentDictionary::new();
    for (key, value) in mapping {
        let name = match key {
            YamlValue::String(name) => name,
            YamlValue::Bool(b) => b.to_string(),
            YamlValue::Number(n) => n.to_string(),
            other => return Err(invalid(format!("variable names must be scalars, found {}", kind_of(&other)))),
        };
        let value = match value {
            YamlValue::String(s) => s,
            YamlValue::Null => return Err(invalid(format!("'{name}' has no value"))),
            other => serde_json::to_string(&other).map_err(|e| invalid(format!("'{name}': {e}")))?,
        };
        arguments.insert(name, value);
    }
    Ok(arguments)
}

fn kind_of(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "null",
        YamlValue::Bool(_) => "a boolean",
        YamlValue::Number(_) => "a number",
        YamlValue::String(_) => "a string",
        YamlValue::Sequence(_) => "a list",
        YamlValue::Mapping(_) => "a mapping",
        YamlValue::Tagged(_) => "a tagged value",
    }
}

/// Splits a `--set key=value` flag at the first `=`.
pub fn parse_set_flag(flag: &str) -> Result<(String, String)> {
    let Some((key, value)) = flag.split_once('=') else {
        bail!("Invalid --set '{flag}': expected key=value");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid --set '{flag}': the key is empty");
    }
    Ok((key.to_string(), value.to_string()))
}
