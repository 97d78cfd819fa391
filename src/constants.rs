//! Global constants used throughout the dcgen codebase.
//!
//! This module contains the reserved argument-dictionary keys, the late-bind
//! sentinel markers, and the environment variable names shared by the engine
//! and the CLI. Defining them centrally keeps the reserved names in one place.

/// Start marker of a late-bind placeholder value.
///
/// A placeholder looks like `<LATE_BIND_PLACEHOLDER_START>name<LATE_BIND_PLACEHOLDER_END>`.
/// The angle brackets make it impossible to confuse with any value a validator accepts.
pub const LATE_BIND_PLACEHOLDER_START: &str = "<LATE_BIND_PLACEHOLDER_START>";

/// End marker of a late-bind placeholder value.
pub const LATE_BIND_PLACEHOLDER_END: &str = "<LATE_BIND_PLACEHOLDER_END>";

/// Redaction token substituted for secret values in masked views.
pub const MASKED_VALUE: &str = "**HIDDEN**";

/// Pretty-printed JSON of the user arguments, secrets included.
pub const USER_ARGUMENTS_FULL: &str = "user_arguments_full";

/// Pretty-printed JSON of the user arguments with secrets masked.
pub const USER_ARGUMENTS: &str = "user_arguments";

/// YAML rendering of the user arguments, secrets included.
pub const CONFIG_YAML_FULL: &str = "config_yaml_full";

/// YAML rendering of the user arguments with secrets masked.
pub const CONFIG_YAML: &str = "config_yaml";

/// Every resolved variable, secrets included.
pub const EXPANDED_CONFIG_FULL: &str = "expanded_config_full";

/// Every resolved variable with secret keys removed.
pub const EXPANDED_CONFIG: &str = "expanded_config";

/// All keys synthesized by the secrecy projector, in insertion order.
pub const RESERVED_KEYS: &[&str] = &[
    USER_ARGUMENTS_FULL,
    USER_ARGUMENTS,
    CONFIG_YAML_FULL,
    CONFIG_YAML,
    EXPANDED_CONFIG_FULL,
    EXPANDED_CONFIG,
];

/// Synthesized keys that are always treated as secret.
pub const SECRET_BUILTINS: &[&str] = &[EXPANDED_CONFIG_FULL, USER_ARGUMENTS_FULL, CONFIG_YAML_FULL];

/// Returns true when `name` is one of the keys synthesized by the secrecy projector.
#[must_use]
pub fn is_reserved_key(name: &str) -> bool {
    RESERVED_KEYS.contains(&name)
}

/// Environment variable overriding the definitions manifest location.
pub const MANIFEST_ENV: &str = "DCGEN_MANIFEST";

/// Environment variable overriding the user configuration location.
pub const CONFIG_ENV: &str = "DCGEN_CONFIG";

/// Default definitions manifest file name.
pub const DEFAULT_MANIFEST_FILE: &str = "dcgen.toml";

/// Default user configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Default directory rendered documents are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "genconf/serve";
