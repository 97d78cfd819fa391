//! Secret classification and the synthesized configuration views.
//!
//! Once the first resolution pass has finished, the projector derives six
//! bookkeeping entries and inserts them into the argument dictionary under the
//! reserved keys, so templates and late-bound calculators can read "the
//! configuration" like any other variable:
//!
//! | key                    | content                                        |
//! |------------------------|------------------------------------------------|
//! | `user_arguments_full`  | pretty JSON of the user arguments              |
//! | `user_arguments`       | the same, secrets masked                       |
//! | `config_yaml_full`     | YAML of the user arguments                     |
//! | `config_yaml`          | the same, secrets masked                       |
//! | `expanded_config_full` | every resolved variable except placeholders    |
//! | `expanded_config`      | the same, secret keys removed                  |
//!
//! The `_full` keys are themselves secret.
//!
//! # Composite secrets
//!
//! A calculated value that embeds the value of a secret it reads (directly or
//! transitively) is classified secret too, so the masked and scrubbed views never
//! carry a secret as a substring. Empty secret values never taint.

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::VariableKind;
use crate::constants::{
    CONFIG_YAML, CONFIG_YAML_FULL, EXPANDED_CONFIG, EXPANDED_CONFIG_FULL, LATE_BIND_PLACEHOLDER_START,
    MASKED_VALUE, SECRET_BUILTINS, USER_ARGUMENTS, USER_ARGUMENTS_FULL, is_reserved_key,
};
use crate::core::{ArgumentDictionary, GenError, GenResult};
use crate::resolver::DependencyGraph;

/// True when `value` is, or still contains, a late-bind placeholder.
#[must_use]
pub fn is_placeholder(value: &str) -> bool {
    value.contains(LATE_BIND_PLACEHOLDER_START)
}

/// Computes the full secret set of a run.
///
/// Starts from the catalog flags plus the always-secret synthesized keys, then adds
/// every calculated or late-bound variable whose value contains the value of a secret
/// it depends on. A variable that reads one of the `_full` views is checked against
/// every secret value. Repeats until stable so chains of composites are caught.
#[must_use]
pub fn classify_secrets(
    flagged: &BTreeSet<String>,
    arguments: &ArgumentDictionary,
    kinds: &BTreeMap<String, VariableKind>,
    graph: &DependencyGraph,
) -> BTreeSet<String> {
    let mut secrets: BTreeSet<String> = flagged.clone();
    secrets.extend(SECRET_BUILTINS.iter().map(|k| (*k).to_string()));

    let candidates: Vec<&String> = kinds
        .iter()
        .filter(|(_, kind)| matches!(kind, VariableKind::Calculated | VariableKind::LateBound))
        .map(|(name, _)| name)
        .collect();

    loop {
        let mut tainted = Vec::new();
        for name in &candidates {
            if secrets.contains(*name) {
                continue;
            }
            let Some(value) = arguments.get(*name) else {
                continue;
            };
            if is_placeholder(value) {
                continue;
            }
            let deps = graph.transitive_deps(name);
            // The `_full` views carry every secret value, so a reader of one may embed any of them.
            let reads_full_view = SECRET_BUILTINS.iter().any(|key| deps.contains(*key));
            let leaks = secrets
                .iter()
                .filter(|secret| reads_full_view || deps.contains(*secret))
                .find(|secret| {
                    arguments
                        .get(*secret)
                        .is_some_and(|secret| !secret.is_empty() && value.contains(secret.as_str()))
                });
            if let Some(dep) = leaks {
                tracing::debug!("Classifying '{name}' as secret: its value embeds secret '{dep}'");
                tainted.push((*name).clone());
            }
        }
        if tainted.is_empty() {
            break;
        }
        secrets.extend(tainted);
    }

    secrets
}

/// Copy of `arguments` with every secret value replaced by [`MASKED_VALUE`].
#[must_use]
pub fn mask(arguments: &ArgumentDictionary, secrets: &BTreeSet<String>) -> ArgumentDictionary {
    arguments
        .iter()
        .map(|(key, value)| {
            let shown = if secrets.contains(key) {
                MASKED_VALUE.to_string()
            } else {
                value.clone()
            };
            (key.clone(), shown)
        })
        .collect()
}

/// Every resolved entry except placeholders and the synthesized views.
#[must_use]
pub fn expanded_full(arguments: &ArgumentDictionary) -> ArgumentDictionary {
    arguments
        .iter()
        .filter(|(key, value)| !is_reserved_key(key) && !is_placeholder(value))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// `full` without any secret key.
#[must_use]
pub fn scrubbed(full: &ArgumentDictionary, secrets: &BTreeSet<String>) -> ArgumentDictionary {
    full.iter()
        .filter(|(key, _)| !secrets.contains(*key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Pretty-printed JSON object with sorted keys.
pub fn json_prettyprint(arguments: &ArgumentDictionary) -> GenResult<String> {
    serde_json::to_string_pretty(arguments).map_err(|e| GenError::Internal {
        message: format!("failed to serialize arguments as JSON: {e}"),
    })
}

/// YAML document of user arguments, restoring structure where a value parses as YAML.
///
/// `resolvers: '["8.8.8.8"]'` becomes a YAML list, `"true"` a boolean. Values that do
/// not parse, or that parse to a null they do not literally spell, stay strings.
pub fn user_arguments_to_yaml(arguments: &ArgumentDictionary) -> GenResult<String> {
    let structured: BTreeMap<&str, YamlValue> = arguments
        .iter()
        .map(|(key, value)| (key.as_str(), structured_value(value)))
        .collect();

    serde_yaml::to_string(&structured).map_err(|e| GenError::Internal {
        message: format!("failed to serialize arguments as YAML: {e}"),
    })
}

fn structured_value(value: &str) -> YamlValue {
    match serde_yaml::from_str::<YamlValue>(value) {
        Ok(YamlValue::Null) if !matches!(value.trim(), "null" | "~" | "Null" | "NULL") => {
            YamlValue::String(value.to_string())
        }
        Ok(YamlValue::Tagged(_)) | Err(_) => YamlValue::String(value.to_string()),
        Ok(parsed) => parsed,
    }
}

/// Expanded configuration text: sorted YAML mapping, each line indented two spaces.
pub fn format_expanded_config(config: &ArgumentDictionary) -> GenResult<String> {
    if config.is_empty() {
        return Ok(String::new());
    }
    let yaml = serde_yaml::to_string(config).map_err(|e| GenError::Internal {
        message: format!("failed to serialize expanded config: {e}"),
    })?;
    Ok(yaml.lines().map(|line| format!("  {line}\n")).collect())
}

/// Builds the six synthesized view entries.
///
/// `user_arguments` are the values the user supplied; `arguments` is the dictionary at
/// the end of the first pass; `secrets` comes from [`classify_secrets`].
pub fn project(
    user_arguments: &ArgumentDictionary,
    arguments: &ArgumentDictionary,
    secrets: &BTreeSet<String>,
) -> GenResult<ArgumentDictionary> {
    let masked_user = mask(user_arguments, secrets);
    let full = expanded_full(arguments);
    let scrubbed_view = scrubbed(&full, secrets);

    let mut views = ArgumentDictionary::new();
    views.insert(USER_ARGUMENTS_FULL.to_string(), json_prettyprint(user_arguments)?);
    views.insert(USER_ARGUMENTS.to_string(), json_prettyprint(&masked_user)?);
    views.insert(CONFIG_YAML_FULL.to_string(), user_arguments_to_yaml(user_arguments)?);
    views.insert(CONFIG_YAML.to_string(), user_arguments_to_yaml(&masked_user)?);
    views.insert(EXPANDED_CONFIG_FULL.to_string(), format_expanded_config(&full)?);
    views.insert(EXPANDED_CONFIG.to_string(), format_expanded_config(&scrubbed_view)?);

    tracing::debug!(
        "Projected configuration views: {} user argument(s), {} expanded entries, {} scrubbed",
        user_arguments.len(),
        full.len(),
        full.len() - scrubbed_view.len()
    );
    Ok(views)
}

/// JSON value of a masked dictionary, for structured output.
#[must_use]
pub fn masked_json(arguments: &ArgumentDictionary, secrets: &BTreeSet<String>) -> JsonValue {
    JsonValue::Object(
        mask(arguments, secrets).into_iter().map(|(k, v)| (k, JsonValue::String(v))).collect(),
    )
}
