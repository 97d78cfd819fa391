//! Value validators for catalog entries.
//!
//! A [`Validator`] is a named, shareable check run on a variable's value right after
//! it is computed (or, for user-provided values, when the run is seeded). The
//! standard checks cover what cluster configuration usually needs: booleans,
//! integers, JSON-encoded lists and maps, IPv4 address lists, enumerations, URLs and
//! absolute paths.
//!
//! Manifests select validators through [`ValidatorSpec`], a tagged table:
//!
//! ```toml
//! validate = { kind = "one_of", values = ["static", "master_http_loadbalancer"] }
//! ```

use anyhow::{Result, anyhow, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

type CheckFn = dyn Fn(&str) -> Result<()> + Send + Sync;

/// A named value check.
#[derive(Clone)]
pub struct Validator {
    name: String,
    check: Arc<CheckFn>,
}

impl Validator {
    /// Wraps a closure as a validator.
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&str) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Name used in logs and error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the check.
    pub fn check(&self, value: &str) -> Result<()> {
        (self.check)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Accepts exactly `true` or `false`.
#[must_use]
pub fn true_false() -> Validator {
    Validator::new("true_false", |value| {
        if value == "true" || value == "false" {
            Ok(())
        } else {
            Err(anyhow!("Must be one of 'true', 'false'. Got '{value}'"))
        }
    })
}

/// Accepts a base-10 integer.
#[must_use]
pub fn integer() -> Validator {
    Validator::new("integer", |value| {
        value.parse::<i64>().map(|_| ()).map_err(|_| anyhow!("Must be an integer but got '{value}'"))
    })
}

/// Accepts an integer in `min..=max`.
#[must_use]
pub fn integer_in_range(min: i64, max: i64) -> Validator {
    Validator::new(format!("integer_in_range({min}, {max})"), move |value| {
        let parsed: i64 =
            value.parse().map_err(|_| anyhow!("Must be an integer but got '{value}'"))?;
        if parsed < min || parsed > max {
            bail!("Must be between {min} and {max} inclusive, got {parsed}");
        }
        Ok(())
    })
}

/// Accepts a JSON-encoded list.
#[must_use]
pub fn json_list() -> Validator {
    Validator::new("json_list", |value| parse_json_list(value).map(|_| ()))
}

/// Accepts a JSON-encoded object.
#[must_use]
pub fn json_dict() -> Validator {
    Validator::new("json_dict", |value| {
        let parsed: serde_json::Value =
            serde_json::from_str(value).map_err(|e| anyhow!("Must be a JSON object: {e}"))?;
        if parsed.is_object() {
            Ok(())
        } else {
            Err(anyhow!("Must be a JSON object. Got a {}", json_type_name(&parsed)))
        }
    })
}

/// Accepts a JSON list of IPv4 addresses, as used for `resolvers` and `master_list`.
#[must_use]
pub fn ipv4_address_list() -> Validator {
    Validator::new("ipv4_address_list", |value| {
        let items = parse_json_list(value)?;
        let mut invalid = Vec::new();
        for item in &items {
            match item.as_str() {
                Some(addr) if addr.parse::<Ipv4Addr>().is_ok() => {}
                Some(addr) => invalid.push(addr.to_string()),
                None => invalid.push(item.to_string()),
            }
        }
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Invalid IPv4 addresses in list: {}", invalid.join(", ")))
        }
    })
}

/// Accepts one of a fixed set of values.
#[must_use]
pub fn one_of(values: Vec<String>) -> Validator {
    Validator::new(format!("one_of({})", values.join(", ")), move |value| {
        if values.iter().any(|v| v == value) {
            Ok(())
        } else {
            Err(anyhow!("Must be one of {}. Got '{value}'", values.join(", ")))
        }
    })
}

/// `scheme://[userinfo@]host[:port][/path]` for http and https. The host is a DNS
/// name, an IPv4 address or a bracketed IPv6 literal.
const URL_PATTERN: &str = r"^https?://(?:[^@/?#\s]+@)?(?:\[[0-9A-Fa-f:.]+\]|[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*)(?::[0-9]{1,5})?(?:[/?#]\S*)?$";

/// Accepts an `http://` or `https://` URL with a well-formed host and optional port.
///
/// This is a structural check of the authority part only; paths and queries are
/// accepted as long as they contain no whitespace.
#[must_use]
pub fn url() -> Validator {
    static PATTERN: std::sync::OnceLock<Option<Regex>> = std::sync::OnceLock::new();
    Validator::new("url", |value| {
        if !value.starts_with("http://") && !value.starts_with("https://") {
            bail!("Must start with http:// or https://. Got '{value}'");
        }
        let pattern = PATTERN
            .get_or_init(|| Regex::new(URL_PATTERN).ok())
            .as_ref()
            .ok_or_else(|| anyhow!("URL pattern failed to compile"))?;
        if !pattern.is_match(value) {
            bail!("URL '{value}' has no valid host");
        }
        Ok(())
    })
}

/// Accepts an absolute filesystem path (unix or windows drive form).
#[must_use]
pub fn absolute_path() -> Validator {
    Validator::new("absolute_path", |value| {
        let bytes = value.as_bytes();
        let is_windows_abs = bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'/' || bytes[2] == b'\\');
        if value.starts_with('/') || is_windows_abs {
            Ok(())
        } else {
            Err(anyhow!("Must be an absolute path. Got '{value}'"))
        }
    })
}

/// Rejects the empty string.
#[must_use]
pub fn non_empty() -> Validator {
    Validator::new("non_empty", |value| {
        if value.trim().is_empty() {
            Err(anyhow!("Must not be empty"))
        } else {
            Ok(())
        }
    })
}

/// Accepts values fully matching `pattern`.
pub fn matches(pattern: &str) -> Result<Validator> {
    let re = Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| anyhow!("Invalid validator pattern '{pattern}': {e}"))?;
    let shown = pattern.to_string();
    Ok(Validator::new(format!("regex({pattern})"), move |value| {
        if re.is_match(value) {
            Ok(())
        } else {
            Err(anyhow!("Must match /{shown}/. Got '{value}'"))
        }
    }))
}

fn parse_json_list(value: &str) -> Result<Vec<serde_json::Value>> {
    let parsed: serde_json::Value = serde_json::from_str(value)
        .map_err(|e| anyhow!("Must be a JSON formatted list, but couldn't be parsed: {e}"))?;
    match parsed {
        serde_json::Value::Array(items) => Ok(items),
        other => Err(anyhow!("Must be a JSON list. Got a {}", json_type_name(&other))),
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}

/// Manifest form of the standard validators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ValidatorSpec {
    /// See [`true_false`].
    TrueFalse,
    /// See [`integer`].
    Integer,
    /// See [`integer_in_range`].
    IntegerInRange {
        /// Inclusive lower bound
        min: i64,
        /// Inclusive upper bound
        max: i64,
    },
    /// See [`json_list`].
    JsonList,
    /// See [`json_dict`].
    JsonDict,
    /// See [`ipv4_address_list`].
    Ipv4AddressList,
    /// See [`one_of`].
    OneOf {
        /// Accepted values
        values: Vec<String>,
    },
    /// See [`url`].
    Url,
    /// See [`absolute_path`].
    AbsolutePath,
    /// See [`non_empty`].
    NonEmpty,
    /// See [`matches`].
    Regex {
        /// Pattern the whole value must match
        pattern: String,
    },
}

impl ValidatorSpec {
    /// Builds the validator this spec names.
    pub fn build(&self) -> Result<Validator> {
        Ok(match self {
            ValidatorSpec::TrueFalse => true_false(),
            ValidatorSpec::Integer => integer(),
            ValidatorSpec::IntegerInRange {
                min,
                max,
            } => {
                if min > max {
                    bail!("integer_in_range: min {min} is greater than max {max}");
                }
                integer_in_range(*min, *max)
            }
            ValidatorSpec::JsonList => json_list(),
            ValidatorSpec::JsonDict => json_dict(),
            ValidatorSpec::Ipv4AddressList => ipv4_address_list(),
            ValidatorSpec::OneOf {
                values,
            } => one_of(values.clone()),
            ValidatorSpec::Url => url(),
            ValidatorSpec::AbsolutePath => absolute_path(),
            ValidatorSpec::NonEmpty => non_empty(),
            ValidatorSpec::Regex {
                pattern,
            } => matches(pattern)?,
        })
    }
}
