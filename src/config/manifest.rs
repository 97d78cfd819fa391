//! Definitions manifest (`dcgen.toml`).
//!
//! The manifest declares the sources that make up the catalog and the targets to
//! render. Source and variable order in the file is registration order.
//!
//! ```toml
//! [[source]]
//! name = "common"
//!
//! [[source.variable]]
//! name = "cluster_name"                 # no value: the user must supply it
//! validate = { kind = "non_empty" }
//!
//! [[source.variable]]
//! name = "bootstrap_id"
//! calculate = "{{ cluster_name }}-bootstrap"
//!
//! [[source.variable]]
//! name = "config_id"
//! digest = ["cluster_name", "resolvers"]
//!
//! [[source.variable]]
//! name = "config_summary"
//! calculate = "{{ expanded_config | length }} bytes"
//! late = true
//!
//! [[source.when]]
//! switch = "provider"
//! case = "aws"
//!
//! [[source.when.variable]]
//! name = "region"
//! default = "us-west-2"
//!
//! [[target]]
//! name = "cloud-config.yaml"
//! template = "templates/cloud-config.yaml"
//!
//! [[target.when]]
//! switch = "provider"
//! case = "aws"
//! required = ["region"]
//! ```
//!
//! A target's required set is its explicit `required` list plus every name its
//! template references, minus the names listed under its `[[target.when]]` tables.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::parser::parse_config;
use crate::catalog::{Calculator, Source, Target, ValidatorSpec, VariableDef};
use crate::core::GenError;
use crate::templating::extract_references;

/// Parsed definitions manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Sources in registration order.
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceSpec>,
    /// Targets to render.
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    pub name: String,
    #[serde(default, rename = "variable")]
    pub variables: Vec<VariableSpec>,
    #[serde(default, rename = "when")]
    pub cases: Vec<CaseSpec>,
}

/// A `[[source.when]]` bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseSpec {
    pub switch: String,
    pub case: String,
    #[serde(default, rename = "variable")]
    pub variables: Vec<VariableSpec>,
}

/// One `[[source.variable]]` entry.
///
/// At most one of `default`, `calculate` and `digest` may be set; with none the
/// variable is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariableSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Tera expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculate: Option<String>,
    /// Inputs of a `calculate` expression; defaults to the names it references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<Vec<String>>,
    #[serde(default)]
    pub late: bool,
    #[serde(default)]
    pub secret: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<ValidatorList>,
}

/// `validate = { kind = ... }` or a list of such tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidatorList {
    One(ValidatorSpec),
    Many(Vec<ValidatorSpec>),
}

impl ValidatorList {
    fn specs(&self) -> &[ValidatorSpec] {
        match self {
            ValidatorList::One(spec) => std::slice::from_ref(spec),
            ValidatorList::Many(specs) => specs,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSpec {
    /// Target name; also the output file name
    pub name: String,
    /// Template path, relative to the manifest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Inline template body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default, rename = "when")]
    pub conditions: Vec<TargetCaseSpec>,
}

/// A `[[target.when]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetCaseSpec {
    pub switch: String,
    pub case: String,
    #[serde(default)]
    pub required: Vec<String>,
}

/// Sources and targets built from a manifest.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub sources: Vec<Source>,
    pub targets: Vec<Target>,
}

impl Manifest {
    /// Reads and parses the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        parse_config(path)
    }

    /// Parses manifest text; `file` is only used in error messages.
    pub fn parse(content: &str, file: &str) -> Result<Self> {
        let manifest = toml::from_str(content).map_err(|e| GenError::ManifestParse {
            file: file.to_string(),
            reason: e.to_string().trim_end().to_string(),
        })?;
        Ok(manifest)
    }

    /// Builds sources and targets. Template paths resolve against `base_dir`.
    ///
    /// # Errors
    ///
    /// [`GenError::ManifestParse`] for malformed entries, duplicate target names,
    /// bad validator settings and unreadable templates; definition errors from
    /// [`Source::register`] pass through unchanged.
    pub fn build(&self, base_dir: &Path, file: &str) -> Result<Definitions> {
        let invalid = |reason: String| GenError::ManifestParse {
            file: file.to_string(),
            reason,
        };

        let mut sources = Vec::with_capacity(self.sources.len());
        for spec in &self.sources {
            let mut source = Source::new(spec.name.as_str());
            for variable in &spec.variables {
                source.register(variable.to_definition().map_err(&invalid)?)?;
            }
            for case in &spec.cases {
                let defs = case
                    .variables
                    .iter()
                    .map(VariableSpec::to_definition)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(&invalid)?;
                source.when(&case.switch, &case.case, defs)?;
            }
            sources.push(source);
        }

        let mut seen = BTreeSet::new();
        let mut targets = Vec::with_capacity(self.targets.len());
        for spec in &self.targets {
            if !seen.insert(spec.name.as_str()) {
                return Err(invalid(format!("target '{}' is declared more than once", spec.name)).into());
            }
            let body = spec.load_body(base_dir).map_err(|e| invalid(format!("{e:#}")))?;
            targets.push(spec.to_target(body));
        }

        tracing::debug!("Manifest {file}: {} source(s), {} target(s)", sources.len(), targets.len());
        Ok(Definitions {
            sources,
            targets,
        })
    }
}

impl VariableSpec {
    fn to_definition(&self) -> std::result::Result<VariableDef, String> {
        let name = self.name.as_str();
        let set = [self.default.is_some(), self.calculate.is_some(), self.digest.is_some()];
        if set.iter().filter(|s| **s).count() > 1 {
            return Err(format!("variable '{name}' sets more than one of default, calculate and digest"));
        }
        if self.inputs.is_some() && self.calculate.is_none() {
            return Err(format!("variable '{name}' declares inputs without a calculate expression"));
        }

        let calculator = if let Some(expression) = &self.calculate {
            let inputs: Vec<String> = match &self.inputs {
                Some(inputs) => inputs.clone(),
                None => extract_references(expression).into_iter().collect(),
            };
            Some(Calculator::template(inputs, expression.as_str()))
        } else {
            self.digest.as_ref().map(|inputs| Calculator::digest(inputs.iter().cloned()))
        };

        let mut def = match (calculator, &self.default) {
            (Some(calculator), _) => {
                VariableDef::calculated(name, if self.late { calculator.late() } else { calculator })
            }
            (None, _) if self.late => {
                return Err(format!("variable '{name}' is late but has no calculate or digest"));
            }
            (None, Some(value)) => VariableDef::default_value(name, value.as_str()),
            (None, None) => VariableDef::required(name),
        };

        if let Some(validators) = &self.validate {
            for spec in validators.specs() {
                let validator = spec.build().map_err(|e| format!("variable '{name}': {e}"))?;
                def = def.with_validator(validator);
            }
        }
        if self.secret {
            def = def.secret();
        }
        Ok(def)
    }
}

impl TargetSpec {
    fn load_body(&self, base_dir: &Path) -> Result<String> {
        match (&self.template, &self.body) {
            (Some(_), Some(_)) => {
                anyhow::bail!("target '{}' sets both template and body", self.name)
            }
            (Some(template), None) => {
                let path: PathBuf = base_dir.join(template);
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read template for '{}': {}", self.name, path.display()))
            }
            (None, Some(body)) => Ok(body.clone()),
            (None, None) => Ok(String::new()),
        }
    }

    fn to_target(&self, body: String) -> Target {
        let mut target = Target::from_template(self.name.as_str(), body).requiring(self.required.iter().cloned());
        for condition in &self.conditions {
            target = target.when(condition.switch.as_str(), condition.case.as_str(), condition.required.iter().cloned());
        }
        target
    }
}

/// Loads the manifest at `path` and builds its definitions.
pub fn load_definitions(path: &Path) -> Result<Definitions> {
    let manifest = Manifest::load(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    manifest.build(base_dir, &path.display().to_string())
}
