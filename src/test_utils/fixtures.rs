//! Test fixtures: sample manifests, user configurations and catalogs.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{Calculator, Source, Target, VariableDef, validators};
use crate::constants::EXPANDED_CONFIG;

/// A sample `dcgen.toml` plus the template files it refers to.
#[derive(Clone, Debug)]
pub struct ManifestFixture {
    pub name: String,
    pub content: String,
    /// (relative path, body)
    pub templates: Vec<(String, String)>,
}

impl ManifestFixture {
    /// A small cloud cluster: required settings, a calculated id, a provider switch,
    /// a secret and a late-bound summary of the expanded config.
    pub fn cluster() -> Self {
        Self {
            name: "cluster".to_string(),
            content: r#"
[[source]]
name = "common"

[[source.variable]]
name = "cluster_name"
validate = { kind = "non_empty" }

[[source.variable]]
name = "resolvers"
validate = { kind = "ipv4_address_list" }

[[source.variable]]
name = "provider"
default = "onprem"
validate = { kind = "one_of", values = ["onprem", "azure", "aws"] }

[[source.variable]]
name = "bootstrap_id"
calculate = "{{ cluster_name }}-bootstrap"

[[source.variable]]
name = "superuser_password"
secret = true

[[source.variable]]
name = "config_summary"
calculate = "{{ expanded_config | length }}"
late = true

[[source.when]]
switch = "provider"
case = "azure"

[[source.when.variable]]
name = "azure_location"
default = "westus"

[[target]]
name = "cloud-config.yaml"
template = "templates/cloud-config.yaml"

[[target]]
name = "dcos-config.yaml"
template = "templates/dcos-config.yaml"

[[target.when]]
switch = "provider"
case = "azure"
required = ["azure_location"]
"#
            .trim_start()
            .to_string(),
            templates: vec![
                (
                    "templates/cloud-config.yaml".to_string(),
                    "#cloud-config\ncluster: {{ cluster_name }}\nbootstrap_id: {{ bootstrap_id }}\nresolvers: {{ resolvers }}\n"
                        .to_string(),
                ),
                (
                    "templates/dcos-config.yaml".to_string(),
                    "provider: {{ provider }}\n{% if provider == \"azure\" %}location: {{ azure_location }}\n{% endif %}password: {{ superuser_password }}\nsummary: {{ config_summary }}\n"
                        .to_string(),
                ),
            ],
        }
    }

    /// A manifest whose calculators depend on each other in a loop.
    pub fn cyclic() -> Self {
        Self {
            name: "cyclic".to_string(),
            content: r#"
[[source]]
name = "loop"

[[source.variable]]
name = "a"
calculate = "{{ b }}"

[[source.variable]]
name = "b"
calculate = "{{ a }}"

[[target]]
name = "out"
body = "{{ a }}"
"#
            .trim_start()
            .to_string(),
            templates: Vec::new(),
        }
    }

    /// Writes the manifest as `dcgen.toml` plus its templates under `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        for (relative, body) in &self.templates {
            let path = dir.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, body).with_context(|| format!("Failed to write template {}", path.display()))?;
        }
        let path = dir.join("dcgen.toml");
        fs::write(&path, &self.content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// A sample `config.yaml`.
#[derive(Clone, Debug)]
pub struct ConfigFixture {
    pub content: String,
}

impl ConfigFixture {
    /// Complete configuration for [`ManifestFixture::cluster`].
    pub fn cluster() -> Self {
        Self {
            content: "cluster_name: test\nresolvers:\n  - 168.63.129.16\nsuperuser_password: s3cr3t-pw\n".to_string(),
        }
    }

    pub fn azure() -> Self {
        let mut fixture = Self::cluster();
        fixture.content.push_str("provider: azure\n");
        fixture
    }

    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join("config.yaml");
        fs::write(&path, &self.content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// In-code catalog matching the `bootstrap_id` scenario: cluster name and resolvers
/// are required, `bootstrap_id` is derived from the cluster name.
pub fn bootstrap_sources(with_calculator: bool) -> Vec<Source> {
    let mut common = Source::new("common");
    let mut register = |def: VariableDef| {
        // Fixture definitions are statically valid.
        common.register(def).unwrap_or_else(|e| panic!("invalid fixture definition: {e}"));
    };
    register(VariableDef::required("cluster_name"));
    register(VariableDef::required("resolvers").with_validator(validators::ipv4_address_list()));
    if with_calculator {
        register(VariableDef::calculated(
            "bootstrap_id",
            Calculator::new(["cluster_name"], |i| Ok(format!("{}-bootstrap", i.get("cluster_name")?))),
        ));
    }
    vec![common]
}

/// The target of the `bootstrap_id` scenario.
pub fn bootstrap_target() -> Target {
    Target::new(
        "cloud-config.yaml",
        ["resolvers", "cluster_name", "bootstrap_id"],
        "cluster: {{ cluster_name }}\nbootstrap_id: {{ bootstrap_id }}\nresolvers: {{ resolvers }}\n",
    )
}

/// A source with one late root reading the expanded config and one dependent.
pub fn late_sources() -> Vec<Source> {
    let mut source = Source::new("late");
    let mut register = |def: VariableDef| {
        source.register(def).unwrap_or_else(|e| panic!("invalid fixture definition: {e}"));
    };
    register(VariableDef::default_value("cluster_name", "prod"));
    register(VariableDef::calculated(
        "config_lines",
        Calculator::new([EXPANDED_CONFIG], |i| Ok(i.get(EXPANDED_CONFIG)?.lines().count().to_string())),
    ));
    register(VariableDef::calculated(
        "config_report",
        Calculator::new(["config_lines"], |i| Ok(format!("{} line(s)", i.get("config_lines")?))),
    ));
    vec![source]
}
