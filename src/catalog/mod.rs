//! Variable catalog: typed definitions, sources, targets and their composition.
//!
//! The catalog is the explicit registry of every variable a resolution run may
//! compute. It is built once from an ordered list of [`Source`]s and is immutable
//! afterwards, so a single composed catalog can be shared (behind an `Arc`) by any
//! number of independent resolution runs.
//!
//! # Composition rules
//!
//! Sources merge left to right:
//! - a later default replaces an earlier default for the same name;
//! - a calculator and a default for the same name conflict
//!   ([`GenError::ConflictingDefinition`]);
//! - two calculators for the same name are duplicates ([`GenError::DuplicateVariable`]);
//! - a required-only declaration adopts whatever value the other source supplies;
//! - the secret flag is sticky and validators accumulate.
//!
//! Conditional bundles ([`Source::when`]) are merged per `(switch, case)` pair with
//! the same rules.
//!
//! # Example
//!
//! ```rust,no_run
//! use dcgen_cli::catalog::{Calculator, Catalog, Source, VariableDef};
//!
//! # fn example() -> dcgen_cli::core::GenResult<()> {
//! let defaults = Source::new("defaults")
//!     .with(VariableDef::default_value("cluster_name", "Mesosphere"))?
//!     .with(VariableDef::calculated(
//!         "bootstrap_id",
//!         Calculator::digest(["cluster_name"]),
//!     ))?;
//! let catalog = Catalog::compose(&[defaults])?;
//! assert!(catalog.lookup("bootstrap_id").is_ok());
//! # Ok(())
//! # }
//! ```

pub mod calculator;
pub mod source;
pub mod target;
pub mod validators;

pub use calculator::{Calculator, Inputs};
pub use source::{Source, SwitchCase};
pub use target::{ConditionalRequirement, Target};
pub use validators::{Validator, ValidatorSpec};

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use strsim::levenshtein;

use crate::constants::MASKED_VALUE;
use crate::core::{ArgumentDictionary, GenError, GenResult};

/// Maximum edit distance, as a percentage of the name length, for "did you mean" hints.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// How a variable obtains its value when the user does not supply one.
#[derive(Debug, Clone)]
pub enum ValueSource {
    /// A fixed default.
    Default(String),
    /// Computed from other variables.
    Calculated(Calculator),
    /// Declared only; the user must supply it.
    Required,
}

impl ValueSource {
    fn kind_name(&self) -> &'static str {
        match self {
            ValueSource::Default(_) => "default",
            ValueSource::Calculated(_) => "calculator",
            ValueSource::Required => "required",
        }
    }
}

/// How a variable in a finished run got its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    /// Supplied by the user.
    UserProvided,
    /// Taken from a catalog default.
    Default,
    /// Computed in the first pass.
    Calculated,
    /// Computed in the late-binding pass.
    LateBound,
    /// Synthesized by the secrecy projector.
    Synthesized,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariableKind::UserProvided => "user-provided",
            VariableKind::Default => "default",
            VariableKind::Calculated => "calculated",
            VariableKind::LateBound => "late-bound",
            VariableKind::Synthesized => "synthesized",
        };
        f.write_str(name)
    }
}

/// A single catalog entry.
#[derive(Debug, Clone)]
pub struct VariableDef {
    name: String,
    value: ValueSource,
    validators: Vec<Validator>,
    is_secret: bool,
}

impl VariableDef {
    /// Creates a definition from its parts.
    pub fn new(name: impl Into<String>, value: ValueSource) -> Self {
        Self {
            name: name.into(),
            value,
            validators: Vec::new(),
            is_secret: false,
        }
    }

    /// A variable with a fixed default.
    pub fn default_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, ValueSource::Default(value.into()))
    }

    /// A variable computed by `calculator`.
    pub fn calculated(name: impl Into<String>, calculator: Calculator) -> Self {
        Self::new(name, ValueSource::Calculated(calculator))
    }

    /// A variable the user must supply.
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, ValueSource::Required)
    }

    /// Adds a validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Flags the variable as secret.
    #[must_use]
    pub fn secret(mut self) -> Self {
        self.is_secret = true;
        self
    }

    /// Variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value source.
    #[must_use]
    pub fn value(&self) -> &ValueSource {
        &self.value
    }

    /// Validators, in registration order.
    #[must_use]
    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Whether the value must be masked.
    #[must_use]
    pub fn is_secret(&self) -> bool {
        self.is_secret
    }

    /// Calculator, if the variable is computed.
    #[must_use]
    pub fn calculator(&self) -> Option<&Calculator> {
        match &self.value {
            ValueSource::Calculated(calc) => Some(calc),
            _ => None,
        }
    }

    /// Runs every validator, returning the first failure as an invalid-value error.
    ///
    /// The value of a secret variable is masked in the reason.
    pub fn validate(&self, value: &str) -> GenResult<()> {
        for validator in &self.validators {
            validator.check(value).map_err(|e| {
                let mut reason = format!("{e:#}");
                if self.is_secret && !value.is_empty() {
                    reason = reason.replace(value, MASKED_VALUE);
                }
                GenError::InvalidVariableValue {
                    name: self.name.clone(),
                    reason,
                }
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    def: VariableDef,
    defined_by: String,
}

#[derive(Debug, Clone)]
struct ComposedCase {
    switch: String,
    case: String,
    entries: HashMap<String, Entry>,
}

/// The composed, immutable registry of variable definitions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    base: HashMap<String, Entry>,
    cases: Vec<ComposedCase>,
    order: HashMap<String, usize>,
    names_in_order: Vec<String>,
}

impl Catalog {
    /// Composes sources left to right.
    pub fn compose(sources: &[Source]) -> GenResult<Self> {
        let mut catalog = Catalog::default();

        for source in sources {
            for def in source.entries() {
                catalog.note_order(def.name());
                merge_into(&mut catalog.base, def.clone(), source.name())?;
            }

            for case in source.cases() {
                let index = catalog.case_index(&case.switch, &case.case);
                for def in &case.entries {
                    catalog.note_order(def.name());
                    merge_into(&mut catalog.cases[index].entries, def.clone(), source.name())?;
                }
            }
        }

        tracing::debug!(
            "Composed catalog from {} source(s): {} variable(s), {} conditional bundle(s)",
            sources.len(),
            catalog.names_in_order.len(),
            catalog.cases.len()
        );
        Ok(catalog)
    }

    fn note_order(&mut self, name: &str) {
        if !self.order.contains_key(name) {
            self.order.insert(name.to_string(), self.names_in_order.len());
            self.names_in_order.push(name.to_string());
        }
    }

    fn case_index(&mut self, switch: &str, case: &str) -> usize {
        if let Some(index) = self.cases.iter().position(|c| c.switch == switch && c.case == case) {
            return index;
        }
        self.cases.push(ComposedCase {
            switch: switch.to_string(),
            case: case.to_string(),
            entries: HashMap::new(),
        });
        self.cases.len() - 1
    }

    /// Unconditional definition of `name`.
    pub fn lookup(&self, name: &str) -> GenResult<&VariableDef> {
        self.base.get(name).map(|e| &e.def).ok_or_else(|| self.unknown(name))
    }

    fn unknown(&self, name: &str) -> GenError {
        GenError::UnknownVariable {
            name: name.to_string(),
            suggestions: self.similar_names(name),
        }
    }

    /// Defined names close to `name`, closest first.
    #[must_use]
    pub fn similar_names(&self, name: &str) -> Vec<String> {
        let threshold = (name.len() * SIMILARITY_THRESHOLD_PERCENT / 100).max(1);
        let mut scored: Vec<(usize, &String)> = self
            .names_in_order
            .iter()
            .map(|candidate| (levenshtein(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= threshold)
            .collect();
        scored.sort();
        scored.into_iter().take(3).map(|(_, n)| n.clone()).collect()
    }

    /// Switch variables whose value may change the definition of `name`.
    #[must_use]
    pub fn switches_for(&self, name: &str) -> Vec<&str> {
        let mut switches: Vec<&str> = Vec::new();
        for case in &self.cases {
            if case.entries.contains_key(name) && !switches.contains(&case.switch.as_str()) {
                switches.push(case.switch.as_str());
            }
        }
        switches
    }

    /// Definition of `name` given resolved switch values.
    ///
    /// The last composed bundle whose switch matches wins over the unconditional
    /// definition. Callers must resolve [`Catalog::switches_for`] first.
    #[must_use]
    pub fn active_definition(&self, name: &str, values: &ArgumentDictionary) -> Option<&VariableDef> {
        self.cases
            .iter()
            .rev()
            .filter(|c| values.get(&c.switch) == Some(&c.case))
            .find_map(|c| c.entries.get(name))
            .or_else(|| self.base.get(name))
            .map(|e| &e.def)
    }

    /// Position of first registration; undefined names sort last.
    #[must_use]
    pub fn order_of(&self, name: &str) -> usize {
        self.order.get(name).copied().unwrap_or(usize::MAX)
    }

    /// Every defined name in registration order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names_in_order
    }

    /// Names flagged secret by any definition.
    #[must_use]
    pub fn secret_variables(&self) -> BTreeSet<String> {
        self.base
            .values()
            .chain(self.cases.iter().flat_map(|c| c.entries.values()))
            .filter(|e| e.def.is_secret())
            .map(|e| e.def.name().to_string())
            .collect()
    }

}

fn merge_into(entries: &mut HashMap<String, Entry>, incoming: VariableDef, source: &str) -> GenResult<()> {
    let Some(existing) = entries.get_mut(incoming.name()) else {
        entries.insert(
            incoming.name().to_string(),
            Entry {
                def: incoming,
                defined_by: source.to_string(),
            },
        );
        return Ok(());
    };

    let name = incoming.name().to_string();
    let VariableDef {
        value,
        validators,
        is_secret,
        ..
    } = incoming;

    let existing_kind = existing.def.value.kind_name();
    match (existing_kind, &value) {
        ("calculator", ValueSource::Calculated(_)) => {
            return Err(GenError::DuplicateVariable {
                name,
                source_name: format!(
                    "composition of sources '{}' and '{source}' (both supply a calculator)",
                    existing.defined_by
                ),
            });
        }
        ("calculator", ValueSource::Default(_)) | ("default", ValueSource::Calculated(_)) => {
            return Err(GenError::ConflictingDefinition {
                reason: format!(
                    "source '{}' and source '{source}' supply both a default and a calculator",
                    existing.defined_by
                ),
                name,
            });
        }
        (_, ValueSource::Required) => {}
        _ => {
            tracing::trace!(
                "Source '{source}' overrides {existing_kind} of '{name}' from '{}'",
                existing.defined_by
            );
            existing.def.value = value;
            existing.defined_by = source.to_string();
        }
    }

    existing.def.validators.extend(validators);
    existing.def.is_secret |= is_secret;
    Ok(())
}
