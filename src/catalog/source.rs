//! Sources: named, ordered bundles of variable definitions.
//!
//! A source is what a platform or provider contributes to the catalog, e.g.
//! "aws defaults". Sources are composed left to right into a [`Catalog`].
//! A source may also carry conditional bundles that only apply when a switch
//! variable resolves to a given value.
//!
//! [`Catalog`]: super::Catalog

use super::VariableDef;
use crate::constants::is_reserved_key;
use crate::core::{GenError, GenResult};

/// Definitions active only when `switch` resolves to `case`.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// Variable whose value selects the bundle
    pub switch: String,
    /// Value that activates the bundle
    pub case: String,
    /// Definitions in registration order
    pub entries: Vec<VariableDef>,
}

/// A named bundle of catalog entries.
#[derive(Debug, Clone, Default)]
pub struct Source {
    name: String,
    entries: Vec<VariableDef>,
    cases: Vec<SwitchCase>,
}

impl Source {
    /// Creates an empty source.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            cases: Vec::new(),
        }
    }

    /// Source name, used in error messages.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a definition.
    ///
    /// A source defines each name once; a second registration fails with
    /// [`GenError::DuplicateVariable`]. The reserved view keys cannot be defined.
    pub fn register(&mut self, def: VariableDef) -> GenResult<()> {
        check_registrable(&def)?;
        if self.entries.iter().any(|e| e.name() == def.name()) {
            return Err(GenError::DuplicateVariable {
                name: def.name().to_string(),
                source_name: format!("source '{}'", self.name),
            });
        }
        self.entries.push(def);
        Ok(())
    }

    /// Builder form of [`Source::register`].
    pub fn with(mut self, def: VariableDef) -> GenResult<Self> {
        self.register(def)?;
        Ok(self)
    }

    /// Registers definitions that apply only when `switch` resolves to `case`.
    ///
    /// Registering the same `(switch, case)` pair twice extends the existing bundle, with
    /// the same duplicate rule as [`Source::register`].
    pub fn when<I>(&mut self, switch: &str, case: &str, defs: I) -> GenResult<()>
    where
        I: IntoIterator<Item = VariableDef>,
    {
        let index = match self.cases.iter().position(|c| c.switch == switch && c.case == case) {
            Some(index) => index,
            None => {
                self.cases.push(SwitchCase {
                    switch: switch.to_string(),
                    case: case.to_string(),
                    entries: Vec::new(),
                });
                self.cases.len() - 1
            }
        };

        for def in defs {
            check_registrable(&def)?;
            if def.name() == switch {
                return Err(GenError::ConflictingDefinition {
                    name: switch.to_string(),
                    reason: "a variable cannot be defined conditionally on its own value".to_string(),
                });
            }
            let bundle = &mut self.cases[index];
            if bundle.entries.iter().any(|e| e.name() == def.name()) {
                return Err(GenError::DuplicateVariable {
                    name: def.name().to_string(),
                    source_name: format!("source '{}' (when {switch} = {case})", self.name),
                });
            }
            bundle.entries.push(def);
        }
        Ok(())
    }

    /// Unconditional definitions in registration order.
    #[must_use]
    pub fn entries(&self) -> &[VariableDef] {
        &self.entries
    }

    /// Conditional bundles in registration order.
    #[must_use]
    pub fn cases(&self) -> &[SwitchCase] {
        &self.cases
    }
}

fn check_registrable(def: &VariableDef) -> GenResult<()> {
    if is_reserved_key(def.name()) {
        return Err(GenError::ConflictingDefinition {
            name: def.name().to_string(),
            reason: "the name is reserved for a synthesized configuration view".to_string(),
        });
    }
    Ok(())
}
