//! The late-binding pass.
//!
//! Some values can only be computed once every other value is final, typically
//! because they read one of the synthesized configuration views. A calculator that
//! reads a reserved key, or is marked `late`, is a *late root*. During the first pass
//! a late root, and every calculator that depends on one, receives a placeholder
//! instead of a value.
//!
//! After the projector has inserted the views, this pass evaluates exactly the
//! deferred variables in dependency order. Because a late root never depends on
//! another late root (the first pass rejects that with
//! [`GenError::NestedLateBinding`]), one pass always suffices.

use std::collections::{BTreeMap, BTreeSet};

use super::DependencyGraph;
use crate::catalog::{Catalog, ValueSource};
use crate::constants::is_reserved_key;
use crate::core::{ArgumentDictionary, GenError, GenResult};
use crate::secrecy::is_placeholder;

/// Second evaluation pass over the deferred variables.
pub struct LateBindingPass<'c> {
    catalog: &'c Catalog,
}

impl<'c> LateBindingPass<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
        }
    }

    /// Replaces every placeholder in `values` with its computed value.
    ///
    /// `deferred` maps each deferred variable to its late root; `graph` is the
    /// first-pass dependency graph. Invalid values are collected and reported as
    /// [`GenError::ValidationFailed`]. Returns the number of variables bound.
    pub fn run(
        &self,
        values: &mut ArgumentDictionary,
        deferred: &BTreeMap<String, String>,
        graph: &DependencyGraph,
    ) -> GenResult<usize> {
        let order: Vec<String> =
            graph.topological_order()?.into_iter().filter(|name| deferred.contains_key(name)).collect();

        let mut errors = Vec::new();
        let mut failed: BTreeSet<String> = BTreeSet::new();
        let mut bound = 0;

        for name in &order {
            let def = self.catalog.active_definition(name, values).ok_or_else(|| GenError::Internal {
                message: format!("deferred variable '{name}' has no active definition"),
            })?;

            let value = match def.value() {
                ValueSource::Default(value) => value.clone(),
                ValueSource::Required => {
                    errors.push(GenError::MissingRequiredVariable {
                        name: name.clone(),
                    });
                    failed.insert(name.clone());
                    continue;
                }
                ValueSource::Calculated(calculator) => {
                    if let Some(input) = calculator.inputs().iter().find(|i| failed.contains(*i)) {
                        tracing::trace!("'{name}' is blocked by failed late variable '{input}'");
                        failed.insert(name.clone());
                        continue;
                    }
                    if let Some(input) = calculator
                        .inputs()
                        .iter()
                        .find(|i| !is_reserved_key(i) && values.get(*i).is_none_or(|v| is_placeholder(v)))
                    {
                        return Err(GenError::Internal {
                            message: format!("late variable '{name}' evaluated before its input '{input}'"),
                        });
                    }
                    match calculator.evaluate(name, values) {
                        Ok(value) => value,
                        Err(error @ GenError::InvalidVariableValue { .. }) => {
                            errors.push(error);
                            failed.insert(name.clone());
                            continue;
                        }
                        Err(error) => return Err(error),
                    }
                }
            };

            if let Err(error) = def.validate(&value) {
                errors.push(error);
                failed.insert(name.clone());
                continue;
            }

            tracing::debug!("Late-bound '{name}' (root '{}')", deferred.get(name).map_or("?", String::as_str));
            values.insert(name.clone(), value);
            bound += 1;
        }

        if !errors.is_empty() {
            return Err(GenError::ValidationFailed {
                errors,
            });
        }

        verify_no_placeholders(values)?;
        Ok(bound)
    }
}

/// Fails with an internal error if any value still carries a placeholder.
pub fn verify_no_placeholders(values: &ArgumentDictionary) -> GenResult<()> {
    let leftover: Vec<&str> =
        values.iter().filter(|(_, value)| is_placeholder(value)).map(|(name, _)| name.as_str()).collect();
    if leftover.is_empty() {
        Ok(())
    } else {
        Err(GenError::Internal {
            message: format!("late-bind placeholders remain after the late pass: {}", leftover.join(", ")),
        })
    }
}
