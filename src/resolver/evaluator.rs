//! First-pass evaluation.
//!
//! The evaluator works from demands. Target requirements are demanded first; a demanded
//! variable that cannot be produced yet demands whatever it waits on (its switch
//! variables, then its calculator inputs). Each iteration scans the pending variables
//! in catalog registration order and evaluates the first one that is ready, so the
//! result never depends on hash order.
//!
//! A user value for a variable with conditional definitions is held back until its
//! switches resolve, then validated against the definition that applies.
//!
//! Missing and invalid values are collected and reported together at the end.
//! A stall (pending variables, none ready, no new demands) is a dependency cycle and
//! aborts at once, as do undeclared calculator reads and nested late binding.

use std::collections::{BTreeMap, BTreeSet};

use super::DependencyGraph;
use crate::catalog::{Calculator, Catalog, Target, ValueSource, VariableDef, VariableKind};
use crate::constants::{LATE_BIND_PLACEHOLDER_END, LATE_BIND_PLACEHOLDER_START, is_reserved_key};
use crate::core::{ArgumentDictionary, GenError, GenResult};

/// Placeholder value stored for a deferred variable during the first pass.
#[must_use]
pub fn placeholder(name: &str) -> String {
    format!("{LATE_BIND_PLACEHOLDER_START}{name}{LATE_BIND_PLACEHOLDER_END}")
}

enum Plan<'c> {
    Ready(Step<'c>),
    Wait(Vec<String>),
    Blocked(String),
    Missing,
}

enum Step<'c> {
    User {
        def: Option<&'c VariableDef>,
        value: String,
    },
    Default {
        def: &'c VariableDef,
        value: &'c str,
    },
    Calculate {
        def: &'c VariableDef,
        calculator: &'c Calculator,
    },
    Defer {
        root: String,
    },
}

/// State handed from the first pass to the projector and the late-binding pass.
#[derive(Debug, Default)]
pub(crate) struct Evaluation {
    pub values: ArgumentDictionary,
    pub kinds: BTreeMap<String, VariableKind>,
    pub graph: DependencyGraph,
    /// Deferred variable → the late root it waits on
    pub deferred: BTreeMap<String, String>,
    /// User keys the run actually read
    pub consulted: BTreeSet<String>,
}

pub(crate) struct Run<'c> {
    catalog: &'c Catalog,
    user_arguments: &'c ArgumentDictionary,
    targets: &'c [Target],
    state: Evaluation,
    pending: BTreeSet<String>,
    failed: BTreeSet<String>,
    /// User values waiting for their switches
    held: ArgumentDictionary,
    errors: Vec<GenError>,
}

impl<'c> Run<'c> {
    pub fn new(catalog: &'c Catalog, user_arguments: &'c ArgumentDictionary, targets: &'c [Target]) -> Self {
        Self {
            catalog,
            user_arguments,
            targets,
            state: Evaluation::default(),
            pending: BTreeSet::new(),
            failed: BTreeSet::new(),
            held: ArgumentDictionary::new(),
            errors: Vec::new(),
        }
    }

    /// Runs the first pass to completion.
    pub fn first_pass(&mut self) -> GenResult<()> {
        self.seed();
        self.demand_targets();

        loop {
            let mut progressed = false;
            let mut ready: Option<(String, Step<'c>)> = None;

            for name in self.pending_in_order() {
                match self.plan(&name)? {
                    Plan::Wait(deps) => {
                        for dep in deps {
                            progressed |= self.demand(&dep, Some(&name));
                        }
                    }
                    Plan::Blocked(dep) => {
                        tracing::trace!("'{name}' is blocked by failed variable '{dep}'");
                        self.fail(&name);
                        progressed = true;
                    }
                    Plan::Missing => {
                        self.errors.push(GenError::MissingRequiredVariable {
                            name: name.clone(),
                        });
                        self.fail(&name);
                        progressed = true;
                    }
                    Plan::Ready(step) => {
                        if ready.is_none() {
                            ready = Some((name, step));
                        }
                    }
                }
            }

            if let Some((name, step)) = ready {
                self.apply(&name, step)?;
                self.activate_conditions();
                continue;
            }
            if self.pending.is_empty() {
                break;
            }
            if !progressed {
                return Err(self.stall_error());
            }
        }

        self.settle_held();
        self.check_condition_switches()?;

        if !self.errors.is_empty() {
            return Err(GenError::ValidationFailed {
                errors: std::mem::take(&mut self.errors),
            });
        }
        Ok(())
    }

    pub fn finish(self) -> Evaluation {
        self.state
    }

    /// Seeds the dictionary with user values, validating each against the
    /// unconditional catalog definition of its name.
    fn seed(&mut self) {
        let user_arguments = self.user_arguments;
        for (name, value) in user_arguments {
            if is_reserved_key(name) {
                self.errors.push(GenError::InvalidVariableValue {
                    name: name.clone(),
                    reason: "the name is reserved for a synthesized configuration view and cannot be set"
                        .to_string(),
                });
                continue;
            }
            if value.contains(LATE_BIND_PLACEHOLDER_START) {
                self.errors.push(GenError::InvalidVariableValue {
                    name: name.clone(),
                    reason: format!("value contains the reserved marker {LATE_BIND_PLACEHOLDER_START}"),
                });
                self.failed.insert(name.clone());
                continue;
            }
            if !self.catalog.switches_for(name).is_empty() {
                self.held.insert(name.clone(), value.clone());
                continue;
            }
            if let Ok(def) = self.catalog.lookup(name)
                && let Err(error) = def.validate(value)
            {
                self.errors.push(error);
                self.failed.insert(name.clone());
                continue;
            }
            self.state.values.insert(name.clone(), value.clone());
            self.state.kinds.insert(name.clone(), VariableKind::UserProvided);
        }
    }

    fn demand_targets(&mut self) {
        let targets = self.targets;
        for target in targets {
            for name in target.required_variables() {
                self.demand(name, None);
            }
            for condition in target.conditions() {
                self.demand(&condition.switch, None);
            }
        }
        self.activate_conditions();
    }

    /// Demands the names of every target condition whose switch now matches.
    fn activate_conditions(&mut self) {
        let targets = self.targets;
        for target in targets {
            for condition in target.conditions() {
                if self.state.values.get(&condition.switch) == Some(&condition.case) {
                    for name in &condition.names {
                        if self.demand(name, None) {
                            tracing::debug!(
                                "'{name}' required by '{}' because {} = {}",
                                target.name(),
                                condition.switch,
                                condition.case
                            );
                        }
                    }
                }
            }
        }
    }

    /// Registers a need for `name`; returns true when it became newly pending.
    fn demand(&mut self, name: &str, by: Option<&str>) -> bool {
        match by {
            Some(by) => self.state.graph.add_dependency(by, name),
            None => {
                self.state.graph.add_node(name);
            }
        }
        if is_reserved_key(name) {
            return false;
        }
        if self.user_arguments.contains_key(name) {
            self.state.consulted.insert(name.to_string());
        }
        if self.state.values.contains_key(name) || self.failed.contains(name) || self.pending.contains(name) {
            return false;
        }
        self.pending.insert(name.to_string())
    }

    fn pending_in_order(&self) -> Vec<String> {
        let catalog = self.catalog;
        let mut names: Vec<String> = self.pending.iter().cloned().collect();
        names.sort_by(|a, b| (catalog.order_of(a), a).cmp(&(catalog.order_of(b), b)));
        names
    }

    fn plan(&mut self, name: &str) -> GenResult<Plan<'c>> {
        let catalog = self.catalog;

        let mut waiting = Vec::new();
        for switch in catalog.switches_for(name) {
            self.state.graph.add_dependency(name, switch);
            if self.failed.contains(switch) {
                return Ok(Plan::Blocked(switch.to_string()));
            }
            if self.state.deferred.contains_key(switch) {
                return Err(late_switch_error(switch));
            }
            if !self.state.values.contains_key(switch) {
                waiting.push(switch.to_string());
            }
        }
        if !waiting.is_empty() {
            return Ok(Plan::Wait(waiting));
        }

        if let Some(value) = self.held.get(name) {
            return Ok(Plan::Ready(Step::User {
                def: catalog.active_definition(name, &self.state.values),
                value: value.clone(),
            }));
        }

        let Some(def) = catalog.active_definition(name, &self.state.values) else {
            return Ok(Plan::Missing);
        };

        let calculator = match def.value() {
            ValueSource::Default(value) => {
                return Ok(Plan::Ready(Step::Default {
                    def,
                    value,
                }));
            }
            ValueSource::Required => return Ok(Plan::Missing),
            ValueSource::Calculated(calculator) => calculator,
        };

        for input in calculator.inputs() {
            self.state.graph.add_dependency(name, input);
            if is_reserved_key(input) {
                continue;
            }
            if self.failed.contains(input) {
                return Ok(Plan::Blocked(input.clone()));
            }
            if !self.state.values.contains_key(input) {
                waiting.push(input.clone());
            }
        }
        if !waiting.is_empty() {
            return Ok(Plan::Wait(waiting));
        }

        let deferred_root = calculator.inputs().iter().find_map(|input| self.state.deferred.get(input));
        if calculator.is_late() {
            if let Some(root) = deferred_root {
                return Err(GenError::NestedLateBinding {
                    name: name.to_string(),
                    depends_on: root.clone(),
                });
            }
            return Ok(Plan::Ready(Step::Defer {
                root: name.to_string(),
            }));
        }

        Ok(Plan::Ready(match deferred_root {
            Some(root) => Step::Defer {
                root: root.clone(),
            },
            None => Step::Calculate {
                def,
                calculator,
            },
        }))
    }

    fn apply(&mut self, name: &str, step: Step<'c>) -> GenResult<()> {
        self.pending.remove(name);

        match step {
            Step::User {
                def,
                value,
            } => {
                self.held.remove(name);
                self.accept_user(name, def, value);
            }
            Step::Default {
                def,
                value,
            } => self.accept(name, def, value.to_string(), VariableKind::Default),
            Step::Calculate {
                def,
                calculator,
            } => match calculator.evaluate(name, &self.state.values) {
                Ok(value) => self.accept(name, def, value, VariableKind::Calculated),
                Err(error @ (GenError::UndeclaredInput { .. } | GenError::Internal { .. })) => {
                    return Err(error);
                }
                Err(error) => {
                    self.errors.push(error);
                    self.fail(name);
                }
            },
            Step::Defer {
                root,
            } => {
                tracing::debug!("Deferring '{name}' to the late-binding pass (late root '{root}')");
                self.state.values.insert(name.to_string(), placeholder(name));
                self.state.kinds.insert(name.to_string(), VariableKind::LateBound);
                self.state.deferred.insert(name.to_string(), root);
            }
        }
        Ok(())
    }

    fn accept(&mut self, name: &str, def: &VariableDef, value: String, kind: VariableKind) {
        if let Err(error) = def.validate(&value) {
            self.errors.push(error);
            self.fail(name);
            return;
        }
        tracing::debug!("Resolved '{name}' ({kind})");
        self.state.values.insert(name.to_string(), value);
        self.state.kinds.insert(name.to_string(), kind);
    }

    fn accept_user(&mut self, name: &str, def: Option<&VariableDef>, value: String) {
        match def {
            Some(def) => self.accept(name, def, value, VariableKind::UserProvided),
            None => {
                self.state.values.insert(name.to_string(), value);
                self.state.kinds.insert(name.to_string(), VariableKind::UserProvided);
            }
        }
    }

    /// Validates and stores held user values nothing demanded.
    fn settle_held(&mut self) {
        let catalog = self.catalog;
        for (name, value) in std::mem::take(&mut self.held) {
            let switches_resolved =
                catalog.switches_for(&name).iter().all(|switch| self.state.values.contains_key(*switch));
            let def = if switches_resolved {
                catalog.active_definition(&name, &self.state.values)
            } else {
                catalog.lookup(&name).ok()
            };
            self.accept_user(&name, def, value);
        }
    }

    fn fail(&mut self, name: &str) {
        self.pending.remove(name);
        self.failed.insert(name.to_string());
    }

    fn stall_error(&self) -> GenError {
        let cycle = self.state.graph.find_cycle_among(&self.pending).unwrap_or_default();
        GenError::CircularDependency {
            unresolved: self.pending.iter().cloned().collect(),
            cycle,
        }
    }

    fn check_condition_switches(&self) -> GenResult<()> {
        for target in self.targets {
            for condition in target.conditions() {
                if self.state.deferred.contains_key(&condition.switch) {
                    return Err(late_switch_error(&condition.switch));
                }
            }
        }
        Ok(())
    }
}

fn late_switch_error(switch: &str) -> GenError {
    GenError::ConflictingDefinition {
        name: switch.to_string(),
        reason: "a late-bound variable cannot select conditional definitions or requirements".to_string(),
    }
}
