//! Variable resolution for dcgen.
//!
//! This module turns user arguments, a composed [`Catalog`] and a set of [`Target`]s
//! into a complete, validated argument dictionary.
//!
//! # Architecture Overview
//!
//! A resolution run has three stages:
//!
//! ## Stage 1: First pass ([`evaluator`])
//! - **Seed**: user arguments enter the dictionary first and are never overridden
//! - **Demand**: every name a target requires is demanded; a demanded calculator
//!   demands its declared inputs, a conditional definition demands its switch
//! - **Evaluate**: the ready variable earliest in catalog registration order is
//!   evaluated and validated, one at a time, until nothing is pending
//! - **Defer**: late roots and their dependents receive a placeholder
//!
//! ## Stage 2: Projection ([`crate::secrecy`])
//! - Secrets are classified and the six configuration views are inserted under the
//!   reserved keys
//!
//! ## Stage 3: Late binding ([`late_bind`])
//! - Deferred variables are evaluated in dependency order with the views present
//!
//! # Failure Model
//!
//! - Missing and invalid values are collected across the whole run and raised as one
//!   [`GenError::ValidationFailed`]
//! - A dependency cycle, a nested late binding or an undeclared calculator read
//!   aborts the run immediately
//! - A failed run never yields a partial dictionary
//!
//! # Concurrency
//!
//! A run is synchronous and owns all of its state. The composed catalog is immutable
//! and shared behind an [`Arc`], so independent runs may proceed on different threads.
//!
//! # Example
//!
//! ```rust,no_run
//! use dcgen_cli::catalog::{Calculator, Source, Target, VariableDef};
//! use dcgen_cli::core::ArgumentDictionary;
//! use dcgen_cli::resolver::resolve;
//!
//! # fn example() -> dcgen_cli::core::GenResult<()> {
//! let source = Source::new("defaults")
//!     .with(VariableDef::required("cluster_name"))?
//!     .with(VariableDef::calculated("bootstrap_id", Calculator::digest(["cluster_name"])))?;
//! let targets = vec![Target::new("cluster.conf", ["cluster_name", "bootstrap_id"], "")];
//!
//! let mut user = ArgumentDictionary::new();
//! user.insert("cluster_name".to_string(), "test".to_string());
//!
//! let resolution = resolve(&user, &[source], &targets)?;
//! assert!(resolution.get("bootstrap_id").is_some());
//! # Ok(())
//! # }
//! ```

pub mod dependency_graph;
pub mod evaluator;
pub mod late_bind;

pub use dependency_graph::DependencyGraph;
pub use evaluator::placeholder;
pub use late_bind::LateBindingPass;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::catalog::{Catalog, Source, Target, VariableKind};
use crate::core::{ArgumentDictionary, GenResult};
use crate::secrecy;
use evaluator::{Evaluation, Run};

/// Resolves argument dictionaries against one composed catalog.
#[derive(Debug, Clone)]
pub struct Resolver {
    catalog: Arc<Catalog>,
}

impl Resolver {
    /// Creates a resolver sharing `catalog`.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
        }
    }

    /// Composes `sources` and wraps the result.
    pub fn from_sources(sources: &[Source]) -> GenResult<Self> {
        Ok(Self::new(Arc::new(Catalog::compose(sources)?)))
    }

    /// The shared catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Runs one resolution.
    ///
    /// # Errors
    ///
    /// - [`GenError::ValidationFailed`] listing every missing or invalid variable
    /// - [`GenError::CircularDependency`] when calculators depend on each other in a loop
    /// - [`GenError::NestedLateBinding`] when a late root depends on another late root
    /// - [`GenError::UndeclaredInput`] when a calculator reads a name it did not declare
    ///
    /// [`GenError::ValidationFailed`]: crate::core::GenError::ValidationFailed
    /// [`GenError::CircularDependency`]: crate::core::GenError::CircularDependency
    /// [`GenError::NestedLateBinding`]: crate::core::GenError::NestedLateBinding
    /// [`GenError::UndeclaredInput`]: crate::core::GenError::UndeclaredInput
    pub fn resolve(&self, user_arguments: &ArgumentDictionary, targets: &[Target]) -> GenResult<Resolution> {
        tracing::debug!(
            "Resolving {} target(s) with {} user argument(s)",
            targets.len(),
            user_arguments.len()
        );

        let mut run = Run::new(&self.catalog, user_arguments, targets);
        run.first_pass()?;
        let Evaluation {
            mut values,
            mut kinds,
            graph,
            deferred,
            consulted,
        } = run.finish();

        let flagged = self.catalog.secret_variables();
        let first_pass_secrets = secrecy::classify_secrets(&flagged, &values, &kinds, &graph);
        for (key, view) in secrecy::project(user_arguments, &values, &first_pass_secrets)? {
            kinds.insert(key.clone(), VariableKind::Synthesized);
            values.insert(key, view);
        }

        let late_bound = LateBindingPass::new(&self.catalog).run(&mut values, &deferred, &graph)?;
        let secrets = secrecy::classify_secrets(&flagged, &values, &kinds, &graph);

        let unused_arguments: Vec<String> =
            user_arguments.keys().filter(|key| !consulted.contains(*key)).cloned().collect();
        if !unused_arguments.is_empty() {
            tracing::warn!(
                "Ignoring {} user argument(s) no target needs: {}",
                unused_arguments.len(),
                unused_arguments.join(", ")
            );
        }

        let resolution = Resolution {
            arguments: values,
            kinds,
            secrets,
            unused_arguments,
            graph,
        };
        tracing::info!(
            "Resolved {} variable(s): {} user-provided, {} default, {} calculated, {} late-bound",
            resolution.arguments.len(),
            resolution.count(VariableKind::UserProvided),
            resolution.count(VariableKind::Default),
            resolution.count(VariableKind::Calculated),
            late_bound
        );
        Ok(resolution)
    }
}

/// Composes `sources` and resolves `user_arguments` for `targets` in one call.
pub fn resolve(user_arguments: &ArgumentDictionary, sources: &[Source], targets: &[Target]) -> GenResult<Resolution> {
    Resolver::from_sources(sources)?.resolve(user_arguments, targets)
}

/// Result of a successful resolution run.
#[derive(Debug, Clone)]
pub struct Resolution {
    arguments: ArgumentDictionary,
    kinds: BTreeMap<String, VariableKind>,
    secrets: BTreeSet<String>,
    unused_arguments: Vec<String>,
    graph: DependencyGraph,
}

impl Resolution {
    /// The final argument dictionary, views included.
    pub fn arguments(&self) -> &ArgumentDictionary {
        &self.arguments
    }

    /// Consumes the resolution, keeping only the dictionary.
    pub fn into_arguments(self) -> ArgumentDictionary {
        self.arguments
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.arguments.get(name).map(String::as_str)
    }

    /// How `name` got its value.
    pub fn kind(&self, name: &str) -> Option<VariableKind> {
        self.kinds.get(name).copied()
    }

    pub fn kinds(&self) -> &BTreeMap<String, VariableKind> {
        &self.kinds
    }

    fn count(&self, kind: VariableKind) -> usize {
        self.kinds.values().filter(|k| **k == kind).count()
    }

    /// Every name whose value must never be shown.
    pub fn secrets(&self) -> &BTreeSet<String> {
        &self.secrets
    }

    pub fn is_secret(&self, name: &str) -> bool {
        self.secrets.contains(name)
    }

    /// User keys no target needed, sorted.
    pub fn unused_arguments(&self) -> &[String] {
        &self.unused_arguments
    }

    /// Dependency graph built during the run.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// The dictionary with every secret value masked; safe to log.
    pub fn masked_arguments(&self) -> ArgumentDictionary {
        secrecy::mask(&self.arguments, &self.secrets)
    }

    /// What `name` reads, as a tree; `None` when the run never touched `name`.
    pub fn dependency_tree(&self, name: &str) -> Option<String> {
        self.graph.contains(name).then(|| self.graph.to_tree_string(name))
    }
}
