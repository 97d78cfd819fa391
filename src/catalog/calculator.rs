//! Calculators: pure functions computing a variable from other variables.
//!
//! Every calculator declares the exact list of inputs it reads. The evaluator hands it
//! an [`Inputs`] view that only answers for those names, so the dependency graph built
//! from the declarations is always accurate. Reading anything else fails with
//! [`GenError::UndeclaredInput`], even if the calculator swallows the error.
//!
//! Three flavours exist:
//! - native closures ([`Calculator::new`]),
//! - Tera expressions over the declared inputs ([`Calculator::template`]),
//! - SHA-256 digests of the declared inputs ([`Calculator::digest`]).

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use tera::{Context as TeraContext, Tera};

use crate::constants::is_reserved_key;
use crate::core::{ArgumentDictionary, GenError, GenResult};
use crate::templating::utils::extract_references;

type CalcFn = dyn Fn(&Inputs<'_>) -> Result<String> + Send + Sync;

/// Restricted view of the argument dictionary passed to a calculator.
pub struct Inputs<'a> {
    owner: &'a str,
    declared: &'a [String],
    values: &'a ArgumentDictionary,
    violation: RefCell<Option<String>>,
}

impl<'a> Inputs<'a> {
    fn new(owner: &'a str, declared: &'a [String], values: &'a ArgumentDictionary) -> Self {
        Self {
            owner,
            declared,
            values,
            violation: RefCell::new(None),
        }
    }

    /// Returns the value of a declared input.
    pub fn get(&self, name: &str) -> GenResult<&'a str> {
        if !self.declared.iter().any(|d| d == name) {
            self.violation.borrow_mut().get_or_insert_with(|| name.to_string());
            return Err(GenError::UndeclaredInput {
                calculator: self.owner.to_string(),
                input: name.to_string(),
            });
        }
        self.values.get(name).map(String::as_str).ok_or_else(|| GenError::Internal {
            message: format!(
                "calculator for '{}' ran before its input '{name}' was resolved",
                self.owner
            ),
        })
    }

    /// Declared input names, in declaration order.
    #[must_use]
    pub fn declared(&self) -> &'a [String] {
        self.declared
    }
}

/// A calculator with its declared inputs.
#[derive(Clone)]
pub struct Calculator {
    inputs: Vec<String>,
    late: bool,
    description: String,
    func: Arc<CalcFn>,
}

impl Calculator {
    /// Wraps a closure reading `inputs`.
    pub fn new<I, S, F>(inputs: I, func: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&Inputs<'_>) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            late: false,
            description: "native".to_string(),
            func: Arc::new(func),
        }
    }

    /// A calculator rendering a Tera expression against its declared inputs.
    ///
    /// Every name the expression references is read through [`Inputs::get`], so an
    /// expression naming an undeclared variable fails the same way a closure would.
    pub fn template<I, S>(inputs: I, expression: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let expression = expression.into();
        let referenced: Vec<String> = extract_references(&expression).into_iter().collect();
        let description = format!("template `{expression}`");

        let mut calc = Self::new(inputs, move |inputs: &Inputs<'_>| {
            let mut context = TeraContext::new();
            for name in &referenced {
                context.insert(name.as_str(), inputs.get(name)?);
            }
            Tera::one_off(&expression, &context, false)
                .map_err(|e| anyhow::anyhow!("template expression failed: {}", tera_message(&e)))
        });
        calc.description = description;
        calc
    }

    /// A calculator producing the hex SHA-256 of `name=value` lines for every input.
    pub fn digest<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut calc = Self::new(inputs, |inputs: &Inputs<'_>| {
            let mut hasher = Sha256::new();
            for name in inputs.declared() {
                hasher.update(name.as_bytes());
                hasher.update(b"=");
                hasher.update(inputs.get(name)?.as_bytes());
                hasher.update(b"\n");
            }
            Ok(hex::encode(hasher.finalize()))
        });
        calc.description = "sha256 digest".to_string();
        calc
    }

    /// Marks the calculator late-bound: it only runs in the second pass.
    #[must_use]
    pub fn late(mut self) -> Self {
        self.late = true;
        self
    }

    /// Declared inputs, in declaration order.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// True when the calculator was marked late or reads one of the synthesized views.
    #[must_use]
    pub fn is_late(&self) -> bool {
        self.late || self.inputs.iter().any(|i| is_reserved_key(i))
    }

    /// Runs the calculator for variable `name` against `values`.
    ///
    /// Undeclared reads surface as [`GenError::UndeclaredInput`]; any other failure is
    /// reported as an invalid value for `name`.
    pub fn evaluate(&self, name: &str, values: &ArgumentDictionary) -> GenResult<String> {
        let inputs = Inputs::new(name, &self.inputs, values);
        let result = (self.func)(&inputs);

        if let Some(input) = inputs.violation.into_inner() {
            return Err(GenError::UndeclaredInput {
                calculator: name.to_string(),
                input,
            });
        }

        result.map_err(|e| match e.downcast_ref::<GenError>() {
            Some(inner) if matches!(inner, GenError::Internal { .. }) => inner.clone(),
            _ => GenError::InvalidVariableValue {
                name: name.to_string(),
                reason: format!("{e:#}"),
            },
        })
    }
}

impl fmt::Debug for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculator")
            .field("inputs", &self.inputs)
            .field("late", &self.late)
            .field("kind", &self.description)
            .finish()
    }
}

fn tera_message(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message.replace("'__tera_one_off'", "expression")
}
