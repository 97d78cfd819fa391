//! Error handling for dcgen
//!
//! This module provides the error type shared by every stage of the engine and the
//! user-friendly reporting used by the CLI. The error system is designed around two
//! core principles:
//! 1. **Strongly-typed errors** so callers can match on the failure kind
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Error Categories
//!
//! - **Definition errors** raised while composing sources: [`GenError::DuplicateVariable`],
//!   [`GenError::ConflictingDefinition`], [`GenError::UnknownVariable`]. These are
//!   programming errors in the catalog and are fatal.
//! - **Per-run validation errors**: [`GenError::MissingRequiredVariable`] and
//!   [`GenError::InvalidVariableValue`]. The resolver collects them for the whole run and
//!   raises them together as [`GenError::ValidationFailed`].
//! - **Structural run errors**: [`GenError::CircularDependency`],
//!   [`GenError::NestedLateBinding`] and [`GenError::UndeclaredInput`]. Fatal, raised at once.
//! - **Internal consistency errors**: [`GenError::UnresolvedReference`] and
//!   [`GenError::Internal`]. These indicate a bug rather than bad input.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dcgen_cli::core::{GenError, ErrorContext, user_friendly_error};
//!
//! let error = GenError::MissingRequiredVariable {
//!     name: "bootstrap_url".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for dcgen operations
///
/// Every variant carries owned strings so the type is cheap to clone into an
/// [`ErrorContext`] and can be aggregated inside [`GenError::ValidationFailed`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenError {
    /// A variable was registered twice inside one source, or two sources both
    /// supply a calculator for the same name.
    #[error("Variable '{name}' is defined more than once in {source_name}")]
    DuplicateVariable {
        /// Variable name
        name: String,
        /// Source (or composition) where the duplicate was found
        source_name: String,
    },

    /// A calculator and a default were supplied for the same variable, or a source
    /// tried to define one of the reserved keys.
    #[error("Conflicting definitions for variable '{name}': {reason}")]
    ConflictingDefinition {
        /// Variable name
        name: String,
        /// Why the definitions cannot be merged
        reason: String,
    },

    /// Lookup of a name that no source defines.
    #[error("Unknown variable '{name}'")]
    UnknownVariable {
        /// Variable name
        name: String,
        /// Close matches among the defined names
        suggestions: Vec<String>,
    },

    /// Calculators depend on each other in a loop.
    #[error("Circular dependency between variables: {}", .unresolved.join(", "))]
    CircularDependency {
        /// Every variable left unresolved when evaluation stalled
        unresolved: Vec<String>,
        /// One concrete cycle, first element repeated at the end
        cycle: Vec<String>,
    },

    /// A needed variable has no user value, no default and no calculator.
    #[error("Missing required variable '{name}'")]
    MissingRequiredVariable {
        /// Variable name
        name: String,
    },

    /// A validator rejected a value, or a calculator failed to produce one.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidVariableValue {
        /// Variable name
        name: String,
        /// Validator or calculator message
        reason: String,
    },

    /// A late-bound variable depends on another late-bound variable.
    #[error("Variable '{name}' is late-bound and depends on late-bound variable '{depends_on}'")]
    NestedLateBinding {
        /// The dependent late-bound variable
        name: String,
        /// The late-bound variable it reads
        depends_on: String,
    },

    /// A calculator read an input it did not declare.
    #[error("Calculator for '{calculator}' read undeclared input '{input}'")]
    UndeclaredInput {
        /// Variable whose calculator misbehaved
        calculator: String,
        /// Name it tried to read
        input: String,
    },

    /// A template references names absent from the argument dictionary.
    #[error("Template '{target}' references unresolved variables: {}", .names.join(", "))]
    UnresolvedReference {
        /// Target whose template failed
        target: String,
        /// Names missing from the dictionary
        names: Vec<String>,
    },

    /// A template could not be parsed or evaluated.
    #[error("Failed to render template '{target}': {reason}")]
    TemplateRender {
        /// Target whose template failed
        target: String,
        /// Tera message, cleaned up
        reason: String,
    },

    /// Aggregate of every missing/invalid variable found in one run.
    #[error("Configuration validation failed with {} error(s):\n{}", .errors.len(), format_error_list(.errors))]
    ValidationFailed {
        /// Collected per-variable errors, in discovery order
        errors: Vec<GenError>,
    },

    /// Definitions manifest could not be read or parsed.
    #[error("Failed to parse manifest {file}: {reason}")]
    ManifestParse {
        /// Manifest path
        file: String,
        /// Parser message
        reason: String,
    },

    /// User configuration could not be read or parsed.
    #[error("Failed to parse configuration {file}: {reason}")]
    ConfigParse {
        /// Configuration path
        file: String,
        /// Parser message
        reason: String,
    },

    /// Invariant broken inside the engine.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the broken invariant
        message: String,
    },
}

fn format_error_list(errors: &[GenError]) -> String {
    errors.iter().map(|e| format!("  - {e}")).collect::<Vec<_>>().join("\n")
}

impl GenError {
    /// True for failures that indicate a bug in the engine or its inputs' consistency
    /// rather than a user configuration problem.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, GenError::UnresolvedReference { .. } | GenError::Internal { .. })
    }

    /// Names of the variables reported missing, flattening an aggregate.
    #[must_use]
    pub fn missing_variables(&self) -> Vec<&str> {
        match self {
            GenError::MissingRequiredVariable {
                name,
            } => vec![name.as_str()],
            GenError::ValidationFailed {
                errors,
            } => errors.iter().flat_map(GenError::missing_variables).collect(),
            _ => Vec::new(),
        }
    }

    /// Names of the variables reported invalid, flattening an aggregate.
    #[must_use]
    pub fn invalid_variables(&self) -> Vec<&str> {
        match self {
            GenError::InvalidVariableValue {
                name,
                ..
            } => vec![name.as_str()],
            GenError::ValidationFailed {
                errors,
            } => errors.iter().flat_map(GenError::invalid_variables).collect(),
            _ => Vec::new(),
        }
    }
}

/// Error wrapper carrying a suggestion and details for display.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: GenError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Creates a context without suggestion or details.
    #[must_use]
    pub fn new(error: GenError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Adds a suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Adds details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into an [`ErrorContext`] with suggestions where the error kind is known.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(gen_error) = error.downcast_ref::<GenError>() {
        return create_error_context(gen_error.clone());
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(GenError::ManifestParse {
            file: "dcgen.toml".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of the definitions manifest")
        .with_details("TOML parsing errors are usually caused by missing quotes or mismatched brackets");
    }

    if let Some(yaml_error) = error.downcast_ref::<serde_yaml::Error>() {
        return ErrorContext::new(GenError::ConfigParse {
            file: "config.yaml".to_string(),
            reason: yaml_error.to_string(),
        })
        .with_suggestion("Check the YAML syntax of the configuration file")
        .with_details("The configuration must be a mapping of variable names to values");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(GenError::Internal {
        message,
    })
}

fn create_error_context(error: GenError) -> ErrorContext {
    match &error {
        GenError::DuplicateVariable {
            name,
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Remove one of the definitions of '{name}'"))
            .with_details("A source may define a variable once; composed sources may share defaults but not calculators"),

        GenError::ConflictingDefinition {
            name,
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Define '{name}' either as a default or as a calculated value, not both"))
            .with_details("This is a problem in the definitions manifest, not in the user configuration"),

        GenError::UnknownVariable {
            suggestions,
            ..
        } => {
            let ctx = ErrorContext::new(error.clone());
            if suggestions.is_empty() {
                ctx.with_suggestion("Check the variable name against the definitions manifest")
            } else {
                ctx.with_suggestion(format!("Did you mean: {}?", suggestions.join(", ")))
            }
        }

        GenError::CircularDependency {
            cycle,
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Break the cycle by giving one of the variables a default or a user value")
            .with_details(format!("Cycle: {}", cycle.join(" → "))),

        GenError::MissingRequiredVariable {
            name,
        } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Set '{name}' in the configuration file or pass --set {name}=<value>")),

        GenError::ValidationFailed {
            errors,
        } => {
            let missing: Vec<&str> = errors.iter().flat_map(GenError::missing_variables).collect();
            let ctx = ErrorContext::new(error.clone())
                .with_details("Every problem found during resolution is listed above");
            if missing.is_empty() {
                ctx.with_suggestion("Fix the invalid values in the configuration file")
            } else {
                ctx.with_suggestion(format!("Add the missing variables to the configuration: {}", missing.join(", ")))
            }
        }

        GenError::NestedLateBinding {
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion("Late-bound variables may only read ordinary variables and the expanded views")
            .with_details("Chained late binding would require more than one additional resolution pass"),

        GenError::TemplateRender {
            target,
            ..
        } => ErrorContext::new(error.clone())
            .with_suggestion(format!("Check the template of target '{target}' for unclosed tags or unknown filters")),

        GenError::UnresolvedReference {
            ..
        }
        | GenError::Internal {
            ..
        } => ErrorContext::new(error.clone())
            .with_details("This is an internal consistency failure; resolution reported success but rendering could not complete"),

        _ => ErrorContext::new(error.clone()),
    }
}
