//! Structured template errors for dcgen
//!
//! Tera reports failures as a chain of loosely formatted messages. This module turns
//! them into [`TemplateError`] values carrying the target name, the line (when Tera
//! reports one) and a few lines of surrounding template text, and converts them into
//! [`GenError`] for the rest of the engine.

use crate::core::GenError;

/// Template errors with location context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    VariableNotFound {
        variable: String,
        suggestions: Vec<String>,
        location: Box<ErrorLocation>,
    },

    SyntaxError {
        message: String,
        location: Box<ErrorLocation>,
    },
}

/// Location information for template errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLocation {
    /// Target whose template failed
    pub target: String,
    /// Line number if available from Tera
    pub line_number: Option<usize>,
    /// Lines around the error, 1-indexed
    pub context_lines: Vec<(usize, String)>,
}

impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateError::VariableNotFound {
                variable,
                ..
            } => {
                write!(f, "Template variable not found: '{}'", variable)
            }
            TemplateError::SyntaxError {
                message,
                ..
            } => {
                write!(f, "Template syntax error: {}", message)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

impl TemplateError {
    /// Target the error belongs to.
    pub fn target(&self) -> &str {
        match self {
            TemplateError::VariableNotFound {
                location,
                ..
            }
            | TemplateError::SyntaxError {
                location,
                ..
            } => &location.target,
        }
    }

    /// Generate user-friendly error message with context and suggestions
    pub fn format_with_context(&self) -> String {
        match self {
            TemplateError::VariableNotFound {
                variable,
                suggestions,
                location,
            } => format_variable_not_found_error(variable, suggestions, location),
            TemplateError::SyntaxError {
                message,
                location,
            } => format_syntax_error(message, location),
        }
    }
}

impl From<TemplateError> for GenError {
    fn from(error: TemplateError) -> Self {
        match error {
            TemplateError::VariableNotFound {
                variable,
                location,
                ..
            } => GenError::UnresolvedReference {
                target: location.target,
                names: vec![variable],
            },
            TemplateError::SyntaxError {
                ..
            } => GenError::TemplateRender {
                target: error.target().to_string(),
                reason: error.format_with_context(),
            },
        }
    }
}

fn format_variable_not_found_error(
    variable: &str,
    suggestions: &[String],
    location: &ErrorLocation,
) -> String {
    let mut msg = String::new();

    msg.push_str(&format!("Variable: {}\n", variable));
    msg.push_str(&format!("Target: {}\n", location.target));
    if let Some(line) = location.line_number {
        msg.push_str(&format!("Line: {}\n", line));
    }

    if !suggestions.is_empty() {
        msg.push_str("Did you mean one of these?\n");
        for suggestion in suggestions {
            msg.push_str(&format!("  - {}\n", suggestion));
        }
    }

    msg.push_str(&format_context_lines(location));
    msg
}

fn format_syntax_error(message: &str, location: &ErrorLocation) -> String {
    let mut msg = String::new();

    msg.push_str(message);
    msg.push('\n');
    if let Some(line) = location.line_number {
        msg.push_str(&format!("Line: {}\n", line));
    }
    msg.push_str(&format_context_lines(location));
    msg.trim_end().to_string()
}

fn format_context_lines(location: &ErrorLocation) -> String {
    let mut msg = String::new();
    for (number, line) in &location.context_lines {
        let marker = if Some(*number) == location.line_number {
            ">"
        } else {
            " "
        };
        msg.push_str(&format!("{marker} {number:>4} | {line}\n"));
    }
    msg
}
