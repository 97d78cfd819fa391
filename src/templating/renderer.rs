//! Template rendering engine with Tera.
//!
//! Rendering is a pure function of a template body and the final argument
//! dictionary. Every argument is exposed to the template as a top-level string.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use strsim::levenshtein;
use tera::{Context as TeraContext, Tera};

use super::error::{ErrorLocation, TemplateError};
use super::filters;
use super::utils::extract_references;
use crate::catalog::Target;
use crate::core::{ArgumentDictionary, GenError, GenResult};

/// Maximum allowed Levenshtein distance as a percentage of target length for suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Lines of template shown on each side of an error line.
const CONTEXT_LINES: usize = 3;

/// Renders `template` against `arguments`.
///
/// `name` only labels errors. Autoescaping is off: output documents are YAML, JSON
/// and shell, never HTML.
pub fn render(name: &str, template: &str, arguments: &ArgumentDictionary) -> Result<String, TemplateError> {
    let mut context = TeraContext::new();
    for (key, value) in arguments {
        context.insert(key.as_str(), value);
    }

    let mut tera = Tera::default();
    tera.autoescape_on(Vec::new());
    tera.register_filter("from_json", filters::create_from_json_filter());

    tera.render_str(template, &context)
        .map_err(|e| parse_tera_error(&e, name, template, arguments))
}

/// Renders one target after checking that every name it needs is present.
///
/// Names the template references, and the target's active requirements, must all be
/// in `arguments`. Names listed only under a conditional requirement are checked when
/// their condition holds; a branch that reads them anyway fails during rendering.
pub fn render_target(target: &Target, arguments: &ArgumentDictionary) -> GenResult<String> {
    let conditional: BTreeSet<&str> = target
        .conditions()
        .iter()
        .flat_map(|c| c.names.iter().map(String::as_str))
        .collect();

    let mut needed = target.active_requirements(arguments);
    needed.extend(
        extract_references(target.template())
            .into_iter()
            .filter(|name| !conditional.contains(name.as_str())),
    );

    let missing: Vec<String> = needed.into_iter().filter(|name| !arguments.contains_key(name)).collect();
    if !missing.is_empty() {
        return Err(GenError::UnresolvedReference {
            target: target.name().to_string(),
            names: missing,
        });
    }

    let document = render(target.name(), target.template(), arguments)?;
    tracing::debug!("Rendered target '{}' ({} bytes)", target.name(), document.len());
    Ok(document)
}

/// Renders every target, failing as a whole if any one fails.
pub fn render_all(targets: &[Target], arguments: &ArgumentDictionary) -> GenResult<BTreeMap<String, String>> {
    let mut documents = BTreeMap::new();
    for target in targets {
        let document = render_target(target, arguments)?;
        insert_document(&mut documents, target.name(), document)?;
    }
    Ok(documents)
}

/// Renders every target concurrently on the blocking pool.
///
/// Produces exactly what [`render_all`] produces for the same inputs.
pub async fn render_all_parallel(
    targets: Vec<Target>,
    arguments: Arc<ArgumentDictionary>,
) -> GenResult<BTreeMap<String, String>> {
    let tasks = targets.into_iter().map(|target| {
        let arguments = Arc::clone(&arguments);
        async move {
            tokio::task::spawn_blocking(move || {
                render_target(&target, &arguments).map(|doc| (target.name().to_string(), doc))
            })
            .await
            .map_err(|e| GenError::Internal {
                message: format!("Task join error during rendering: {e}"),
            })?
        }
    });

    let rendered = futures::future::try_join_all(tasks).await?;

    let mut documents = BTreeMap::new();
    for (name, document) in rendered {
        insert_document(&mut documents, &name, document)?;
    }
    Ok(documents)
}

fn insert_document(documents: &mut BTreeMap<String, String>, name: &str, document: String) -> GenResult<()> {
    if documents.insert(name.to_string(), document).is_some() {
        return Err(GenError::Internal {
            message: format!("two targets are named '{name}'"),
        });
    }
    Ok(())
}

/// Parse a Tera error into a structured TemplateError
fn parse_tera_error(
    error: &tera::Error,
    name: &str,
    template: &str,
    arguments: &ArgumentDictionary,
) -> TemplateError {
    let messages = error_chain(error);
    let line_number = messages.iter().find_map(|m| extract_line_number(m));
    let location = Box::new(ErrorLocation {
        target: name.to_string(),
        line_number,
        context_lines: line_number.map(|line| extract_context_lines(template, line)).unwrap_or_default(),
    });

    if let Some(variable) = messages.iter().find_map(|m| extract_variable_name(m)) {
        let suggestions = find_similar_variables(&variable, arguments);
        return TemplateError::VariableNotFound {
            variable,
            suggestions,
            location,
        };
    }

    TemplateError::SyntaxError {
        message: format_tera_error(&messages),
        location,
    }
}

fn error_chain(error: &tera::Error) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut current = std::error::Error::source(error);
    while let Some(cause) = current {
        messages.push(cause.to_string());
        current = cause.source();
    }
    messages
}

/// Extract variable name from "Variable `foo` not found" message
fn extract_variable_name(message: &str) -> Option<String> {
    let re = Regex::new(r"Variable `([^`]+)` not found").ok()?;
    let caps = re.captures(message)?;
    // `a.b` means attribute `b` of `a` is missing; report the top-level name.
    let full = caps.get(1)?.as_str();
    Some(full.split('.').next().unwrap_or(full).to_string())
}

/// Tera prints parse positions as `--> line:column`.
fn extract_line_number(message: &str) -> Option<usize> {
    let re = Regex::new(r"--> (\d+):(\d+)").ok()?;
    re.captures(message)?.get(1)?.as_str().parse().ok()
}

fn extract_context_lines(template: &str, line: usize) -> Vec<(usize, String)> {
    let lines: Vec<&str> = template.lines().collect();
    if line == 0 || line > lines.len() {
        return Vec::new();
    }
    let start = line.saturating_sub(CONTEXT_LINES + 1);
    let end = (line + CONTEXT_LINES).min(lines.len());
    lines[start..end].iter().enumerate().map(|(i, l)| (start + i + 1, (*l).to_string())).collect()
}

fn find_similar_variables(target: &str, arguments: &ArgumentDictionary) -> Vec<String> {
    let threshold = (target.len() * SIMILARITY_THRESHOLD_PERCENT / 100).max(1);
    let mut scored: Vec<(usize, &String)> = arguments
        .keys()
        .map(|key| (levenshtein(target, key), key))
        .filter(|(distance, _)| *distance <= threshold)
        .collect();
    scored.sort();
    scored.into_iter().take(3).map(|(_, key)| key.clone()).collect()
}

/// Joins the useful parts of a Tera error chain, dropping the internal template name.
fn format_tera_error(messages: &[String]) -> String {
    let cleaned: Vec<String> = messages
        .iter()
        .map(|msg| {
            msg.replace("while rendering '__tera_one_off'", "")
                .replace("Failed to render '__tera_one_off'", "")
                .replace("Failed to parse '__tera_one_off'", "")
                .replace("'__tera_one_off'", "template")
                .trim()
                .to_string()
        })
        .filter(|msg| !msg.is_empty())
        .collect();

    if cleaned.is_empty() {
        "Template syntax error".to_string()
    } else {
        cleaned.join("\n  → ")
    }
}
