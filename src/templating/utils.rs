//! Utility functions for the templating system.

use std::collections::BTreeSet;

/// Words that never name a template variable.
const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "if", "elif", "else", "endif", "for", "endfor", "set",
    "set_global", "true", "false", "True", "False", "loop", "break", "continue", "as",
    "with", "raw", "endraw", "filter", "endfilter", "__tera_context",
];

/// Statement tags whose bodies hold no variable references worth tracking.
const OPAQUE_TAGS: &[&str] = &[
    "raw", "endraw", "block", "endblock", "macro", "endmacro", "include", "import",
    "extends", "filter", "endfilter",
];

/// Collect the top-level variable names a Tera template reads.
///
/// Scans `{{ ... }}` expressions and `{% ... %}` statements. Filters, function
/// calls, attribute accesses, keyword arguments, `is` tests, string literals and
/// loop or `set` bindings are not references. Comments (`{# ... #}`) are skipped.
///
/// # Examples
///
/// ```
/// use dcgen_cli::templating::extract_references;
///
/// let names = extract_references("{{ cluster_name | upper }} {% if oauth_enabled %}x{% endif %}");
/// assert!(names.contains("cluster_name"));
/// assert!(names.contains("oauth_enabled"));
/// assert!(!names.contains("upper"));
/// ```
#[must_use]
pub fn extract_references(template: &str) -> BTreeSet<String> {
    let mut references = BTreeSet::new();
    let mut bound = BTreeSet::new();
    let mut rest = template;

    while let Some(start) = find_block_start(rest) {
        let opener = &rest[start..start + 2];
        let body_start = start + 2;
        let closer = match opener {
            "{{" => "}}",
            "{%" => "%}",
            _ => "#}",
        };
        let Some(len) = rest[body_start..].find(closer) else {
            break;
        };
        let body = rest[body_start..body_start + len].trim_matches(|c: char| c == '-' || c.is_whitespace());

        match opener {
            "{{" => collect_expression(body, &mut references),
            "{%" => collect_statement(body, &mut references, &mut bound),
            _ => {}
        }
        rest = &rest[body_start + len + 2..];
    }

    references.retain(|name| !bound.contains(name));
    references
}

fn find_block_start(text: &str) -> Option<usize> {
    ["{{", "{%", "{#"].iter().filter_map(|opener| text.find(opener)).min()
}

fn collect_statement(body: &str, references: &mut BTreeSet<String>, bound: &mut BTreeSet<String>) {
    let tokens = tokenize(body);
    let Some(Token::Ident(tag)) = tokens.first() else {
        return;
    };
    if OPAQUE_TAGS.contains(&tag.as_str()) {
        return;
    }

    match tag.as_str() {
        "for" => {
            let in_pos = tokens.iter().position(|t| matches!(t, Token::Ident(w) if w == "in"));
            if let Some(in_pos) = in_pos {
                for token in &tokens[1..in_pos] {
                    if let Token::Ident(name) = token {
                        bound.insert(name.clone());
                    }
                }
                scan_tokens(&tokens[in_pos + 1..], references);
            }
        }
        "set" | "set_global" => {
            if let Some(Token::Ident(name)) = tokens.get(1) {
                bound.insert(name.clone());
            }
            if let Some(eq) = tokens.iter().position(|t| matches!(t, Token::Punct('='))) {
                scan_tokens(&tokens[eq + 1..], references);
            }
        }
        _ => scan_tokens(&tokens[1..], references),
    }
}

fn collect_expression(body: &str, references: &mut BTreeSet<String>) {
    scan_tokens(&tokenize(body), references);
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Punct(char),
    Literal,
}

fn tokenize(body: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' | '`' => {
                for next in chars.by_ref() {
                    if next == c {
                        break;
                    }
                }
                tokens.push(Token::Literal);
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = c.to_string();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            c if c.is_ascii_digit() => {
                while chars.peek().is_some_and(|n| n.is_ascii_alphanumeric() || *n == '.') {
                    chars.next();
                }
                tokens.push(Token::Literal);
            }
            c if c.is_whitespace() => {}
            c => tokens.push(Token::Punct(c)),
        }
    }
    tokens
}

fn scan_tokens(tokens: &[Token], references: &mut BTreeSet<String>) {
    for (i, token) in tokens.iter().enumerate() {
        let Token::Ident(name) = token else {
            continue;
        };
        if KEYWORDS.contains(&name.as_str()) {
            continue;
        }

        let prev = i.checked_sub(1).and_then(|p| tokens.get(p));
        if matches!(prev, Some(Token::Punct('|' | '.'))) {
            continue;
        }
        if is_test_name(tokens, i) {
            continue;
        }

        match (tokens.get(i + 1), tokens.get(i + 2)) {
            (Some(Token::Punct('(')), _) => continue,
            (Some(Token::Punct('=')), next) if next != Some(&Token::Punct('=')) => continue,
            _ => {}
        }

        references.insert(name.clone());
    }
}

/// True when the identifier at `i` follows `is` or `is not`.
fn is_test_name(tokens: &[Token], i: usize) -> bool {
    let word = |offset: usize| match i.checked_sub(offset).and_then(|p| tokens.get(p)) {
        Some(Token::Ident(w)) => Some(w.as_str()),
        _ => None,
    };
    word(1) == Some("is") || (word(1) == Some("not") && word(2) == Some("is"))
}
