/*
 * tokenizer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Argument list tokenizer.
//!
//! Splits the raw text between a call's parentheses into top-level
//! parameters and classifies each one. A comma only separates parameters
//! when it is outside quotes, outside `(...)` and `[...]`, and not part of an
//! embedded `data:<mime>;base64,<payload>` URI.
//!
//! The same scanner also locates the closing parenthesis of `IF(`, `MATH(`
//! and method-call argument lists, so every construct agrees on how quotes
//! and nesting behave.

use crate::error::{TemplateError, TemplateResult};
use crate::value::Value;

/// One parameter of a call, before resolution against the row.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedParameter {
    /// A literal string or number.
    Literal(Value),
    /// A `::column::` reference.
    Column(String),
    /// A nested `::~Target->method(...)~::` expression.
    Call(String),
    /// A bracketed `[a, b]` list.
    List(Vec<ParsedParameter>),
}

/// Where the scanner is inside an embedded data URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataUri {
    Outside,
    /// Between `data:` and the comma that ends the header.
    Header,
    /// Inside the base64 payload.
    Payload,
}

fn is_payload_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | '-' | '_' | '%')
}

/// Split a raw argument string into trimmed top-level parameters.
///
/// Empty (or all-whitespace) input yields no parameters. Unterminated quotes
/// and unbalanced brackets are parse errors.
pub fn split_params(raw: &str) -> TemplateResult<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut params = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut data_uri = DataUri::Outside;
    let mut parens: i32 = 0;
    let mut brackets: i32 = 0;

    for (i, c) in raw.char_indices() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match data_uri {
            DataUri::Header => {
                current.push(c);
                if c == ',' {
                    data_uri = DataUri::Payload;
                }
                continue;
            }
            DataUri::Payload if is_payload_char(c) => {
                current.push(c);
                continue;
            }
            DataUri::Payload => data_uri = DataUri::Outside,
            DataUri::Outside => {}
        }

        match c {
            'd' if raw[i..].starts_with("data:")
                && !raw[..i].ends_with(|p: char| p.is_ascii_alphanumeric()) =>
            {
                data_uri = DataUri::Header;
                current.push(c);
            }
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '(' => {
                parens += 1;
                current.push(c);
            }
            ')' => {
                parens -= 1;
                if parens < 0 {
                    return Err(TemplateError::parse(format!("unbalanced ')' in '{}'", raw)));
                }
                current.push(c);
            }
            '[' => {
                brackets += 1;
                current.push(c);
            }
            ']' => {
                brackets -= 1;
                if brackets < 0 {
                    return Err(TemplateError::parse(format!("unbalanced ']' in '{}'", raw)));
                }
                current.push(c);
            }
            ',' if parens == 0 && brackets == 0 => {
                params.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(TemplateError::parse(format!("unterminated quote in '{}'", raw)));
    }
    if parens != 0 || brackets != 0 {
        return Err(TemplateError::parse(format!("unbalanced brackets in '{}'", raw)));
    }

    params.push(current.trim().to_string());
    Ok(params)
}

/// Find the `)` matching the `(` at byte offset `open`.
///
/// Quoted text is skipped. Returns `None` if `open` is not a `(` or the
/// parenthesis is never closed.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    if !text[open..].starts_with('(') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Whether `name` is a plain or table-qualified column name.
pub fn is_column_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Strip matching surrounding quotes and resolve backslash escapes.
///
/// Returns `None` when `text` is not a quoted literal.
pub fn unquote(text: &str) -> Option<String> {
    let mut chars = text.chars();
    let first = chars.next()?;
    if !matches!(first, '\'' | '"') || text.len() < 2 || !text.ends_with(first) {
        return None;
    }
    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Classify one raw parameter.
pub fn classify(raw: &str) -> TemplateResult<ParsedParameter> {
    let text = raw.trim();

    if text.starts_with("::~") && text.ends_with("~::") && text.len() >= 6 {
        return Ok(ParsedParameter::Call(text.to_string()));
    }

    if let Some(name) = text
        .strip_prefix("::")
        .and_then(|rest| rest.strip_suffix("::"))
    {
        if is_column_name(name) {
            return Ok(ParsedParameter::Column(name.to_string()));
        }
    }

    if let Some(literal) = unquote(text) {
        return Ok(ParsedParameter::Literal(Value::from_literal(&literal)));
    }

    if let Some(inner) = text.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        let items = split_params(inner)?
            .iter()
            .map(|item| classify(item))
            .collect::<TemplateResult<Vec<_>>>()?;
        return Ok(ParsedParameter::List(items));
    }

    Ok(ParsedParameter::Literal(Value::from_literal(text)))
}

/// Split and classify a raw argument string.
pub fn tokenize(raw: &str) -> TemplateResult<Vec<ParsedParameter>> {
    split_params(raw)?.iter().map(|p| classify(p)).collect()
}
