/*
 * math.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Arithmetic placeholders: `::MATH(::price:: * ::qty::)::`.
//!
//! Evaluation happens in three steps:
//!
//! 1. Column tokens are replaced by their numeric value (or `0`).
//! 2. The result must consist only of digits, spaces, `+ - * / ( ) .`.
//! 3. A recursive-descent parser evaluates it with the usual precedence.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::{TemplateError, TemplateResult};
use crate::eval_context::EvalContext;
use crate::placeholder::{PLACEHOLDER, resolve_column_numeric};
use crate::tokenizer::matching_paren;
use crate::value::format_number;

const MARKER: &str = "::MATH(";

static MATH_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9 +\-*/().]+$").expect("math charset pattern is valid"));

/// Replace every `::MATH(...)::` block in `template` with its result.
///
/// Failed expressions become empty strings. Blocks whose parentheses never
/// close are left in place.
pub fn resolve_all(template: &str, ctx: &mut EvalContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(MARKER) {
        let open = start + MARKER.len() - 1;
        let Some(close) = matching_paren(rest, open).filter(|&c| rest[c + 1..].starts_with("::"))
        else {
            out.push_str(&rest[..open]);
            rest = &rest[open..];
            continue;
        };
        out.push_str(&rest[..start]);
        let result = evaluate(&rest[open + 1..close], ctx);
        out.push_str(&ctx.text_or_recover(result));
        rest = &rest[close + 3..];
    }

    out.push_str(rest);
    out
}

/// Evaluate one arithmetic expression against the row.
pub fn evaluate(expression: &str, ctx: &mut EvalContext) -> TemplateResult<String> {
    let substituted = PLACEHOLDER
        .replace_all(expression, |caps: &Captures| {
            let value = resolve_column_numeric(&caps[1], ctx);
            match value.as_number() {
                Some(n) => format_number(n),
                None => {
                    if !value.is_null() {
                        ctx.report(&TemplateError::NonNumeric {
                            column: caps[1].to_string(),
                        });
                    }
                    "0".to_string()
                }
            }
        })
        .into_owned();

    if !MATH_CHARSET.is_match(&substituted) {
        return Err(match substituted.chars().find(|c| !is_math_char(*c)) {
            Some(found) => TemplateError::MathCharset {
                expression: substituted.clone(),
                found,
            },
            None => TemplateError::MathSyntax {
                expression: substituted.clone(),
                message: "empty expression".to_string(),
            },
        });
    }

    let value = Arithmetic::new(&substituted).parse()?;
    if !value.is_finite() {
        return Err(TemplateError::MathSyntax {
            expression: substituted,
            message: "result is out of range".to_string(),
        });
    }
    Ok(format_number((value * 1e10).round() / 1e10))
}

fn is_math_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '*' | '/' | '(' | ')' | '.')
}

/// Recursive-descent evaluator over a vetted expression.
///
/// ```text
/// expr   := term (('+' | '-') term)*
/// term   := factor (('*' | '/') factor)*
/// factor := ('+' | '-') factor | number | '(' expr ')'
/// ```
struct Arithmetic<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Arithmetic<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn parse(mut self) -> TemplateResult<f64> {
        let value = self.expr()?;
        self.skip_spaces();
        if self.pos < self.bytes.len() {
            return Err(self.error(format!(
                "unexpected '{}' at offset {}",
                self.bytes[self.pos] as char, self.pos
            )));
        }
        Ok(value)
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::MathSyntax {
            expression: self.source.to_string(),
            message: message.into(),
        }
    }

    fn skip_spaces(&mut self) {
        while self.bytes.get(self.pos) == Some(&b' ') {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_spaces();
        self.bytes.get(self.pos).copied()
    }

    fn expr(&mut self) -> TemplateResult<f64> {
        let mut value = self.term()?;
        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            if op == b'+' {
                value += rhs;
            } else {
                value -= rhs;
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> TemplateResult<f64> {
        let mut value = self.factor()?;
        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == b'*' {
                value *= rhs;
            } else if rhs == 0.0 {
                return Err(TemplateError::DivisionByZero {
                    expression: self.source.to_string(),
                });
            } else {
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> TemplateResult<f64> {
        match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some(b'+') => {
                self.pos += 1;
                self.factor()
            }
            Some(b'(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.peek() != Some(b')') {
                    return Err(self.error("missing ')'"));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(b'0'..=b'9' | b'.') => self.number(),
            Some(other) => Err(self.error(format!(
                "unexpected '{}' at offset {}",
                other as char, self.pos
            ))),
            None => Err(self.error("unexpected end of expression")),
        }
    }

    fn number(&mut self) -> TemplateResult<f64> {
        let start = self.pos;
        while matches!(self.bytes.get(self.pos), Some(b'0'..=b'9' | b'.')) {
            self.pos += 1;
        }
        let text = &self.source[start..self.pos];
        text.parse::<f64>()
            .map_err(|_| self.error(format!("invalid number '{}'", text)))
    }
}
