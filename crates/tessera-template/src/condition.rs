/*
 * condition.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Boolean conditions used by `IF(...)` and `ELSEIF(...)`.
//!
//! ```text
//! cond := '(' cond ')'
//!       | cond (AND | OR) cond
//!       | column IN [v1, v2, ...]
//!       | column IS [NOT] NULL
//!       | column (= | != | > | <) value
//!       | column LIKE value
//! ```
//!
//! `AND` and `OR` have no relative precedence. A condition is split at the
//! first top-level connective and each side is parsed recursively, so
//! `a AND b OR c` means `a AND (b OR c)`. Existing templates rely on this.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{TemplateError, TemplateResult};
use crate::eval_context::EvalContext;
use crate::tokenizer::{is_column_name, matching_paren, split_params, unquote};
use crate::value::Value;

static IN_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(\S+)\s+IN\s*\[(.*)\]$").expect("IN pattern is valid")
});

static IS_NULL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\S+)\s+IS\s+(NOT\s+)?NULL$").expect("IS NULL pattern is valid")
});

static COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^([^\s=!<>]+)(?:\s*(!=|=|>|<)\s*|\s+(LIKE)\s+)(.*)$")
        .expect("comparison pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Like,
}

/// A parsed condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    In {
        column: String,
        values: Vec<String>,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    Compare {
        column: String,
        op: CompareOp,
        value: String,
    },
}

fn invalid(condition: &str, message: impl Into<String>) -> TemplateError {
    TemplateError::InvalidCondition {
        condition: condition.to_string(),
        message: message.into(),
    }
}

/// Parse a condition string.
pub fn parse(text: &str) -> TemplateResult<Condition> {
    let text = text.trim();
    if text.is_empty() {
        return Err(invalid(text, "empty condition"));
    }

    if text.starts_with('(') && matching_paren(text, 0) == Some(text.len() - 1) {
        return parse(&text[1..text.len() - 1]);
    }

    if let Some((at, connective)) = find_connective(text) {
        let left = Box::new(parse(&text[..at])?);
        let right = Box::new(parse(&text[at + connective.len()..])?);
        return Ok(match connective {
            Connective::And => Condition::And(left, right),
            Connective::Or => Condition::Or(left, right),
        });
    }

    parse_atom(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

impl Connective {
    fn len(self) -> usize {
        match self {
            Connective::And => 3,
            Connective::Or => 2,
        }
    }
}

/// Locate the first `AND`/`OR` outside quotes, parentheses and brackets.
///
/// The keyword must be preceded by whitespace and followed by whitespace or
/// an opening parenthesis.
fn find_connective(text: &str) -> Option<(usize, Connective)> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev = ' ';

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            prev = c;
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            'a' | 'A' | 'o' | 'O' if depth == 0 && i > 0 && prev.is_whitespace() => {
                for connective in [Connective::And, Connective::Or] {
                    let keyword = match connective {
                        Connective::And => "AND",
                        Connective::Or => "OR",
                    };
                    let matches_keyword = text
                        .get(i..i + keyword.len())
                        .is_some_and(|s| s.eq_ignore_ascii_case(keyword));
                    if matches_keyword
                        && text[i + keyword.len()..]
                            .starts_with(|n: char| n.is_whitespace() || n == '(')
                    {
                        return Some((i, connective));
                    }
                }
            }
            _ => {}
        }
        prev = c;
    }
    None
}

/// Strip optional `::` delimiters from a column reference.
fn column_ref(raw: &str) -> Option<String> {
    let name = raw
        .strip_prefix("::")
        .and_then(|r| r.strip_suffix("::"))
        .unwrap_or(raw);
    is_column_name(name).then(|| name.to_string())
}

fn literal(raw: &str) -> String {
    let raw = raw.trim();
    unquote(raw).unwrap_or_else(|| raw.to_string())
}

fn parse_atom(text: &str) -> TemplateResult<Condition> {
    if let Some(caps) = IN_LIST.captures(text) {
        let column = column_ref(&caps[1]).ok_or_else(|| invalid(text, "invalid column"))?;
        let values = split_params(&caps[2])
            .map_err(|err| invalid(text, err.to_string()))?
            .iter()
            .map(|v| literal(v))
            .collect();
        return Ok(Condition::In { column, values });
    }

    if let Some(caps) = IS_NULL.captures(text) {
        let column = column_ref(&caps[1]).ok_or_else(|| invalid(text, "invalid column"))?;
        return Ok(Condition::IsNull {
            column,
            negated: caps.get(2).is_some(),
        });
    }

    if let Some(caps) = COMPARISON.captures(text) {
        let column = column_ref(&caps[1]).ok_or_else(|| invalid(text, "invalid column"))?;
        let op = match caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()) {
            Some("=") => CompareOp::Eq,
            Some("!=") => CompareOp::Ne,
            Some(">") => CompareOp::Gt,
            Some("<") => CompareOp::Lt,
            Some(_) => CompareOp::Like,
            None => return Err(invalid(text, "missing operator")),
        };
        return Ok(Condition::Compare {
            column,
            op,
            value: literal(&caps[4]),
        });
    }

    Err(invalid(text, "unrecognized condition"))
}

impl Condition {
    /// Evaluate against the row. Unlisted columns make their atom false.
    pub fn evaluate(&self, ctx: &mut EvalContext) -> bool {
        match self {
            Condition::And(left, right) => left.evaluate(ctx) && right.evaluate(ctx),
            Condition::Or(left, right) => left.evaluate(ctx) || right.evaluate(ctx),
            Condition::In { column, values } => lookup(column, ctx).is_some_and(|v| {
                let text = v.render();
                values.iter().any(|candidate| *candidate == text)
            }),
            Condition::IsNull { column, negated } => {
                lookup(column, ctx).is_some_and(|v| v.is_blank() != *negated)
            }
            Condition::Compare { column, op, value } => {
                let Some(actual) = lookup(column, ctx) else {
                    return false;
                };
                let expected = Value::string(value.as_str());
                match op {
                    CompareOp::Eq => actual.loose_eq(&expected),
                    CompareOp::Ne => !actual.loose_eq(&expected),
                    CompareOp::Gt => numeric_pair(&actual, &expected).is_some_and(|(a, b)| a > b),
                    CompareOp::Lt => numeric_pair(&actual, &expected).is_some_and(|(a, b)| a < b),
                    CompareOp::Like => {
                        let needle = value.replace(['%', '_'], "").to_lowercase();
                        actual.render().to_lowercase().contains(&needle)
                    }
                }
            }
        }
    }
}

/// Whitelisted column value; absent cells read as null.
fn lookup(column: &str, ctx: &mut EvalContext) -> Option<Value> {
    if !ctx.columns.contains(column) {
        ctx.report(&TemplateError::MissingColumn {
            column: column.to_string(),
        });
        return None;
    }
    Some(ctx.row.get(column).cloned().unwrap_or(Value::Null))
}

fn numeric_pair(a: &Value, b: &Value) -> Option<(f64, f64)> {
    Some((a.as_number()?, b.as_number()?))
}

/// Parse and evaluate `text`. Malformed conditions are false.
pub fn evaluate(text: &str, ctx: &mut EvalContext) -> bool {
    match parse(text) {
        Ok(condition) => condition.evaluate(ctx),
        Err(err) => {
            ctx.report(&err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{NullDispatcher, StaticAssets};
    use crate::error::ErrorKind;
    use crate::options::RenderOptions;
    use crate::row::{Row, ValidColumns};

    fn row() -> Row {
        Row::new()
            .with("users.status", "active")
            .with("users.age", "42")
            .with("users.name", "Margaret Hamilton")
            .with("users.deleted_at", Value::Null)
            .with("users.nick", "")
            .with("is_approved", "1")
            .with("users.secret", "x")
    }

    fn check(cond: &str) -> (bool, Vec<ErrorKind>) {
        let row = row();
        let columns: ValidColumns = [
            "users.status",
            "users.age",
            "users.name",
            "users.deleted_at",
            "users.nick",
            "is_approved",
        ]
        .into_iter()
        .collect();
        let options = RenderOptions::default();
        let assets = StaticAssets::new();
        let mut ctx = EvalContext::new(&row, &columns, &NullDispatcher, &assets, &options);
        let result = evaluate(cond, &mut ctx);
        let kinds = ctx.diagnostics.diagnostics().iter().map(|d| d.kind).collect();
        (result, kinds)
    }

    fn holds(cond: &str) -> bool {
        check(cond).0
    }

    #[test]
    fn test_equality() {
        assert!(holds("is_approved = 1"));
        assert!(holds("is_approved = '1.0'"));
        assert!(!holds("is_approved != 1"));
        assert!(holds("users.status = 'active'"));
        assert!(holds("::users.status:: = active"));
        assert!(!holds("users.status = inactive"));
    }

    #[test]
    fn test_ordering_requires_numbers() {
        assert!(holds("users.age > 18"));
        assert!(holds("users.age < 100"));
        assert!(!holds("users.age > 42"));
        assert!(!holds("users.status > 1"));
    }

    #[test]
    fn test_like() {
        assert!(holds("users.name LIKE '%hamil%'"));
        assert!(holds("users.name like 'MARG_'"));
        assert!(!holds("users.name LIKE '%lovelace%'"));
    }

    #[test]
    fn test_in_list() {
        assert!(holds("users.status IN ['active', 'pending']"));
        assert!(holds("users.age IN [41, 42]"));
        assert!(!holds("users.status IN [banned]"));
    }

    #[test]
    fn test_null_checks() {
        assert!(holds("users.deleted_at IS NULL"));
        assert!(holds("users.nick IS NULL"));
        assert!(holds("users.status IS NOT NULL"));
        assert!(!holds("users.deleted_at is not null"));
    }

    #[test]
    fn test_connectives_split_left_to_right() {
        assert!(holds("is_approved = 1 AND users.age > 18"));
        assert!(holds("is_approved = 0 OR users.age > 18"));
        // a AND (b OR c)
        assert!(!holds("is_approved = 0 AND users.age > 18 OR users.status = active"));
        // a OR (b AND c)
        assert!(holds("is_approved = 1 OR users.age > 100 AND users.status = active"));
    }

    #[test]
    fn test_parentheses() {
        assert!(holds("(is_approved = 0 OR users.age > 18) AND users.status = active"));
        assert!(!holds("(is_approved = 0 AND users.age > 18) OR users.status = banned"));
        assert_eq!(
            parse("((a = 1))").unwrap(),
            Condition::Compare {
                column: "a".to_string(),
                op: CompareOp::Eq,
                value: "1".to_string()
            }
        );
    }

    #[test]
    fn test_keywords_inside_values_are_not_connectives() {
        assert!(holds("users.name = 'Margaret Hamilton' OR users.status = 'x AND y'"));
        assert_eq!(
            parse("users.name = Anderson").unwrap(),
            Condition::Compare {
                column: "users.name".to_string(),
                op: CompareOp::Eq,
                value: "Anderson".to_string()
            }
        );
    }

    #[test]
    fn test_unlisted_column_is_false_with_warning() {
        let (result, kinds) = check("users.secret = x");
        assert!(!result);
        assert_eq!(kinds, vec![ErrorKind::MissingColumn]);
    }

    #[test]
    fn test_malformed_is_false_with_warning() {
        let (result, kinds) = check("this is not a condition");
        assert!(!result);
        assert_eq!(kinds, vec![ErrorKind::InvalidConditionSyntax]);

        let (result, _) = check("");
        assert!(!result);
    }
}
