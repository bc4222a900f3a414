/*
 * conditional.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Conditional blocks.
//!
//! ```text
//! ::IF(cond, value[, else_value])::
//!   ELSEIF(cond, value)::      (zero or more)
//!   ELSE(value)::              (optional)
//! ```
//!
//! Only whitespace may separate the parts of one block. The first branch
//! whose condition holds wins; otherwise `ELSE`, then the `IF`'s own
//! `else_value`, then the empty string. The chosen text has its own
//! conditionals resolved before it is spliced back; its placeholders and
//! calls are rendered by the passes that follow.

use crate::condition;
use crate::error::{TemplateError, TemplateResult};
use crate::eval_context::EvalContext;
use crate::tokenizer::{matching_paren, split_params, unquote};

const IF_MARKER: &str = "::IF(";
const ELSEIF_MARKER: &str = "ELSEIF(";
const ELSE_MARKER: &str = "ELSE(";

/// A parsed conditional block.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    /// List of (condition, value) pairs for the `IF` and `ELSEIF` branches.
    pub branches: Vec<(String, String)>,
    /// Value used when no branch matches.
    pub else_value: Option<String>,
}

impl Conditional {
    /// Pick the value of the first matching branch.
    pub fn select(&self, ctx: &mut EvalContext) -> String {
        for (cond, value) in &self.branches {
            if condition::evaluate(cond, ctx) {
                return value.clone();
            }
        }
        self.else_value.clone().unwrap_or_default()
    }
}

fn branch_value(raw: &str) -> String {
    unquote(raw).unwrap_or_else(|| raw.to_string())
}

/// Parse the arguments of `NAME(...)::` starting at the `(` at `open`.
///
/// Returns the split arguments and the offset just past the closing `::`.
fn parse_clause(text: &str, open: usize, name: &str) -> TemplateResult<(Vec<String>, usize)> {
    let close = matching_paren(text, open)
        .ok_or_else(|| TemplateError::parse(format!("unclosed {}(", name)))?;
    if !text[close + 1..].starts_with("::") {
        return Err(TemplateError::parse(format!("{}(...) must end with '::'", name)));
    }
    let args = split_params(&text[open + 1..close])?;
    Ok((args, close + 3))
}

/// Parse the block whose `::IF(` starts at `start`.
///
/// Returns the block and the offset just past its last clause.
pub fn parse_block(text: &str, start: usize) -> TemplateResult<(Conditional, usize)> {
    let (mut args, mut end) = parse_clause(text, start + IF_MARKER.len() - 1, "IF")?;
    if !(2..=3).contains(&args.len()) {
        return Err(TemplateError::InvalidCondition {
            condition: args.first().cloned().unwrap_or_default(),
            message: format!("IF takes 2 or 3 arguments, found {}", args.len()),
        });
    }
    let else_value = args.get(2).map(|v| branch_value(v));
    args.truncate(2);
    let mut block = Conditional {
        branches: vec![(args[0].clone(), branch_value(&args[1]))],
        else_value,
    };

    loop {
        let next = end + (text[end..].len() - text[end..].trim_start().len());
        let following = &text[next..];
        if following.starts_with(ELSEIF_MARKER) {
            let (args, after) = parse_clause(text, next + ELSEIF_MARKER.len() - 1, "ELSEIF")?;
            let [cond, value] = args.as_slice() else {
                return Err(TemplateError::InvalidCondition {
                    condition: args.first().cloned().unwrap_or_default(),
                    message: format!("ELSEIF takes 2 arguments, found {}", args.len()),
                });
            };
            block.branches.push((cond.clone(), branch_value(value)));
            end = after;
        } else if following.starts_with(ELSE_MARKER) {
            let (args, after) = parse_clause(text, next + ELSE_MARKER.len() - 1, "ELSE")?;
            let [value] = args.as_slice() else {
                return Err(TemplateError::parse(format!(
                    "ELSE takes 1 argument, found {}",
                    args.len()
                )));
            };
            block.else_value = Some(branch_value(value));
            end = after;
            break;
        } else {
            break;
        }
    }

    Ok((block, end))
}

/// End of the clause whose `(` is at `open`, falling back to the next `)::`.
fn clause_extent(text: &str, open: usize) -> Option<usize> {
    match matching_paren(text, open) {
        Some(close) if text[close + 1..].starts_with("::") => Some(close + 3),
        _ => text[open..].find(")::").map(|pos| open + pos + 3),
    }
}

/// End of a malformed block starting at `start`, covering any `ELSEIF` and
/// `ELSE` clauses that follow it.
fn block_extent(text: &str, start: usize) -> Option<usize> {
    let mut end = clause_extent(text, start + IF_MARKER.len() - 1)?;
    loop {
        let next = end + (text[end..].len() - text[end..].trim_start().len());
        let following = &text[next..];
        let marker = if following.starts_with(ELSEIF_MARKER) {
            ELSEIF_MARKER
        } else if following.starts_with(ELSE_MARKER) {
            ELSE_MARKER
        } else {
            return Some(end);
        };
        match clause_extent(text, next + marker.len() - 1) {
            Some(after) => end = after,
            None => return Some(end),
        }
    }
}

/// Resolve every conditional block in `template`.
///
/// A block that fails to parse is replaced by the empty string. Only a block
/// with no closing `)::` at all is left in place.
pub fn resolve_all(template: &str, ctx: &mut EvalContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(IF_MARKER) {
        if ctx.conditional_passes >= ctx.options.max_conditional_passes {
            ctx.report(&TemplateError::LimitExceeded {
                what: "conditional pass",
                limit: ctx.options.max_conditional_passes,
            });
            break;
        }
        ctx.conditional_passes += 1;

        match parse_block(rest, start) {
            Ok((block, end)) => {
                out.push_str(&rest[..start]);
                let chosen = block.select(ctx);
                let resolved = match ctx.enter() {
                    Ok(()) => {
                        let resolved = resolve_all(&chosen, ctx);
                        ctx.exit();
                        resolved
                    }
                    Err(err) => ctx.recover(err),
                };
                out.push_str(&resolved);
                rest = &rest[end..];
            }
            Err(err) => match block_extent(rest, start) {
                Some(end) => {
                    out.push_str(&rest[..start]);
                    out.push_str(&ctx.recover(err));
                    rest = &rest[end..];
                }
                None => {
                    ctx.report(&err);
                    let skip = start + IF_MARKER.len();
                    out.push_str(&rest[..skip]);
                    rest = &rest[skip..];
                }
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{NullDispatcher, StaticAssets};
    use crate::error::ErrorKind;
    use crate::options::RenderOptions;
    use crate::row::{Row, ValidColumns};
    use pretty_assertions::assert_eq;

    fn resolve_with(template: &str, row: &Row, options: RenderOptions) -> (String, Vec<ErrorKind>) {
        let columns: ValidColumns = row.iter().map(|(k, _)| k.to_string()).collect();
        let assets = StaticAssets::new();
        let mut ctx = EvalContext::new(row, &columns, &NullDispatcher, &assets, &options);
        let out = resolve_all(template, &mut ctx);
        let kinds = ctx.diagnostics.diagnostics().iter().map(|d| d.kind).collect();
        (out, kinds)
    }

    fn resolve(template: &str, row: &Row) -> String {
        resolve_with(template, row, RenderOptions::default()).0
    }

    #[test]
    fn test_if_with_inline_else() {
        let approved = Row::new().with("is_approved", "1");
        let pending = Row::new().with("is_approved", "0");
        let template = "::IF(is_approved = 1, Active, Inactive)::";
        assert_eq!(resolve(template, &approved), "Active");
        assert_eq!(resolve(template, &pending), "Inactive");
    }

    #[test]
    fn test_if_without_else_is_empty() {
        let row = Row::new().with("flag", "0");
        assert_eq!(resolve("[::IF(flag = 1, yes)::]", &row), "[]");
    }

    #[test]
    fn test_elseif_chain() {
        let template = "::IF(level = 1, 'Bronze')::ELSEIF(level = 2, 'Silver')::\nELSEIF(level = 3, Gold)::ELSE(None)::!";
        let pick = |level: &str| resolve(template, &Row::new().with("level", level));
        assert_eq!(pick("1"), "Bronze!");
        assert_eq!(pick("2"), "Silver!");
        assert_eq!(pick("3"), "Gold!");
        assert_eq!(pick("9"), "None!");
    }

    #[test]
    fn test_else_overrides_inline_else() {
        let row = Row::new().with("a", "0");
        assert_eq!(resolve("::IF(a = 1, x, inline)::ELSE(block)::", &row), "block");
    }

    #[test]
    fn test_quoted_values_keep_commas() {
        let row = Row::new().with("a", "1");
        assert_eq!(resolve("::IF(a = 1, 'one, uno', two)::", &row), "one, uno");
    }

    #[test]
    fn test_nested_conditionals() {
        let template = "::IF(a = 1, ::IF(b = 1, both, only-a)::, neither)::";
        let row = Row::new().with("a", "1").with("b", "0");
        assert_eq!(resolve(template, &row), "only-a");
        let row = Row::new().with("a", "1").with("b", "1");
        assert_eq!(resolve(template, &row), "both");
    }

    #[test]
    fn test_branch_placeholders_are_left_for_later_passes() {
        let row = Row::new().with("a", "1");
        assert_eq!(
            resolve("::IF(a = 1, <b>::users.name::</b>, -)::", &row),
            "<b>::users.name::</b>"
        );
    }

    #[test]
    fn test_surrounding_text_is_preserved() {
        let row = Row::new().with("a", "1");
        assert_eq!(
            resolve("<td>::IF(a = 1, on, off)::</td><td>::IF(a = 2, on, off)::</td>", &row),
            "<td>on</td><td>off</td>"
        );
    }

    #[test]
    fn test_malformed_block_falls_back() {
        let row = Row::new().with("a", "1");
        let (out, kinds) = resolve_with("<td>::IF(a = 1)::</td>", &row, RenderOptions::default());
        assert_eq!(out, "<td></td>");
        assert_eq!(kinds, vec![ErrorKind::InvalidConditionSyntax]);

        let (out, kinds) = resolve_with(
            "<td>::IF(a = 'x, y)::</td>",
            &row,
            RenderOptions::default(),
        );
        assert_eq!(out, "<td></td>");
        assert_eq!(kinds, vec![ErrorKind::MalformedSyntax]);

        let (out, kinds) = resolve_with(
            "<td>::IF(a = 1, x)::ELSEIF(a = 2)::ELSE(z)::</td>",
            &row,
            RenderOptions::default(),
        );
        assert_eq!(out, "<td></td>");
        assert_eq!(kinds, vec![ErrorKind::InvalidConditionSyntax]);
    }

    #[test]
    fn test_unterminated_block_left_in_place() {
        let row = Row::new().with("a", "1");
        let (out, kinds) = resolve_with("::IF(a = 1, x", &row, RenderOptions::default());
        assert_eq!(out, "::IF(a = 1, x");
        assert_eq!(kinds, vec![ErrorKind::MalformedSyntax]);
    }

    #[test]
    fn test_pass_limit() {
        let row = Row::new().with("a", "1");
        let options = RenderOptions {
            max_conditional_passes: 2,
            ..RenderOptions::default()
        };
        let (out, kinds) = resolve_with(
            "::IF(a = 1, x)::::IF(a = 1, y)::::IF(a = 1, z)::",
            &row,
            options,
        );
        assert_eq!(out, "xy::IF(a = 1, z)::");
        assert_eq!(kinds, vec![ErrorKind::LimitExceeded]);
    }

    #[test]
    fn test_depth_limit() {
        let row = Row::new().with("a", "1");
        let options = RenderOptions::default().with_max_depth(1);
        let (out, kinds) = resolve_with(
            "::IF(a = 1, ::IF(a = 1, deep)::)::",
            &row,
            options,
        );
        assert_eq!(out, "");
        assert_eq!(kinds, vec![ErrorKind::LimitExceeded]);
    }
}
