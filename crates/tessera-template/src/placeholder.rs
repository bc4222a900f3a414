/*
 * placeholder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Column placeholder resolution: `::table.column::`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::data_uri;
use crate::error::TemplateResult;
use crate::eval_context::EvalContext;
use crate::value::Value;

/// A bare `::column::` token.
pub(crate) static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"::([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)::")
        .expect("placeholder pattern is valid")
});

/// Resolve a column for text output.
///
/// Unavailable columns resolve to an empty string after reporting a
/// `MissingColumn` diagnostic.
pub fn resolve_column(name: &str, ctx: &mut EvalContext) -> Value {
    match ctx.column(name) {
        Ok(value) => value.clone(),
        Err(err) => {
            ctx.report(&err);
            Value::string("")
        }
    }
}

/// Resolve a column for arithmetic.
///
/// Unavailable columns propagate as `Null`, which arithmetic treats as 0.
pub fn resolve_column_numeric(name: &str, ctx: &mut EvalContext) -> Value {
    match ctx.column(name) {
        Ok(value) => value.clone(),
        Err(err) => {
            ctx.report(&err);
            Value::Null
        }
    }
}

/// Substitute every remaining `::column::` token in `template`.
///
/// Each substituted value goes through the data URI post-processor and is
/// protected from the passes and checks that follow.
pub fn substitute(template: &str, ctx: &mut EvalContext) -> String {
    if !template.contains("::") {
        return template.to_string();
    }
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let value = resolve_column(&caps[1], ctx);
            let text: TemplateResult<String> = data_uri::post_process(&value, ctx.options.mode);
            let text = ctx.text_or_recover(text);
            ctx.protect(text)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{NullDispatcher, StaticAssets};
    use crate::error::ErrorKind;
    use crate::options::RenderOptions;
    use crate::row::{Row, ValidColumns};

    fn run(template: &str, row: &Row, columns: &[&str]) -> (String, usize) {
        let columns: ValidColumns = columns.iter().copied().collect();
        let options = RenderOptions::default();
        let assets = StaticAssets::new();
        let mut ctx = EvalContext::new(row, &columns, &NullDispatcher, &assets, &options);
        let out = substitute(template, &mut ctx);
        (ctx.restore(&out), ctx.diagnostics.count(ErrorKind::MissingColumn))
    }

    #[test]
    fn test_substitutes_whitelisted_columns() {
        let row = Row::new().with("users.name", "Alice").with("users.age", 30i64);
        let (out, missing) = run(
            "<b>::users.name::</b> (::users.age::)",
            &row,
            &["users.name", "users.age"],
        );
        assert_eq!(out, "<b>Alice</b> (30)");
        assert_eq!(missing, 0);
    }

    #[test]
    fn test_unlisted_column_is_never_leaked() {
        let row = Row::new().with("users.password", "hunter2");
        let (out, missing) = run("pw=::users.password::", &row, &[]);
        assert_eq!(out, "pw=");
        assert_eq!(missing, 1);
    }

    #[test]
    fn test_null_renders_empty() {
        let row = Row::new().with("users.nick", Value::Null);
        let (out, missing) = run("[::users.nick::]", &row, &["users.nick"]);
        assert_eq!(out, "[]");
        assert_eq!(missing, 0);
    }

    #[test]
    fn test_numeric_context_propagates_null() {
        let row = Row::new();
        let columns = ValidColumns::new();
        let options = RenderOptions::default();
        let assets = StaticAssets::new();
        let mut ctx = EvalContext::new(&row, &columns, &NullDispatcher, &assets, &options);
        assert_eq!(resolve_column_numeric("price", &mut ctx), Value::Null);
        assert_eq!(resolve_column("price", &mut ctx), Value::string(""));
        assert_eq!(ctx.diagnostics.len(), 2);
    }
}
