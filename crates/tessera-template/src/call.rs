/*
 * call.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Method-call placeholders.
//!
//! Two syntaxes produce the same [`MethodCallSpec`]:
//!
//! - `::~Target->method(args)->method2(args2)~::` with at most two calls
//! - legacy `::Target::method(args)::` with exactly one call, where
//!   `Target` goes through [`RenderOptions::legacy_target`](crate::RenderOptions::legacy_target)
//!
//! Arguments are tokenized and resolved against the row before dispatch.
//! Any failure is recovered by the [`EvalContext`] and never escapes.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::data_uri;
use crate::error::{TemplateError, TemplateResult};
use crate::eval_context::EvalContext;
use crate::placeholder::resolve_column;
use crate::tokenizer::{ParsedParameter, matching_paren, tokenize};
use crate::value::Value;

const CALL_OPEN: &str = "::~";
const CALL_CLOSE: &str = "~::";

/// Maximum number of chained calls in one placeholder.
pub const MAX_CHAIN: usize = 2;

static LEGACY_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"::([A-Za-z_][A-Za-z0-9_\\]*)::([A-Za-z_][A-Za-z0-9_]*)\(")
        .expect("legacy call pattern is valid")
});

/// One parsed call placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallSpec {
    pub target: String,
    pub method1: String,
    pub args1: Vec<ParsedParameter>,
    /// Second link of the chain, invoked on the first call's result.
    pub second: Option<(String, Vec<ParsedParameter>)>,
}

fn take_ident(text: &str, allow_namespace: bool) -> &str {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || (allow_namespace && c == '\\')))
        .unwrap_or(text.len());
    &text[..end]
}

/// Parse a `::~...~::` placeholder starting at `start`.
///
/// Returns the parsed call and the offset just past the closing `~::`.
pub fn parse_call(text: &str, start: usize) -> TemplateResult<(MethodCallSpec, usize)> {
    let mut pos = start + CALL_OPEN.len();
    let target = take_ident(&text[pos..], true);
    if target.is_empty() {
        return Err(TemplateError::parse("call is missing a target"));
    }
    pos += target.len();

    let mut calls: Vec<(String, Vec<ParsedParameter>)> = Vec::new();
    while text[pos..].starts_with("->") {
        pos += 2;
        let method = take_ident(&text[pos..], false);
        if method.is_empty() {
            return Err(TemplateError::parse(format!(
                "missing method name after '{}->'",
                target
            )));
        }
        let open = pos + method.len();
        let close = matching_paren(text, open).ok_or_else(|| {
            TemplateError::parse(format!("unclosed argument list for '{}'", method))
        })?;
        calls.push((method.to_string(), tokenize(&text[open + 1..close])?));
        pos = close + 1;
    }

    if !text[pos..].starts_with(CALL_CLOSE) {
        return Err(TemplateError::parse(format!(
            "call on '{}' must end with '{}'",
            target, CALL_CLOSE
        )));
    }
    if calls.len() > MAX_CHAIN {
        return Err(TemplateError::parse(format!(
            "call chains are limited to {} calls, found {}",
            MAX_CHAIN,
            calls.len()
        )));
    }

    let mut calls = calls.into_iter();
    let Some((method1, args1)) = calls.next() else {
        return Err(TemplateError::parse(format!("no method called on '{}'", target)));
    };
    let spec = MethodCallSpec {
        target: target.to_string(),
        method1,
        args1,
        second: calls.next(),
    };
    Ok((spec, pos + CALL_CLOSE.len()))
}

/// Parse a legacy call whose head (`::Target::method(`) ends at the `(` at `open`.
fn parse_legacy(
    text: &str,
    head: &Captures,
    open: usize,
    ctx: &EvalContext,
) -> TemplateResult<(MethodCallSpec, usize)> {
    let close = matching_paren(text, open)
        .ok_or_else(|| TemplateError::parse(format!("unclosed argument list for '{}'", &head[2])))?;
    if !text[close + 1..].starts_with("::") {
        return Err(TemplateError::parse(format!(
            "legacy call '{}::{}' must end with '::'",
            &head[1], &head[2]
        )));
    }
    let spec = MethodCallSpec {
        target: ctx.options.legacy_target(&head[1]).to_string(),
        method1: head[2].to_string(),
        args1: tokenize(&text[open + 1..close])?,
        second: None,
    };
    Ok((spec, close + 3))
}

/// Resolve parsed parameters into values.
pub fn resolve_params(params: &[ParsedParameter], ctx: &mut EvalContext) -> Vec<Value> {
    params.iter().map(|p| resolve_param(p, ctx)).collect()
}

fn resolve_param(param: &ParsedParameter, ctx: &mut EvalContext) -> Value {
    match param {
        ParsedParameter::Literal(value) => value.clone(),
        ParsedParameter::Column(name) => resolve_column(name, ctx),
        ParsedParameter::List(items) => Value::List(resolve_params(items, ctx)),
        ParsedParameter::Call(raw) => {
            let result = ctx.enter().and_then(|()| {
                let result = parse_call(raw, 0).and_then(|(spec, _)| invoke(&spec, ctx));
                ctx.exit();
                result
            });
            result.unwrap_or_else(|err| Value::String(ctx.recover(err)))
        }
    }
}

/// Dispatch a call, including the optional second link.
pub fn invoke(spec: &MethodCallSpec, ctx: &mut EvalContext) -> TemplateResult<Value> {
    let args = resolve_params(&spec.args1, ctx);
    let first = ctx
        .dispatcher
        .resolve(&spec.target, &spec.method1, &args)
        .map_err(|source| TemplateError::Dispatch {
            target: spec.target.clone(),
            method: spec.method1.clone(),
            source,
        })?;

    let Some((method, params)) = &spec.second else {
        return Ok(first);
    };
    let args = resolve_params(params, ctx);
    ctx.dispatcher
        .chain(first, method, &args)
        .map_err(|source| TemplateError::Dispatch {
            target: spec.target.clone(),
            method: method.clone(),
            source,
        })
}

/// Invoke a call and turn its result into protected output text.
fn render_call(spec: &MethodCallSpec, ctx: &mut EvalContext) -> String {
    let text = invoke(spec, ctx).and_then(|value| data_uri::post_process(&value, ctx.options.mode));
    let text = ctx.text_or_recover(text);
    ctx.protect(text)
}

/// End of the legacy call whose argument list opens at `open`.
///
/// Falls back to the next `)::` when the parentheses do not balance.
fn legacy_extent(text: &str, open: usize) -> Option<usize> {
    match matching_paren(text, open) {
        Some(close) if text[close + 1..].starts_with("::") => Some(close + 3),
        _ => text[open..].find(")::").map(|pos| open + pos + 3),
    }
}

/// End of the malformed placeholder whose body starts at `body`.
///
/// This is the next `~::`, unless another `::~` opens first.
fn call_extent(text: &str, body: usize) -> Option<usize> {
    let close = text[body..].find(CALL_CLOSE)?;
    match text[body..].find(CALL_OPEN) {
        Some(open) if open < close => None,
        _ => Some(body + close + CALL_CLOSE.len()),
    }
}

/// Resolve every `::~...~::` placeholder in `template`.
///
/// A placeholder that fails to parse is replaced by its fallback up to its
/// closing `~::`. Without one it is reported and left in place.
pub fn resolve_calls(template: &str, ctx: &mut EvalContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(CALL_OPEN) {
        match parse_call(rest, start) {
            Ok((spec, end)) => {
                out.push_str(&rest[..start]);
                out.push_str(&render_call(&spec, ctx));
                rest = &rest[end..];
            }
            Err(err) => {
                let body = start + CALL_OPEN.len();
                match call_extent(rest, body) {
                    Some(end) => {
                        out.push_str(&rest[..start]);
                        let fallback = ctx.recover(err);
                        out.push_str(&ctx.protect(fallback));
                        rest = &rest[end..];
                    }
                    None => {
                        ctx.report(&err);
                        out.push_str(&rest[..body]);
                        rest = &rest[body..];
                    }
                }
            }
        }
    }

    out.push_str(rest);
    out
}

/// Resolve every legacy `::Target::method(args)::` call in `template`.
///
/// Malformed calls fall back the same way as `::~...~::` placeholders.
pub fn resolve_legacy_calls(template: &str, ctx: &mut EvalContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(head) = LEGACY_HEAD.captures(rest) {
        let Some(whole) = head.get(0) else { break };
        let start = whole.start();
        let open = whole.end() - 1;
        match parse_legacy(rest, &head, open, ctx) {
            Ok((spec, end)) => {
                out.push_str(&rest[..start]);
                out.push_str(&render_call(&spec, ctx));
                rest = &rest[end..];
            }
            Err(err) => match legacy_extent(rest, open) {
                Some(end) => {
                    out.push_str(&rest[..start]);
                    let fallback = ctx.recover(err);
                    out.push_str(&ctx.protect(fallback));
                    rest = &rest[end..];
                }
                None => {
                    ctx.report(&err);
                    let skip = start + 2;
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
    use crate::dispatch::{FnCollaborator, Registry, StaticAssets};
    use crate::error::{DispatchError, ErrorKind};
    use crate::options::RenderOptions;
    use crate::row::{Row, ValidColumns};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn registry() -> Registry {
        let text = FnCollaborator::new("Text")
            .method("upper", |args| {
                Ok(Value::string(
                    args.first().map(Value::render).unwrap_or_default().to_uppercase(),
                ))
            })
            .method("join", |args| {
                Ok(Value::string(
                    args.iter().map(Value::render).collect::<Vec<_>>().join("+"),
                ))
            })
            .method("count", |args| match args.first() {
                Some(Value::List(items)) => Ok(Value::Int(items.len() as i64)),
                _ => Err(DispatchError::InvalidArguments {
                    method: "count".to_string(),
                    message: "expected a list".to_string(),
                }),
            });
        let user = FnCollaborator::new("User").method("name", |_| Ok(Value::string("ada")));
        let users = FnCollaborator::new("Users").method("find", move |_| {
            Ok(Value::Object(Arc::new(user.clone())))
        });

        let mut registry = Registry::new();
        registry.register("Text", text.clone());
        registry.register("Users", users);
        registry.with_scalar_methods(text)
    }

    fn run(template: &str) -> (String, Vec<ErrorKind>) {
        let row = Row::new().with("users.name", "grace").with("users.bio", "a, b");
        let columns: ValidColumns = ["users.name", "users.bio"].into_iter().collect();
        let registry = registry();
        let assets = StaticAssets::with_defaults([("file", "/img/default.png")]);
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&row, &columns, &registry, &assets, &options);
        let out = resolve_calls(template, &mut ctx);
        let out = resolve_legacy_calls(&out, &mut ctx);
        let kinds = ctx.diagnostics.diagnostics().iter().map(|d| d.kind).collect();
        (ctx.restore(&out), kinds)
    }

    #[test]
    fn test_parse_chain() {
        let (spec, end) = parse_call("x ::~Text->upper(::users.name::)->join('!')~:: y", 2).unwrap();
        assert_eq!(spec.target, "Text");
        assert_eq!(spec.method1, "upper");
        assert_eq!(
            spec.args1,
            vec![ParsedParameter::Column("users.name".to_string())]
        );
        assert_eq!(
            spec.second,
            Some((
                "join".to_string(),
                vec![ParsedParameter::Literal(Value::string("!"))]
            ))
        );
        assert_eq!(end, 46);
    }

    #[test]
    fn test_chain_depth_limit() {
        let err = parse_call("::~Text->a()->b()->c()~::", 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedSyntax);
    }

    #[test]
    fn test_simple_call() {
        let (out, kinds) = run("<b>::~Text->upper(::users.name::)~::</b>");
        assert_eq!(out, "<b>GRACE</b>");
        assert!(kinds.is_empty());
    }

    #[test]
    fn test_column_with_comma_is_one_argument() {
        let (out, _) = run("::~Text->join(::users.bio::, 'x')~::");
        assert_eq!(out, "a, b+x");
    }

    #[test]
    fn test_chain_on_scalar_result() {
        let (out, _) = run("::~Text->join(a, b)->upper()~::");
        assert_eq!(out, "A+B");
    }

    #[test]
    fn test_chain_on_object_result() {
        let (out, _) = run("::~Users->find(1)->name()~::");
        assert_eq!(out, "ada");
    }

    #[test]
    fn test_object_result_renders_empty() {
        let (out, kinds) = run("[::~Users->find(1)~::]");
        assert_eq!(out, "[]");
        assert!(kinds.is_empty());
    }

    #[test]
    fn test_nested_call_argument() {
        let (out, _) = run("::~Text->join(::~Text->upper(x)~::, y)~::");
        assert_eq!(out, "X+y");
    }

    #[test]
    fn test_list_argument() {
        let (out, _) = run("::~Text->count([1, 2, 3])~::");
        assert_eq!(out, "3");
    }

    #[test]
    fn test_unknown_target_falls_back_once() {
        let (out, kinds) = run("[::~Foo->bar()~::]");
        assert_eq!(out, "[]");
        assert_eq!(kinds, vec![ErrorKind::UnresolvedDispatchTarget]);
    }

    #[test]
    fn test_failed_file_call_uses_default_asset() {
        let (out, kinds) = run("<img src=\"::~Storage->getFile(::users.name::)~::\">");
        assert_eq!(out, "<img src=\"/img/default.png\">");
        assert_eq!(kinds, vec![ErrorKind::UnresolvedDispatchTarget]);
    }

    #[test]
    fn test_collaborator_error_falls_back() {
        let (out, kinds) = run("::~Text->count(nope)~::");
        assert_eq!(out, "");
        assert_eq!(kinds, vec![ErrorKind::UnresolvedDispatchTarget]);
    }

    #[test]
    fn test_malformed_call_falls_back() {
        let (out, kinds) = run("<td>::~Text->upper('open)~::</td>");
        assert_eq!(out, "<td></td>");
        assert_eq!(kinds, vec![ErrorKind::MalformedSyntax]);

        let (out, kinds) = run("<img src=\"::~Storage->getFile(::users.name::\")~::\">");
        assert_eq!(out, "<img src=\"\">");
        assert_eq!(kinds, vec![ErrorKind::MalformedSyntax]);
    }

    #[test]
    fn test_unterminated_call_left_in_place() {
        let (out, kinds) = run("<td>::~Text->upper(x)</td>");
        assert_eq!(out, "<td>::~Text->upper(x)</td>");
        assert_eq!(kinds, vec![ErrorKind::MalformedSyntax]);

        let (out, kinds) = run("::~Text->upper(x) | ::~Text->upper(y)~::");
        assert_eq!(out, "::~Text->upper(x) | Y");
        assert_eq!(kinds, vec![ErrorKind::MalformedSyntax]);
    }

    #[test]
    fn test_malformed_legacy_call_falls_back() {
        let (out, kinds) = run("<td>::TextHelper::upper('open)::</td>");
        assert_eq!(out, "<td></td>");
        assert_eq!(kinds, vec![ErrorKind::MalformedSyntax]);
    }

    #[test]
    fn test_call_output_is_not_rescanned() {
        let row = Row::new().with("users.bio", "::TextHelper::upper(x):: ::users.name::");
        let columns: ValidColumns = ["users.bio", "users.name"].into_iter().collect();
        let registry = registry();
        let assets = StaticAssets::new();
        let options = RenderOptions::default();
        let mut ctx = EvalContext::new(&row, &columns, &registry, &assets, &options);

        let out = resolve_calls("<p>::~Text->join(::users.bio::)~::</p>", &mut ctx);
        let out = resolve_legacy_calls(&out, &mut ctx);
        assert_eq!(
            ctx.restore(&out),
            "<p>::TextHelper::upper(x):: ::users.name::</p>"
        );
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn test_legacy_call_uses_mapping() {
        let (out, kinds) = run("::TextHelper::upper(::users.name::)::");
        assert_eq!(out, "GRACE");
        assert!(kinds.is_empty());
    }

    #[test]
    fn test_legacy_head_ignores_placeholders() {
        let (out, _) = run("::users.name:: and ::a::");
        assert_eq!(out, "::users.name:: and ::a::");
    }
}
