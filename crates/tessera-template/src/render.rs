/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Top-level renderer.
//!
//! Runs the passes in a fixed order over one template and one row:
//!
//! 1. `::MATH(...)::`
//! 2. `::IF(...)::` blocks
//! 3. `::~Target->method()~::` calls
//! 4. legacy `::Target::method()::` calls
//! 5. remaining `::column::` placeholders
//!
//! Data URI post-processing happens inside passes 3 to 5, once per
//! substituted value. Substituted values stay behind markers until every
//! pass and the leftover check have run, so they are never parsed as
//! template syntax. The output is then HTML-escaped if requested.

use serde::Serialize;

use crate::call;
use crate::conditional;
use crate::diagnostic::Diagnostic;
use crate::dispatch::{AssetResolver, Dispatcher};
use crate::error::TemplateError;
use crate::eval_context::EvalContext;
use crate::math;
use crate::options::RenderOptions;
use crate::placeholder;
use crate::row::{Row, ValidColumns};

/// Markers that should never survive a render.
const LEFTOVER_MARKERS: [&str; 5] = ["::~", "~::", "::IF(", "ELSEIF(", "::MATH("];

/// Characters of context kept around a leftover marker.
const SNIPPET_LEN: usize = 40;

/// Output of one render together with what went wrong along the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub output: String,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip)]
    strict: bool,
}

impl Rendered {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Whether the render counts as failed: strict mode and any diagnostic.
    pub fn has_errors(&self) -> bool {
        self.strict && self.has_diagnostics()
    }
}

/// Renders templates against rows.
///
/// A `Renderer` holds no per-render state, so one instance can serve many
/// rows, including from several threads at once.
pub struct Renderer<'a> {
    dispatcher: &'a dyn Dispatcher,
    assets: &'a dyn AssetResolver,
    options: RenderOptions,
}

impl<'a> Renderer<'a> {
    pub fn new(
        dispatcher: &'a dyn Dispatcher,
        assets: &'a dyn AssetResolver,
        options: RenderOptions,
    ) -> Self {
        Self {
            dispatcher,
            assets,
            options,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `template` for `row`, returning only the output text.
    ///
    /// Never fails: broken fragments degrade to their fallback and are
    /// logged through `tracing`.
    pub fn render(
        &self,
        template: &str,
        row: &Row,
        columns: &ValidColumns,
        render_html: bool,
    ) -> String {
        self.render_with_diagnostics(template, row, columns, render_html)
            .output
    }

    /// Render `template` for `row` and keep the collected diagnostics.
    ///
    /// When `render_html` is false the output is HTML-escaped.
    pub fn render_with_diagnostics(
        &self,
        template: &str,
        row: &Row,
        columns: &ValidColumns,
        render_html: bool,
    ) -> Rendered {
        let mut ctx = EvalContext::new(row, columns, self.dispatcher, self.assets, &self.options);

        let output = math::resolve_all(template, &mut ctx);
        let output = conditional::resolve_all(&output, &mut ctx);
        let output = call::resolve_calls(&output, &mut ctx);
        let output = call::resolve_legacy_calls(&output, &mut ctx);
        let output = placeholder::substitute(&output, &mut ctx);

        check_leftovers(&output, &mut ctx);
        let output = ctx.restore(&output);
        tracing::debug!(
            columns = columns.len(),
            diagnostics = ctx.diagnostics.len(),
            "rendered template"
        );

        Rendered {
            output: if render_html {
                output
            } else {
                escape_html(&output)
            },
            diagnostics: ctx.diagnostics.into_diagnostics(),
            strict: self.options.strict,
        }
    }

    /// Render the same template for each row in turn.
    pub fn render_rows<'r>(
        &self,
        template: &str,
        rows: impl IntoIterator<Item = &'r Row>,
        columns: &ValidColumns,
        render_html: bool,
    ) -> Vec<Rendered> {
        rows.into_iter()
            .map(|row| self.render_with_diagnostics(template, row, columns, render_html))
            .collect()
    }
}

/// Report the first marker no pass consumed. Output is left untouched.
fn check_leftovers(output: &str, ctx: &mut EvalContext) {
    let first = LEFTOVER_MARKERS
        .iter()
        .filter_map(|marker| output.find(marker))
        .min();
    if let Some(pos) = first {
        ctx.report(&TemplateError::Leftover {
            snippet: output[pos..].chars().take(SNIPPET_LEN).collect(),
        });
    }
}

/// Escape HTML special characters.
pub fn escape_html(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            _ => c.to_string(),
        })
        .collect()
}
