/*
 * eval_context.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Evaluation context for template rendering.
//!
//! [`EvalContext`] is threaded through every pass of a render. It carries:
//!
//! 1. **Inputs**: the row, the column whitelist and the collaborators
//! 2. **Diagnostics**: one entry per recovered failure
//! 3. **State tracking**: nesting depth for recursion protection
//! 4. **Substituted values**: held behind markers until the last pass is done
//!
//! It is also the single place where a failed fragment turns into its
//! fallback text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::diagnostic::{Diagnostic, DiagnosticCollector};
use crate::dispatch::{AssetResolver, Dispatcher};
use crate::error::{TemplateError, TemplateResult};
use crate::options::RenderOptions;
use crate::row::{Row, ValidColumns};
use crate::value::Value;

const SLOT_OPEN: char = '\u{E000}';
const SLOT_CLOSE: char = '\u{E001}';

static SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E000}([0-9]+)\u{E001}").expect("slot pattern is valid"));

pub struct EvalContext<'a> {
    pub row: &'a Row,
    pub columns: &'a ValidColumns,
    pub dispatcher: &'a dyn Dispatcher,
    pub assets: &'a dyn AssetResolver,
    pub options: &'a RenderOptions,
    pub diagnostics: DiagnosticCollector,

    /// Current nesting depth of recursive renders.
    pub depth: usize,

    /// Conditional blocks rewritten so far in this render.
    pub conditional_passes: usize,

    /// Values spliced in by the call and placeholder passes.
    substituted: Vec<String>,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        row: &'a Row,
        columns: &'a ValidColumns,
        dispatcher: &'a dyn Dispatcher,
        assets: &'a dyn AssetResolver,
        options: &'a RenderOptions,
    ) -> Self {
        Self {
            row,
            columns,
            dispatcher,
            assets,
            options,
            diagnostics: DiagnosticCollector::new(),
            depth: 0,
            conditional_passes: 0,
            substituted: Vec::new(),
        }
    }

    /// Look up a whitelisted column.
    ///
    /// Returns [`TemplateError::MissingColumn`] when the column is not in the
    /// whitelist or the row has no cell for it. The row is never consulted
    /// for a column outside the whitelist.
    pub fn column(&self, name: &str) -> TemplateResult<&'a Value> {
        let missing = || TemplateError::MissingColumn {
            column: name.to_string(),
        };
        if !self.columns.contains(name) {
            return Err(missing());
        }
        self.row.get(name).ok_or_else(missing)
    }

    /// Enter a nested render, failing once `max_depth` is reached.
    pub fn enter(&mut self) -> TemplateResult<()> {
        if self.depth >= self.options.max_depth {
            return Err(TemplateError::LimitExceeded {
                what: "nesting depth",
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Record a failure: one tracing event and one collected diagnostic.
    pub fn report(&mut self, err: &TemplateError) {
        let diagnostic = Diagnostic::from(err);
        tracing::warn!(
            code = diagnostic.code,
            kind = ?diagnostic.kind,
            "{}",
            diagnostic.message
        );
        self.diagnostics.add(diagnostic);
    }

    /// Record a failure and return the text that replaces the failed fragment.
    ///
    /// Failed calls to asset methods and invalid data URI payloads fall back
    /// to the configured default asset; everything else becomes empty.
    pub fn recover(&mut self, err: TemplateError) -> String {
        self.report(&err);
        match &err {
            TemplateError::Dispatch { method, .. } => self
                .options
                .asset_kind(method)
                .map(|kind| self.assets.default_for(kind))
                .unwrap_or_default(),
            TemplateError::InvalidBase64 { .. } => self.assets.default_for("file"),
            _ => String::new(),
        }
    }

    /// Unwrap a fragment result, recovering on failure.
    pub fn text_or_recover(&mut self, result: TemplateResult<String>) -> String {
        result.unwrap_or_else(|err| self.recover(err))
    }

    /// Stash a substituted value and return the marker that stands in for it.
    ///
    /// Later passes only see the marker, so row data and collaborator output
    /// are never scanned as template syntax.
    pub fn protect(&mut self, value: String) -> String {
        let slot = format!("{}{}{}", SLOT_OPEN, self.substituted.len(), SLOT_CLOSE);
        self.substituted.push(value);
        slot
    }

    /// Put every protected value back in place of its marker.
    pub fn restore(&self, text: &str) -> String {
        if !text.contains(SLOT_OPEN) {
            return text.to_string();
        }
        SLOT.replace_all(text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| self.substituted.get(index))
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
    }
}
