/*
 * diagnostic.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Diagnostic messages collected during a render.

use serde::Serialize;

use crate::error::{ErrorKind, TemplateError};

/// A warning produced while rendering one template against one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Stable code (e.g. "T-3") for searchability.
    pub code: &'static str,

    /// Which class of failure this is.
    pub kind: ErrorKind,

    /// Human-readable description.
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            code: kind.code(),
            kind,
            message: message.into(),
        }
    }
}

impl From<&TemplateError> for Diagnostic {
    fn from(err: &TemplateError) -> Self {
        Diagnostic::new(err.kind(), err.to_string())
    }
}

/// Collector for diagnostic messages during template evaluation.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Number of diagnostics of `kind` collected so far.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
