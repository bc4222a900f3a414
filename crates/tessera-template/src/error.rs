/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template evaluation.
//!
//! None of these errors escape [`Renderer::render`](crate::Renderer::render).
//! Passes return them as values and the renderer turns each one into a
//! diagnostic plus a fallback substitution.

use serde::Serialize;
use thiserror::Error;

/// The failure taxonomy reported in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Referenced column is absent from the row or not whitelisted.
    MissingColumn,
    /// A condition could not be parsed.
    InvalidConditionSyntax,
    /// Unknown collaborator, unknown method, or a collaborator failure.
    UnresolvedDispatchTarget,
    /// A data URI payload is not valid base64.
    InvalidBase64,
    /// An arithmetic expression contains a disallowed character.
    MathCharsetViolation,
    /// Arithmetic evaluation failed (division by zero, malformed expression).
    MathEvaluation,
    /// Placeholder syntax that could not be parsed (quotes, brackets, chains).
    MalformedSyntax,
    /// Recursion or iteration limit reached.
    LimitExceeded,
    /// Template syntax survived rendering.
    UnparsedLeftoverSyntax,
}

impl ErrorKind {
    /// Stable diagnostic code for this kind.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::MissingColumn => "T-1",
            ErrorKind::InvalidConditionSyntax => "T-2",
            ErrorKind::UnresolvedDispatchTarget => "T-3",
            ErrorKind::InvalidBase64 => "T-4",
            ErrorKind::MathCharsetViolation => "T-5",
            ErrorKind::MathEvaluation => "T-6",
            ErrorKind::MalformedSyntax => "T-7",
            ErrorKind::LimitExceeded => "T-8",
            ErrorKind::UnparsedLeftoverSyntax => "T-9",
        }
    }
}

/// Errors raised by collaborators behind a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("no collaborator registered as '{target}'")]
    UnknownTarget { target: String },

    #[error("'{target}' has no method '{method}'")]
    UnknownMethod { target: String, method: String },

    #[error("invalid arguments for '{method}': {message}")]
    InvalidArguments { method: String, message: String },

    #[error("cannot call '{method}' on a scalar result")]
    NotChainable { method: String },

    #[error("{message}")]
    Failed { message: String },
}

/// Errors that can occur while evaluating one template fragment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("column '{column}' is not available")]
    MissingColumn { column: String },

    #[error("invalid condition '{condition}': {message}")]
    InvalidCondition { condition: String, message: String },

    #[error("call to {target}->{method} failed: {source}")]
    Dispatch {
        target: String,
        method: String,
        #[source]
        source: DispatchError,
    },

    #[error("invalid base64 payload in data URI ({mime})")]
    InvalidBase64 { mime: String },

    #[error("disallowed character '{found}' in arithmetic expression '{expression}'")]
    MathCharset { expression: String, found: char },

    #[error("column '{column}' is not numeric, using 0")]
    NonNumeric { column: String },

    #[error("division by zero in '{expression}'")]
    DivisionByZero { expression: String },

    #[error("malformed arithmetic expression '{expression}': {message}")]
    MathSyntax { expression: String, message: String },

    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("{what} limit of {limit} exceeded")]
    LimitExceeded { what: &'static str, limit: usize },

    #[error("unresolved template syntax left in output: {snippet}")]
    Leftover { snippet: String },
}

impl TemplateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TemplateError::MissingColumn { .. } => ErrorKind::MissingColumn,
            TemplateError::InvalidCondition { .. } => ErrorKind::InvalidConditionSyntax,
            TemplateError::Dispatch { .. } => ErrorKind::UnresolvedDispatchTarget,
            TemplateError::InvalidBase64 { .. } => ErrorKind::InvalidBase64,
            TemplateError::MathCharset { .. } => ErrorKind::MathCharsetViolation,
            TemplateError::NonNumeric { .. }
            | TemplateError::DivisionByZero { .. }
            | TemplateError::MathSyntax { .. } => ErrorKind::MathEvaluation,
            TemplateError::Parse { .. } => ErrorKind::MalformedSyntax,
            TemplateError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            TemplateError::Leftover { .. } => ErrorKind::UnparsedLeftoverSyntax,
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        TemplateError::Parse {
            message: message.into(),
        }
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
