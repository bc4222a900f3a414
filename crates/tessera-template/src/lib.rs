/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Row template engine for card and table views.
//!
//! A template is HTML with embedded placeholders that are resolved against
//! one flattened data row:
//!
//! - Column substitution: `::users.name::` (only for whitelisted columns)
//! - Arithmetic: `::MATH(::price:: * ::qty::)::`
//! - Conditionals: `::IF(cond, value[, else])::ELSEIF(cond, value)::ELSE(value)::`
//! - Collaborator calls: `::~File->getFile(::users.avatar::)->url()~::`
//! - Legacy calls: `::FileHelper::getFile(::users.avatar::)::`
//!
//! Substituted values of the form `data:<mime>;base64,<payload>` are turned
//! into media elements or download links depending on the
//! [`PresentationMode`].
//!
//! # Architecture
//!
//! The engine performs no I/O. Method calls go through a caller-supplied
//! [`Dispatcher`] (usually a [`Registry`]) and fallback asset URLs come from an
//! [`AssetResolver`]. Failures never abort a render: each one is logged with
//! `tracing`, recorded as a [`Diagnostic`], and the failed fragment is
//! replaced by its fallback text.
//!
//! # Example
//!
//! ```ignore
//! use tessera_template::{NullDispatcher, RenderOptions, Renderer, Row, StaticAssets, ValidColumns};
//!
//! let row = Row::new().with("is_approved", "1");
//! let columns: ValidColumns = ["is_approved"].into_iter().collect();
//! let assets = StaticAssets::new();
//! let renderer = Renderer::new(&NullDispatcher, &assets, RenderOptions::default());
//!
//! let html = renderer.render("::IF(is_approved = 1, Active, Inactive)::", &row, &columns, true);
//! assert_eq!(html, "Active");
//! ```

pub mod call;
pub mod condition;
pub mod conditional;
pub mod data_uri;
pub mod diagnostic;
pub mod dispatch;
pub mod error;
pub mod eval_context;
pub mod math;
pub mod options;
pub mod placeholder;
pub mod render;
pub mod row;
pub mod tokenizer;
pub mod value;

// Re-export main types at crate root
pub use call::MethodCallSpec;
pub use condition::{CompareOp, Condition};
pub use conditional::Conditional;
pub use data_uri::DataUri;
pub use diagnostic::{Diagnostic, DiagnosticCollector};
pub use dispatch::{
    AssetResolver, Collaborator, DEFAULT_ASSET, Dispatcher, FnCollaborator, NullDispatcher,
    Registry, StaticAssets,
};
pub use error::{DispatchError, ErrorKind, TemplateError, TemplateResult};
pub use eval_context::EvalContext;
pub use options::{PresentationMode, RenderOptions};
pub use render::{Rendered, Renderer, escape_html};
pub use row::{Row, ValidColumns};
pub use tokenizer::ParsedParameter;
pub use value::Value;
