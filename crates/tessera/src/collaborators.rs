/*
 * collaborators.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Built-in collaborators available to templates
 */

//! Collaborators registered by the command-line front end.
//!
//! - `File`: `fetch(path)` (aliases `getFile`, `file`) reads a file below the
//!   project's files root and returns it as a base64 data URI.
//! - `Text`: string helpers (`upper`, `lower`, `trim`, `limit`, `default`).
//!   Also registered as the scalar-method collaborator so that any chain can
//!   end in `->upper()`.

use std::path::{Component, Path, PathBuf};

use base64::prelude::*;
use tessera_template::{Collaborator, DispatchError, Registry, Value};

/// MIME type used for a data URI built from `path`.
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn string_arg(method: &str, args: &[Value], index: usize) -> Result<String, DispatchError> {
    match args.get(index) {
        Some(Value::List(_) | Value::Object(_)) | None => Err(DispatchError::InvalidArguments {
            method: method.to_string(),
            message: format!("argument {} must be text", index + 1),
        }),
        Some(value) => Ok(value.render()),
    }
}

/// Reads files below a root directory.
#[derive(Debug, Clone)]
pub struct FileCollaborator {
    root: PathBuf,
}

impl FileCollaborator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `relative` below the root, refusing anything that could escape it.
    fn resolve(&self, relative: &str) -> Result<PathBuf, DispatchError> {
        let path = Path::new(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if relative.is_empty() || escapes {
            return Err(DispatchError::InvalidArguments {
                method: "fetch".to_string(),
                message: format!("'{}' is not a relative path inside the files root", relative),
            });
        }
        Ok(self.root.join(path))
    }

    fn fetch(&self, args: &[Value]) -> Result<Value, DispatchError> {
        let relative = string_arg("fetch", args, 0)?;
        let path = self.resolve(&relative)?;
        let bytes = std::fs::read(&path).map_err(|e| DispatchError::Failed {
            message: format!("cannot read {}: {}", relative, e),
        })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "fetched file");
        Ok(Value::String(format!(
            "data:{};base64,{}",
            mime_for(&path),
            BASE64_STANDARD.encode(bytes)
        )))
    }
}

impl Collaborator for FileCollaborator {
    fn name(&self) -> &str {
        "File"
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, DispatchError> {
        match method {
            "fetch" | "getFile" | "file" => self.fetch(args),
            _ => Err(DispatchError::UnknownMethod {
                target: "File".to_string(),
                method: method.to_string(),
            }),
        }
    }
}

/// String helpers. The subject is always the first argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextMethods;

impl TextMethods {
    fn limit(args: &[Value]) -> Result<Value, DispatchError> {
        let text = string_arg("limit", args, 0)?;
        let max = args
            .get(1)
            .and_then(Value::as_number)
            .filter(|n| *n >= 0.0)
            .ok_or_else(|| DispatchError::InvalidArguments {
                method: "limit".to_string(),
                message: "argument 2 must be a non-negative number".to_string(),
            })? as usize;
        if text.chars().count() <= max {
            return Ok(Value::String(text));
        }
        let suffix = match args.get(2) {
            Some(value) => value.render(),
            None => "...".to_string(),
        };
        let mut out: String = text.chars().take(max).collect();
        out.push_str(&suffix);
        Ok(Value::String(out))
    }
}

impl Collaborator for TextMethods {
    fn name(&self) -> &str {
        "Text"
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, DispatchError> {
        let text = || string_arg(method, args, 0);
        match method {
            "upper" => Ok(Value::String(text()?.to_uppercase())),
            "lower" => Ok(Value::String(text()?.to_lowercase())),
            "trim" => Ok(Value::String(text()?.trim().to_string())),
            "limit" => Self::limit(args),
            "default" => match args.first() {
                Some(value) if !value.is_blank() => Ok(value.clone()),
                _ => Ok(args.get(1).cloned().unwrap_or_default()),
            },
            _ => Err(DispatchError::UnknownMethod {
                target: "Text".to_string(),
                method: method.to_string(),
            }),
        }
    }
}

/// Registry with every built-in collaborator.
pub fn registry(files_root: impl Into<PathBuf>) -> Registry {
    let mut registry = Registry::new();
    registry.register("File", FileCollaborator::new(files_root));
    registry.register("Text", TextMethods);
    registry.with_scalar_methods(TextMethods)
}
