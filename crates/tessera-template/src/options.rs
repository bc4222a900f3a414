/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Renderer configuration.
//!
//! Every field has a default, so a configuration file only needs to name the
//! settings it changes.

use std::collections::HashMap;

use serde::Deserialize;

/// How valid data URIs are presented after substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationMode {
    /// Audio, video, PDF and other payloads become HTML elements (card views).
    #[default]
    Rich,
    /// Every data URI is left as-is (table views).
    Raw,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    pub mode: PresentationMode,

    /// Maximum nesting of recursive renders (nested calls and conditionals).
    pub max_depth: usize,

    /// Maximum number of blocks the conditional resolver rewrites per render.
    pub max_conditional_passes: usize,

    /// Legacy `::Target::method()::` names and the collaborator they map to.
    pub legacy_targets: HashMap<String, String>,

    /// Methods whose failure falls back to a default asset, keyed by method
    /// name with the asset kind as value.
    pub asset_methods: HashMap<String, String>,

    /// Treat any diagnostic as a failed render (reported, never raised).
    pub strict: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        let legacy_targets = [
            ("FileHelper", "File"),
            ("ImageHelper", "File"),
            ("TextHelper", "Text"),
            ("DateHelper", "Date"),
        ];
        let asset_methods = [
            ("getFile", "file"),
            ("fetchFile", "file"),
            ("fetch", "file"),
            ("file", "file"),
            ("getImage", "image"),
            ("image", "image"),
        ];
        Self {
            mode: PresentationMode::Rich,
            max_depth: 16,
            max_conditional_passes: 256,
            legacy_targets: legacy_targets
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            asset_methods: asset_methods
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            strict: false,
        }
    }
}

impl RenderOptions {
    pub fn with_mode(mut self, mode: PresentationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Collaborator name for a legacy target, or the name itself.
    pub fn legacy_target<'a>(&'a self, name: &'a str) -> &'a str {
        self.legacy_targets
            .get(name)
            .map(String::as_str)
            .unwrap_or(name)
    }

    /// Asset kind whose default replaces a failed call to `method`, if any.
    pub fn asset_kind(&self, method: &str) -> Option<&str> {
        self.asset_methods.get(method).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RenderOptions::default();
        assert_eq!(options.mode, PresentationMode::Rich);
        assert_eq!(options.max_depth, 16);
        assert_eq!(options.legacy_target("FileHelper"), "File");
        assert_eq!(options.legacy_target("Custom"), "Custom");
        assert_eq!(options.asset_kind("getFile"), Some("file"));
        assert_eq!(options.asset_kind("format"), None);
    }

    #[test]
    fn test_partial_deserialize() {
        let options: RenderOptions =
            serde_json::from_str(r#"{"mode": "raw", "max_depth": 4}"#).unwrap();
        assert_eq!(options.mode, PresentationMode::Raw);
        assert_eq!(options.max_depth, 4);
        assert_eq!(options.max_conditional_passes, 256);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<RenderOptions, _> = serde_json::from_str(r#"{"colour": "red"}"#);
        assert!(result.is_err());
    }
}
