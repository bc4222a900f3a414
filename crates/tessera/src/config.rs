/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Project configuration loading
 */

//! Project configuration from `_tessera.yml`.
//!
//! ```yaml
//! render:
//!   mode: raw
//!   max_depth: 8
//! assets:
//!   file: /static/missing.png
//! files:
//!   root: uploads
//! ```
//!
//! Every section is optional. Relative paths resolve against the directory
//! holding the configuration file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use tessera_template::{RenderOptions, StaticAssets};

const CONFIG_FILES: [&str; 2] = ["_tessera.yml", "_tessera.yaml"];

/// Where the `File` collaborator may read from.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    pub root: Option<PathBuf>,
}

/// Parsed `_tessera.yml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub render: RenderOptions,

    /// Fallback asset URL per asset kind.
    pub assets: HashMap<String, String>,

    pub files: FilesConfig,
}

impl ProjectConfig {
    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file is a valid, empty configuration.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Default assets with the configured overrides applied.
    pub fn assets(&self) -> StaticAssets {
        StaticAssets::with_defaults(self.assets.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// A configuration together with the directory it was found in.
#[derive(Debug, Clone)]
pub struct Project {
    pub dir: PathBuf,
    pub config: ProjectConfig,
    /// Path of the configuration file, if one was found.
    pub config_path: Option<PathBuf>,
}

impl Project {
    /// Search `start` and its parents for a configuration file.
    ///
    /// Without one, `start` becomes the project directory with a default
    /// configuration.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let start = start.as_ref();
        let start = start
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", start.display()))?;
        let search_dir = if start.is_file() {
            start.parent().map(Path::to_path_buf).unwrap_or_else(|| start.clone())
        } else {
            start
        };

        let mut current = Some(search_dir.as_path());
        while let Some(dir) = current {
            for name in CONFIG_FILES {
                let path = dir.join(name);
                if path.exists() {
                    return Self::load(dir, path);
                }
            }
            current = dir.parent();
        }

        debug!("No project configuration found, using defaults");
        Ok(Self {
            dir: search_dir,
            config: ProjectConfig::default(),
            config_path: None,
        })
    }

    fn load(dir: &Path, path: PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = ProjectConfig::from_yaml(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        debug!("Loaded project configuration from {}", path.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            config_path: Some(path),
        })
    }

    /// Directory the `File` collaborator reads from.
    pub fn files_root(&self) -> PathBuf {
        match &self.config.files.root {
            Some(root) => self.dir.join(root),
            None => self.dir.clone(),
        }
    }
}
