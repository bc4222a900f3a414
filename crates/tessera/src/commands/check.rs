/*
 * check.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Check command implementation
 */

//! Check command implementation.
//!
//! `tessera check TEMPLATE --columns a,b` renders the template against a row
//! in which every listed column is null and reports what went wrong as
//! JSON. Unlisted columns, malformed blocks, unknown collaborators and
//! leftover syntax all show up as diagnostics.

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use tessera_template::{Diagnostic, Renderer, Row, ValidColumns, Value};

use crate::collaborators;
use crate::commands::read_template;
use crate::config::Project;

/// Arguments for the check command
#[derive(Debug, Default)]
pub struct CheckArgs {
    /// Template file
    pub template: PathBuf,
    /// Columns the template is allowed to use
    pub columns: Vec<String>,
    /// Directory to search for `_tessera.yml` (default: the template's directory)
    pub project: Option<PathBuf>,
}

/// Result of checking one template.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub template: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Check a template and return the report.
pub fn run(args: &CheckArgs) -> Result<CheckReport> {
    let template = read_template(&args.template)?;
    let project = Project::discover(args.project.as_ref().unwrap_or(&args.template))?;

    let columns: ValidColumns = args.columns.iter().cloned().collect();
    let row: Row = args.columns.iter().map(|c| (c, Value::Null)).collect();

    let registry = collaborators::registry(project.files_root());
    let assets = project.config.assets();
    let renderer = Renderer::new(&registry, &assets, project.config.render.clone());
    let rendered = renderer.render_with_diagnostics(&template, &row, &columns, true);

    Ok(CheckReport {
        template: args.template.clone(),
        diagnostics: rendered.diagnostics,
    })
}

/// Execute the check command
pub fn execute(args: CheckArgs) -> Result<()> {
    let report = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_clean() {
        anyhow::bail!(
            "{} has {} problem(s)",
            args.template.display(),
            report.diagnostics.len()
        );
    }
    info!("{} is clean", args.template.display());
    Ok(())
}
