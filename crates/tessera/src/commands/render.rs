/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

//! Render command implementation.
//!
//! `tessera render TEMPLATE --rows rows.json` renders the template once per
//! row and prints the fragments, one per line. Without `--columns` every
//! column present in the rows is whitelisted.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use tessera_template::{PresentationMode, Rendered, Renderer, Row, ValidColumns};

use crate::collaborators;
use crate::commands::{parse_rows, read_template};
use crate::config::Project;

/// Arguments for the render command
#[derive(Debug, Default)]
pub struct RenderArgs {
    /// Template file
    pub template: PathBuf,
    /// JSON file with one row object or an array of rows (none: one empty row)
    pub rows: Option<PathBuf>,
    /// Whitelisted columns (default: every column in the rows)
    pub columns: Vec<String>,
    /// HTML-escape the output
    pub escape: bool,
    /// Presentation mode override
    pub mode: Option<PresentationMode>,
    /// Fail when any row produced diagnostics
    pub strict: bool,
    /// Directory to search for `_tessera.yml` (default: the template's directory)
    pub project: Option<PathBuf>,
    /// Output file (default: stdout)
    pub output: Option<PathBuf>,
}

/// Render every row and return the results.
pub fn run(args: &RenderArgs) -> Result<Vec<Rendered>> {
    let template = read_template(&args.template)?;
    let project = Project::discover(args.project.as_ref().unwrap_or(&args.template))?;

    let (rows, found_columns) = match &args.rows {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read rows {}", path.display()))?;
            parse_rows(&content)?
        }
        None => (vec![Row::new()], ValidColumns::new()),
    };
    let columns = if args.columns.is_empty() {
        found_columns
    } else {
        args.columns.iter().cloned().collect()
    };

    let mut options = project.config.render.clone();
    if let Some(mode) = args.mode {
        options.mode = mode;
    }
    if args.strict {
        options.strict = true;
    }

    let registry = collaborators::registry(project.files_root());
    let assets = project.config.assets();
    let renderer = Renderer::new(&registry, &assets, options);

    info!(
        "Rendering {} with {} row(s)",
        args.template.display(),
        rows.len()
    );
    Ok(renderer.render_rows(&template, &rows, &columns, !args.escape))
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let results = run(&args)?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    for rendered in &results {
        writeln!(out, "{}", rendered.output)?;
    }
    out.flush()?;

    let failed = results.iter().filter(|r| r.has_errors()).count();
    if failed > 0 {
        warn!("{} row(s) rendered with diagnostics", failed);
        anyhow::bail!("Strict mode: {} of {} row(s) had diagnostics", failed, results.len());
    }
    Ok(())
}
