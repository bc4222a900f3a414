//! tessera CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tessera::commands::{self, check::CheckArgs, render::RenderArgs};
use tessera_template::PresentationMode;

#[derive(Parser)]
#[command(name = "tessera")]
#[command(version)]
#[command(about = "Render row templates into HTML fragments", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Turn media data URIs into HTML elements (card views)
    Rich,
    /// Leave data URIs untouched (table views)
    Raw,
}

impl From<Mode> for PresentationMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Rich => PresentationMode::Rich,
            Mode::Raw => PresentationMode::Raw,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template once per data row
    Render {
        /// Template file
        template: PathBuf,

        /// JSON file holding one row object or an array of rows
        #[arg(short, long)]
        rows: Option<PathBuf>,

        /// Columns the template may substitute (default: all columns in the rows)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// HTML-escape the rendered output
        #[arg(long)]
        escape: bool,

        /// How data URIs are presented
        #[arg(long, value_enum)]
        mode: Option<Mode>,

        /// Exit with an error if any row produced diagnostics
        #[arg(long)]
        strict: bool,

        /// Directory to search for _tessera.yml
        #[arg(long)]
        project: Option<PathBuf>,

        /// Write output to FILE instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report problems in a template as JSON
    Check {
        /// Template file
        template: PathBuf,

        /// Columns the template may use
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Directory to search for _tessera.yml
        #[arg(long)]
        project: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tessera=info,tessera_template=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            template,
            rows,
            columns,
            escape,
            mode,
            strict,
            project,
            output,
        } => commands::render::execute(RenderArgs {
            template,
            rows,
            columns,
            escape,
            mode: mode.map(Into::into),
            strict,
            project,
            output,
        }),
        Commands::Check {
            template,
            columns,
            project,
        } => commands::check::execute(CheckArgs {
            template,
            columns,
            project,
        }),
    }
}
