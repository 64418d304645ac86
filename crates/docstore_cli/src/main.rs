//! docstore CLI
//!
//! Command-line tools for docstore JSON snapshots.
//!
//! # Commands
//!
//! - `apply` - Run a batch of operations as one transaction
//! - `inspect` - Display the node tree and document statistics
//! - `verify` - Check document integrity
//! - `version` - Show version information

mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::Format;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// docstore command-line document tools.
#[derive(Parser)]
#[command(name = "docstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of operations against a snapshot as one transaction
    Apply {
        /// Snapshot to load
        #[arg(short, long)]
        doc: PathBuf,

        /// JSON array of operations
        #[arg(long)]
        ops: PathBuf,

        /// Where to write the resulting snapshot
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Display the node tree and document statistics
    Inspect {
        /// Snapshot to load
        #[arg(short, long)]
        doc: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Check document integrity
    Verify {
        /// Snapshot to load
        #[arg(short, long)]
        doc: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Apply {
            doc,
            ops,
            out: target,
            format,
        } => {
            commands::apply::run(&doc, &ops, target.as_deref(), format, &mut out)?;
        }
        Commands::Inspect { doc, format } => {
            commands::inspect::run(&doc, format, &mut out)?;
        }
        Commands::Verify { doc, format } => {
            commands::verify::run(&doc, format, &mut out)?;
        }
        Commands::Version => {
            writeln!(out, "docstore CLI v{}", env!("CARGO_PKG_VERSION"))?;
            writeln!(out, "docstore core v{}", docstore_core::VERSION)?;
        }
    }

    Ok(())
}
