//! CLI command implementations.

pub mod apply;
pub mod inspect;
pub mod verify;

use crate::error::{CliError, CliResult};
use docstore_model::DocumentSnapshot;
use std::path::Path;

/// Output format shared by the commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Reads a file, naming it in the error.
pub(crate) fn read_file(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a snapshot from a JSON file.
pub(crate) fn load_snapshot(path: &Path) -> CliResult<DocumentSnapshot> {
    let text = read_file(path)?;
    Ok(DocumentSnapshot::from_json(&text)?)
}
