//! Apply command implementation.

use super::{load_snapshot, read_file, Format};
use crate::error::{CliError, CliResult};
use docstore_core::{DocumentStore, PermissiveSchema, StoreConfig, TransactionResult};
use docstore_model::Operation;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs the apply command.
///
/// Loads the snapshot, runs every operation in one transaction and, on
/// success, writes the resulting snapshot to `target` if given. A failed
/// transaction leaves `target` untouched.
pub fn run(
    doc: &Path,
    ops: &Path,
    target: Option<&Path>,
    format: Format,
    out: &mut dyn Write,
) -> CliResult<TransactionResult> {
    let snapshot = load_snapshot(doc)?;
    let operations = load_operations(ops)?;
    debug!(operations = operations.len(), "loaded operations");

    let store = DocumentStore::from_snapshot(
        snapshot,
        Arc::new(PermissiveSchema),
        StoreConfig::default(),
    )?;
    let result = store.run(&operations);

    match format {
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?,
        Format::Text => print_text_output(&result, out)?,
    }

    if !result.success {
        return Err(CliError::TransactionFailed {
            code: result.error_code.clone().unwrap_or_default(),
            message: result.error.clone().unwrap_or_default(),
        });
    }

    if let Some(target) = target {
        let json = store.snapshot().to_json()?;
        std::fs::write(target, json).map_err(|source| CliError::Io {
            path: target.to_path_buf(),
            source,
        })?;
        info!(path = %target.display(), "wrote snapshot");
    }

    Ok(result)
}

/// Reads a JSON array of operations.
fn load_operations(path: &Path) -> CliResult<Vec<Operation>> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Operations {
        path: path.to_path_buf(),
        source,
    })
}

fn print_text_output(result: &TransactionResult, out: &mut dyn Write) -> CliResult<()> {
    if result.success {
        writeln!(out, "✓ Transaction committed")?;
    } else {
        writeln!(out, "✗ Transaction rolled back")?;
        if let Some(error) = &result.error {
            writeln!(out, "  Error: {error}")?;
        }
    }
    writeln!(out, "  Operations: {}", result.operations.len())?;
    writeln!(out, "  Inverse operations: {}", result.inverse_operations.len())?;
    for op in &result.operations {
        match op.target_node() {
            Some(node) => writeln!(out, "    {} {node}", op.name())?,
            None => writeln!(out, "    {}", op.name())?,
        }
    }
    Ok(())
}
