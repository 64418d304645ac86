//! Verify command implementation.

use super::{load_snapshot, Format};
use crate::error::{CliError, CliResult};
use docstore_core::{check_integrity, IntegrityReport};
use std::io::Write;
use std::path::Path;

/// Runs the verify command.
///
/// Prints the integrity report and fails if it lists any issue.
pub fn run(doc: &Path, format: Format, out: &mut dyn Write) -> CliResult<IntegrityReport> {
    let snapshot = load_snapshot(doc)?;
    let report = check_integrity(&snapshot);

    match format {
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
        Format::Text => print_result(doc, &report, out)?,
    }

    if report.is_ok() {
        Ok(report)
    } else {
        Err(CliError::VerificationFailed {
            issues: report.issues.len(),
        })
    }
}

fn print_result(doc: &Path, report: &IntegrityReport, out: &mut dyn Write) -> CliResult<()> {
    writeln!(out, "Verifying document at {}", doc.display())?;
    writeln!(out)?;
    writeln!(out, "  Nodes checked: {}", report.nodes_checked)?;
    writeln!(out, "  Decorators checked: {}", report.decorators_checked)?;
    writeln!(out, "  Issues: {}", report.issues.len())?;
    for issue in &report.issues {
        writeln!(out, "    - {issue}")?;
    }
    writeln!(out)?;
    if report.is_ok() {
        writeln!(out, "✓ Document verification passed")?;
    } else {
        writeln!(out, "✗ Document verification failed")?;
    }
    Ok(())
}
