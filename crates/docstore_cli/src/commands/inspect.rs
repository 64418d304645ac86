//! Inspect command implementation.

use super::{load_snapshot, Format};
use crate::error::CliResult;
use docstore_core::traverse::children;
use docstore_core::{DocumentStore, NodeReader, PermissiveSchema, StoreConfig};
use docstore_model::{Node, NodeId, Selection};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Document inspection result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectResult {
    /// Snapshot path.
    pub path: String,
    /// Root node identifier.
    pub root_id: NodeId,
    /// Number of stored nodes.
    pub node_count: usize,
    /// Number of text leaves.
    pub text_node_count: usize,
    /// Number of chars over all text leaves.
    pub char_count: usize,
    /// Number of marks over all text leaves.
    pub mark_count: usize,
    /// Number of decorators.
    pub decorator_count: usize,
    /// Stored nodes not reachable from the root.
    pub unreachable_count: usize,
    /// Current selection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    /// The node tree, one line per node in document order.
    pub tree: Vec<String>,
}

/// Runs the inspect command.
pub fn run(doc: &Path, format: Format, out: &mut dyn Write) -> CliResult<InspectResult> {
    let snapshot = load_snapshot(doc)?;
    // Broken documents are still worth looking at.
    let store = DocumentStore::from_snapshot(
        snapshot,
        Arc::new(PermissiveSchema),
        StoreConfig::default().verify_on_load(false),
    )?;

    let mut tree = Vec::new();
    describe(&store, store.root_id(), 0, &mut tree);

    let snapshot = store.snapshot();
    let texts: Vec<&Node> = snapshot.nodes.iter().filter(|n| n.is_text()).collect();
    let result = InspectResult {
        path: doc.display().to_string(),
        root_id: snapshot.root_id.clone(),
        node_count: snapshot.nodes.len(),
        text_node_count: texts.len(),
        char_count: texts.iter().map(|n| n.text_len()).sum(),
        mark_count: texts.iter().map(|n| n.marks().len()).sum(),
        decorator_count: snapshot.decorators.len(),
        unreachable_count: snapshot.nodes.len().saturating_sub(tree.len()),
        selection: snapshot.selection.clone(),
        tree,
    };

    match format {
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?,
        Format::Text => print_text_output(&result, out)?,
    }
    Ok(result)
}

/// Appends one line per node under `id`, guarding against cycles by depth.
fn describe(store: &DocumentStore, id: &NodeId, depth: usize, lines: &mut Vec<String>) {
    let Some(node) = store.get_node(id) else {
        return;
    };
    if depth > store.graph().node_count() {
        return;
    }
    let indent = "  ".repeat(depth);
    let line = match &node.text {
        Some(text) => {
            let marks: Vec<String> = node
                .marks()
                .iter()
                .map(|m| format!("{} {}..{}", m.mark_type, m.range.start, m.range.end))
                .collect();
            if marks.is_empty() {
                format!("{indent}{} {} {text:?}", node.node_type, node.id)
            } else {
                format!("{indent}{} {} {text:?} [{}]", node.node_type, node.id, marks.join(", "))
            }
        }
        None => format!("{indent}{} {}", node.node_type, node.id),
    };
    lines.push(line);
    for child in children(store, id) {
        describe(store, &child.id, depth + 1, lines);
    }
}

fn print_text_output(result: &InspectResult, out: &mut dyn Write) -> CliResult<()> {
    writeln!(out, "Document: {}", result.path)?;
    writeln!(out)?;
    writeln!(out, "Nodes:       {}", result.node_count)?;
    writeln!(out, "Text nodes:  {}", result.text_node_count)?;
    writeln!(out, "Characters:  {}", result.char_count)?;
    writeln!(out, "Marks:       {}", result.mark_count)?;
    writeln!(out, "Decorators:  {}", result.decorator_count)?;
    if result.unreachable_count > 0 {
        writeln!(out, "Unreachable: {}", result.unreachable_count)?;
    }
    if let Some(selection) = &result.selection {
        writeln!(out, "Selection:   {}", serde_json::to_string(selection)?)?;
    }
    writeln!(out)?;
    for line in &result.tree {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
