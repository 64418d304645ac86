//! Structural integrity checks over a whole document.
//!
//! Operations keep these invariants on every commit; the checker exists for
//! documents that arrive from outside (snapshots, fixtures, other tools) and
//! for tests that want to assert a graph is still well-formed.

use crate::marks::normalize_marks;
use docstore_model::{DecoratorId, DocumentSnapshot, Node, NodeId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntegrityIssue {
    /// The root node is absent.
    #[serde(rename_all = "camelCase")]
    MissingRoot {
        /// Declared root.
        root_id: NodeId,
    },
    /// Two records share an identifier.
    #[serde(rename_all = "camelCase")]
    DuplicateNode {
        /// The repeated identifier.
        node_id: NodeId,
    },
    /// A child list names a node that does not exist.
    #[serde(rename_all = "camelCase")]
    DanglingChild {
        /// Container holding the reference.
        parent_id: NodeId,
        /// Missing child.
        child_id: NodeId,
    },
    /// A node is listed more than once across child lists.
    #[serde(rename_all = "camelCase")]
    SharedChild {
        /// The node listed again.
        child_id: NodeId,
        /// The second container listing it.
        parent_id: NodeId,
    },
    /// A node's parent back-reference disagrees with the child lists.
    #[serde(rename_all = "camelCase")]
    ParentMismatch {
        /// The node.
        node_id: NodeId,
        /// The container whose child list holds the node.
        listed_by: Option<NodeId>,
        /// The back-reference stored on the node.
        recorded: Option<NodeId>,
    },
    /// A node carries both text and a child list.
    #[serde(rename_all = "camelCase")]
    LeafContainerConflict {
        /// The node.
        node_id: NodeId,
    },
    /// A node without text carries marks.
    #[serde(rename_all = "camelCase")]
    MarksWithoutText {
        /// The node.
        node_id: NodeId,
    },
    /// A mark range is empty or extends past the text.
    #[serde(rename_all = "camelCase")]
    InvalidMark {
        /// The node.
        node_id: NodeId,
        /// Mark type.
        mark_type: String,
        /// Range start.
        start: usize,
        /// Range end.
        end: usize,
    },
    /// The marks are valid but not in normalized form (unsorted, or
    /// overlapping marks of the same kind).
    #[serde(rename_all = "camelCase")]
    MarksNotNormalized {
        /// The node.
        node_id: NodeId,
    },
    /// A decorator's anchor is missing or out of range.
    #[serde(rename_all = "camelCase")]
    InvalidDecorator {
        /// The decorator.
        decorator_id: DecoratorId,
        /// What is wrong with it.
        reason: String,
    },
    /// A node names a parent but no child list reaches it.
    #[serde(rename_all = "camelCase")]
    Unreachable {
        /// The node.
        node_id: NodeId,
    },
    /// Following child lists from the root comes back to this node.
    #[serde(rename_all = "camelCase")]
    Cycle {
        /// The node reached twice.
        node_id: NodeId,
    },
    /// The selection references a node that does not exist.
    #[serde(rename_all = "camelCase")]
    SelectionTarget {
        /// Missing node.
        node_id: NodeId,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRoot { root_id } => write!(f, "root {root_id} is missing"),
            Self::DuplicateNode { node_id } => write!(f, "node {node_id} appears more than once"),
            Self::DanglingChild {
                parent_id,
                child_id,
            } => write!(f, "{parent_id} lists missing child {child_id}"),
            Self::SharedChild {
                child_id,
                parent_id,
            } => write!(f, "{child_id} is listed again by {parent_id}"),
            Self::ParentMismatch {
                node_id,
                listed_by,
                recorded,
            } => write!(
                f,
                "{node_id} is listed by {} but records parent {}",
                display_opt(listed_by.as_ref()),
                display_opt(recorded.as_ref())
            ),
            Self::LeafContainerConflict { node_id } => {
                write!(f, "{node_id} has both text and children")
            }
            Self::MarksWithoutText { node_id } => write!(f, "{node_id} has marks but no text"),
            Self::InvalidMark {
                node_id,
                mark_type,
                start,
                end,
            } => write!(f, "{node_id} has invalid {mark_type} mark [{start}, {end})"),
            Self::MarksNotNormalized { node_id } => {
                write!(f, "marks of {node_id} are not normalized")
            }
            Self::InvalidDecorator {
                decorator_id,
                reason,
            } => write!(f, "decorator {decorator_id}: {reason}"),
            Self::Unreachable { node_id } => write!(f, "{node_id} has a parent but is not reachable from any child list"),
            Self::Cycle { node_id } => write!(f, "cycle through {node_id}"),
            Self::SelectionTarget { node_id } => {
                write!(f, "selection references missing node {node_id}")
            }
        }
    }
}

fn display_opt(id: Option<&NodeId>) -> String {
    id.map_or_else(|| "nothing".to_string(), ToString::to_string)
}

/// Result of [`check_integrity`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    /// Number of node records examined.
    pub nodes_checked: usize,
    /// Number of decorators examined.
    pub decorators_checked: usize,
    /// Every problem found, in discovery order.
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    /// Returns true if no issue was found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Checks every structural invariant of a document snapshot.
#[must_use]
pub fn check_integrity(snapshot: &DocumentSnapshot) -> IntegrityReport {
    let mut issues = Vec::new();

    let mut nodes: HashMap<&NodeId, &Node> = HashMap::with_capacity(snapshot.nodes.len());
    for node in &snapshot.nodes {
        if nodes.insert(&node.id, node).is_some() {
            issues.push(IntegrityIssue::DuplicateNode {
                node_id: node.id.clone(),
            });
        }
    }

    let listed_by = check_children(&snapshot.nodes, &nodes, &mut issues);

    for node in &snapshot.nodes {
        check_node(node, &mut issues);
        let expected = listed_by.get(&node.id).cloned();
        if node.parent != expected {
            issues.push(IntegrityIssue::ParentMismatch {
                node_id: node.id.clone(),
                listed_by: expected,
                recorded: node.parent.clone(),
            });
        }
    }

    if nodes.contains_key(&snapshot.root_id) {
        check_reachability(&snapshot.root_id, &nodes, &mut issues);
    } else {
        issues.push(IntegrityIssue::MissingRoot {
            root_id: snapshot.root_id.clone(),
        });
    }

    for decorator in &snapshot.decorators {
        if let Some(reason) = decorator_problem(decorator, &nodes) {
            issues.push(IntegrityIssue::InvalidDecorator {
                decorator_id: decorator.id.clone(),
                reason,
            });
        }
    }

    if let Some(selection) = &snapshot.selection {
        for node_id in selection.node_ids() {
            if !nodes.contains_key(node_id) {
                issues.push(IntegrityIssue::SelectionTarget {
                    node_id: node_id.clone(),
                });
            }
        }
    }

    IntegrityReport {
        nodes_checked: snapshot.nodes.len(),
        decorators_checked: snapshot.decorators.len(),
        issues,
    }
}

/// Validates child references; returns child -> first container listing it.
fn check_children(
    all: &[Node],
    nodes: &HashMap<&NodeId, &Node>,
    issues: &mut Vec<IntegrityIssue>,
) -> HashMap<NodeId, NodeId> {
    let mut listed_by: HashMap<NodeId, NodeId> = HashMap::new();
    for node in all {
        for child in node.children() {
            if !nodes.contains_key(child) {
                issues.push(IntegrityIssue::DanglingChild {
                    parent_id: node.id.clone(),
                    child_id: child.clone(),
                });
                continue;
            }
            if listed_by.contains_key(child) {
                issues.push(IntegrityIssue::SharedChild {
                    child_id: child.clone(),
                    parent_id: node.id.clone(),
                });
                continue;
            }
            listed_by.insert(child.clone(), node.id.clone());
        }
    }
    listed_by
}

fn check_node(node: &Node, issues: &mut Vec<IntegrityIssue>) {
    let node_id = || node.id.clone();
    if node.text.is_some() && node.content.is_some() {
        issues.push(IntegrityIssue::LeafContainerConflict { node_id: node_id() });
    }
    if node.text.is_none() {
        if !node.marks().is_empty() {
            issues.push(IntegrityIssue::MarksWithoutText { node_id: node_id() });
        }
        return;
    }

    let len = node.text_len();
    let mut valid = true;
    for mark in node.marks() {
        if mark.range.is_empty() || mark.range.end > len {
            valid = false;
            issues.push(IntegrityIssue::InvalidMark {
                node_id: node_id(),
                mark_type: mark.mark_type.clone(),
                start: mark.range.start,
                end: mark.range.end,
            });
        }
    }
    if valid && normalize_marks(node.marks().to_vec(), len) != node.marks() {
        issues.push(IntegrityIssue::MarksNotNormalized { node_id: node_id() });
    }
}

fn check_reachability(
    root: &NodeId,
    nodes: &HashMap<&NodeId, &Node>,
    issues: &mut Vec<IntegrityIssue>,
) {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut path: HashSet<NodeId> = HashSet::new();
    visit(root, nodes, &mut visited, &mut path, issues);

    // Parentless nodes are detached subtrees left by removeChild or a
    // createNode without a parent; they and their descendants are sound.
    let mut detached: Vec<&NodeId> = nodes
        .iter()
        .filter(|(id, node)| node.parent.is_none() && !visited.contains(**id))
        .map(|(id, _)| *id)
        .collect();
    detached.sort();
    for id in detached {
        visit(id, nodes, &mut visited, &mut path, issues);
    }

    let mut unreachable: Vec<&NodeId> = nodes
        .keys()
        .copied()
        .filter(|id| !visited.contains(*id))
        .collect();
    unreachable.sort();
    issues.extend(
        unreachable
            .into_iter()
            .map(|id| IntegrityIssue::Unreachable { node_id: id.clone() }),
    );
}

fn visit(
    id: &NodeId,
    nodes: &HashMap<&NodeId, &Node>,
    visited: &mut HashSet<NodeId>,
    path: &mut HashSet<NodeId>,
    issues: &mut Vec<IntegrityIssue>,
) {
    if path.contains(id) {
        issues.push(IntegrityIssue::Cycle { node_id: id.clone() });
        return;
    }
    if !visited.insert(id.clone()) {
        // Already reported as a shared child.
        return;
    }
    let Some(node) = nodes.get(id) else {
        return;
    };
    path.insert(id.clone());
    for child in node.children() {
        visit(child, nodes, visited, path, issues);
    }
    path.remove(id);
}

fn decorator_problem(
    decorator: &docstore_model::Decorator,
    nodes: &HashMap<&NodeId, &Node>,
) -> Option<String> {
    let Some(target) = &decorator.target else {
        return decorator
            .category
            .requires_target()
            .then(|| "missing target".to_string());
    };
    let Some(node) = nodes.get(&target.node_id) else {
        return Some(format!("target node {} does not exist", target.node_id));
    };
    match (target.start_offset, target.end_offset, target.span()) {
        (None, None, _) => None,
        (_, _, Some(span)) if span.start >= span.end => {
            Some(format!("empty range [{}, {})", span.start, span.end))
        }
        (_, _, Some(span)) if span.end > node.text_len() => Some(format!(
            "range [{}, {}) exceeds text length {}",
            span.start,
            span.end,
            node.text_len()
        )),
        (_, _, Some(_)) => None,
        _ => Some("only one range offset is set".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore_model::{Decorator, DecoratorCategory, DecoratorTarget, Mark, Selection};

    fn doc() -> DocumentSnapshot {
        let root = Node::container("root", "doc").with_children(vec!["p1".into()]);
        let mut p1 = Node::container("p1", "paragraph").with_children(vec!["t1".into()]);
        p1.parent = Some("root".into());
        let mut t1 = Node::text("t1", "Hello").with_marks(vec![Mark::new("bold", 0, 5)]);
        t1.parent = Some("p1".into());
        DocumentSnapshot {
            root_id: "root".into(),
            nodes: vec![root, p1, t1],
            decorators: Vec::new(),
            selection: None,
        }
    }

    fn node_mut<'a>(snapshot: &'a mut DocumentSnapshot, id: &str) -> &'a mut Node {
        snapshot
            .nodes
            .iter_mut()
            .find(|n| n.id.as_str() == id)
            .unwrap()
    }

    #[test]
    fn well_formed_document_passes() {
        let report = check_integrity(&doc());
        assert!(report.is_ok(), "{:?}", report.issues);
        assert_eq!(report.nodes_checked, 3);
    }

    #[test]
    fn dangling_child_and_unreachable_node() {
        let mut snapshot = doc();
        node_mut(&mut snapshot, "p1").content = Some(vec!["gone".into()]);
        let report = check_integrity(&snapshot);
        assert!(report.issues.contains(&IntegrityIssue::DanglingChild {
            parent_id: "p1".into(),
            child_id: "gone".into(),
        }));
        assert!(report
            .issues
            .contains(&IntegrityIssue::Unreachable { node_id: "t1".into() }));
    }

    #[test]
    fn detached_subtrees_are_sound() {
        let mut snapshot = doc();
        let mut quote = Node::container("q1", "quote").with_children(vec!["t2".into()]);
        quote.parent = None;
        let mut t2 = Node::text("t2", "aside");
        t2.parent = Some("q1".into());
        snapshot.nodes.extend([quote, t2, Node::text("loose", "x")]);

        let report = check_integrity(&snapshot);
        assert!(report.is_ok(), "{:?}", report.issues);
    }

    #[test]
    fn claimed_parent_that_does_not_list_node_is_unreachable() {
        let mut snapshot = doc();
        let mut stray = Node::text("stray", "x");
        stray.parent = Some("p1".into());
        snapshot.nodes.push(stray);

        let report = check_integrity(&snapshot);
        assert!(report
            .issues
            .contains(&IntegrityIssue::Unreachable { node_id: "stray".into() }));
    }

    #[test]
    fn parent_back_reference_must_match() {
        let mut snapshot = doc();
        node_mut(&mut snapshot, "t1").parent = Some("root".into());
        let report = check_integrity(&snapshot);
        assert_eq!(
            report.issues,
            vec![IntegrityIssue::ParentMismatch {
                node_id: "t1".into(),
                listed_by: Some("p1".into()),
                recorded: Some("root".into()),
            }]
        );
    }

    #[test]
    fn marks_are_checked() {
        let mut snapshot = doc();
        node_mut(&mut snapshot, "t1").marks = Some(vec![Mark::new("bold", 2, 9)]);
        let report = check_integrity(&snapshot);
        assert!(matches!(report.issues[0], IntegrityIssue::InvalidMark { end: 9, .. }));

        node_mut(&mut snapshot, "t1").marks =
            Some(vec![Mark::new("bold", 0, 3), Mark::new("bold", 2, 5)]);
        let report = check_integrity(&snapshot);
        assert_eq!(
            report.issues,
            vec![IntegrityIssue::MarksNotNormalized { node_id: "t1".into() }]
        );
    }

    #[test]
    fn cycles_are_reported() {
        let mut snapshot = doc();
        node_mut(&mut snapshot, "t1").text = None;
        node_mut(&mut snapshot, "t1").marks = None;
        node_mut(&mut snapshot, "t1").content = Some(vec!["p1".into()]);
        let report = check_integrity(&snapshot);
        assert!(report
            .issues
            .contains(&IntegrityIssue::Cycle { node_id: "p1".into() }));
    }

    #[test]
    fn decorators_and_selection_are_checked() {
        let mut snapshot = doc();
        snapshot.decorators = vec![
            Decorator::new("d1", "comment", DecoratorCategory::Inline, None),
            Decorator::new(
                "d2",
                "highlight",
                DecoratorCategory::Inline,
                Some(DecoratorTarget::range("t1", 1, 8)),
            ),
            Decorator::new(
                "d3",
                "note",
                DecoratorCategory::Block,
                Some(DecoratorTarget::node("p1")),
            ),
        ];
        snapshot.selection = Some(Selection::caret("nope", 0));

        let report = check_integrity(&snapshot);
        let kinds: Vec<String> = report.issues.iter().map(ToString::to_string).collect();
        assert_eq!(report.issues.len(), 3, "{kinds:?}");
        assert!(kinds[0].contains("missing target"));
        assert!(kinds[1].contains("exceeds text length 5"));
        assert!(kinds[2].contains("nope"));
    }

    #[test]
    fn issues_serialize_with_kind_tag() {
        let issue = IntegrityIssue::Unreachable { node_id: "x".into() };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "unreachable");
        assert_eq!(json["nodeId"], "x");
    }
}
