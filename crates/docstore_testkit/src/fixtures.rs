//! Document fixtures.
//!
//! Provides a snapshot builder and ready-made stores for the common test
//! documents.

use docstore_core::marks::normalize_marks;
use docstore_core::{DocumentStore, PermissiveSchema, Schema, StoreConfig};
use docstore_model::text::char_len;
use docstore_model::{DocumentSnapshot, Mark, Node, NodeId, Selection};
use docstore_storage::InMemoryBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Builds document snapshots with consistent parent links.
///
/// # Example
///
/// ```rust
/// use docstore_testkit::DocumentBuilder;
///
/// let snapshot = DocumentBuilder::new()
///     .block("p1", "paragraph", &[("t1", "Hello")])
///     .block("p2", "paragraph", &[("t2", "World")])
///     .build();
/// assert_eq!(snapshot.nodes.len(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    root: Node,
    nodes: Vec<Node>,
    selection: Option<Selection>,
}

impl DocumentBuilder {
    /// Starts a document with an empty `doc` root named `root`.
    pub fn new() -> Self {
        Self::with_root("root", "doc")
    }

    /// Starts a document with a custom root.
    pub fn with_root(id: &str, node_type: &str) -> Self {
        Self {
            root: Node::container(id, node_type),
            nodes: Vec::new(),
            selection: None,
        }
    }

    /// Appends a container under the root holding plain text leaves.
    pub fn block(self, id: &str, node_type: &str, leaves: &[(&str, &str)]) -> Self {
        let leaves = leaves
            .iter()
            .map(|(leaf_id, text)| (*leaf_id, *text, Vec::new()))
            .collect::<Vec<_>>();
        self.marked_block(id, node_type, leaves)
    }

    /// Appends a container under the root holding text leaves with marks.
    ///
    /// Marks are normalized, so callers may pass them in any order.
    pub fn marked_block(
        mut self,
        id: &str,
        node_type: &str,
        leaves: Vec<(&str, &str, Vec<Mark>)>,
    ) -> Self {
        let block_id = NodeId::from(id);
        let mut block = Node::container(id, node_type);
        block.parent = Some(self.root.id.clone());

        for (leaf_id, text, marks) in leaves {
            let mut leaf = Node::text(leaf_id, text);
            let marks = normalize_marks(marks, char_len(text));
            if !marks.is_empty() {
                leaf = leaf.with_marks(marks);
            }
            leaf.parent = Some(block_id.clone());
            block.content.get_or_insert_with(Vec::new).push(leaf.id.clone());
            self.nodes.push(leaf);
        }

        self.root
            .content
            .get_or_insert_with(Vec::new)
            .push(block_id);
        self.nodes.push(block);
        self
    }

    /// Sets the snapshot selection.
    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Produces the canonical snapshot.
    pub fn build(self) -> DocumentSnapshot {
        let root_id = self.root.id.clone();
        let mut nodes = self.nodes;
        nodes.push(self.root);
        let mut snapshot = DocumentSnapshot {
            root_id,
            nodes,
            decorators: Vec::new(),
            selection: self.selection,
        };
        snapshot.canonicalize();
        snapshot
    }

    /// Loads the snapshot into a permissive in-memory store.
    pub fn store(self) -> DocumentStore {
        self.store_with(Arc::new(PermissiveSchema), StoreConfig::default())
    }

    /// Loads the snapshot into an in-memory store.
    pub fn store_with(self, schema: Arc<dyn Schema>, config: StoreConfig) -> DocumentStore {
        DocumentStore::from_snapshot(self.build(), schema, config)
            .expect("Failed to build store from fixture")
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A store holding `root > p1 > t1 "Hello World"` with the given marks.
pub fn hello_world(marks: Vec<Mark>) -> DocumentStore {
    DocumentBuilder::new()
        .marked_block("p1", "paragraph", vec![("t1", "Hello World", marks)])
        .store()
}

/// A store with two paragraphs: `p1 > [t1 "Hello ", t2 "brave"]` and
/// `p2 > [t3 " new world"]`.
pub fn two_paragraphs() -> DocumentStore {
    DocumentBuilder::new()
        .block("p1", "paragraph", &[("t1", "Hello "), ("t2", "brave")])
        .block("p2", "paragraph", &[("t3", " new world")])
        .store()
}

/// An empty store opened over a bare in-memory backend.
pub fn empty_store() -> DocumentStore {
    let config = StoreConfig::default();
    DocumentStore::open(
        Box::new(InMemoryBackend::new()),
        Arc::new(PermissiveSchema),
        config,
    )
    .expect("Failed to open empty store")
}

/// A snapshot file in a temporary directory.
pub struct TempSnapshot {
    path: PathBuf,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TempSnapshot {
    /// Writes `snapshot` to `doc.json` in a fresh temporary directory.
    pub fn write(snapshot: &DocumentSnapshot) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("doc.json");
        let json = snapshot.to_json().expect("Failed to encode snapshot");
        std::fs::write(&path, json).expect("Failed to write snapshot");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Returns the snapshot path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the temporary directory, for writing sibling files.
    pub fn dir(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Writes `contents` to `name` next to the snapshot.
    pub fn sibling(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir().join(name);
        std::fs::write(&path, contents).expect("Failed to write sibling file");
        path
    }

    /// Reads a snapshot back from `path`.
    pub fn read(path: &Path) -> DocumentSnapshot {
        let text = std::fs::read_to_string(path).expect("Failed to read snapshot");
        DocumentSnapshot::from_json(&text).expect("Failed to decode snapshot")
    }
}
