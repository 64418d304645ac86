//! Store configuration.

use docstore_model::NodeId;

/// Configuration for opening a document store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Identifier of the document root.
    pub root_id: NodeId,

    /// Node type given to a freshly created root.
    pub root_type: String,

    /// Prefix for generated node identifiers (`None` = bare uuid).
    pub id_prefix: Option<String>,

    /// Maximum number of undo entries kept by the history (0 = disabled).
    pub history_limit: usize,

    /// Maximum nesting of combinator expansion.
    pub max_expansion_depth: usize,

    /// Number of commit events kept for polling.
    pub feed_history: usize,

    /// Whether snapshots are checked for integrity when loaded.
    pub verify_on_load: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root_id: NodeId::from("root"),
            root_type: "doc".to_string(),
            id_prefix: None,
            history_limit: 100,
            max_expansion_depth: 8,
            feed_history: 1024,
            verify_on_load: true,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root identifier.
    #[must_use]
    pub fn root_id(mut self, id: impl Into<NodeId>) -> Self {
        self.root_id = id.into();
        self
    }

    /// Sets the root node type.
    #[must_use]
    pub fn root_type(mut self, node_type: impl Into<String>) -> Self {
        self.root_type = node_type.into();
        self
    }

    /// Sets the prefix for generated identifiers.
    #[must_use]
    pub fn id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = Some(prefix.into());
        self
    }

    /// Sets the undo history limit.
    #[must_use]
    pub const fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Sets the maximum combinator nesting.
    #[must_use]
    pub const fn max_expansion_depth(mut self, depth: usize) -> Self {
        self.max_expansion_depth = depth;
        self
    }

    /// Sets the number of commit events kept for polling.
    #[must_use]
    pub const fn feed_history(mut self, size: usize) -> Self {
        self.feed_history = size;
        self
    }

    /// Sets whether loaded snapshots are integrity-checked.
    #[must_use]
    pub const fn verify_on_load(mut self, value: bool) -> Self {
        self.verify_on_load = value;
        self
    }

    pub(crate) fn prefix(&self) -> Option<&str> {
        self.id_prefix.as_deref()
    }
}
