//! Schema boundary.
//!
//! The store never decides on its own which node types exist or what they
//! may contain. It asks an injected [`Schema`] before persisting Core and
//! Content operations and fails the operation with
//! [`crate::StoreError::Validation`] on a negative answer.

use docstore_model::Attrs;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// What a node type may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentModel {
    /// A leaf holding text.
    Text,
    /// A container holding child nodes.
    Children,
    /// An atom: neither text nor children.
    Empty,
}

/// Validation hooks queried by the operation library.
pub trait Schema: Send + Sync + fmt::Debug {
    /// Checks the attributes of a node of `node_type`.
    ///
    /// # Errors
    ///
    /// Returns the list of problems found.
    fn validate_attributes(&self, node_type: &str, attrs: Option<&Attrs>)
        -> Result<(), Vec<String>>;

    /// Checks the child types of a container of `node_type`, in order.
    ///
    /// # Errors
    ///
    /// Returns the list of problems found.
    fn validate_content(&self, node_type: &str, child_types: &[&str]) -> Result<(), Vec<String>>;

    /// Returns the content model of `node_type`, if the schema knows it.
    fn content_model(&self, node_type: &str) -> Option<ContentModel>;
}

/// A schema that accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveSchema;

impl Schema for PermissiveSchema {
    fn validate_attributes(&self, _: &str, _: Option<&Attrs>) -> Result<(), Vec<String>> {
        Ok(())
    }

    fn validate_content(&self, _: &str, _: &[&str]) -> Result<(), Vec<String>> {
        Ok(())
    }

    fn content_model(&self, _: &str) -> Option<ContentModel> {
        None
    }
}

/// Constraints for one node type in a [`RuleSchema`].
#[derive(Debug, Clone)]
pub struct TypeRule {
    content: ContentModel,
    allowed_children: Option<BTreeSet<String>>,
    required_attrs: BTreeSet<String>,
    allowed_attrs: Option<BTreeSet<String>>,
}

impl TypeRule {
    /// A rule for a container type.
    #[must_use]
    pub fn children() -> Self {
        Self::with_model(ContentModel::Children)
    }

    /// A rule for a text leaf type.
    #[must_use]
    pub fn text() -> Self {
        Self::with_model(ContentModel::Text)
    }

    /// A rule for an atom type.
    #[must_use]
    pub fn empty() -> Self {
        Self::with_model(ContentModel::Empty)
    }

    fn with_model(content: ContentModel) -> Self {
        Self {
            content,
            allowed_children: None,
            required_attrs: BTreeSet::new(),
            allowed_attrs: None,
        }
    }

    /// Restricts child types to `types`.
    #[must_use]
    pub fn allow_children<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_children = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Requires attribute `key`.
    #[must_use]
    pub fn require_attr(mut self, key: impl Into<String>) -> Self {
        self.required_attrs.insert(key.into());
        self
    }

    /// Restricts attribute keys to `keys` (required keys are always allowed).
    #[must_use]
    pub fn allow_attrs<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_attrs = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

/// A table-driven schema.
///
/// # Example
///
/// ```rust
/// use docstore_core::{RuleSchema, Schema, TypeRule};
///
/// let schema = RuleSchema::new()
///     .rule("doc", TypeRule::children().allow_children(["paragraph"]))
///     .rule("paragraph", TypeRule::children().allow_children(["text"]))
///     .rule("text", TypeRule::text());
///
/// assert!(schema.validate_content("doc", &["paragraph"]).is_ok());
/// assert!(schema.validate_content("doc", &["text"]).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSchema {
    rules: HashMap<String, TypeRule>,
    reject_unknown: bool,
}

impl RuleSchema {
    /// Creates an empty schema that accepts unknown types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the rule for `node_type`.
    #[must_use]
    pub fn rule(mut self, node_type: impl Into<String>, rule: TypeRule) -> Self {
        self.rules.insert(node_type.into(), rule);
        self
    }

    /// Makes node types without a rule invalid.
    #[must_use]
    pub fn reject_unknown(mut self) -> Self {
        self.reject_unknown = true;
        self
    }

    fn lookup(&self, node_type: &str) -> Result<Option<&TypeRule>, Vec<String>> {
        match self.rules.get(node_type) {
            Some(rule) => Ok(Some(rule)),
            None if self.reject_unknown => Err(vec![format!("unknown node type '{node_type}'")]),
            None => Ok(None),
        }
    }
}

impl Schema for RuleSchema {
    fn validate_attributes(
        &self,
        node_type: &str,
        attrs: Option<&Attrs>,
    ) -> Result<(), Vec<String>> {
        let Some(rule) = self.lookup(node_type)? else {
            return Ok(());
        };
        let mut problems = Vec::new();
        for key in &rule.required_attrs {
            if attrs.map_or(true, |a| !a.contains_key(key)) {
                problems.push(format!("{node_type}: missing attribute '{key}'"));
            }
        }
        if let (Some(allowed), Some(attrs)) = (&rule.allowed_attrs, attrs) {
            for key in attrs.keys() {
                if !allowed.contains(key) && !rule.required_attrs.contains(key) {
                    problems.push(format!("{node_type}: attribute '{key}' is not allowed"));
                }
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    fn validate_content(&self, node_type: &str, child_types: &[&str]) -> Result<(), Vec<String>> {
        let Some(rule) = self.lookup(node_type)? else {
            return Ok(());
        };
        if rule.content != ContentModel::Children && !child_types.is_empty() {
            return Err(vec![format!("{node_type}: cannot hold children")]);
        }
        let Some(allowed) = &rule.allowed_children else {
            return Ok(());
        };
        let problems: Vec<String> = child_types
            .iter()
            .filter(|t| !allowed.contains(**t))
            .map(|t| format!("{node_type}: child type '{t}' is not allowed"))
            .collect();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    fn content_model(&self, node_type: &str) -> Option<ContentModel> {
        self.rules.get(node_type).map(|rule| rule.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> RuleSchema {
        RuleSchema::new()
            .rule("doc", TypeRule::children().allow_children(["paragraph"]))
            .rule(
                "link",
                TypeRule::children()
                    .require_attr("href")
                    .allow_attrs(["title"]),
            )
            .rule("text", TypeRule::text())
            .rule("image", TypeRule::empty())
    }

    #[test]
    fn permissive_accepts_anything() {
        let schema = PermissiveSchema;
        assert!(schema.validate_attributes("x", None).is_ok());
        assert!(schema.validate_content("x", &["y"]).is_ok());
        assert_eq!(schema.content_model("x"), None);
    }

    #[test]
    fn required_and_allowed_attrs() {
        let schema = schema();
        assert!(schema.validate_attributes("link", None).is_err());

        let mut attrs = Attrs::new();
        attrs.insert("href".into(), json!("https://example.com"));
        assert!(schema.validate_attributes("link", Some(&attrs)).is_ok());

        attrs.insert("target".into(), json!("_blank"));
        let problems = schema.validate_attributes("link", Some(&attrs)).unwrap_err();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("target"));
    }

    #[test]
    fn leaf_types_reject_children() {
        let schema = schema();
        assert!(schema.validate_content("text", &[]).is_ok());
        assert!(schema.validate_content("image", &["text"]).is_err());
        assert_eq!(schema.content_model("image"), Some(ContentModel::Empty));
    }

    #[test]
    fn unknown_types_follow_flag() {
        assert!(schema().validate_content("aside", &["x"]).is_ok());
        let strict = schema().reject_unknown();
        assert!(strict.validate_attributes("aside", None).is_err());
    }
}
