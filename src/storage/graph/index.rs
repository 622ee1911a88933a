//! Exact-match property index over nodes.
//!
//! Only string values of the configured keys are indexed. The key `type`
//! resolves to the node label when the node has no `type` property, because
//! ingested entities carry their type as the label.

use crate::models::{Node, NodeId, PropertyValue};
use indexmap::IndexSet;
use std::collections::HashMap;

/// Property key that falls back to the node label.
pub const TYPE_KEY: &str = "type";

/// Returns the value a node exposes for `key`, taking the label fallback
/// for [`TYPE_KEY`] into account.
#[must_use]
pub fn node_value<'a>(node: &'a Node, key: &str) -> Option<ValueRef<'a>> {
    match node.properties.get(key) {
        Some(value) => Some(ValueRef::Property(value)),
        None if key == TYPE_KEY => Some(ValueRef::Label(&node.label)),
        None => None,
    }
}

/// A borrowed node value: either a stored property or the label.
#[derive(Debug, Clone, Copy)]
pub enum ValueRef<'a> {
    /// A property value.
    Property(&'a PropertyValue),
    /// The node label.
    Label(&'a str),
}

impl ValueRef<'_> {
    /// Returns the string form if the value is textual.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Property(value) => value.as_str(),
            Self::Label(label) => Some(label),
        }
    }

    /// Literal equality against a pattern value.
    #[must_use]
    pub fn literal_eq(&self, other: &PropertyValue) -> bool {
        match self {
            Self::Property(value) => value.literal_eq(other),
            Self::Label(label) => other.as_str() == Some(*label),
        }
    }
}

/// Maps `(key, value)` pairs to the ids of nodes holding them.
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
    entries: HashMap<String, HashMap<String, IndexSet<NodeId>>>,
}

impl PropertyIndex {
    /// Creates an index over `keys`.
    #[must_use]
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: keys
                .into_iter()
                .map(|key| (key.into(), HashMap::new()))
                .collect(),
        }
    }

    /// Returns `true` if `key` is indexed.
    #[must_use]
    pub fn is_indexed(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the indexed keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Adds a node's indexed values.
    pub fn insert(&mut self, node: &Node) {
        for (key, values) in &mut self.entries {
            if let Some(text) = node_value(node, key).and_then(|v| v.as_str().map(str::to_owned)) {
                values.entry(text).or_default().insert(node.id.clone());
            }
        }
    }

    /// Removes a node's indexed values.
    ///
    /// Must be called with the node as it was when inserted.
    pub fn remove(&mut self, node: &Node) {
        for (key, values) in &mut self.entries {
            let Some(text) = node_value(node, key).and_then(|v| v.as_str().map(str::to_owned))
            else {
                continue;
            };
            if let Some(ids) = values.get_mut(&text) {
                ids.shift_remove(&node.id);
                if ids.is_empty() {
                    values.remove(&text);
                }
            }
        }
    }

    /// Looks up the nodes holding `value` under `key`.
    ///
    /// Returns `None` if the key is not indexed, so callers can fall back
    /// to a scan.
    #[must_use]
    pub fn lookup(&self, key: &str, value: &str) -> Option<Vec<&NodeId>> {
        let values = self.entries.get(key)?;
        Some(
            values
                .get(value)
                .map(|ids| ids.iter().collect())
                .unwrap_or_default(),
        )
    }

    /// Drops every entry, keeping the indexed keys.
    pub fn clear(&mut self) {
        for values in self.entries.values_mut() {
            values.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> PropertyIndex {
        PropertyIndex::new(["type", "name"])
    }

    #[test]
    fn test_type_key_uses_label() {
        let mut idx = index();
        idx.insert(&Node::new("n1", "person").with_property("name", "Alice"));

        let ids = idx.lookup("type", "person").unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].as_str(), "n1");
    }

    #[test]
    fn test_explicit_type_property_wins() {
        let node = Node::new("n1", "person").with_property("type", "employee");
        let mut idx = index();
        idx.insert(&node);

        assert!(idx.lookup("type", "person").unwrap().is_empty());
        assert_eq!(idx.lookup("type", "employee").unwrap().len(), 1);
    }

    #[test]
    fn test_remove_drops_entries() {
        let node = Node::new("n1", "person").with_property("name", "Alice");
        let mut idx = index();
        idx.insert(&node);
        idx.remove(&node);

        assert!(idx.lookup("name", "Alice").unwrap().is_empty());
    }

    #[test]
    fn test_unindexed_key_returns_none() {
        let idx = index();
        assert!(idx.lookup("sourceDocument", "a.txt").is_none());
        assert!(!idx.is_indexed("sourceDocument"));
    }

    #[test]
    fn test_non_string_values_are_not_indexed() {
        let mut idx = index();
        idx.insert(&Node::new("n1", "person").with_property("name", 42));
        assert!(idx.lookup("name", "42").unwrap().is_empty());
    }
}
