//! Graph types: nodes, edges, snapshots and update operations.
//!
//! A [`Node`] represents one extracted entity and an [`Edge`] one extracted
//! relation. Edges refer to nodes by id only; the store does not enforce
//! referential integrity, so an edge may point at a node that was never added
//! or has since been deleted.
//!
//! # Example
//!
//! ```rust
//! use kgraph::models::{Edge, GraphSnapshot, Node};
//!
//! let alice = Node::new("n1", "person").with_property("name", "Alice");
//! let acme = Node::new("n2", "organization").with_property("name", "Acme");
//! let works_at = Edge::new("e1", "n1", "n2", "works_at");
//!
//! let snapshot = GraphSnapshot {
//!     nodes: vec![alice, acme],
//!     edges: vec![works_at],
//! };
//! assert_eq!(snapshot.nodes.len(), 2);
//! ```

use super::property::{Properties, PropertyValue};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from a string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the id is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Unique identifier of a graph node.
    NodeId
);

string_id!(
    /// Unique identifier of a graph edge.
    EdgeId
);

/// A graph vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node id.
    pub id: NodeId,
    /// Type tag (the entity type for ingested entities).
    pub label: String,
    /// Schemaless properties.
    #[serde(default)]
    pub properties: Properties,
}

impl Node {
    /// Creates a node with no properties.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            properties: Properties::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns a property value by key.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Shallow-merges `patch` onto this node.
    ///
    /// The label is replaced when the patch label is non-empty. A non-empty
    /// patch property map replaces the whole map; keys absent from the patch
    /// are dropped.
    pub fn merge(&mut self, patch: &Self) {
        if !patch.label.is_empty() {
            self.label.clone_from(&patch.label);
        }
        if !patch.properties.is_empty() {
            self.properties.clone_from(&patch.properties);
        }
    }
}

/// A directed graph connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique edge id.
    pub id: EdgeId,
    /// Source node id.
    pub source: NodeId,
    /// Target node id.
    pub target: NodeId,
    /// Relation type; empty when the snapshot omits it.
    #[serde(default)]
    pub label: String,
    /// Schemaless properties.
    #[serde(default)]
    pub properties: Properties,
}

impl Edge {
    /// Creates an edge with no properties.
    #[must_use]
    pub fn new(
        id: impl Into<EdgeId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            label: label.into(),
            properties: Properties::new(),
        }
    }

    /// Adds a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if either endpoint is `node`.
    #[must_use]
    pub fn touches(&self, node: &NodeId) -> bool {
        self.source == *node || self.target == *node
    }

    /// Returns the endpoint opposite `node`, treating the edge as undirected.
    #[must_use]
    pub fn other_end(&self, node: &NodeId) -> &NodeId {
        if self.source == *node {
            &self.target
        } else {
            &self.source
        }
    }

    /// Shallow-merges `patch` onto this edge.
    ///
    /// Endpoints and label are replaced when non-empty in the patch. A
    /// non-empty patch property map replaces the whole map.
    pub fn merge(&mut self, patch: &Self) {
        if !patch.source.is_empty() {
            self.source.clone_from(&patch.source);
        }
        if !patch.target.is_empty() {
            self.target.clone_from(&patch.target);
        }
        if !patch.label.is_empty() {
            self.label.clone_from(&patch.label);
        }
        if !patch.properties.is_empty() {
            self.properties.clone_from(&patch.properties);
        }
    }
}

/// The complete node and edge sets, persisted as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// All nodes.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// All edges.
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Returns `true` if the snapshot has neither nodes nor edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Kind of a [`GraphUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateKind {
    /// Insert or overwrite by id.
    Add,
    /// Shallow-merge onto existing records; missing ids are ignored.
    Update,
    /// Remove by id.
    Delete,
}

/// A batch mutation applied to the node set and then the edge set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphUpdate {
    /// What to do with the records.
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    /// Nodes to add, merge or delete (only the id matters for delete).
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Edges to add, merge or delete (only the id matters for delete).
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphUpdate {
    /// Creates an empty update of the given kind.
    #[must_use]
    pub const fn new(kind: UpdateKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Sets the nodes of the update.
    #[must_use]
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes = nodes.into_iter().collect();
        self
    }

    /// Sets the edges of the update.
    #[must_use]
    pub fn with_edges(mut self, edges: impl IntoIterator<Item = Edge>) -> Self {
        self.edges = edges.into_iter().collect();
        self
    }

    /// Builds a delete operation from node ids alone.
    #[must_use]
    pub fn delete_nodes<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        Self::new(UpdateKind::Delete).with_nodes(ids.into_iter().map(|id| Node::new(id, "")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_merge_is_shallow() {
        let mut node = Node::new("n1", "person")
            .with_property("name", "Alice")
            .with_property("old", 1);
        let patch = Node::new("n1", "").with_property("age", 3);

        node.merge(&patch);

        assert_eq!(node.label, "person");
        assert_eq!(node.properties.len(), 1);
        assert_eq!(node.property("age"), Some(&PropertyValue::Integer(3)));
        assert!(node.property("name").is_none());
    }

    #[test]
    fn test_merge_without_properties_keeps_existing() {
        let mut node = Node::new("n1", "person").with_property("name", "Alice");
        node.merge(&Node::new("n1", "employee"));

        assert_eq!(node.label, "employee");
        assert_eq!(node.property("name"), Some(&PropertyValue::from("Alice")));

        let mut edge = Edge::new("e1", "a", "b", "knows").with_property("since", 2020);
        edge.merge(&Edge::new("e1", "", "c", "").with_property("weight", 0.5));

        assert_eq!(edge.source.as_str(), "a");
        assert_eq!(edge.target.as_str(), "c");
        assert_eq!(edge.label, "knows");
        assert!(edge.properties.get("since").is_none());
        assert_eq!(edge.properties.get("weight"), Some(&PropertyValue::Float(0.5)));
    }

    #[test]
    fn test_edge_label_defaults_to_empty() {
        let edge: Edge =
            serde_json::from_str(r#"{"id": "e", "source": "a", "target": "b"}"#).unwrap();
        assert!(edge.label.is_empty());
        assert!(edge.properties.is_empty());
    }

    #[test]
    fn test_edge_other_end() {
        let edge = Edge::new("e1", "a", "b", "knows");
        assert_eq!(edge.other_end(&NodeId::new("a")).as_str(), "b");
        assert_eq!(edge.other_end(&NodeId::new("b")).as_str(), "a");
        assert!(edge.touches(&NodeId::new("a")));
        assert!(!edge.touches(&NodeId::new("c")));
    }

    #[test]
    fn test_snapshot_json_layout() {
        let snapshot = GraphSnapshot {
            nodes: vec![Node::new("n1", "person")],
            edges: vec![Edge::new("e1", "n1", "n2", "knows")],
        };
        let value = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(value["nodes"][0]["id"], "n1");
        assert_eq!(value["edges"][0]["source"], "n1");
        assert_eq!(value["edges"][0]["target"], "n2");
        assert_eq!(value["edges"][0]["label"], "knows");
    }

    #[test]
    fn test_update_deserializes_type_tag() {
        let update: GraphUpdate =
            serde_json::from_str(r#"{"type":"delete","nodes":[{"id":"x","label":""}]}"#).unwrap();
        assert_eq!(update.kind, UpdateKind::Delete);
        assert_eq!(update.nodes[0].id.as_str(), "x");
        assert!(update.edges.is_empty());
    }
}
