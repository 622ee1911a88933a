//! In-memory property graph with snapshot persistence.
//!
//! [`GraphStore`] owns the node and edge collections, the registry of
//! ingested documents and the property index. All of them live behind one
//! [`RwLock`]; readers share it, mutations take it exclusively.
//!
//! # Autosave
//!
//! Every mutation bumps a revision counter. After each mutation the store
//! compares it with the last saved revision and, if the store is dirty and
//! at least `autosave_interval` has passed since the last save (or since
//! construction), writes a snapshot through the attached backend. The lock is
//! released before any file I/O. This is a heuristic, not a durability
//! guarantee: a process that exits between saves loses the unsaved changes.
//!
//! # Referential integrity
//!
//! Edges refer to nodes by id and are not checked. Deleting a node leaves
//! its edges in place.

use super::index::{PropertyIndex, node_value};
use crate::models::{
    Edge, EdgeId, GraphSnapshot, GraphUpdate, Node, NodeId, ProcessingResult, PropertyValue,
    UpdateKind,
};
use crate::storage::traits::{DEFAULT_GRAPH_ID, SnapshotBackend};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default interval between autosaves.
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_millis(5000);

/// Default maximum number of entities plus relations per document.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

/// Property keys indexed by default.
pub const DEFAULT_INDEXED_PROPERTIES: [&str; 3] = ["type", "name", "sourceDocument"];

/// Tuning for a [`GraphStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphStoreConfig {
    /// Minimum time between autosaves.
    pub autosave_interval: Duration,
    /// Property keys served by [`GraphStore::find_nodes_by_property`] in O(1).
    pub indexed_properties: Vec<String>,
    /// Maximum entities plus relations accepted from one document.
    pub max_batch_size: usize,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            indexed_properties: DEFAULT_INDEXED_PROPERTIES
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl GraphStoreConfig {
    /// Sets the autosave interval.
    #[must_use]
    pub const fn with_autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// Sets the indexed property keys.
    #[must_use]
    pub fn with_indexed_properties<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexed_properties = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the maximum batch size.
    #[must_use]
    pub const fn with_max_batch_size(mut self, max: usize) -> Self {
        self.max_batch_size = max;
        self
    }
}

/// Counts and sizes describing the in-memory graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Number of nodes.
    pub node_count: usize,
    /// Number of edges.
    pub edge_count: usize,
    /// Number of registered documents.
    pub document_count: usize,
    /// Time of the last mutation.
    pub last_updated: DateTime<Utc>,
    /// Serialized size of the node and edge lists in bytes.
    pub storage_size: usize,
}

#[derive(Debug)]
struct GraphState {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    documents: IndexSet<String>,
    index: PropertyIndex,
    last_updated: DateTime<Utc>,
    revision: u64,
    saved_revision: u64,
    last_saved: Instant,
}

impl GraphState {
    fn new(indexed_properties: &[String]) -> Self {
        Self {
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            documents: IndexSet::new(),
            index: PropertyIndex::new(indexed_properties.iter().cloned()),
            last_updated: Utc::now(),
            revision: 0,
            saved_revision: 0,
            last_saved: Instant::now(),
        }
    }

    fn touch(&mut self) {
        self.last_updated = Utc::now();
        self.revision += 1;
    }

    const fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    fn upsert_node(&mut self, node: Node) {
        if let Some(previous) = self.nodes.get(&node.id) {
            self.index.remove(previous);
        }
        self.index.insert(&node);
        self.nodes.insert(node.id.clone(), node);
    }

    fn merge_node(&mut self, patch: &Node) {
        let Some(existing) = self.nodes.get_mut(&patch.id) else {
            return;
        };
        self.index.remove(existing);
        existing.merge(patch);
        self.index.insert(existing);
    }

    fn remove_node(&mut self, id: &NodeId) {
        if let Some(removed) = self.nodes.shift_remove(id) {
            self.index.remove(&removed);
        }
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.documents.clear();
        self.index.clear();
    }

    fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }
}

/// Read-only access to the graph while the store's read lock is held.
///
/// Obtained through [`GraphStore::read`]. Iteration follows insertion order.
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'a> {
    state: &'a GraphState,
}

impl<'a> GraphView<'a> {
    /// Iterates over all nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &'a Node> + use<'a> {
        self.state.nodes.values()
    }

    /// Iterates over all edges.
    pub fn edges(&self) -> impl Iterator<Item = &'a Edge> + use<'a> {
        self.state.edges.values()
    }

    /// Returns a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&'a Node> {
        self.state.nodes.get(id)
    }

    /// Returns an edge by id.
    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&'a Edge> {
        self.state.edges.get(id)
    }

    /// Returns the insertion position of a node.
    #[must_use]
    pub fn node_position(&self, id: &str) -> Option<usize> {
        self.state.nodes.get_index_of(id)
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.state.nodes.len()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.state.edges.len()
    }
}

/// The in-memory knowledge graph.
///
/// # Example
///
/// ```rust
/// use kgraph::models::{GraphUpdate, Node, UpdateKind};
/// use kgraph::storage::GraphStore;
///
/// let store = GraphStore::in_memory();
/// store.update_graph(&GraphUpdate::new(UpdateKind::Add).with_nodes([Node::new("n1", "person")]))?;
/// assert!(store.get_node("n1")?.is_some());
/// # Ok::<(), kgraph::Error>(())
/// ```
pub struct GraphStore {
    state: RwLock<GraphState>,
    backend: Option<Arc<dyn SnapshotBackend>>,
    config: GraphStoreConfig,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("config", &self.config)
            .field("has_backend", &self.backend.is_some())
            .finish_non_exhaustive()
    }
}

impl GraphStore {
    /// Creates an empty store.
    ///
    /// With a backend attached the store autosaves; without one it never
    /// touches the filesystem.
    #[must_use]
    pub fn new(config: GraphStoreConfig, backend: Option<Arc<dyn SnapshotBackend>>) -> Self {
        Self {
            state: RwLock::new(GraphState::new(&config.indexed_properties)),
            backend,
            config,
        }
    }

    /// Creates an empty store with default tuning and no backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(GraphStoreConfig::default(), None)
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &GraphStoreConfig {
        &self.config
    }

    fn read_state(&self, operation: &str) -> Result<RwLockReadGuard<'_, GraphState>> {
        self.state
            .read()
            .map_err(|_| Error::mutation(operation, "lock poisoned"))
    }

    fn write_state(&self, operation: &str) -> Result<RwLockWriteGuard<'_, GraphState>> {
        self.state
            .write()
            .map_err(|_| Error::mutation(operation, "lock poisoned"))
    }

    /// Upserts the entities and relations of one processed document.
    ///
    /// Each entity becomes a node labelled with its type; each relation an
    /// edge labelled with its type. `name`, `sourceDocument`, `confidence`
    /// and `createdAt` are merged into the properties, overriding any
    /// extractor-supplied values with the same keys. Existing records with
    /// the same ids are overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the document exceeds the configured
    /// batch size, or an error if the lock is poisoned or autosave fails.
    #[instrument(skip(self, result), fields(document = %result.metadata.path, entities = result.entities.len(), relations = result.relations.len()))]
    pub fn add_document(&self, result: &ProcessingResult) -> Result<()> {
        let batch = result.entities.len() + result.relations.len();
        if batch > self.config.max_batch_size {
            return Err(Error::InvalidInput(format!(
                "document '{}' has {batch} records, exceeding the batch limit of {}",
                result.metadata.path, self.config.max_batch_size
            )));
        }

        let source = &result.metadata.path;
        let created_at = PropertyValue::from(Utc::now().to_rfc3339());

        {
            let mut state = self.write_state("add_document")?;

            state.documents.insert(source.clone());

            for entity in &result.entities {
                let mut node = Node::new(entity.id.as_str(), entity.entity_type.as_str());
                node.properties.clone_from(&entity.properties);
                node.properties
                    .insert("name".to_string(), entity.name.as_str().into());
                node.properties
                    .insert("sourceDocument".to_string(), source.as_str().into());
                node.properties
                    .insert("confidence".to_string(), entity.confidence.into());
                node.properties
                    .insert("createdAt".to_string(), created_at.clone());
                state.upsert_node(node);
            }

            for relation in &result.relations {
                let mut edge = Edge::new(
                    relation.id.as_str(),
                    relation.source.as_str(),
                    relation.target.as_str(),
                    relation.relation_type.as_str(),
                );
                edge.properties.clone_from(&relation.properties);
                edge.properties
                    .insert("sourceDocument".to_string(), source.as_str().into());
                edge.properties
                    .insert("confidence".to_string(), relation.confidence.into());
                edge.properties
                    .insert("createdAt".to_string(), created_at.clone());
                state.edges.insert(edge.id.clone(), edge);
            }

            state.touch();
        }

        self.autosave_if_due()
    }

    /// Applies a batch mutation: nodes first, then edges.
    ///
    /// Not transactional across nodes and edges. `Update` on an unknown id
    /// is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or autosave fails.
    #[instrument(skip(self, update), fields(kind = ?update.kind, nodes = update.nodes.len(), edges = update.edges.len()))]
    pub fn update_graph(&self, update: &GraphUpdate) -> Result<()> {
        {
            let mut state = self.write_state("update_graph")?;

            match update.kind {
                UpdateKind::Add => {
                    for node in &update.nodes {
                        state.upsert_node(node.clone());
                    }
                    for edge in &update.edges {
                        state.edges.insert(edge.id.clone(), edge.clone());
                    }
                },
                UpdateKind::Update => {
                    for node in &update.nodes {
                        state.merge_node(node);
                    }
                    for edge in &update.edges {
                        if let Some(existing) = state.edges.get_mut(&edge.id) {
                            existing.merge(edge);
                        }
                    }
                },
                UpdateKind::Delete => {
                    for node in &update.nodes {
                        state.remove_node(&node.id);
                    }
                    for edge in &update.edges {
                        state.edges.shift_remove(&edge.id);
                    }
                },
            }

            state.touch();
        }

        self.autosave_if_due()
    }

    /// Returns a node by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn get_node(&self, id: &str) -> Result<Option<Node>> {
        Ok(self.read_state("get_node")?.nodes.get(id).cloned())
    }

    /// Returns an edge by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn get_edge(&self, id: &str) -> Result<Option<Edge>> {
        Ok(self.read_state("get_edge")?.edges.get(id).cloned())
    }

    /// Returns every node satisfying `predicate`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn find_nodes(&self, predicate: impl Fn(&Node) -> bool) -> Result<Vec<Node>> {
        let state = self.read_state("find_nodes")?;
        Ok(state
            .nodes
            .values()
            .filter(|n| predicate(n))
            .cloned()
            .collect())
    }

    /// Returns every edge satisfying `predicate`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn find_edges(&self, predicate: impl Fn(&Edge) -> bool) -> Result<Vec<Edge>> {
        let state = self.read_state("find_edges")?;
        Ok(state
            .edges
            .values()
            .filter(|e| predicate(e))
            .cloned()
            .collect())
    }

    /// Returns the nodes whose `key` literally equals `value`.
    ///
    /// String values of indexed keys are answered from the property index;
    /// anything else falls back to a scan. The key `type` also matches the
    /// node label. Results follow insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn find_nodes_by_property(&self, key: &str, value: &PropertyValue) -> Result<Vec<Node>> {
        let state = self.read_state("find_nodes_by_property")?;

        if let Some(text) = value.as_str()
            && let Some(ids) = state.index.lookup(key, text)
        {
            let mut hits: Vec<(usize, &Node)> = ids
                .into_iter()
                .filter_map(|id| state.nodes.get_full(id).map(|(pos, _, node)| (pos, node)))
                .collect();
            hits.sort_unstable_by_key(|(pos, _)| *pos);
            return Ok(hits.into_iter().map(|(_, node)| node.clone()).collect());
        }

        Ok(state
            .nodes
            .values()
            .filter(|node| node_value(node, key).is_some_and(|v| v.literal_eq(value)))
            .cloned()
            .collect())
    }

    /// Runs `f` against a consistent view of the graph.
    ///
    /// The read lock is held for the duration of the call.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn read<R>(&self, f: impl FnOnce(GraphView<'_>) -> R) -> Result<R> {
        let state = self.read_state("read_graph")?;
        Ok(f(GraphView { state: &state }))
    }

    /// Returns the full node and edge sets in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn graph_data(&self) -> Result<GraphSnapshot> {
        Ok(self.read_state("graph_data")?.snapshot())
    }

    /// Returns counts and sizes of the in-memory graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or serialization fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let state = self.read_state("graph_stats")?;

        let nodes: Vec<&Node> = state.nodes.values().collect();
        let edges: Vec<&Edge> = state.edges.values().collect();
        let storage_size = serde_json::to_vec(&nodes)
            .map_err(|e| Error::mutation("graph_stats", e))?
            .len()
            + serde_json::to_vec(&edges)
                .map_err(|e| Error::mutation("graph_stats", e))?
                .len();

        Ok(StoreStats {
            node_count: state.nodes.len(),
            edge_count: state.edges.len(),
            document_count: state.documents.len(),
            last_updated: state.last_updated,
            storage_size,
        })
    }

    /// Returns the registered document paths in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn documents(&self) -> Result<Vec<String>> {
        Ok(self
            .read_state("documents")?
            .documents
            .iter()
            .cloned()
            .collect())
    }

    /// Returns `true` if there are changes not yet written by a save.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn is_dirty(&self) -> Result<bool> {
        Ok(self.read_state("is_dirty")?.is_dirty())
    }

    /// Drops all nodes, edges, documents and index entries.
    ///
    /// Does not save; callers that want an empty snapshot on disk call
    /// [`GraphStore::persist`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<()> {
        let mut state = self.write_state("clear_graph")?;
        state.clear();
        state.touch();
        Ok(())
    }

    /// Replaces the graph contents with `snapshot`.
    ///
    /// The document registry is rebuilt from the `sourceDocument` properties
    /// of the loaded records.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    #[instrument(skip(self, snapshot), fields(nodes = snapshot.nodes.len(), edges = snapshot.edges.len()))]
    pub fn load_snapshot(&self, snapshot: GraphSnapshot) -> Result<()> {
        let mut state = self.write_state("load_snapshot")?;
        Self::replace_contents(&mut state, snapshot);
        state.touch();
        Ok(())
    }

    fn replace_contents(state: &mut GraphState, snapshot: GraphSnapshot) {
        state.clear();

        let sources = snapshot
            .nodes
            .iter()
            .map(|n| &n.properties)
            .chain(snapshot.edges.iter().map(|e| &e.properties))
            .filter_map(|props| props.get("sourceDocument").and_then(PropertyValue::as_str))
            .map(str::to_owned)
            .collect::<Vec<_>>();
        state.documents.extend(sources);

        for node in snapshot.nodes {
            state.upsert_node(node);
        }
        for edge in snapshot.edges {
            state.edges.insert(edge.id.clone(), edge);
        }
    }

    /// Writes the current graph through the attached backend as `main`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no backend is attached, or the
    /// backend's error if the save fails.
    pub fn persist(&self) -> Result<()> {
        let backend = self.require_backend()?;
        let (snapshot, revision) = {
            let state = self.read_state("persist")?;
            (state.snapshot(), state.revision)
        };
        self.save_revision(backend, &snapshot, revision)
    }

    /// Replaces the graph contents with the backend's `main` snapshot.
    ///
    /// The store is clean afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no backend is attached, or the
    /// backend's error if loading fails.
    pub fn load(&self) -> Result<()> {
        let backend = self.require_backend()?;
        let snapshot = backend.load_graph(DEFAULT_GRAPH_ID)?;

        let mut state = self.write_state("load_graph")?;
        Self::replace_contents(&mut state, snapshot);
        state.touch();
        state.saved_revision = state.revision;
        state.last_saved = Instant::now();
        Ok(())
    }

    fn require_backend(&self) -> Result<&Arc<dyn SnapshotBackend>> {
        self.backend
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("no snapshot backend attached".to_string()))
    }

    fn save_revision(
        &self,
        backend: &Arc<dyn SnapshotBackend>,
        snapshot: &GraphSnapshot,
        revision: u64,
    ) -> Result<()> {
        backend.save_graph(snapshot, DEFAULT_GRAPH_ID)?;

        let mut state = self.write_state("mark_saved")?;
        state.saved_revision = state.saved_revision.max(revision);
        state.last_saved = Instant::now();
        Ok(())
    }

    fn autosave_if_due(&self) -> Result<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };

        let pending = {
            let state = self.read_state("autosave")?;
            let due = state.is_dirty()
                && state.last_saved.elapsed() >= self.config.autosave_interval;
            due.then(|| (state.snapshot(), state.revision))
        };

        let Some((snapshot, revision)) = pending else {
            tracing::debug!("Autosave skipped");
            return Ok(());
        };

        tracing::debug!(revision, "Autosaving graph");
        self.save_revision(backend, &snapshot, revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentMetadata, Entity, Relation};
    use crate::storage::persistence::FilesystemSnapshotBackend;
    use tempfile::TempDir;

    fn entity(id: &str, kind: &str, name: &str) -> Entity {
        Entity {
            id: id.to_string(),
            entity_type: kind.to_string(),
            name: name.to_string(),
            properties: crate::models::Properties::new(),
            source_document: String::new(),
            confidence: 0.9,
        }
    }

    fn document(path: &str) -> ProcessingResult {
        ProcessingResult {
            entities: vec![
                entity("n1", "person", "Alice"),
                entity("n2", "organization", "Acme"),
            ],
            relations: vec![Relation {
                id: "e1".to_string(),
                relation_type: "works_at".to_string(),
                source: "n1".to_string(),
                target: "n2".to_string(),
                properties: crate::models::Properties::new(),
                source_document: String::new(),
                confidence: 0.8,
            }],
            metadata: DocumentMetadata::for_path(std::path::Path::new(path)),
        }
    }

    #[test]
    fn test_add_document_builds_nodes_and_edges() {
        let store = GraphStore::in_memory();
        store.add_document(&document("docs/a.txt")).unwrap();

        let alice = store.get_node("n1").unwrap().unwrap();
        assert_eq!(alice.label, "person");
        assert_eq!(alice.property("name"), Some(&PropertyValue::from("Alice")));
        assert_eq!(
            alice.property("sourceDocument"),
            Some(&PropertyValue::from("docs/a.txt"))
        );
        assert!(alice.property("createdAt").is_some());

        let edge = store.get_edge("e1").unwrap().unwrap();
        assert_eq!(edge.label, "works_at");
        assert_eq!(edge.source.as_str(), "n1");
        assert_eq!(store.documents().unwrap(), vec!["docs/a.txt"]);
    }

    #[test]
    fn test_add_document_is_idempotent_by_id() {
        let store = GraphStore::in_memory();
        store.add_document(&document("a.txt")).unwrap();
        store.add_document(&document("a.txt")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 1);
        assert_eq!(stats.document_count, 1);
    }

    #[test]
    fn test_batch_limit() {
        let store = GraphStore::new(GraphStoreConfig::default().with_max_batch_size(2), None);
        let result = store.add_document(&document("a.txt"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert_eq!(store.stats().unwrap().node_count, 0);
    }

    #[test]
    fn test_update_replaces_properties() {
        let store = GraphStore::in_memory();
        store.add_document(&document("a.txt")).unwrap();

        let patch = Node::new("n1", "").with_property("age", 30);
        store
            .update_graph(&GraphUpdate::new(UpdateKind::Update).with_nodes([patch]))
            .unwrap();

        let alice = store.get_node("n1").unwrap().unwrap();
        assert_eq!(alice.label, "person");
        assert_eq!(alice.property("age"), Some(&PropertyValue::Integer(30)));
        assert!(alice.property("name").is_none());
        assert!(
            store
                .find_nodes_by_property("name", &"Alice".into())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_update_missing_id_is_ignored() {
        let store = GraphStore::in_memory();
        store
            .update_graph(&GraphUpdate::new(UpdateKind::Update).with_nodes([Node::new("x", "y")]))
            .unwrap();
        assert!(store.get_node("x").unwrap().is_none());
    }

    #[test]
    fn test_delete_leaves_dangling_edges() {
        let store = GraphStore::in_memory();
        store.add_document(&document("a.txt")).unwrap();

        store.update_graph(&GraphUpdate::delete_nodes(["n1"])).unwrap();

        assert!(store.get_node("n1").unwrap().is_none());
        assert!(store.get_edge("e1").unwrap().is_some());
    }

    #[test]
    fn test_find_nodes_by_indexed_and_scanned_keys() {
        let store = GraphStore::in_memory();
        store.add_document(&document("a.txt")).unwrap();

        let people = store
            .find_nodes_by_property("type", &PropertyValue::from("person"))
            .unwrap();
        assert_eq!(people.len(), 1);
        assert_eq!(people[0].id.as_str(), "n1");

        let by_name = store
            .find_nodes_by_property("name", &PropertyValue::from("Acme"))
            .unwrap();
        assert_eq!(by_name[0].id.as_str(), "n2");

        let by_confidence = store
            .find_nodes_by_property("confidence", &PropertyValue::Float(0.9))
            .unwrap();
        assert_eq!(by_confidence.len(), 2);
    }

    #[test]
    fn test_index_follows_updates_and_deletes() {
        let store = GraphStore::in_memory();
        store.add_document(&document("a.txt")).unwrap();

        let rename = Node::new("n1", "").with_property("name", "Alicia");
        store
            .update_graph(&GraphUpdate::new(UpdateKind::Update).with_nodes([rename]))
            .unwrap();
        let old = store
            .find_nodes_by_property("name", &PropertyValue::from("Alice"))
            .unwrap();
        assert!(old.is_empty());

        store.update_graph(&GraphUpdate::delete_nodes(["n1"])).unwrap();
        let new = store
            .find_nodes_by_property("name", &PropertyValue::from("Alicia"))
            .unwrap();
        assert!(new.is_empty());
    }

    #[test]
    fn test_clear_resets_everything() {
        let store = GraphStore::in_memory();
        store.add_document(&document("a.txt")).unwrap();
        store.clear().unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.edge_count, 0);
        assert_eq!(stats.document_count, 0);
        assert!(
            store
                .find_nodes_by_property("type", &PropertyValue::from("person"))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_graph_data_keeps_insertion_order() {
        let store = GraphStore::in_memory();
        let nodes = ["c", "a", "b"].map(|id| Node::new(id, "x"));
        store
            .update_graph(&GraphUpdate::new(UpdateKind::Add).with_nodes(nodes))
            .unwrap();

        let ids: Vec<String> = store
            .graph_data()
            .unwrap()
            .nodes
            .into_iter()
            .map(|n| n.id.to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_load_snapshot_rebuilds_registry() {
        let store = GraphStore::in_memory();
        let snapshot = GraphSnapshot {
            nodes: vec![Node::new("n1", "person").with_property("sourceDocument", "a.txt")],
            edges: vec![],
        };
        store.load_snapshot(snapshot).unwrap();

        assert_eq!(store.documents().unwrap(), vec!["a.txt"]);
        assert_eq!(
            store
                .find_nodes_by_property("type", &PropertyValue::from("person"))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_autosave_after_interval() {
        let dir = TempDir::new().unwrap();
        let backend: Arc<dyn SnapshotBackend> =
            Arc::new(FilesystemSnapshotBackend::with_create(dir.path(), false).unwrap());
        let config = GraphStoreConfig::default().with_autosave_interval(Duration::ZERO);
        let store = GraphStore::new(config, Some(Arc::clone(&backend)));

        store.add_document(&document("a.txt")).unwrap();

        assert!(!store.is_dirty().unwrap());
        assert_eq!(backend.load_graph("main").unwrap().nodes.len(), 2);
    }

    #[test]
    fn test_no_autosave_within_interval() {
        let dir = TempDir::new().unwrap();
        let backend: Arc<dyn SnapshotBackend> =
            Arc::new(FilesystemSnapshotBackend::with_create(dir.path(), false).unwrap());
        let config = GraphStoreConfig::default().with_autosave_interval(Duration::from_secs(3600));
        let store = GraphStore::new(config, Some(Arc::clone(&backend)));

        store.add_document(&document("a.txt")).unwrap();

        assert!(store.is_dirty().unwrap());
        assert!(backend.load_graph("main").unwrap().is_empty());

        store.persist().unwrap();
        assert!(!store.is_dirty().unwrap());
        assert_eq!(backend.load_graph("main").unwrap().nodes.len(), 2);
    }

    #[test]
    fn test_persist_without_backend_fails() {
        let store = GraphStore::in_memory();
        assert!(matches!(store.persist(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_load_replaces_contents_and_is_clean() {
        let dir = TempDir::new().unwrap();
        let backend: Arc<dyn SnapshotBackend> =
            Arc::new(FilesystemSnapshotBackend::with_create(dir.path(), false).unwrap());
        backend
            .save_graph(
                &GraphSnapshot {
                    nodes: vec![Node::new("z", "thing")],
                    edges: vec![],
                },
                "main",
            )
            .unwrap();

        let config = GraphStoreConfig::default().with_autosave_interval(Duration::from_secs(3600));
        let store = GraphStore::new(config, Some(backend));
        store.add_document(&document("a.txt")).unwrap();
        store.load().unwrap();

        assert!(store.get_node("n1").unwrap().is_none());
        assert!(store.get_node("z").unwrap().is_some());
        assert!(!store.is_dirty().unwrap());
    }

    #[test]
    fn test_read_view() {
        let store = GraphStore::in_memory();
        store.add_document(&document("a.txt")).unwrap();

        let (nodes, edges, pos) = store
            .read(|view| (view.node_count(), view.edge_count(), view.node_position("n2")))
            .unwrap();
        assert_eq!((nodes, edges, pos), (2, 1, Some(1)));
    }
}
