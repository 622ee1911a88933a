//! The knowledge graph facade.
//!
//! [`KnowledgeGraphService`] wires a [`DocumentExtractor`], the shared
//! [`GraphStore`], a [`QueryEngine`] and a [`SnapshotBackend`] together and
//! exposes the operations a host application needs.

use crate::config::KgraphConfig;
use crate::models::{
    DocumentMetadata, GraphPatterns, GraphSnapshot, ProcessingResult, Query, QueryResult,
    QueryStats, SemanticOptions, SemanticQuery, StructuredQuery,
};
use crate::services::QueryEngine;
use crate::services::extraction::DocumentExtractor;
use crate::services::query::QueryEngineConfig;
use crate::services::visualize::{self, VisualFormat};
use crate::storage::{
    DEFAULT_GRAPH_ID, FilesystemSnapshotBackend, GraphStore, SnapshotBackend, SnapshotStats,
    StoreStats,
};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

/// Combined statistics for the persisted graph, the live store and queries.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    /// Snapshot storage statistics.
    pub graph: SnapshotStats,
    /// In-memory graph statistics.
    pub store: StoreStats,
    /// Query execution statistics.
    pub queries: QueryStats,
}

/// Entry point for ingesting, querying and persisting a knowledge graph.
///
/// # Example
///
/// ```rust,ignore
/// use kgraph::{KgraphConfig, KnowledgeGraphService};
/// use kgraph::services::JsonResultExtractor;
///
/// let service = KnowledgeGraphService::open(&KgraphConfig::default(), JsonResultExtractor)?;
/// service.process_document("extracted/report.json")?;
/// println!("{}", service.stats()?.store.node_count);
/// ```
pub struct KnowledgeGraphService<E> {
    extractor: E,
    store: Arc<GraphStore>,
    engine: QueryEngine,
    backend: Arc<dyn SnapshotBackend>,
}

impl<E> std::fmt::Debug for KnowledgeGraphService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeGraphService")
            .field("store", &self.store)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

impl<E: DocumentExtractor> KnowledgeGraphService<E> {
    /// Assembles a service from existing parts.
    ///
    /// `store` should be attached to `backend`; nothing is loaded.
    #[must_use]
    pub fn new(
        extractor: E,
        store: Arc<GraphStore>,
        backend: Arc<dyn SnapshotBackend>,
        query_config: &QueryEngineConfig,
    ) -> Self {
        let engine = QueryEngine::new(Arc::clone(&store), query_config);
        Self {
            extractor,
            store,
            engine,
            backend,
        }
    }

    /// Opens the service described by `config` and loads the `main` snapshot.
    ///
    /// A missing or unreadable `main` snapshot is logged and the service
    /// starts with an empty graph.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open(config: &KgraphConfig, extractor: E) -> Result<Self> {
        let backend: Arc<dyn SnapshotBackend> = Arc::new(FilesystemSnapshotBackend::with_create(
            &config.data_dir,
            config.persistence.backup,
        )?);
        let store = Arc::new(GraphStore::new(
            config.store_config(),
            Some(Arc::clone(&backend)),
        ));
        let service = Self::new(extractor, store, backend, &config.query_config());

        if service.backend.exists(DEFAULT_GRAPH_ID)? {
            if let Err(e) = service.store.load() {
                tracing::error!(error = %e, "Failed to load persisted graph, starting empty");
            }
        } else {
            tracing::debug!(data_dir = %config.data_dir.display(), "No persisted graph found");
        }
        Ok(service)
    }

    /// The shared graph store.
    #[must_use]
    pub const fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// The query engine.
    #[must_use]
    pub const fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// The snapshot backend.
    #[must_use]
    pub fn backend(&self) -> &dyn SnapshotBackend {
        self.backend.as_ref()
    }

    /// Reads, extracts and ingests one document, then saves the graph unless
    /// ingestion already autosaved it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`] if the file cannot be read or extracted,
    /// or the store/backend error if ingestion or saving fails.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn process_document(&self, path: impl AsRef<Path>) -> Result<ProcessingResult> {
        let path = path.as_ref();
        let metadata = DocumentMetadata::for_path(path);
        let content = std::fs::read_to_string(path).map_err(|e| Error::Extraction {
            document: metadata.path.clone(),
            cause: e.to_string(),
        })?;

        let result = self.extractor.extract(&content, &metadata)?;
        self.store.add_document(&result)?;
        // add_document may already have autosaved this revision
        if self.store.is_dirty()? {
            self.store.persist()?;
        }

        metrics::counter!("kgraph_documents_processed_total").increment(1);
        tracing::info!(
            document = %metadata.path,
            entities = result.entities.len(),
            relations = result.relations.len(),
            "Processed document"
        );
        Ok(result)
    }

    /// Processes each path in turn, skipping documents that fail.
    pub fn process_documents<P: AsRef<Path>>(
        &self,
        paths: impl IntoIterator<Item = P>,
    ) -> Vec<ProcessingResult> {
        paths
            .into_iter()
            .filter_map(|path| {
                let path = path.as_ref();
                self.process_document(path)
                    .inspect_err(|e| {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping document");
                    })
                    .ok()
            })
            .collect()
    }

    /// Executes a typed query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueryExecution`] if the query fails.
    pub fn query(&self, query: &Query) -> Result<QueryResult> {
        self.engine.execute(query)
    }

    /// Executes a query given as JSON with a `type` tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueryExecution`] if the payload names an unknown type
    /// or the query fails.
    pub fn query_json(&self, payload: serde_json::Value) -> Result<QueryResult> {
        self.engine.execute_json(payload)
    }

    /// Runs a semantic query for `text`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueryExecution`] if the query fails.
    pub fn semantic_search(
        &self,
        text: &str,
        options: Option<SemanticOptions>,
    ) -> Result<QueryResult> {
        let query = SemanticQuery::new(text).with_options(options.unwrap_or_default());
        self.engine.execute(&query.into())
    }

    /// Runs a structured query for `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueryExecution`] if the query fails.
    pub fn structured_search(&self, patterns: GraphPatterns) -> Result<QueryResult> {
        self.engine.execute(&StructuredQuery::new(patterns).into())
    }

    /// Returns the live graph and, when `destination` is given, copies the
    /// persisted `main` snapshot there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `main` has never been saved, or the
    /// backend's I/O error.
    pub fn export_graph(&self, destination: Option<&Path>) -> Result<GraphSnapshot> {
        let snapshot = self.store.graph_data()?;
        if let Some(destination) = destination {
            self.backend.export_graph(DEFAULT_GRAPH_ID, destination)?;
        }
        Ok(snapshot)
    }

    /// Imports a snapshot file as `main` and reloads the store from it.
    ///
    /// The query cache is not cleared; cached results may be served until
    /// their TTL expires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the file is structurally invalid, or
    /// the backend's error if reading or saving fails.
    pub fn import_graph(&self, source: &Path) -> Result<()> {
        self.backend.import_graph(source, DEFAULT_GRAPH_ID)?;
        self.store.load()?;
        tracing::info!(source = %source.display(), "Imported graph");
        Ok(())
    }

    /// Collects storage, store and query statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned or the backend fails.
    pub fn stats(&self) -> Result<ServiceStats> {
        Ok(ServiceStats {
            graph: self.backend.stats()?,
            store: self.store.stats()?,
            queries: self.engine.stats(),
        })
    }

    /// Empties the graph, saves the empty `main` snapshot and drops cached
    /// query results.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned or saving fails.
    pub fn clear(&self) -> Result<()> {
        self.store.clear()?;
        self.store.persist()?;
        self.engine.clear_cache();
        tracing::info!("Cleared knowledge graph");
        Ok(())
    }

    /// Renders the live graph in `format`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn visualize(&self, format: VisualFormat) -> Result<String> {
        let snapshot = self.store.graph_data()?;
        Ok(visualize::render(&snapshot, format))
    }

    /// Lists persisted snapshot identifiers.
    ///
    /// # Errors
    ///
    /// Returns the backend's error.
    pub fn list_graphs(&self) -> Result<Vec<String>> {
        self.backend.list_graphs()
    }

    /// Deletes a persisted snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the snapshot does not exist.
    pub fn delete_graph(&self, identifier: &str) -> Result<()> {
        self.backend.delete_graph(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::JsonResultExtractor;
    use crate::storage::GraphStoreConfig;
    use std::time::Duration;
    use tempfile::TempDir;

    const DOCUMENT: &str = r#"{
        "entities": [
            {"id": "alice", "type": "person", "name": "Alice Smith", "confidence": 0.9},
            {"id": "acme", "type": "organization", "name": "Acme Corp", "confidence": 0.8}
        ],
        "relations": [
            {"id": "r1", "type": "works_at", "source": "alice", "target": "acme"}
        ]
    }"#;

    fn service(dir: &TempDir) -> KnowledgeGraphService<JsonResultExtractor> {
        let backend: Arc<dyn SnapshotBackend> = Arc::new(
            FilesystemSnapshotBackend::with_create(dir.path().join("graphs"), true).unwrap(),
        );
        let store = Arc::new(GraphStore::new(
            GraphStoreConfig::default().with_autosave_interval(Duration::from_secs(3600)),
            Some(Arc::clone(&backend)),
        ));
        KnowledgeGraphService::new(
            JsonResultExtractor,
            store,
            backend,
            &QueryEngineConfig::default(),
        )
    }

    fn write_document(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_process_document_ingests_and_saves() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let path = write_document(&dir, "report.json", DOCUMENT);

        let result = svc.process_document(&path).unwrap();

        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.metadata.doc_type, ".json");
        assert_eq!(svc.store().stats().unwrap().node_count, 2);
        assert!(svc.backend().exists(DEFAULT_GRAPH_ID).unwrap());
        assert!(!svc.store().is_dirty().unwrap());
    }

    #[test]
    fn test_backup_holds_prior_version_when_autosave_fires() {
        let dir = TempDir::new().unwrap();
        let backend: Arc<dyn SnapshotBackend> = Arc::new(
            FilesystemSnapshotBackend::with_create(dir.path().join("graphs"), true).unwrap(),
        );
        let store = Arc::new(GraphStore::new(
            GraphStoreConfig::default().with_autosave_interval(Duration::ZERO),
            Some(Arc::clone(&backend)),
        ));
        let svc = KnowledgeGraphService::new(
            JsonResultExtractor,
            store,
            backend,
            &QueryEngineConfig::default(),
        );
        let main = dir.path().join("graphs").join("main.json");

        svc.process_document(write_document(&dir, "first.json", DOCUMENT))
            .unwrap();
        let prior = std::fs::read(&main).unwrap();
        svc.process_document(write_document(&dir, "second.json", DOCUMENT))
            .unwrap();

        let backup = std::fs::read(dir.path().join("graphs").join("main.json.backup")).unwrap();
        assert_eq!(backup, prior);
        assert_ne!(backup, std::fs::read(&main).unwrap());
    }

    #[test]
    fn test_process_document_missing_file() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let err = svc.process_document(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn test_process_documents_skips_failures() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let good = write_document(&dir, "good.json", DOCUMENT);
        let bad = write_document(&dir, "bad.json", "not json");

        let results = svc.process_documents([bad, good]);

        assert_eq!(results.len(), 1);
        assert_eq!(svc.store().stats().unwrap().node_count, 2);
    }

    #[test]
    fn test_semantic_and_structured_search() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        svc.process_document(write_document(&dir, "report.json", DOCUMENT))
            .unwrap();

        let semantic = svc.semantic_search("alice", None).unwrap();
        assert_eq!(semantic.metadata.strategy, "semantic");
        assert!(!semantic.matches.is_empty());

        let structured = svc
            .structured_search(GraphPatterns::nodes([
                crate::models::NodePattern::with_label("organization"),
            ]))
            .unwrap();
        assert_eq!(structured.matches.len(), 1);
    }

    #[test]
    fn test_clear_saves_empty_graph() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        svc.process_document(write_document(&dir, "report.json", DOCUMENT))
            .unwrap();

        svc.clear().unwrap();

        assert_eq!(svc.store().stats().unwrap().node_count, 0);
        let saved = svc.backend().load_graph(DEFAULT_GRAPH_ID).unwrap();
        assert!(saved.nodes.is_empty());
        assert_eq!(svc.engine().cached_results(), 0);
    }

    #[test]
    fn test_export_and_import_round_trip() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        svc.process_document(write_document(&dir, "report.json", DOCUMENT))
            .unwrap();
        let exported = dir.path().join("export.json");

        let snapshot = svc.export_graph(Some(&exported)).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);

        svc.clear().unwrap();
        svc.import_graph(&exported).unwrap();

        assert_eq!(svc.store().graph_data().unwrap(), snapshot);
        assert_eq!(svc.store().documents().unwrap().len(), 1);
    }

    #[test]
    fn test_export_without_saved_graph_is_not_found() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let err = svc
            .export_graph(Some(&dir.path().join("out.json")))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_stats_and_visualize() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        svc.process_document(write_document(&dir, "report.json", DOCUMENT))
            .unwrap();
        svc.semantic_search("acme", None).unwrap();

        let stats = svc.stats().unwrap();
        assert_eq!(stats.graph.total_graphs, 1);
        assert_eq!(stats.store.edge_count, 1);
        assert_eq!(stats.queries.total_queries, 1);

        let summary = svc.visualize(VisualFormat::Summary).unwrap();
        assert!(summary.contains("  person: 1"));
        assert!(summary.ends_with("Total Relationships: 1"));
    }

    #[test]
    fn test_open_loads_persisted_graph() {
        let dir = TempDir::new().unwrap();
        let config = KgraphConfig {
            data_dir: dir.path().join("data"),
            ..KgraphConfig::default()
        };
        {
            let svc = KnowledgeGraphService::open(&config, JsonResultExtractor).unwrap();
            svc.process_document(write_document(&dir, "report.json", DOCUMENT))
                .unwrap();
        }

        let reopened = KnowledgeGraphService::open(&config, JsonResultExtractor).unwrap();
        assert_eq!(reopened.store().stats().unwrap().node_count, 2);
        assert_eq!(reopened.list_graphs().unwrap(), vec!["main".to_string()]);
    }

    #[test]
    fn test_open_with_corrupt_snapshot_starts_empty() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("main.json"), "{ broken").unwrap();
        let config = KgraphConfig {
            data_dir,
            ..KgraphConfig::default()
        };

        let svc = KnowledgeGraphService::open(&config, JsonResultExtractor).unwrap();
        assert_eq!(svc.store().stats().unwrap().node_count, 0);
    }
}
