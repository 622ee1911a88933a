//! Query execution over the knowledge graph.
//!
//! The [`QueryEngine`] answers three kinds of [`Query`]:
//!
//! | Type | Scoring | Strategy name |
//! |------|---------|---------------|
//! | Semantic | fraction of query terms found in node properties | `semantic` |
//! | Structured | 1.0 for every pattern match | `structured` |
//! | Hybrid | weighted sum of both | `hybrid-{strategy}` |
//!
//! Every result is ranked by descending score, filtered by the query context
//! and cached by query content for a fixed TTL.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use kgraph::models::{GraphUpdate, Node, SemanticQuery, UpdateKind};
//! use kgraph::services::QueryEngine;
//! use kgraph::storage::GraphStore;
//!
//! let store = Arc::new(GraphStore::in_memory());
//! store.update_graph(
//!     &GraphUpdate::new(UpdateKind::Add)
//!         .with_nodes([Node::new("n1", "person").with_property("name", "Alice")]),
//! )?;
//!
//! let engine = QueryEngine::with_defaults(Arc::clone(&store));
//! let result = engine.execute(&SemanticQuery::new("alice").into())?;
//! assert_eq!(result.matches.len(), 1);
//! # Ok::<(), kgraph::Error>(())
//! ```

mod cache;
mod hybrid;
mod ranking;
pub mod semantic;
mod stats;
pub mod structured;

pub use cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, QueryCache};
pub use ranking::{describe, mean_score, merge_weighted, rank_and_filter};
pub use stats::QueryStatsTracker;

use crate::models::{Query, QueryMatch, QueryMetadata, QueryResult, QueryStats};
use crate::storage::{GraphStore, GraphView};
use crate::{Error, QueryErrorKind, Result, current_timestamp_millis};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Query engine tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEngineConfig {
    /// How long a cached result stays fresh.
    pub cache_ttl: Duration,
    /// Maximum number of cached results.
    pub cache_capacity: usize,
}

impl Default for QueryEngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Executes queries against a shared [`GraphStore`].
#[derive(Debug)]
pub struct QueryEngine {
    store: Arc<GraphStore>,
    cache: QueryCache,
    stats: QueryStatsTracker,
}

impl QueryEngine {
    /// Creates an engine over `store`.
    #[must_use]
    pub fn new(store: Arc<GraphStore>, config: &QueryEngineConfig) -> Self {
        Self {
            store,
            cache: QueryCache::new(config.cache_capacity, config.cache_ttl),
            stats: QueryStatsTracker::new(),
        }
    }

    /// Creates an engine with the default cache settings.
    #[must_use]
    pub fn with_defaults(store: Arc<GraphStore>) -> Self {
        Self::new(store, &QueryEngineConfig::default())
    }

    /// Executes a query, serving it from the cache when a fresh result exists.
    ///
    /// Cached results are returned verbatim, even if the graph has changed
    /// since they were computed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueryExecution`] with
    /// [`QueryErrorKind::InternalFailure`] if execution fails.
    #[instrument(skip(self, query), fields(query_type = query.kind()))]
    pub fn execute(&self, query: &Query) -> Result<QueryResult> {
        let key = QueryCache::key(query)?;

        if let Some(cached) = self.cache.get(&key) {
            metrics::counter!("kgraph_cache_hits_total").increment(1);
            tracing::debug!("Query served from cache");
            return Ok(cached);
        }
        tracing::debug!("Query cache miss");

        if let Some(timeout_ms) = query.context().and_then(|c| c.timeout_ms) {
            tracing::debug!(timeout_ms, "Query timeout is not enforced");
        }

        let started = Instant::now();
        let outcome = self
            .store
            .read(|view| Self::dispatch(view, query, started))
            .and_then(|inner| inner);
        let elapsed = started.elapsed();

        metrics::histogram!("kgraph_query_duration_ms", "type" => query.kind())
            .record(elapsed.as_secs_f64() * 1000.0);

        match outcome {
            Ok(result) => {
                metrics::counter!("kgraph_queries_total", "type" => query.kind(), "status" => "success")
                    .increment(1);
                self.stats.record_success(query.kind(), elapsed);
                tracing::debug!(
                    total_results = result.metadata.total_results,
                    returned = result.matches.len(),
                    "Query executed"
                );
                self.cache.put(key, result.clone());
                Ok(result)
            },
            Err(e) => {
                metrics::counter!("kgraph_queries_total", "type" => query.kind(), "status" => "error")
                    .increment(1);
                self.stats.record_failure();
                tracing::warn!(error = %e, "Query execution failed");
                Err(Self::as_query_error(e, query))
            },
        }
    }

    /// Parses and executes a JSON query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueryExecution`] with
    /// [`QueryErrorKind::UnsupportedQueryType`] if `type` is missing or not
    /// one of `semantic`, `structured` or `hybrid`, with
    /// [`QueryErrorKind::InternalFailure`] if the payload is otherwise
    /// malformed, or any error from [`QueryEngine::execute`].
    pub fn execute_json(&self, payload: serde_json::Value) -> Result<QueryResult> {
        let query_type = payload.get("type").and_then(serde_json::Value::as_str);
        if !matches!(query_type, Some("semantic" | "structured" | "hybrid")) {
            let cause = query_type.map_or_else(
                || "query has no 'type' field".to_string(),
                |t| format!("unsupported query type: {t}"),
            );
            self.stats.record_failure();
            metrics::counter!("kgraph_queries_total", "type" => "unknown", "status" => "error")
                .increment(1);
            return Err(Error::QueryExecution {
                kind: QueryErrorKind::UnsupportedQueryType,
                query: Box::new(payload),
                cause,
            });
        }

        match serde_json::from_value::<Query>(payload.clone()) {
            Ok(query) => self.execute(&query),
            Err(e) => {
                self.stats.record_failure();
                Err(Error::QueryExecution {
                    kind: QueryErrorKind::InternalFailure,
                    query: Box::new(payload),
                    cause: format!("malformed query: {e}"),
                })
            },
        }
    }

    /// Drops every cached result. Statistics are kept.
    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::debug!("Query cache cleared");
    }

    /// Returns aggregate usage statistics.
    #[must_use]
    pub fn stats(&self) -> QueryStats {
        self.stats.snapshot()
    }

    /// Returns the number of cached results.
    #[must_use]
    pub fn cached_results(&self) -> usize {
        self.cache.len()
    }

    fn dispatch(view: GraphView<'_>, query: &Query, started: Instant) -> Result<QueryResult> {
        match query {
            Query::Semantic(q) => {
                let matches = semantic::execute(view, &q.query, &q.options)?;
                let confidence = mean_score(&matches);
                Ok(Self::finish(matches, q.context.as_ref(), confidence, "semantic", started))
            },
            Query::Structured(q) => {
                let matches = structured::execute(view, &q.patterns);
                Ok(Self::finish(matches, q.context.as_ref(), 1.0, "structured", started))
            },
            Query::Hybrid(q) => {
                let matches = hybrid::execute(view, q)?;
                let confidence = mean_score(&matches);
                let strategy = format!("hybrid-{}", q.strategy);
                Ok(Self::finish(matches, q.context.as_ref(), confidence, &strategy, started))
            },
        }
    }

    fn finish(
        matches: Vec<QueryMatch>,
        context: Option<&crate::models::QueryContext>,
        confidence: f64,
        strategy: &str,
        started: Instant,
    ) -> QueryResult {
        let total_results = matches.len();
        let matches = rank_and_filter(matches, context);

        QueryResult {
            matches,
            metadata: QueryMetadata {
                total_results,
                executed_at: current_timestamp_millis(),
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                confidence,
                strategy: strategy.to_string(),
            },
        }
    }

    fn as_query_error(error: Error, query: &Query) -> Error {
        match error {
            Error::QueryExecution { .. } => error,
            other => Error::QueryExecution {
                kind: QueryErrorKind::InternalFailure,
                query: Box::new(serde_json::to_value(query).unwrap_or_default()),
                cause: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        GraphPatterns, GraphUpdate, Node, NodePattern, QueryContext, SemanticQuery,
        StructuredQuery, UpdateKind,
    };
    use serde_json::json;

    fn engine() -> (Arc<GraphStore>, QueryEngine) {
        let store = Arc::new(GraphStore::in_memory());
        let nodes = [
            Node::new("a", "person").with_property("name", "Alice"),
            Node::new("b", "organization").with_property("name", "Acme"),
            Node::new("c", "location").with_property("name", "Berlin"),
        ];
        store
            .update_graph(&GraphUpdate::new(UpdateKind::Add).with_nodes(nodes))
            .unwrap();
        let engine = QueryEngine::with_defaults(Arc::clone(&store));
        (store, engine)
    }

    #[test]
    fn test_structured_metadata() {
        let (_, engine) = engine();
        let query = Query::from(StructuredQuery::new(GraphPatterns::nodes([
            NodePattern::with_label("person"),
        ])));

        let result = engine.execute(&query).unwrap();

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.metadata.total_results, 1);
        assert_eq!(result.metadata.strategy, "structured");
        assert!((result.metadata.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_total_results_counts_before_truncation() {
        let (_, engine) = engine();
        let query = Query::from(
            SemanticQuery::new("a").with_context(QueryContext::default().with_max_results(1)),
        );

        let result = engine.execute(&query).unwrap();

        // "a" occurs in Alice, Acme and Berlin's serialized properties.
        assert_eq!(result.metadata.total_results, 3);
        assert_eq!(result.matches.len(), 1);
    }

    #[test]
    fn test_cache_hits_do_not_count() {
        let (_, engine) = engine();
        let query = Query::from(SemanticQuery::new("alice"));

        engine.execute(&query).unwrap();
        engine.execute(&query).unwrap();

        assert_eq!(engine.stats().total_queries, 1);
        assert_eq!(engine.cached_results(), 1);
    }

    #[test]
    fn test_clear_cache_keeps_stats() {
        let (_, engine) = engine();
        engine.execute(&SemanticQuery::new("alice").into()).unwrap();

        engine.clear_cache();

        assert_eq!(engine.cached_results(), 0);
        assert_eq!(engine.stats().total_queries, 1);
    }

    #[test]
    fn test_execute_json_unsupported_type() {
        let (_, engine) = engine();
        let payload = json!({"type": "fuzzy", "query": "x"});

        let err = engine.execute_json(payload.clone()).unwrap_err();

        match err {
            Error::QueryExecution { kind, query, .. } => {
                assert_eq!(kind, QueryErrorKind::UnsupportedQueryType);
                assert_eq!(*query, payload);
            },
            other => panic!("unexpected error: {other}"),
        }
        assert!(engine.stats().success_rate < 1.0);
    }

    #[test]
    fn test_execute_json_malformed_known_type() {
        let (_, engine) = engine();
        let err = engine
            .execute_json(json!({"type": "structured"}))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::QueryExecution {
                kind: QueryErrorKind::InternalFailure,
                ..
            }
        ));
    }

    #[test]
    fn test_execute_json_runs_query() {
        let (_, engine) = engine();
        let result = engine
            .execute_json(json!({"type": "semantic", "query": "berlin"}))
            .unwrap();
        assert_eq!(result.matches[0].nodes[0].id.as_str(), "c");
    }
}
