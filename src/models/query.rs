//! Query, result and statistics types.
//!
//! A [`Query`] is a tagged union serialized with a `type` discriminator:
//!
//! ```json
//! {"type": "semantic", "query": "alice acme", "options": {"maxDistance": 1}}
//! {"type": "structured", "patterns": {"nodes": [{"label": "person"}], "edges": []}}
//! {"type": "hybrid", "semantic": {"query": "acme"},
//!  "structured": {"patterns": {"nodes": [{"label": "person"}]}}, "strategy": "weighted"}
//! ```
//!
//! Pattern values are matched by literal equality. Strings that look like
//! regular expressions are compared verbatim.

use super::graph::{Edge, Node, NodeId};
use super::property::Properties;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default similarity threshold for semantic seeds.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.5;

/// Default traversal depth around semantic seeds.
pub const DEFAULT_MAX_DISTANCE: usize = 2;

/// Caller-supplied ranking and filtering hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    /// Truncate results to this many matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    /// Drop matches scoring below this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    /// Reserved for callers that render provenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_sources: Option<bool>,
    /// Declared deadline in milliseconds. Not enforced.
    #[serde(default, alias = "timeout", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl QueryContext {
    /// Sets the maximum number of results.
    #[must_use]
    pub const fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = Some(max);
        self
    }

    /// Sets the minimum score.
    #[must_use]
    pub const fn with_min_confidence(mut self, min: f64) -> Self {
        self.min_confidence = Some(min);
        self
    }
}

/// Tuning for lexical relevance and neighbourhood expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SemanticOptions {
    /// Nodes whose relevance is strictly above this become seeds.
    pub similarity_threshold: f64,
    /// Maximum hops explored from each seed.
    pub max_distance: usize,
    /// Accepted for compatibility; lexical scoring has no window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window: Option<usize>,
}

impl Default for SemanticOptions {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            max_distance: DEFAULT_MAX_DISTANCE,
            context_window: None,
        }
    }
}

impl SemanticOptions {
    /// Sets the similarity threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Sets the maximum traversal distance.
    #[must_use]
    pub const fn with_max_distance(mut self, distance: usize) -> Self {
        self.max_distance = distance;
        self
    }
}

/// Lexical relevance query with neighbourhood expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticQuery {
    /// Free text; split on single spaces into terms.
    pub query: String,
    /// Threshold and traversal options.
    #[serde(default)]
    pub options: SemanticOptions,
    /// Ranking hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<QueryContext>,
}

impl SemanticQuery {
    /// Creates a query with default options.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            options: SemanticOptions::default(),
            context: None,
        }
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: SemanticOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the ranking context.
    #[must_use]
    pub fn with_context(mut self, context: QueryContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Constraint on a node. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePattern {
    /// Exact node id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    /// Exact label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Properties that must be literally equal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

impl NodePattern {
    /// Pattern matching every node with `label`.
    #[must_use]
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Pattern matching the node with `id`.
    #[must_use]
    pub fn with_id(id: impl Into<NodeId>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Adds a required property value.
    #[must_use]
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<super::PropertyValue>,
    ) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Constraint on an edge. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgePattern {
    /// Exact source node id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<NodeId>,
    /// Exact target node id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
    /// Exact label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Properties that must be literally equal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

impl EdgePattern {
    /// Pattern matching every edge.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Pattern matching every edge with `label`.
    #[must_use]
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }
}

/// Node and edge pattern lists. Each list is a disjunction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphPatterns {
    /// A node qualifies if it matches any of these.
    #[serde(default)]
    pub nodes: Vec<NodePattern>,
    /// An edge is collected if it matches any of these.
    #[serde(default)]
    pub edges: Vec<EdgePattern>,
}

impl GraphPatterns {
    /// Patterns with only node constraints.
    #[must_use]
    pub fn nodes(nodes: impl IntoIterator<Item = NodePattern>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            edges: Vec::new(),
        }
    }

    /// Sets the edge patterns.
    #[must_use]
    pub fn with_edges(mut self, edges: impl IntoIterator<Item = EdgePattern>) -> Self {
        self.edges = edges.into_iter().collect();
        self
    }
}

/// Pattern-matching query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredQuery {
    /// Node and edge patterns.
    pub patterns: GraphPatterns,
    /// Ranking hints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<QueryContext>,
}

impl StructuredQuery {
    /// Creates a query without ranking hints.
    #[must_use]
    pub const fn new(patterns: GraphPatterns) -> Self {
        Self {
            patterns,
            context: None,
        }
    }
}

/// How a hybrid query schedules and weights its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HybridStrategy {
    /// Run both parts concurrently; equal weights.
    Parallel,
    /// Run semantic then structured; equal weights.
    Sequential,
    /// Run sequentially; 0.6 semantic / 0.4 structured.
    Weighted,
}

impl HybridStrategy {
    /// Returns the strategy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
            Self::Weighted => "weighted",
        }
    }

    /// Returns `(semantic_weight, structured_weight)`.
    #[must_use]
    pub const fn weights(&self) -> (f64, f64) {
        match self {
            Self::Weighted => (0.6, 0.4),
            Self::Parallel | Self::Sequential => (0.5, 0.5),
        }
    }
}

impl fmt::Display for HybridStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic half of a hybrid query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticPart {
    /// Free text.
    pub query: String,
    /// Threshold and traversal options.
    #[serde(default)]
    pub options: SemanticOptions,
}

/// Structured half of a hybrid query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredPart {
    /// Node and edge patterns.
    pub patterns: GraphPatterns,
}

/// Weighted combination of a semantic and a structured query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridQuery {
    /// Semantic half.
    pub semantic: SemanticPart,
    /// Structured half.
    pub structured: StructuredPart,
    /// Scheduling and weighting.
    pub strategy: HybridStrategy,
    /// Ranking hints, forwarded to both halves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<QueryContext>,
}

/// Any query the engine can execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Query {
    /// Lexical relevance with neighbourhood expansion.
    Semantic(SemanticQuery),
    /// Pattern matching.
    Structured(StructuredQuery),
    /// Weighted merge of both.
    Hybrid(HybridQuery),
}

impl Query {
    /// Returns the query type name used for statistics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Semantic(_) => "semantic",
            Self::Structured(_) => "structured",
            Self::Hybrid(_) => "hybrid",
        }
    }

    /// Returns the ranking context, if any.
    #[must_use]
    pub const fn context(&self) -> Option<&QueryContext> {
        match self {
            Self::Semantic(q) => q.context.as_ref(),
            Self::Structured(q) => q.context.as_ref(),
            Self::Hybrid(q) => q.context.as_ref(),
        }
    }
}

impl From<SemanticQuery> for Query {
    fn from(q: SemanticQuery) -> Self {
        Self::Semantic(q)
    }
}

impl From<StructuredQuery> for Query {
    fn from(q: StructuredQuery) -> Self {
        Self::Structured(q)
    }
}

impl From<HybridQuery> for Query {
    fn from(q: HybridQuery) -> Self {
        Self::Hybrid(q)
    }
}

/// One ranked result unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    /// Matched nodes; the anchor node comes first.
    pub nodes: Vec<Node>,
    /// Edges among or around the matched nodes.
    pub edges: Vec<Edge>,
    /// Ranking score.
    pub score: f64,
    /// Human-readable `"{label}: {name} ({sourceDocument})"` line.
    pub context: String,
}

impl QueryMatch {
    /// Merge key: sorted, comma-joined node ids.
    #[must_use]
    pub fn node_key(&self) -> String {
        let mut ids: Vec<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        ids.join(",")
    }
}

/// Execution metadata attached to every result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    /// Number of matches before filtering and truncation.
    pub total_results: usize,
    /// Unix timestamp (ms) at which the result was produced.
    pub executed_at: u64,
    /// Wall-clock execution time in milliseconds.
    pub duration_ms: u64,
    /// Mean score of the unfiltered matches.
    pub confidence: f64,
    /// Strategy name, e.g. `semantic` or `hybrid-weighted`.
    pub strategy: String,
}

/// Ranked query output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Matches ordered by descending score.
    pub matches: Vec<QueryMatch>,
    /// Execution metadata.
    pub metadata: QueryMetadata,
}

/// Invocation count for one query type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternCount {
    /// Query type name.
    pub pattern: String,
    /// Successful executions.
    pub count: u64,
}

/// Aggregate query usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryStats {
    /// Successful executions across all types (cache hits excluded).
    pub total_queries: u64,
    /// Mean execution time of successful executions.
    pub average_execution_time_ms: f64,
    /// Successful executions over all attempted executions.
    pub success_rate: f64,
    /// Per-type counts, most frequent first.
    pub common_patterns: Vec<PatternCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_defaults_when_options_missing() {
        let query: Query = serde_json::from_str(r#"{"type":"semantic","query":"alice"}"#).unwrap();
        let Query::Semantic(q) = query else {
            panic!("expected semantic query");
        };
        assert!((q.options.similarity_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(q.options.max_distance, 2);
        assert!(q.context.is_none());
    }

    #[test]
    fn test_partial_options_keep_other_defaults() {
        let query: Query = serde_json::from_str(
            r#"{"type":"semantic","query":"a","options":{"maxDistance":1}}"#,
        )
        .unwrap();
        let Query::Semantic(q) = query else {
            panic!("expected semantic query");
        };
        assert_eq!(q.options.max_distance, 1);
        assert!((q.options.similarity_threshold - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hybrid_roundtrip() {
        let json = r#"{
            "type": "hybrid",
            "semantic": {"query": "acme"},
            "structured": {"patterns": {"nodes": [{"label": "person"}]}},
            "strategy": "weighted",
            "context": {"maxResults": 5, "timeout": 100}
        }"#;
        let query: Query = serde_json::from_str(json).unwrap();
        assert_eq!(query.kind(), "hybrid");
        let context = query.context().unwrap();
        assert_eq!(context.max_results, Some(5));
        assert_eq!(context.timeout_ms, Some(100));

        let reparsed: Query =
            serde_json::from_str(&serde_json::to_string(&query).unwrap()).unwrap();
        assert_eq!(reparsed, query);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let parsed = serde_json::from_str::<Query>(r#"{"type":"fuzzy","query":"x"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_strategy_weights() {
        assert_eq!(HybridStrategy::Weighted.weights(), (0.6, 0.4));
        assert_eq!(HybridStrategy::Parallel.weights(), (0.5, 0.5));
        assert_eq!(HybridStrategy::Sequential.weights(), (0.5, 0.5));
    }

    #[test]
    fn test_node_key_is_order_independent() {
        let m = QueryMatch {
            nodes: vec![Node::new("b", "x"), Node::new("a", "x")],
            edges: Vec::new(),
            score: 1.0,
            context: String::new(),
        };
        assert_eq!(m.node_key(), "a,b");
    }
}
