//! # kgraph
//!
//! An embedded knowledge-graph engine.
//!
//! kgraph ingests entities and relations produced by an external extraction
//! pipeline into an in-memory property graph, answers lexical, structured and
//! hybrid queries over it, and snapshots the graph to disk as JSON.
//!
//! ## Features
//!
//! - Upsert-by-id ingestion with a document registry and property indexes
//! - Three query strategies with ranking, filtering and a TTL result cache
//! - Named JSON snapshots with backups, validated import and export
//! - Dirty-flag autosave with a configurable interval
//!
//! ## Example
//!
//! ```rust,ignore
//! use kgraph::{KgraphConfig, KnowledgeGraphService, Query};
//! use kgraph::services::JsonResultExtractor;
//!
//! let service = KnowledgeGraphService::open(&KgraphConfig::default(), JsonResultExtractor)?;
//! service.process_document("extracted/report.json")?;
//!
//! let result = service.semantic_search("alice acme", None)?;
//! for hit in &result.matches {
//!     println!("{:.2} {}", hit.score, hit.context);
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use serde::Serialize;
use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::KgraphConfig;
pub use models::{
    Edge, EdgeId, GraphSnapshot, Node, NodeId, ProcessingResult, Properties, PropertyValue,
    Query, QueryResult,
};
pub use services::{KnowledgeGraphService, QueryEngine};
pub use storage::{FilesystemSnapshotBackend, GraphStore, SnapshotBackend};

/// Classifies a query execution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryErrorKind {
    /// The query payload named a variant the engine does not know.
    UnsupportedQueryType,
    /// Any other failure while executing a known query.
    InternalFailure,
}

impl std::fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedQueryType => write!(f, "unsupported query type"),
            Self::InternalFailure => write!(f, "internal failure"),
        }
    }
}

/// Error type for kgraph operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Extraction` | The document extractor fails or the document cannot be read |
/// | `GraphMutation` | Store locks are poisoned, snapshot I/O or parsing fails |
/// | `QueryExecution` | A query has an unknown type or fails while running |
/// | `Validation` | An imported snapshot has nodes/edges missing required fields |
/// | `NotFound` | Deleting or exporting a snapshot identifier that does not exist |
/// | `InvalidInput` | Bad identifiers, oversized batches, malformed config or arguments |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The entity/relation producer failed.
    #[error("extraction of '{document}' failed: {cause}")]
    Extraction {
        /// The document being processed.
        document: String,
        /// The underlying cause.
        cause: String,
    },

    /// A graph or snapshot mutation failed.
    ///
    /// Raised when:
    /// - A store lock is poisoned
    /// - Reading, writing or deleting a snapshot file fails
    /// - An existing snapshot file cannot be parsed
    #[error("operation '{operation}' failed: {cause}")]
    GraphMutation {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A query could not be executed.
    ///
    /// Carries the submitted query payload so callers can report it.
    #[error("query execution failed ({kind}): {cause}")]
    QueryExecution {
        /// The failure class.
        kind: QueryErrorKind,
        /// The query as submitted.
        query: Box<serde_json::Value>,
        /// The underlying cause.
        cause: String,
    },

    /// An imported payload failed structural validation.
    #[error("invalid graph data: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A snapshot identifier does not exist.
    #[error("graph not found: {0}")]
    NotFound(String),

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Builds a [`Error::GraphMutation`] from an operation name and any displayable cause.
    pub(crate) fn mutation(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::GraphMutation {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for kgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in milliseconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
