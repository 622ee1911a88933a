//! Data models for kgraph.
//!
//! This module contains the graph records, the producer boundary types and the
//! query/result types shared by the store, the query engine and the facade.

mod document;
pub mod graph;
mod property;
pub mod query;

pub use document::{DocumentMetadata, Entity, ProcessingResult, Relation};
pub use graph::{Edge, EdgeId, GraphSnapshot, GraphUpdate, Node, NodeId, UpdateKind};
pub use property::{Properties, PropertyValue};
pub use query::{
    EdgePattern, GraphPatterns, HybridQuery, HybridStrategy, NodePattern, PatternCount, Query,
    QueryContext, QueryMatch, QueryMetadata, QueryResult, QueryStats, SemanticOptions,
    SemanticPart, SemanticQuery, StructuredPart, StructuredQuery,
};
