//! Business logic services.
//!
//! Services orchestrate the graph store and snapshot backend and provide
//! high-level operations.

pub mod extraction;
mod knowledge_graph;
pub mod query;
pub mod visualize;

pub use extraction::{DocumentExtractor, JsonResultExtractor};
pub use knowledge_graph::{KnowledgeGraphService, ServiceStats};
pub use query::{QueryEngine, QueryEngineConfig};
pub use visualize::VisualFormat;
