//! Storage layer.
//!
//! Two layers cooperate:
//! - **Graph**: the authoritative in-memory node/edge collections
//!   ([`GraphStore`])
//! - **Persistence**: named JSON snapshots of the graph
//!   ([`SnapshotBackend`], implemented by [`FilesystemSnapshotBackend`])
//!
//! The store holds an optional `Arc<dyn SnapshotBackend>` and writes through
//! it on explicit saves and autosaves.

// Allow significant_drop_tightening - guards are scoped by explicit blocks.
#![allow(clippy::significant_drop_tightening)]

pub mod graph;
pub mod persistence;
pub mod traits;

pub use graph::{GraphStore, GraphStoreConfig, GraphView, StoreStats};
pub use persistence::FilesystemSnapshotBackend;
pub use traits::{DEFAULT_GRAPH_ID, SnapshotBackend, SnapshotStats};
