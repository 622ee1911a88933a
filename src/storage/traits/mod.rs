//! Storage backend traits.

mod snapshot;

pub use snapshot::{DEFAULT_GRAPH_ID, SnapshotBackend, SnapshotStats};
