//! Snapshot backend implementations.

mod filesystem;
mod validation;

pub use filesystem::{FilesystemSnapshotBackend, MAX_SNAPSHOT_SIZE};
pub use validation::validate_snapshot;
