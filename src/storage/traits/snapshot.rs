//! Snapshot backend trait.
//!
//! A snapshot backend stores complete graphs under short string identifiers.
//! The store persists its working graph under [`DEFAULT_GRAPH_ID`].
//!
//! # Error Modes
//!
//! | Operation | Missing identifier | Other failures |
//! |-----------|--------------------|----------------|
//! | `save_graph` | created | `GraphMutation` |
//! | `load_graph` | empty snapshot | `GraphMutation` (I/O, parse) |
//! | `list_graphs` | - | logged, empty list |
//! | `delete_graph` | `NotFound` | `GraphMutation` |
//! | `export_graph` | `NotFound` | `GraphMutation` |
//! | `import_graph` | created | `Validation`, `GraphMutation` |
//!
//! Identifiers that could escape the storage directory are rejected with
//! `InvalidInput` by every operation.

use crate::Result;
use crate::models::GraphSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Identifier of the working graph.
pub const DEFAULT_GRAPH_ID: &str = "main";

/// Aggregate information about stored snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStats {
    /// Number of stored snapshots.
    pub total_graphs: usize,
    /// Combined size of all snapshots in bytes.
    pub total_size: u64,
    /// Most recent modification time, `None` when nothing is stored.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Trait for graph snapshot storage.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn SnapshotBackend>`
/// - Backup failures must be logged, never returned
/// - `import_graph` must validate the whole payload before writing anything
pub trait SnapshotBackend: Send + Sync {
    /// Stores `snapshot` under `identifier`, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is invalid or the write fails.
    fn save_graph(&self, snapshot: &GraphSnapshot, identifier: &str) -> Result<()>;

    /// Loads the snapshot stored under `identifier`.
    ///
    /// A missing identifier yields an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored data cannot be read or parsed.
    fn load_graph(&self, identifier: &str) -> Result<GraphSnapshot>;

    /// Lists stored identifiers in sorted order.
    ///
    /// # Errors
    ///
    /// Implementations may return an error, but the filesystem backend
    /// logs listing failures and returns an empty list instead.
    fn list_graphs(&self) -> Result<Vec<String>>;

    /// Deletes the snapshot stored under `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if nothing is stored under the
    /// identifier.
    fn delete_graph(&self, identifier: &str) -> Result<()>;

    /// Copies the stored snapshot to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if nothing is stored under the
    /// identifier, or an error if the copy fails.
    fn export_graph(&self, identifier: &str, destination: &Path) -> Result<()>;

    /// Validates the snapshot at `source` and stores it under `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] if any node or edge is malformed;
    /// the stored snapshot is left untouched in that case.
    fn import_graph(&self, source: &Path, identifier: &str) -> Result<()>;

    /// Returns aggregate information about stored snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if file metadata cannot be read.
    fn stats(&self) -> Result<SnapshotStats>;

    /// Checks whether a snapshot exists under `identifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    fn exists(&self, identifier: &str) -> Result<bool> {
        Ok(self.list_graphs()?.iter().any(|id| id == identifier))
    }
}
