//! Filesystem-based snapshot backend.
//!
//! Stores each graph as a pretty-printed JSON file `<identifier>.json` in a
//! base directory. When backups are enabled, the previous version of a file
//! is copied to `<identifier>.json.backup` before it is overwritten or
//! deleted.
//!
//! # Security
//!
//! - **Path traversal**: identifiers are restricted to alphanumerics, dashes
//!   and underscores
//! - **File size limits**: snapshots larger than [`MAX_SNAPSHOT_SIZE`] are
//!   refused on read
//!
//! # Durability
//!
//! Writes go directly to the target file. A crash mid-write can leave a
//! truncated snapshot; the `.backup` sibling holds the previous version.

use super::validation::validate_snapshot;
use crate::models::GraphSnapshot;
use crate::storage::traits::{SnapshotBackend, SnapshotStats};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Maximum snapshot file size accepted on read (256 MiB).
pub const MAX_SNAPSHOT_SIZE: u64 = 256 * 1024 * 1024;

const SNAPSHOT_EXTENSION: &str = "json";
const BACKUP_SUFFIX: &str = ".backup";

/// Filesystem-based snapshot backend.
#[derive(Debug, Clone)]
pub struct FilesystemSnapshotBackend {
    /// Directory holding the snapshot files.
    base_path: PathBuf,
    /// Whether to copy the previous file before overwriting or deleting it.
    backup: bool,
}

impl FilesystemSnapshotBackend {
    /// Creates a backend rooted at `base_path`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_create(base_path: impl Into<PathBuf>, backup: bool) -> Result<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).map_err(|e| Error::mutation("create_storage_dir", e))?;

        Ok(Self { base_path, backup })
    }

    /// Returns the base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns whether backups are enabled.
    #[must_use]
    pub const fn backup_enabled(&self) -> bool {
        self.backup
    }

    /// Returns the path of the snapshot file for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the identifier could escape the
    /// base directory.
    pub fn snapshot_path(&self, identifier: &str) -> Result<PathBuf> {
        if !Self::is_safe_identifier(identifier) {
            return Err(Error::InvalidInput(format!(
                "graph identifier contains invalid characters: {identifier}"
            )));
        }

        let path = self
            .base_path
            .join(format!("{identifier}.{SNAPSHOT_EXTENSION}"));

        if !path.starts_with(&self.base_path) {
            return Err(Error::InvalidInput(format!(
                "path traversal attempt detected for identifier: {identifier}"
            )));
        }

        Ok(path)
    }

    /// Returns the backup path that belongs to a snapshot path.
    #[must_use]
    pub fn backup_path(snapshot_path: &Path) -> PathBuf {
        let mut name = snapshot_path.as_os_str().to_os_string();
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    /// Checks if an identifier is safe to use as a file stem.
    fn is_safe_identifier(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= 255
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }

    /// Copies an existing snapshot to its backup path.
    ///
    /// Never fails: a missing source is skipped and copy errors are logged.
    fn create_backup(&self, path: &Path) {
        if !self.backup || !path.exists() {
            return;
        }

        let backup = Self::backup_path(path);
        if let Err(e) = fs::copy(path, &backup) {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to create snapshot backup"
            );
        }
    }

    fn read_snapshot_file(path: &Path) -> Result<String> {
        let metadata = fs::metadata(path).map_err(|e| Error::mutation("read_snapshot_metadata", e))?;

        if metadata.len() > MAX_SNAPSHOT_SIZE {
            return Err(Error::InvalidInput(format!(
                "snapshot exceeds maximum size of {MAX_SNAPSHOT_SIZE} bytes: {}",
                path.display()
            )));
        }

        fs::read_to_string(path).map_err(|e| Error::mutation("read_snapshot_file", e))
    }
}

impl SnapshotBackend for FilesystemSnapshotBackend {
    #[instrument(skip(self, snapshot), fields(nodes = snapshot.nodes.len(), edges = snapshot.edges.len()))]
    fn save_graph(&self, snapshot: &GraphSnapshot, identifier: &str) -> Result<()> {
        let path = self.snapshot_path(identifier)?;

        fs::create_dir_all(&self.base_path).map_err(|e| Error::mutation("create_storage_dir", e))?;

        self.create_backup(&path);

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| Error::mutation("serialize_snapshot", e))?;

        fs::write(&path, json).map_err(|e| Error::mutation("write_snapshot_file", e))?;

        metrics::counter!("kgraph_snapshot_saves_total").increment(1);
        tracing::info!(path = %path.display(), "Graph saved");
        Ok(())
    }

    #[instrument(skip(self))]
    fn load_graph(&self, identifier: &str) -> Result<GraphSnapshot> {
        let path = self.snapshot_path(identifier)?;

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No snapshot on disk, starting empty");
            return Ok(GraphSnapshot::default());
        }

        let json = Self::read_snapshot_file(&path)?;
        serde_json::from_str(&json).map_err(|e| Error::mutation("deserialize_snapshot", e))
    }

    fn list_graphs(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    path = %self.base_path.display(),
                    error = %e,
                    "Failed to list snapshot directory"
                );
                return Ok(Vec::new());
            },
        };

        let mut identifiers: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| extract_identifier_from_path(&entry.path()))
            .collect();
        identifiers.sort();

        Ok(identifiers)
    }

    #[instrument(skip(self))]
    fn delete_graph(&self, identifier: &str) -> Result<()> {
        let path = self.snapshot_path(identifier)?;

        if !path.exists() {
            return Err(Error::NotFound(identifier.to_string()));
        }

        self.create_backup(&path);

        fs::remove_file(&path).map_err(|e| Error::mutation("delete_snapshot_file", e))?;

        tracing::info!(identifier, "Graph deleted");
        Ok(())
    }

    #[instrument(skip(self, destination), fields(destination = %destination.display()))]
    fn export_graph(&self, identifier: &str, destination: &Path) -> Result<()> {
        let path = self.snapshot_path(identifier)?;

        if !path.exists() {
            return Err(Error::NotFound(identifier.to_string()));
        }

        fs::copy(&path, destination).map_err(|e| Error::mutation("export_snapshot", e))?;

        tracing::info!(identifier, "Graph exported");
        Ok(())
    }

    #[instrument(skip(self, source), fields(source = %source.display()))]
    fn import_graph(&self, source: &Path, identifier: &str) -> Result<()> {
        // Reject a bad identifier before touching the source file.
        self.snapshot_path(identifier)?;

        let json = Self::read_snapshot_file(source)?;
        let payload: serde_json::Value =
            serde_json::from_str(&json).map_err(|e| Error::mutation("parse_import", e))?;

        let problems = validate_snapshot(&payload);
        if !problems.is_empty() {
            tracing::warn!(problems = problems.len(), "Rejected invalid graph import");
            return Err(Error::Validation(problems));
        }

        let snapshot: GraphSnapshot =
            serde_json::from_value(payload).map_err(|e| Error::mutation("parse_import", e))?;

        self.save_graph(&snapshot, identifier)?;

        tracing::info!(identifier, "Graph imported");
        Ok(())
    }

    fn stats(&self) -> Result<SnapshotStats> {
        let identifiers = self.list_graphs()?;
        let mut stats = SnapshotStats {
            total_graphs: identifiers.len(),
            ..SnapshotStats::default()
        };

        for identifier in &identifiers {
            let path = self.snapshot_path(identifier)?;
            let metadata = fs::metadata(&path).map_err(|e| Error::mutation("snapshot_stats", e))?;

            stats.total_size += metadata.len();

            if let Ok(modified) = metadata.modified() {
                let modified = DateTime::<Utc>::from(modified);
                if stats.last_modified.is_none_or(|latest| modified > latest) {
                    stats.last_modified = Some(modified);
                }
            }
        }

        Ok(stats)
    }
}

/// Extracts a graph identifier from a snapshot file path.
///
/// Backups (`*.json.backup`) and non-JSON files are ignored.
fn extract_identifier_from_path(path: &Path) -> Option<String> {
    if path.extension().is_none_or(|ext| ext != SNAPSHOT_EXTENSION) {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    FilesystemSnapshotBackend::is_safe_identifier(stem).then(|| stem.to_string())
}
