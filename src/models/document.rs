//! Producer boundary types.
//!
//! These mirror what an external extraction pipeline hands to the engine:
//! entities, relations between them, and metadata about the source document.
//! Field names serialize in camelCase.

use super::property::Properties;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entity extracted from a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Entity id, reused as the node id.
    pub id: String,
    /// Entity type, reused as the node label.
    #[serde(rename = "type")]
    pub entity_type: String,
    /// Display name.
    pub name: String,
    /// Extra properties reported by the extractor.
    #[serde(default)]
    pub properties: Properties,
    /// Document the entity came from, as reported by the extractor.
    #[serde(default)]
    pub source_document: String,
    /// Extraction confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

/// A relation between two extracted entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// Relation id, reused as the edge id.
    pub id: String,
    /// Relation type, reused as the edge label.
    #[serde(rename = "type")]
    pub relation_type: String,
    /// Source entity id.
    pub source: String,
    /// Target entity id.
    pub target: String,
    /// Extra properties reported by the extractor.
    #[serde(default)]
    pub properties: Properties,
    /// Document the relation came from, as reported by the extractor.
    #[serde(default)]
    pub source_document: String,
    /// Extraction confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
}

/// Metadata describing a processed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// File name without directories.
    pub filename: String,
    /// Lowercase extension including the dot, or empty.
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Path the document was read from; registered in the store.
    pub path: String,
    /// When extraction finished.
    pub processed_at: DateTime<Utc>,
}

impl DocumentMetadata {
    /// Builds metadata for a file path, stamped with the current time.
    #[must_use]
    pub fn for_path(path: &std::path::Path) -> Self {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let doc_type = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();

        Self {
            filename,
            doc_type,
            path: path.to_string_lossy().into_owned(),
            processed_at: Utc::now(),
        }
    }
}

/// Everything extracted from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Extracted entities.
    #[serde(default)]
    pub entities: Vec<Entity>,
    /// Extracted relations.
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Source document metadata.
    pub metadata: DocumentMetadata,
}
