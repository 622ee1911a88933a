//! Entity/relation producers.
//!
//! Extraction from natural language happens outside this crate. A
//! [`DocumentExtractor`] turns document content into a [`ProcessingResult`];
//! the bundled [`JsonResultExtractor`] reads results that an external
//! pipeline already produced.

use crate::models::{DocumentMetadata, Entity, ProcessingResult, Relation};
use crate::{Error, Result};
use serde::Deserialize;

/// Produces entities and relations for one document.
pub trait DocumentExtractor: Send + Sync {
    /// Extracts entities and relations from `content`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Extraction`] if the content cannot be processed.
    fn extract(&self, content: &str, metadata: &DocumentMetadata) -> Result<ProcessingResult>;
}

#[derive(Debug, Deserialize)]
struct ExtractedPayload {
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    relations: Vec<Relation>,
}

/// Reads pre-extracted `{"entities": [...], "relations": [...]}` JSON.
///
/// Any `metadata` object in the payload is ignored in favour of the metadata
/// describing the file being ingested. Entities and relations without a
/// `sourceDocument` inherit the document path.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResultExtractor;

impl DocumentExtractor for JsonResultExtractor {
    fn extract(&self, content: &str, metadata: &DocumentMetadata) -> Result<ProcessingResult> {
        let payload: ExtractedPayload =
            serde_json::from_str(content).map_err(|e| Error::Extraction {
                document: metadata.path.clone(),
                cause: e.to_string(),
            })?;

        let mut entities = payload.entities;
        for entity in entities.iter_mut().filter(|e| e.source_document.is_empty()) {
            entity.source_document.clone_from(&metadata.path);
        }
        let mut relations = payload.relations;
        for relation in relations.iter_mut().filter(|r| r.source_document.is_empty()) {
            relation.source_document.clone_from(&metadata.path);
        }

        tracing::debug!(
            document = %metadata.path,
            entities = entities.len(),
            relations = relations.len(),
            "Read extracted document"
        );

        Ok(ProcessingResult {
            entities,
            relations,
            metadata: metadata.clone(),
        })
    }
}
