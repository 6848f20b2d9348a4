//! Vector-store entries and search results.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MemoryError;

/// A stored embedding plus the content and metadata it was derived from.
///
/// `id` equals the source message id, unless this entry is a
/// retrieval-annotated copy produced by the semantic retriever, in which
/// case it takes the form `<origId>_semantic`. All entries within a given
/// store share the same embedding `dimension`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntry {
    /// Identifier, see type-level docs for the `_semantic` suffix rule.
    pub id: String,
    /// The embedding vector. Every component must be finite.
    pub embedding: Vec<f32>,
    /// The text this embedding was derived from.
    pub content: String,
    /// Metadata; must contain a `"role"` key.
    pub metadata: HashMap<String, Value>,
    /// When this entry's source message was created.
    pub timestamp: DateTime<Utc>,
}

impl VectorEntry {
    /// Construct a new entry, validating the embedding and the metadata
    /// invariant (`role` key present).
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Validation`] if `id` is empty, `embedding`
    /// contains a non-finite value, or `metadata` lacks a `role` key.
    pub fn new(
        id: impl Into<String>,
        embedding: Vec<f32>,
        content: impl Into<String>,
        metadata: HashMap<String, Value>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, MemoryError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(MemoryError::validation("vector entry id must not be empty"));
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(MemoryError::validation(
                "embedding must contain only finite values",
            ));
        }
        if !metadata.contains_key("role") {
            return Err(MemoryError::validation(
                "vector entry metadata must contain a \"role\" key",
            ));
        }
        Ok(Self {
            id,
            embedding,
            content: content.into(),
            metadata,
            timestamp,
        })
    }

    /// The `<id>_semantic` form used for retrieval-annotated copies.
    #[must_use]
    pub fn semantic_id(original_id: &str) -> String {
        format!("{original_id}_semantic")
    }
}

/// One vector-store search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilaritySearchResult {
    /// The matched entry.
    pub entry: VectorEntry,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f32,
}

/// The on-disk row shape for a persistent vector-store backend (spec's
/// normative minimum layout). The in-memory store never materializes this
/// type; it exists so a future SQL-backed store has a concrete target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistableVectorEntry {
    /// Primary key.
    pub id: String,
    /// Little-endian float32 embedding bytes.
    pub embedding: Vec<u8>,
    /// Embedding dimension, stored alongside the blob for cheap validation.
    pub dimension: usize,
    /// The source text.
    pub content: String,
    /// The `role` metadata value, broken out as its own column.
    pub role: String,
    /// The remaining metadata, serialized as a JSON object.
    pub metadata_json: String,
    /// ISO-8601 timestamp.
    pub timestamp: String,
}

impl PersistableVectorEntry {
    /// Flatten a [`VectorEntry`] into its persistable row form.
    #[must_use]
    pub fn to_row(entry: &VectorEntry) -> Self {
        let mut metadata = entry.metadata.clone();
        let role = metadata
            .remove("role")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let embedding = entry
            .embedding
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect();
        Self {
            id: entry.id.clone(),
            embedding,
            dimension: entry.embedding.len(),
            content: entry.content.clone(),
            role,
            metadata_json: serde_json::to_string(&metadata).unwrap_or_else(|_| "{}".to_string()),
            timestamp: entry.timestamp.to_rfc3339(),
        }
    }

    /// Reconstruct a [`VectorEntry`] from a persisted row.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Storage`] if the embedding blob length isn't
    /// a multiple of four bytes, the metadata JSON is malformed, or the
    /// timestamp cannot be parsed.
    pub fn to_entry(&self) -> Result<VectorEntry, MemoryError> {
        if self.embedding.len() % 4 != 0 {
            return Err(MemoryError::Storage(
                "embedding blob length is not a multiple of 4 bytes".into(),
            ));
        }
        let embedding = self
            .embedding
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let mut metadata: HashMap<String, Value> = serde_json::from_str(&self.metadata_json)
            .map_err(|e| MemoryError::Storage(Box::new(e)))?;
        metadata.insert("role".to_string(), Value::String(self.role.clone()));
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| MemoryError::Storage(Box::new(e)))?
            .with_timezone(&Utc);
        Ok(VectorEntry {
            id: self.id.clone(),
            embedding,
            content: self.content.clone(),
            metadata,
            timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> HashMap<String, Value> {
        let mut m = HashMap::new();
        m.insert("role".to_string(), Value::String("user".to_string()));
        m
    }

    #[test]
    fn new_rejects_missing_role_metadata() {
        let err = VectorEntry::new("id1", vec![0.1], "hi", HashMap::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));
    }

    #[test]
    fn new_rejects_non_finite_embedding() {
        let err = VectorEntry::new(
            "id1",
            vec![f32::NAN],
            "hi",
            sample_metadata(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));
    }

    #[test]
    fn semantic_id_suffix() {
        assert_eq!(VectorEntry::semantic_id("msg_1_0"), "msg_1_0_semantic");
    }

    #[test]
    fn persistable_round_trip_is_bit_identical() {
        let entry = VectorEntry::new(
            "id1",
            vec![0.1, -0.5, 1.0],
            "hello",
            sample_metadata(),
            Utc::now(),
        )
        .unwrap();
        let row = PersistableVectorEntry::to_row(&entry);
        let back = row.to_entry().unwrap();
        assert_eq!(back.id, entry.id);
        assert_eq!(back.embedding, entry.embedding);
        assert_eq!(back.content, entry.content);
        assert_eq!(back.metadata.get("role"), entry.metadata.get("role"));
    }
}
