//! Document data structure stored alongside the graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// A document indexed by the graph.
///
/// `embedding` is stored redundantly with the graph node's `vector` so that
/// migration can re-embed text without needing to touch the graph until the
/// new batch is ready to be re-inserted (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Opaque unique identifier, assigned at insertion, immutable.
    pub id: String,
    /// Original source text.
    pub text: String,
    /// Opaque metadata, untouched by the core.
    #[serde(default)]
    pub metadata: HashMap<String, JsonValue>,
    /// The vector actually indexed.
    pub embedding: Vec<f32>,
    /// Wall-clock timestamp at first insertion, preserved across migrations.
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Builds a fresh document with a new id and the current timestamp.
    #[must_use]
    pub fn new(text: String, metadata: HashMap<String, JsonValue>, embedding: Vec<f32>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text,
            metadata,
            embedding,
            created_at: Utc::now(),
        }
    }

    /// Returns a copy of this document with a new embedding, preserving id,
    /// text, metadata, and `created_at` — the shape migration needs (§4.5).
    #[must_use]
    pub fn with_embedding(&self, embedding: Vec<f32>) -> Self {
        Self {
            id: self.id.clone(),
            text: self.text.clone(),
            metadata: self.metadata.clone(),
            embedding,
            created_at: self.created_at,
        }
    }
}

/// Input for `Indexer::add_document`/`add_documents`: text plus optional
/// metadata, not yet embedded or timestamped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    /// Source text to embed and index.
    pub text: String,
    /// Optional metadata to attach to the resulting document.
    #[serde(default)]
    pub metadata: HashMap<String, JsonValue>,
}

impl NewDocument {
    /// Convenience constructor for plain-text inserts with no metadata.
    #[must_use]
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: HashMap::new(),
        }
    }
}

/// A search hit: the matching document and its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matching document.
    pub document: Document,
    /// Cosine similarity score; higher is better.
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_gets_a_fresh_uuid() {
        let a = Document::new("hello".into(), HashMap::new(), vec![1.0]);
        let b = Document::new("hello".into(), HashMap::new(), vec![1.0]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn with_embedding_preserves_identity_fields() {
        let doc = Document::new("hello".into(), HashMap::new(), vec![1.0, 2.0]);
        let migrated = doc.with_embedding(vec![9.0, 9.0, 9.0]);

        assert_eq!(migrated.id, doc.id);
        assert_eq!(migrated.text, doc.text);
        assert_eq!(migrated.created_at, doc.created_at);
        assert_eq!(migrated.embedding, vec![9.0, 9.0, 9.0]);
    }
}
