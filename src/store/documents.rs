//! Durable key→document mapping, with a secondary ordering by `created_at`
//! to support scans without deserializing every document (§4.3).

use crate::document::Document;
use crate::error::Result;

/// `documents` tree keyed by id, plus `documents_by_created_at` keyed by a
/// `(timestamp_nanos, id)` composite so callers can scan in insertion
/// order cheaply.
pub struct DocumentStore {
    tree: sled::Tree,
    by_created_at: sled::Tree,
}

fn created_at_key(doc: &Document) -> Vec<u8> {
    let nanos = doc.created_at.timestamp_nanos_opt().unwrap_or_default();
    let mut key = Vec::with_capacity(8 + doc.id.len());
    key.extend_from_slice(&nanos.to_be_bytes());
    key.extend_from_slice(doc.id.as_bytes());
    key
}

impl DocumentStore {
    /// Opens (creating if absent) the document trees on `db`.
    pub fn open(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree("documents")?,
            by_created_at: db.open_tree("documents_by_created_at")?,
        })
    }

    /// Writes a single document, keeping the secondary time index in sync.
    ///
    /// If a document with the same id already exists, its old secondary
    /// index entry is removed first so the scan tree never accumulates
    /// stale rows (relevant to migration, which overwrites `embedding` in
    /// place while keeping `id` and `created_at`).
    pub fn put(&self, doc: &Document) -> Result<()> {
        if let Some(existing) = self.get(&doc.id)? {
            self.by_created_at.remove(created_at_key(&existing))?;
        }

        let bytes = bincode::serialize(doc)?;
        self.tree.insert(doc.id.as_bytes(), bytes)?;
        self.by_created_at.insert(created_at_key(doc), doc.id.as_bytes())?;
        Ok(())
    }

    /// Writes a batch of documents as one logical unit (`add_documents`,
    /// `index_documents`).
    pub fn put_all(&self, docs: &[Document]) -> Result<()> {
        for doc in docs {
            self.put(doc)?;
        }
        Ok(())
    }

    /// Fetches a single document by id.
    pub fn get(&self, id: &str) -> Result<Option<Document>> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Fetches many documents by id, silently dropping ids that are
    /// absent (the orphan-document / ghost-node tolerance of §4.3 — a
    /// node can outlive its document across a crash).
    pub fn get_many(&self, ids: &[String]) -> Result<Vec<Document>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get(id)? {
                out.push(doc);
            }
        }
        Ok(out)
    }

    /// Returns every stored document, in unspecified order.
    pub fn all(&self) -> Result<Vec<Document>> {
        let mut out = Vec::with_capacity(self.tree.len());
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            out.push(bincode::deserialize(&bytes)?);
        }
        Ok(out)
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the store holds no documents.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Wipes both the document tree and its secondary time index.
    pub fn clear(&self) -> Result<()> {
        self.tree.clear()?;
        self.by_created_at.clear()?;
        Ok(())
    }
}
