//! Durable scalar graph parameters and entry-point id (§4.3 "Meta").

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Persisted layout schema version (§6). Bumped whenever the on-disk shape
/// of the three trees changes incompatibly.
pub const SCHEMA_VERSION: u32 = 3;

const META_KEY: &[u8] = b"hnsw-meta";
const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Scalar index parameters and graph state, persisted under the
/// well-known key `"hnsw-meta"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMeta {
    /// `HnswParams::m`.
    pub m: usize,
    /// `HnswParams::ef_construction`.
    pub ef_construction: usize,
    /// `HnswParams::ef_search`.
    pub ef_search: usize,
    /// `HnswParams::level_multiplier`.
    pub level_multiplier: f64,
    /// Highest layer currently in use.
    pub max_level: usize,
    /// Current entry point, or `None` for an empty index.
    pub entry_point_id: Option<String>,
    /// Dimensionality recorded at the first insert, if any.
    pub dimension: Option<usize>,
}

/// `meta` tree holding a single well-known key.
pub struct MetaStore {
    tree: sled::Tree,
}

impl MetaStore {
    /// Opens (creating if absent) the meta tree on `db`, performing the
    /// schema-version check described in §6.
    pub fn open(db: &sled::Db) -> Result<Self> {
        let tree = db.open_tree("meta")?;
        Self::check_schema_version(&tree)?;
        Ok(Self { tree })
    }

    fn check_schema_version(tree: &sled::Tree) -> Result<()> {
        match tree.get(SCHEMA_VERSION_KEY)? {
            None => {
                tree.insert(SCHEMA_VERSION_KEY, &SCHEMA_VERSION.to_be_bytes())?;
                Ok(())
            }
            Some(bytes) => {
                let stored = u32::from_be_bytes(bytes.as_ref().try_into().map_err(|_| {
                    Error::Config("corrupt schema_version key".to_string())
                })?);
                if stored > SCHEMA_VERSION {
                    return Err(Error::Config(format!(
                        "on-disk schema version {stored} is newer than this build supports ({SCHEMA_VERSION})"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Reads the current metadata, or `None` if the index has never been
    /// written.
    pub fn read(&self) -> Result<Option<IndexMeta>> {
        match self.tree.get(META_KEY)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Overwrites the metadata in its own transaction boundary relative to
    /// the node writes (§4.3).
    pub fn write(&self, meta: &IndexMeta) -> Result<()> {
        let bytes = bincode::serialize(meta)?;
        self.tree.insert(META_KEY, bytes)?;
        Ok(())
    }

    /// Removes the metadata key, used by `clear` and `reset_index`.
    pub fn clear(&self) -> Result<()> {
        self.tree.remove(META_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, sled::Db, MetaStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let store = MetaStore::open(&db).unwrap();
        (dir, db, store)
    }

    fn sample_meta() -> IndexMeta {
        IndexMeta {
            m: 16,
            ef_construction: 200,
            ef_search: 200,
            level_multiplier: 1.0 / (16f64).ln(),
            max_level: 2,
            entry_point_id: Some("a".to_string()),
            dimension: Some(768),
        }
    }

    #[test]
    fn absent_meta_reads_as_none() {
        let (_dir, _db, store) = open_store();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let (_dir, _db, store) = open_store();
        let meta = sample_meta();
        store.write(&meta).unwrap();
        assert_eq!(store.read().unwrap(), Some(meta));
    }

    #[test]
    fn clear_removes_only_the_meta_key_not_the_schema_version() {
        let (_dir, db, store) = open_store();
        store.write(&sample_meta()).unwrap();
        store.clear().unwrap();
        assert!(store.read().unwrap().is_none());

        // Reopening must not re-trip the "newer schema" guard.
        assert!(MetaStore::open(&db).is_ok());
    }

    #[test]
    fn newer_on_disk_schema_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let tree = db.open_tree("meta").unwrap();
        tree.insert(SCHEMA_VERSION_KEY, &(SCHEMA_VERSION + 1).to_be_bytes())
            .unwrap();

        let err = MetaStore::open(&db).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
