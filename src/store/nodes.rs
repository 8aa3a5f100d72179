//! Durable id→graph-node mapping, written in chunks to bound the memory
//! used by any single transaction (§4.3 "Granular write protocol").

use crate::error::Result;
use crate::hnsw::GraphNode;
use sled::transaction::ConflictableTransactionError;

/// Transactions are chunked at this many keys to bound memory.
const MAX_KEYS_PER_TXN: usize = 500;

/// `hnsw_nodes` tree keyed by node id.
pub struct NodeStore {
    tree: sled::Tree,
}

impl NodeStore {
    /// Opens (creating if absent) the node tree on `db`.
    pub fn open(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            tree: db.open_tree("hnsw_nodes")?,
        })
    }

    /// Writes exactly the touched nodes from one insertion, in transactions
    /// of at most [`MAX_KEYS_PER_TXN`] keys each.
    pub fn write_touched(&self, nodes: &[GraphNode]) -> Result<()> {
        for chunk in nodes.chunks(MAX_KEYS_PER_TXN) {
            self.tree
                .transaction(|tx| {
                    for node in chunk {
                        let bytes = bincode::serialize(node)
                            .map_err(|e| ConflictableTransactionError::Abort(e.to_string()))?;
                        tx.insert(node.id.as_bytes(), bytes)?;
                    }
                    Ok(())
                })
                .map_err(|e: sled::transaction::TransactionError<String>| {
                    crate::error::Error::PersistenceFailure(e.to_string())
                })?;
        }
        Ok(())
    }

    /// Streams every node back into memory (load protocol, §4.3).
    pub fn load_all(&self) -> Result<Vec<GraphNode>> {
        let mut out = Vec::with_capacity(self.tree.len());
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            out.push(bincode::deserialize(&bytes)?);
        }
        Ok(out)
    }

    /// Wipes every node. Used by `clear` and by `reset_index`.
    pub fn clear(&self) -> Result<()> {
        self.tree.clear()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> (tempfile::TempDir, NodeStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let store = NodeStore::open(&db).unwrap();
        (dir, store)
    }

    #[test]
    fn write_then_load_round_trips() {
        let (_dir, store) = open_store();
        let node = GraphNode::new("a".into(), vec![1.0, 2.0], 1);
        store.write_touched(std::slice::from_ref(&node)).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![node]);
    }

    #[test]
    fn writes_chunk_at_the_transaction_boundary() {
        let (_dir, store) = open_store();
        let nodes: Vec<GraphNode> = (0..1200)
            .map(|i| GraphNode::new(format!("n{i}"), vec![i as f32], 0))
            .collect();

        store.write_touched(&nodes).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1200);
    }

    #[test]
    fn clear_wipes_all_nodes() {
        let (_dir, store) = open_store();
        store
            .write_touched(&[GraphNode::new("a".into(), vec![1.0], 0)])
            .unwrap();
        store.clear().unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }
}
