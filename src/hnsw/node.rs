//! Graph node record.

use serde::{Deserialize, Serialize};

/// A single node in the HNSW graph.
///
/// `id` equals the owning document's id. `neighbors[L]` holds the ordered
/// (within-snapshot, not semantically meaningful) list of neighbor ids on
/// layer `L`; it is sized `level + 1`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphNode {
    /// Id shared with the owning document.
    pub id: String,
    /// Copy of the document's embedding.
    pub vector: Vec<f32>,
    /// Highest layer this node participates in.
    pub level: usize,
    /// Per-layer adjacency lists, `neighbors[L].len() <= m` (invariant 1).
    pub neighbors: Vec<Vec<String>>,
}

impl GraphNode {
    /// Creates a node with empty neighbor lists for every layer `0..=level`.
    #[must_use]
    pub fn new(id: String, vector: Vec<f32>, level: usize) -> Self {
        Self {
            id,
            vector,
            level,
            neighbors: vec![Vec::new(); level + 1],
        }
    }

    /// Neighbors on layer `layer`, or an empty slice if the node does not
    /// reach that layer.
    #[must_use]
    pub fn neighbors_at(&self, layer: usize) -> &[String] {
        self.neighbors.get(layer).map_or(&[], Vec::as_slice)
    }
}
