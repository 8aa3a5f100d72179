//! HNSW graph parameters.

use serde::{Deserialize, Serialize};

/// Maximum layer a node may be assigned, regardless of how the random draw
/// turns out. Caps pathological towers (§4.1).
pub const MAX_LEVEL_CAP: usize = 16;

/// Graph-wide parameters, fixed at index creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HnswParams {
    /// Target maximum out-degree per node per layer.
    pub m: usize,
    /// Beam width used while inserting.
    pub ef_construction: usize,
    /// Beam width used while searching, unless overridden per-call.
    pub ef_search: usize,
    /// `1 / ln(m)`, used to draw a node's level.
    pub level_multiplier: f64,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self::new(16, 200, 200)
    }
}

impl HnswParams {
    /// Builds parameters with an explicit `m`, deriving `level_multiplier`.
    #[must_use]
    pub fn new(m: usize, ef_construction: usize, ef_search: usize) -> Self {
        Self {
            m,
            ef_construction,
            ef_search,
            level_multiplier: 1.0 / (m as f64).ln(),
        }
    }
}
