//! The in-memory HNSW graph: hierarchical construction, neighbor selection,
//! and layer-wise greedy search.
//!
//! The graph is expressed as an arena — a single map from id to
//! [`GraphNode`] behind one lock — per the design note on graph mutation
//! through shared nodes: the graph never holds a long-lived reference into
//! another node's interior, only ids that are re-resolved through the
//! arena on every access.

use super::node::GraphNode;
use super::ordered_float::OrderedFloat;
use super::params::{HnswParams, MAX_LEVEL_CAP};
use crate::distance::cosine_similarity;
use crate::error::{Error, Result};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// Inner state guarded by a single lock: nodes, entry point, max level, and
/// the dimensionality recorded on first insert.
struct GraphInner {
    nodes: HashMap<String, GraphNode>,
    entry_point_id: Option<String>,
    max_level: usize,
    dimension: Option<usize>,
}

/// The HNSW graph.
pub struct Graph {
    /// Parameters fixed at construction.
    pub params: HnswParams,
    inner: RwLock<GraphInner>,
    rng_state: AtomicU64,
}

impl Graph {
    /// Builds an empty graph with the given parameters.
    #[must_use]
    pub fn new(params: HnswParams) -> Self {
        Self {
            params,
            inner: RwLock::new(GraphInner {
                nodes: HashMap::new(),
                entry_point_id: None,
                max_level: 0,
                dimension: None,
            }),
            rng_state: AtomicU64::new(0x5DEE_CE66_D1A4_B5B5),
        }
    }

    /// Rebuilds a graph from persisted nodes and metadata (load protocol,
    /// §4.3).
    #[must_use]
    pub fn from_parts(
        params: HnswParams,
        nodes: Vec<GraphNode>,
        entry_point_id: Option<String>,
        max_level: usize,
        dimension: Option<usize>,
    ) -> Self {
        let map = nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        Self {
            params,
            inner: RwLock::new(GraphInner {
                nodes: map,
                entry_point_id,
                max_level,
                dimension,
            }),
            rng_state: AtomicU64::new(0x5DEE_CE66_D1A4_B5B5),
        }
    }

    /// Number of nodes currently in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    /// Whether the graph holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The id of the current entry point, or `None` for an empty graph.
    #[must_use]
    pub fn entry_point_id(&self) -> Option<String> {
        self.inner.read().entry_point_id.clone()
    }

    /// The highest layer currently in use.
    #[must_use]
    pub fn max_level(&self) -> usize {
        self.inner.read().max_level
    }

    /// Dimensionality recorded at the first insert, if any.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().dimension
    }

    /// Snapshots every node currently in the graph, for persistence.
    #[must_use]
    pub fn snapshot_nodes(&self) -> Vec<GraphNode> {
        self.inner.read().nodes.values().cloned().collect()
    }

    /// Fetches a single node by id, for persistence of the touched set.
    #[must_use]
    pub fn get_node(&self, id: &str) -> Option<GraphNode> {
        self.inner.read().nodes.get(id).cloned()
    }

    /// Draws a random level: start at 0, keep incrementing while a uniform
    /// draw is below `level_multiplier`, capped at [`MAX_LEVEL_CAP`].
    fn random_level(&self) -> usize {
        let mut level = 0usize;
        while self.next_uniform() < self.params.level_multiplier && level < MAX_LEVEL_CAP {
            level += 1;
        }
        level
    }

    /// xorshift64 PRNG, mapped into `[0, 1)`.
    #[allow(clippy::cast_precision_loss)]
    fn next_uniform(&self) -> f64 {
        let mut state = self.rng_state.load(Ordering::Relaxed);
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        self.rng_state.store(state, Ordering::Relaxed);
        (state as f64) / (u64::MAX as f64)
    }

    /// Inserts `(id, vector)` into the graph, per §4.1 steps 1–6.
    ///
    /// Returns the set of touched node ids: the new id plus any node whose
    /// `neighbors` list was modified. This drives granular persistence
    /// (§4.3).
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateId`] if `id` is already present, or
    /// [`Error::DimensionMismatch`] if `vector`'s length does not match the
    /// dimension recorded at the first insert.
    pub fn insert(&self, id: String, vector: Vec<f32>) -> Result<Vec<String>> {
        {
            let inner = self.inner.read();
            if inner.nodes.contains_key(&id) {
                return Err(Error::DuplicateId(id));
            }
            if let Some(expected) = inner.dimension {
                if expected != vector.len() {
                    return Err(Error::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
            }
        }

        let level = self.random_level();
        let mut touched = vec![id.clone()];

        let mut inner = self.inner.write();
        inner.dimension.get_or_insert(vector.len());

        let existing_entry = inner.entry_point_id.clone();
        let max_level_before = inner.max_level;

        let Some(mut cur) = existing_entry else {
            // First node in the graph becomes the sole entry point.
            inner
                .nodes
                .insert(id.clone(), GraphNode::new(id.clone(), vector, level));
            inner.entry_point_id = Some(id);
            inner.max_level = level;
            return Ok(touched);
        };

        let mut cur_score = cosine_similarity(&vector, &inner.nodes[&cur].vector);

        // Greedy beam-width-1 descent from the top down to level + 1.
        for layer in (level + 1..=max_level_before).rev() {
            loop {
                let neighbors = inner.nodes[&cur].neighbors_at(layer).to_vec();
                let mut best_id: Option<String> = None;
                let mut best_score = cur_score;
                for n in &neighbors {
                    let Some(n_node) = inner.nodes.get(n) else {
                        continue; // ghost neighbor, skip
                    };
                    let score = cosine_similarity(&vector, &n_node.vector);
                    if score > best_score {
                        best_score = score;
                        best_id = Some(n.clone());
                    }
                }
                match best_id {
                    Some(id) => {
                        cur = id;
                        cur_score = best_score;
                    }
                    None => break,
                }
            }
        }

        // Insert into every layer from min(level, max_level) down to 0.
        let new_node = GraphNode::new(id.clone(), vector.clone(), level);
        inner.nodes.insert(id.clone(), new_node);

        for layer in (0..=level.min(max_level_before)).rev() {
            let candidates = Self::search_layer_locked(&inner, &vector, vec![cur.clone()], self.params.ef_construction, layer);
            let max_conn = self.params.m;
            let selected = Self::select_neighbors(&candidates, max_conn);

            if let Some(node) = inner.nodes.get_mut(&id) {
                node.neighbors[layer] = selected.clone();
            }

            for neighbor_id in &selected {
                if Self::add_bidirectional(&mut inner, neighbor_id, &id, layer, max_conn) {
                    touched.push(neighbor_id.clone());
                }
            }

            if let Some((best_id, _)) = candidates.first() {
                cur = best_id.clone();
            }
        }

        if level > max_level_before {
            inner.max_level = level;
            inner.entry_point_id = Some(id);
        }

        touched.sort();
        touched.dedup();
        Ok(touched)
    }

    /// Adds `new_id` to `neighbor_id`'s adjacency list on `layer`, pruning
    /// back to the `max_conn` highest-similarity entries if it overflows
    /// (§4.1 step 4c). Returns whether the neighbor's list actually changed.
    fn add_bidirectional(
        inner: &mut GraphInner,
        neighbor_id: &str,
        new_id: &str,
        layer: usize,
        max_conn: usize,
    ) -> bool {
        let Some(neighbor_vec) = inner.nodes.get(neighbor_id).map(|n| n.vector.clone()) else {
            return false;
        };

        let mut list = inner
            .nodes
            .get(neighbor_id)
            .map(|n| n.neighbors_at(layer).to_vec())
            .unwrap_or_default();

        if list.contains(&new_id.to_string()) {
            return false;
        }
        list.push(new_id.to_string());

        if list.len() > max_conn {
            let mut with_score: Vec<(String, f32)> = list
                .iter()
                .filter_map(|nid| {
                    inner
                        .nodes
                        .get(nid)
                        .map(|n| (nid.clone(), cosine_similarity(&neighbor_vec, &n.vector)))
                })
                .collect();
            with_score.sort_by(|a, b| b.1.total_cmp(&a.1));
            with_score.truncate(max_conn);
            list = with_score.into_iter().map(|(id, _)| id).collect();
        }

        if let Some(node) = inner.nodes.get_mut(neighbor_id) {
            while node.neighbors.len() <= layer {
                node.neighbors.push(Vec::new());
            }
            node.neighbors[layer] = list;
        }
        true
    }

    /// Best-first beam search on a single layer, beam width `ef` (§4.1
    /// `searchLayer`). Returns results sorted descending by similarity.
    fn search_layer_locked(
        inner: &GraphInner,
        query: &[f32],
        entry_points: Vec<String>,
        ef: usize,
        layer: usize,
    ) -> Vec<(String, f32)> {
        let mut visited: FxHashSet<String> = FxHashSet::default();
        let mut candidates: BinaryHeap<(OrderedFloat, String)> = BinaryHeap::new();
        let mut results: BinaryHeap<(OrderedFloat, String)> = BinaryHeap::new();

        for ep in entry_points {
            let Some(ep_node) = inner.nodes.get(&ep) else {
                continue; // ghost entry point
            };
            let score = cosine_similarity(query, &ep_node.vector);
            visited.insert(ep.clone());
            candidates.push((OrderedFloat(score), ep.clone()));
            results.push((OrderedFloat(score), ep));
        }

        while let Some((OrderedFloat(c_score), c_id)) = candidates.pop() {
            let worst = results
                .iter()
                .min_by(|a, b| a.0.cmp(&b.0))
                .map_or(f32::MIN, |r| r.0 .0);

            if c_score < worst && results.len() >= ef {
                break;
            }

            let Some(c_node) = inner.nodes.get(&c_id) else {
                continue; // ghost node, skip (§9)
            };
            let neighbors = c_node.neighbors_at(layer).to_vec();

            for n in neighbors {
                if !visited.insert(n.clone()) {
                    continue;
                }
                let Some(n_node) = inner.nodes.get(&n) else {
                    continue; // dangling neighbor id, skip and move on
                };
                let score = cosine_similarity(query, &n_node.vector);
                let worst = results
                    .iter()
                    .min_by(|a, b| a.0.cmp(&b.0))
                    .map_or(f32::MIN, |r| r.0 .0);

                if results.len() < ef || score > worst {
                    candidates.push((OrderedFloat(score), n.clone()));
                    results.push((OrderedFloat(score), n));

                    if results.len() > ef {
                        Self::evict_worst(&mut results);
                    }
                }
            }
        }

        let mut out: Vec<(String, f32)> = results.into_iter().map(|(s, id)| (id, s.0)).collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1));
        out
    }

    /// Removes the lowest-scoring element from a max-heap ordered by score.
    fn evict_worst(results: &mut BinaryHeap<(OrderedFloat, String)>) {
        if let Some(worst) = results.iter().min_by(|a, b| a.0.cmp(&b.0)).cloned() {
            let mut rest: Vec<_> = results.drain().filter(|x| x.1 != worst.1).collect();
            // `filter` drops every element equal to `worst`'s id, which is
            // at most one since ids are unique in a visited-guarded search.
            results.clear();
            results.extend(rest.drain(..));
        }
    }

    /// Baseline neighbor-selection heuristic: the `max_neighbors`
    /// highest-similarity candidates (§4.1 "Neighbor selection heuristic").
    fn select_neighbors(candidates: &[(String, f32)], max_neighbors: usize) -> Vec<String> {
        candidates
            .iter()
            .take(max_neighbors)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Top-k search (§4.1 "Top-k search").
    ///
    /// Greedily descends from `max_level` to layer 1, then runs
    /// `searchLayer` on layer 0 with `ef_search`, returning the top `k` by
    /// similarity.
    #[must_use]
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        self.search_with_ef(query, k, self.params.ef_search)
    }

    /// Like [`Graph::search`] but with an explicit `ef_search` override.
    #[must_use]
    pub fn search_with_ef(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<(String, f32)> {
        let inner = self.inner.read();
        let Some(entry) = inner.entry_point_id.clone() else {
            return Vec::new();
        };

        let mut cur = entry;
        for layer in (1..=inner.max_level).rev() {
            loop {
                let Some(cur_node) = inner.nodes.get(&cur) else {
                    break;
                };
                let mut best_score = cosine_similarity(query, &cur_node.vector);
                let mut best_id: Option<String> = None;
                for n in cur_node.neighbors_at(layer) {
                    let Some(n_node) = inner.nodes.get(n) else {
                        continue;
                    };
                    let score = cosine_similarity(query, &n_node.vector);
                    if score > best_score {
                        best_score = score;
                        best_id = Some(n.clone());
                    }
                }
                match best_id {
                    Some(id) => cur = id,
                    None => break,
                }
            }
        }

        let candidates = Self::search_layer_locked(&inner, query, vec![cur], ef_search, 0);
        candidates.into_iter().take(k).collect()
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod graph_tests;
