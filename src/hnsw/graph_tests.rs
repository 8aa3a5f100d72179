//! Tests for the HNSW graph — insertion invariants and search behavior.

use super::*;
use crate::hnsw::params::HnswParams;

fn small_params() -> HnswParams {
    HnswParams::new(4, 32, 32)
}

fn unit_vector(dim: usize, hot: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[hot] = 1.0;
    v
}

#[test]
fn empty_graph_search_returns_empty() {
    let graph = Graph::new(small_params());
    assert!(graph.search(&[1.0, 0.0, 0.0], 5).is_empty());
}

#[test]
fn single_point_search_returns_itself_with_score_near_one() {
    let graph = Graph::new(small_params());
    graph.insert("a".into(), vec![1.0, 0.0, 0.0]).unwrap();

    let results = graph.search(&[1.0, 0.0, 0.0], 3);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "a");
    assert!((results[0].1 - 1.0).abs() < 1e-3);
}

#[test]
fn duplicate_id_is_rejected() {
    let graph = Graph::new(small_params());
    graph.insert("a".into(), vec![1.0, 0.0]).unwrap();
    let err = graph.insert("a".into(), vec![0.0, 1.0]).unwrap_err();
    assert!(matches!(err, Error::DuplicateId(id) if id == "a"));
}

#[test]
fn dimension_mismatch_is_rejected() {
    let graph = Graph::new(small_params());
    graph.insert("a".into(), vec![1.0, 0.0, 0.0]).unwrap();
    let err = graph.insert("b".into(), vec![1.0, 0.0]).unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[test]
fn k_larger_than_corpus_returns_whole_corpus() {
    let graph = Graph::new(small_params());
    for i in 0..5 {
        graph.insert(format!("n{i}"), unit_vector(8, i)).unwrap();
    }
    let results = graph.search(&unit_vector(8, 0), 1000);
    assert_eq!(results.len(), 5);
}

#[test]
fn neighbor_lists_never_exceed_m() {
    let params = small_params();
    let m = params.m;
    let graph = Graph::new(params);

    for i in 0..64 {
        let v: Vec<f32> = (0..16)
            .map(|j| ((i * 7 + j) as f32 * 0.13).sin())
            .collect();
        graph.insert(format!("n{i}"), v).unwrap();
    }

    for node in graph.snapshot_nodes() {
        for (layer, neighbors) in node.neighbors.iter().enumerate() {
            assert!(
                neighbors.len() <= m,
                "node {} layer {} has {} neighbors (> m={})",
                node.id,
                layer,
                neighbors.len(),
                m
            );
        }
    }
}

#[test]
fn entry_point_level_is_always_max_or_above() {
    let graph = Graph::new(small_params());
    for i in 0..80 {
        let v: Vec<f32> = (0..16)
            .map(|j| ((i * 11 + j) as f32 * 0.07).cos())
            .collect();
        graph.insert(format!("n{i}"), v).unwrap();
    }

    let entry_id = graph.entry_point_id().unwrap();
    let entry_level = graph.get_node(&entry_id).unwrap().level;
    for node in graph.snapshot_nodes() {
        assert!(entry_level >= node.level);
    }
    assert_eq!(entry_level, graph.max_level());
}

#[test]
fn search_scores_are_monotonically_non_increasing() {
    let graph = Graph::new(small_params());
    for i in 0..40 {
        let v: Vec<f32> = (0..16)
            .map(|j| ((i * 3 + j) as f32 * 0.05).sin())
            .collect();
        graph.insert(format!("n{i}"), v).unwrap();
    }

    let query: Vec<f32> = (0..16).map(|j| (j as f32 * 0.05).sin()).collect();
    let results = graph.search(&query, 10);
    for w in results.windows(2) {
        assert!(w[0].1 >= w[1].1);
    }
}

#[test]
fn touched_set_always_includes_the_new_id() {
    let graph = Graph::new(small_params());
    let touched = graph.insert("a".into(), vec![1.0, 0.0]).unwrap();
    assert!(touched.contains(&"a".to_string()));

    let touched = graph.insert("b".into(), vec![0.0, 1.0]).unwrap();
    assert!(touched.contains(&"b".to_string()));
}

#[test]
fn ghost_neighbor_ids_are_skipped_not_fatal() {
    let graph = Graph::new(small_params());
    graph.insert("a".into(), vec![1.0, 0.0]).unwrap();
    graph.insert("b".into(), vec![0.0, 1.0]).unwrap();

    // Simulate a crash that left a dangling neighbor reference behind by
    // rebuilding the graph from a node set with a neighbor id that was
    // never inserted.
    let mut nodes = graph.snapshot_nodes();
    for node in &mut nodes {
        if node.id == "a" {
            node.neighbors[0].push("ghost".into());
        }
    }
    let rebuilt = Graph::from_parts(
        graph.params,
        nodes,
        graph.entry_point_id(),
        graph.max_level(),
        graph.dimension(),
    );

    let results = rebuilt.search(&[1.0, 0.0], 5);
    assert!(results.iter().all(|(id, _)| id != "ghost"));
}

#[test]
fn recall_against_brute_force_on_unit_sphere() {
    let params = HnswParams::new(16, 200, 200);
    let graph = Graph::new(params);

    let dim = 32;
    let n = 1000;
    let mut vectors = Vec::with_capacity(n);
    let mut state = 0x1234_5678_9abc_defu64;
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state as f64 / u64::MAX as f64) as f32
    };

    for i in 0..n {
        let mut v: Vec<f32> = (0..dim).map(|_| next() * 2.0 - 1.0).collect();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        vectors.push(v.clone());
        graph.insert(format!("n{i}"), v).unwrap();
    }

    let mut hits = 0usize;
    let queries = 20;
    for q in 0..queries {
        let query = &vectors[q * (n / queries)];

        let mut brute: Vec<(usize, f32)> = vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, crate::distance::cosine_similarity(query, v)))
            .collect();
        brute.sort_by(|a, b| b.1.total_cmp(&a.1));
        let brute_top10: std::collections::HashSet<String> = brute
            .iter()
            .take(10)
            .map(|(i, _)| format!("n{i}"))
            .collect();

        let approx = graph.search(query, 10);
        let approx_ids: std::collections::HashSet<String> =
            approx.into_iter().map(|(id, _)| id).collect();

        hits += brute_top10.intersection(&approx_ids).count();
    }

    let recall = hits as f64 / (queries * 10) as f64;
    assert!(recall >= 0.9, "recall@10 was {recall}, expected >= 0.9");
}
