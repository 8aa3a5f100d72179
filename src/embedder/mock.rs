//! Deterministic embedder used by tests and as a dependency-free default.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

/// Produces a deterministic, hash-derived unit vector for any input text.
///
/// Two calls with the same text always produce the same vector; different
/// texts produce (with overwhelming probability) different vectors. This
/// gives tests a stand-in that behaves like a real embedder — stable
/// output, well-formed unit-length vectors — without depending on a model
/// or network access.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    /// Builds a mock embedder that produces vectors of `dimension` length.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let mut hasher = FxHasher::default();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let bits = hasher.finish();
            // Map to [-1.0, 1.0).
            let v = ((bits % 2_000_001) as f32 / 1_000_000.0) - 1.0;
            out.push(v);
        }

        let norm = out.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut out {
                *v /= norm;
            }
        }
        out
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }
}
