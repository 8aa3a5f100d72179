//! Cosine similarity over fixed-precision vectors.
//!
//! The engine's ordering convention is **similarity**, not distance: a
//! higher score is always better. Every heap, priority queue, and
//! termination test in the HNSW graph assumes this.

/// Numerical floor added to the denominator to avoid division by zero for
/// zero-length or zero-norm vectors.
const EPSILON: f32 = 1e-6;

/// Cosine similarity between `a` and `b`.
///
/// `dot(a, b) / (‖a‖·‖b‖ + ε)`. Zero-length vectors yield `0.0` rather than
/// panicking. Vectors of different lengths are zipped pairwise, so a length
/// mismatch silently truncates to the shorter vector — callers that care
/// should check [`crate::hnsw::graph::Graph`]'s recorded dimension first.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt() + EPSILON)
}
