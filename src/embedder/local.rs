//! Generic wrapper decoupling the embedder contract from any particular
//! on-device inference stack.
//!
//! Loading weights and running inference is explicitly out of scope for
//! this crate (§1, Non-goals). `InferenceBackend` is the seam a caller
//! plugs a real model into; `LocalEmbedder` just adapts it to
//! [`Embedder`].

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;

/// A synchronous, in-process embedding backend.
///
/// Implementations are expected to be CPU- or GPU-bound and are run via
/// `spawn_blocking` by [`LocalEmbedder`] so they never stall the async
/// runtime's worker threads.
pub trait InferenceBackend: Send + Sync + 'static {
    /// Runs inference for a single piece of text, returning its vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Adapts a blocking [`InferenceBackend`] to the async [`Embedder`] trait.
pub struct LocalEmbedder<B: InferenceBackend> {
    backend: std::sync::Arc<B>,
}

impl<B: InferenceBackend> LocalEmbedder<B> {
    /// Wraps `backend` for use as an [`Embedder`].
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend: std::sync::Arc::new(backend),
        }
    }
}

#[async_trait]
impl<B: InferenceBackend> Embedder for LocalEmbedder<B> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let backend = self.backend.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || backend.embed(&text))
            .await
            .map_err(|e| crate::error::Error::EmbedderFailure(e.to_string()))?
    }
}
