//! The embedder capability: text in, vector out.
//!
//! The embedding function itself — model loading, tokenization, on-device
//! inference — is out of scope for this crate (§1). What lives here is the
//! contract the indexer depends on, plus the two concrete implementations
//! whose wire shape the specification pins down: an OpenAI-compatible HTTP
//! backend and a deterministic mock used by tests and as a zero-dependency
//! stand-in.

mod local;
mod mock;
mod openai;

pub use local::{InferenceBackend, LocalEmbedder};
pub use mock::MockEmbedder;
pub use openai::{OpenAiEmbedder, DEFAULT_ENDPOINT, DEFAULT_MODEL};

use crate::error::Result;
use async_trait::async_trait;

/// A capability that maps text to a fixed-size vector.
///
/// Implementations must return vectors in input order for `embed_batch`,
/// and must not silently swallow per-item failures — one bad input fails
/// the whole batch, so the indexer can honor "on embedder failure, nothing
/// is persisted" (§4.4).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a single piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds a batch of texts, returning vectors in input order.
    ///
    /// The default implementation calls [`Embedder::embed`] once per item;
    /// implementations with a genuine batch API (e.g. a single HTTP call
    /// for the whole batch) should override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
