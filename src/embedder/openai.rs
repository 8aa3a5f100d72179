//! OpenAI-compatible HTTP embedder (§6).

use super::Embedder;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default endpoint when `openai.endpoint` is not configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default model when `openai.model_name` is not configured.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Embeds text via `POST {endpoint}/embeddings`, following the wire
/// contract in §6: JSON body `{"input": [..], "model": ".."}`, bearer
/// auth, response `{"data": [{"embedding": [..]}, ..]}` in input order.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Builds an embedder with an explicit endpoint and model name.
    #[must_use]
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Builds an embedder using the documented defaults for endpoint and
    /// model.
    #[must_use]
    pub fn with_defaults(api_key: impl Into<String>) -> Self {
        Self::new(api_key, DEFAULT_ENDPOINT, DEFAULT_MODEL)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut results = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        results
            .pop()
            .ok_or_else(|| Error::EmbedderFailure("empty response for single embed".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.endpoint.trim_end_matches('/'));
        let body = EmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::EmbedderFailure(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::EmbedderFailure(format!(
                "openai embeddings request failed with {status}: {text}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::EmbedderFailure(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(Error::EmbedderFailure(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}
