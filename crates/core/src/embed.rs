//! # Embeddings
//!
//! Query and chunk embedding behind a trait so tests can substitute a
//! deterministic embedder. The HTTP implementation targets an
//! OpenAI-compatible `/embeddings` endpoint.

use crate::config::Settings;
use crate::error::{LodestoneError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Client for an OpenAI-compatible embeddings endpoint.
pub struct HttpEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LodestoneError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.embedding_base_url.trim_end_matches('/').to_string(),
            api_key: settings
                .embedding_api_key
                .clone()
                .or_else(|| settings.llm_api_key.clone()),
            model: settings.embedding_model.clone(),
            dimension: settings.vector_dimension,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = json!({ "model": self.model, "input": [text] });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LodestoneError::Embedding(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LodestoneError::Embedding(format!("HTTP {status}: {text}")));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| LodestoneError::Embedding(format!("invalid JSON: {e}")))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| LodestoneError::Embedding("endpoint returned no vectors".to_string()))?;

        if vector.len() != self.dimension {
            return Err(LodestoneError::Embedding(format!(
                "vector dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }

        Ok(vector)
    }
}
