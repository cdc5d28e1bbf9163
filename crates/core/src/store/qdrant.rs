//! Qdrant adapter over the REST API.
//!
//! Covers exactly the operations the system needs: ensure-collection on
//! startup, batched upsert, filtered similarity search, delete-by-source
//! with a count, collection stats, and a payload scroll for the document
//! listing.

use super::{DocumentSummary, RetrievedChunk, StoreStats, StoredChunk, VectorStore};
use crate::config::Settings;
use crate::error::{LodestoneError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

pub struct QdrantStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    vector_dimension: usize,
}

impl QdrantStore {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LodestoneError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.qdrant_url.trim_end_matches('/').to_string(),
            api_key: settings.qdrant_api_key.clone(),
            collection: settings.qdrant_collection_name.clone(),
            vector_dimension: settings.vector_dimension,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Value> {
        let response = builder
            .send()
            .await
            .map_err(|e| LodestoneError::Store(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LodestoneError::Store(format!("HTTP {status}: {text}")));
        }
        response
            .json()
            .await
            .map_err(|e| LodestoneError::Store(format!("invalid JSON: {e}")))
    }

    /// Create the collection if it does not exist yet.
    pub async fn ensure_collection(&self) -> Result<()> {
        let path = format!("/collections/{}", self.collection);
        let exists = self
            .request(reqwest::Method::GET, &path)
            .send()
            .await
            .map_err(|e| LodestoneError::Store(e.to_string()))?
            .status()
            .is_success();

        if exists {
            tracing::info!(collection = %self.collection, "using existing Qdrant collection");
            return Ok(());
        }

        let body = json!({
            "vectors": { "size": self.vector_dimension, "distance": "Cosine" }
        });
        self.send(self.request(reqwest::Method::PUT, &path).json(&body))
            .await?;
        tracing::info!(collection = %self.collection, "created Qdrant collection");
        Ok(())
    }

    fn source_filter(source: &str) -> Value {
        json!({ "must": [{ "key": "source", "match": { "value": source } }] })
    }

    async fn count_by_source(&self, source: &str) -> Result<u64> {
        let path = format!("/collections/{}/points/count", self.collection);
        let body = json!({ "filter": Self::source_filter(source), "exact": true });
        let value = self
            .send(self.request(reqwest::Method::POST, &path).json(&body))
            .await?;
        Ok(value["result"]["count"].as_u64().unwrap_or(0))
    }

    async fn scroll_payloads(&self) -> Result<Vec<Value>> {
        let path = format!("/collections/{}/points/scroll", self.collection);
        let body = json!({ "limit": 1000, "with_payload": true, "with_vector": false });
        let value = self
            .send(self.request(reqwest::Method::POST, &path).json(&body))
            .await?;
        Ok(value["result"]["points"]
            .as_array()
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn upsert(&self, chunks: Vec<StoredChunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let points: Vec<Value> = chunks
            .iter()
            .map(|chunk| {
                json!({
                    "id": chunk.id,
                    "vector": chunk.embedding,
                    "payload": {
                        "text": chunk.text,
                        "source": chunk.source,
                        "document_type": chunk.document_type,
                        "chunk_index": chunk.chunk_index,
                        "total_chunks": chunk.total_chunks,
                        "created_at": chrono::Utc::now().to_rfc3339(),
                    }
                })
            })
            .collect();

        let path = format!("/collections/{}/points?wait=true", self.collection);
        self.send(
            self.request(reqwest::Method::PUT, &path)
                .json(&json!({ "points": points })),
        )
        .await?;
        tracing::info!(count = chunks.len(), "stored chunks in Qdrant");
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>> {
        let path = format!("/collections/{}/points/search", self.collection);
        let mut body = json!({
            "vector": embedding,
            "limit": top_k,
            "with_payload": true,
        });
        if let Some(source) = source_filter {
            body["filter"] = Self::source_filter(source);
        }

        let value = self
            .send(self.request(reqwest::Method::POST, &path).json(&body))
            .await?;

        let results = value["result"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|point| RetrievedChunk {
                id: point["id"].as_str().map(String::from).unwrap_or_else(|| {
                    point["id"].as_u64().map(|n| n.to_string()).unwrap_or_default()
                }),
                text: point["payload"]["text"].as_str().unwrap_or("").to_string(),
                source: point["payload"]["source"]
                    .as_str()
                    .unwrap_or("unknown")
                    .to_string(),
                chunk_index: point["payload"]["chunk_index"].as_u64().unwrap_or(0) as usize,
                score: point["score"].as_f64().unwrap_or(0.0) as f32,
            })
            .collect();

        Ok(results)
    }

    async fn delete_by_source(&self, source: &str) -> Result<u64> {
        let count = self.count_by_source(source).await?;
        if count == 0 {
            return Ok(0);
        }

        let path = format!("/collections/{}/points/delete?wait=true", self.collection);
        let body = json!({ "filter": Self::source_filter(source) });
        self.send(self.request(reqwest::Method::POST, &path).json(&body))
            .await?;
        tracing::info!(source, count, "deleted chunks from Qdrant");
        Ok(count)
    }

    async fn health(&self) -> bool {
        self.request(reqwest::Method::GET, "/collections")
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let path = format!("/collections/{}", self.collection);
        let value = self.send(self.request(reqwest::Method::GET, &path)).await?;
        let vector_count = value["result"]["points_count"].as_u64().unwrap_or(0);

        let documents = self.list_documents().await?;
        Ok(StoreStats {
            vector_count,
            source_count: documents.len() as u64,
        })
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let points = self.scroll_payloads().await?;
        let mut by_source: BTreeMap<String, DocumentSummary> = BTreeMap::new();
        for point in points {
            let source = point["payload"]["source"]
                .as_str()
                .unwrap_or("unknown")
                .to_string();
            let document_type = point["payload"]["document_type"]
                .as_str()
                .unwrap_or("generic")
                .to_string();
            by_source
                .entry(source.clone())
                .and_modify(|d| d.chunk_count += 1)
                .or_insert(DocumentSummary {
                    source,
                    document_type,
                    chunk_count: 1,
                });
        }
        Ok(by_source.into_values().collect())
    }
}
