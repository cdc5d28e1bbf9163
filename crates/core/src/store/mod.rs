//! # Vector Store
//!
//! Storage seam for document chunks. Two implementations: Qdrant over its
//! REST API for production, and an in-memory cosine store for tests and
//! keyless demo runs.

pub mod memory;
pub mod qdrant;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryStore;
pub use qdrant::QdrantStore;

/// A chunk ready to be written, embedding included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub document_type: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub embedding: Vec<f32>,
}

/// A chunk returned from a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub chunk_index: usize,
    pub score: f32,
}

/// Collection-level statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub vector_count: u64,
    pub source_count: u64,
}

/// One distinct uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub source: String,
    pub document_type: String,
    pub chunk_count: u64,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Write chunks, replacing any with the same id.
    async fn upsert(&self, chunks: Vec<StoredChunk>) -> Result<()>;

    /// Top-k similarity search, optionally restricted to one source.
    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Delete every chunk belonging to a source. Returns the deleted count.
    async fn delete_by_source(&self, source: &str) -> Result<u64>;

    /// Whether the backend is reachable.
    async fn health(&self) -> bool;

    /// Vector and source counts.
    async fn stats(&self) -> Result<StoreStats>;

    /// Distinct sources with their chunk counts.
    async fn list_documents(&self) -> Result<Vec<DocumentSummary>>;
}
