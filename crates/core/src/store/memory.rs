//! In-memory cosine-similarity store. Backs the test suite and lets the
//! server run without a Qdrant instance.

use super::{DocumentSummary, RetrievedChunk, StoreStats, StoredChunk, VectorStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, new_chunks: Vec<StoredChunk>) -> Result<()> {
        let mut chunks = self.chunks.write().await;
        for chunk in new_chunks {
            if let Some(existing) = chunks.iter_mut().find(|c| c.id == chunk.id) {
                *existing = chunk;
            } else {
                chunks.push(chunk);
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        source_filter: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>> {
        let chunks = self.chunks.read().await;
        let mut scored: Vec<RetrievedChunk> = chunks
            .iter()
            .filter(|c| source_filter.map_or(true, |s| c.source == s))
            .map(|c| RetrievedChunk {
                id: c.id.clone(),
                text: c.text.clone(),
                source: c.source.clone(),
                chunk_index: c.chunk_index,
                score: cosine_similarity(embedding, &c.embedding),
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_by_source(&self, source: &str) -> Result<u64> {
        let mut chunks = self.chunks.write().await;
        let before = chunks.len();
        chunks.retain(|c| c.source != source);
        Ok((before - chunks.len()) as u64)
    }

    async fn health(&self) -> bool {
        true
    }

    async fn stats(&self) -> Result<StoreStats> {
        let chunks = self.chunks.read().await;
        let sources: std::collections::BTreeSet<&str> =
            chunks.iter().map(|c| c.source.as_str()).collect();
        Ok(StoreStats {
            vector_count: chunks.len() as u64,
            source_count: sources.len() as u64,
        })
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let chunks = self.chunks.read().await;
        let mut by_source: BTreeMap<String, DocumentSummary> = BTreeMap::new();
        for chunk in chunks.iter() {
            by_source
                .entry(chunk.source.clone())
                .and_modify(|d| d.chunk_count += 1)
                .or_insert_with(|| DocumentSummary {
                    source: chunk.source.clone(),
                    document_type: chunk.document_type.clone(),
                    chunk_count: 1,
                });
        }
        Ok(by_source.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, source: &str, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk {
            id: id.to_string(),
            text: format!("text for {id}"),
            source: source.to_string(),
            document_type: "generic".to_string(),
            chunk_index: 0,
            total_chunks: 1,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = InMemoryStore::new();
        store
            .upsert(vec![
                chunk("a", "doc1.txt", vec![1.0, 0.0]),
                chunk("b", "doc2.txt", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.1], 2, None).await.unwrap();
        assert_eq!(results[0].id, "a");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_source_filter() {
        let store = InMemoryStore::new();
        store
            .upsert(vec![
                chunk("a", "doc1.txt", vec![1.0, 0.0]),
                chunk("b", "doc2.txt", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 10, Some("doc2.txt")).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source, "doc2.txt");
    }

    #[tokio::test]
    async fn test_delete_by_source_and_stats() {
        let store = InMemoryStore::new();
        store
            .upsert(vec![
                chunk("a", "doc1.txt", vec![1.0, 0.0]),
                chunk("b", "doc1.txt", vec![0.5, 0.5]),
                chunk("c", "doc2.txt", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let deleted = store.delete_by_source("doc1.txt").await.unwrap();
        assert_eq!(deleted, 2);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.vector_count, 1);
        assert_eq!(stats.source_count, 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let store = InMemoryStore::new();
        store
            .upsert(vec![chunk("a", "doc1.txt", vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .upsert(vec![chunk("a", "doc1.txt", vec![0.0, 1.0])])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.vector_count, 1);
    }

    #[tokio::test]
    async fn test_list_documents() {
        let store = InMemoryStore::new();
        store
            .upsert(vec![
                chunk("a", "doc1.txt", vec![1.0, 0.0]),
                chunk("b", "doc1.txt", vec![0.5, 0.5]),
                chunk("c", "doc2.txt", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let docs = store.list_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        let doc1 = docs.iter().find(|d| d.source == "doc1.txt").unwrap();
        assert_eq!(doc1.chunk_count, 2);
    }
}
