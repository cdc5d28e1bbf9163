//! # Ingestion Pipeline
//!
//! Upload glue: word-window chunking with overlap, embedding, and upsert
//! into the vector store, reporting per-file status. Only UTF-8 text is
//! accepted; format parsing is out of scope.

use crate::embed::Embedder;
use crate::store::{StoredChunk, VectorStore};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One uploaded file, already decoded to text.
#[derive(Debug, Clone)]
pub struct IngestFile {
    pub name: String,
    pub content: String,
    pub document_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStatus {
    pub source: String,
    pub chunks: usize,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub chunks_written: usize,
    pub per_file_status: Vec<FileStatus>,
}

pub struct IngestionPipeline {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    /// Chunk, embed and store a batch of files. A failure in one file does
    /// not abort the others; it is recorded in that file's status.
    pub async fn ingest(&self, files: Vec<IngestFile>) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for file in files {
            match self.ingest_one(&file).await {
                Ok(written) => {
                    report.chunks_written += written;
                    report.per_file_status.push(FileStatus {
                        source: file.name,
                        chunks: written,
                        status: "ingested".to_string(),
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(source = %file.name, error = %e, "file ingestion failed");
                    report.per_file_status.push(FileStatus {
                        source: file.name,
                        chunks: 0,
                        status: "failed".to_string(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        tracing::info!(chunks = report.chunks_written, "ingestion batch complete");
        Ok(report)
    }

    async fn ingest_one(&self, file: &IngestFile) -> Result<usize> {
        let pieces = chunk_words(&file.content, self.chunk_size, self.chunk_overlap);
        let total = pieces.len();

        let mut chunks = Vec::with_capacity(total);
        for (index, text) in pieces.into_iter().enumerate() {
            let embedding = self.embedder.embed(&text).await?;
            chunks.push(StoredChunk {
                id: Uuid::new_v4().to_string(),
                text,
                source: file.name.clone(),
                document_type: file.document_type.clone(),
                chunk_index: index,
                total_chunks: total,
                embedding,
            });
        }

        self.store.upsert(chunks).await?;
        Ok(total)
    }
}

/// Split text into word windows of `size` with `overlap` words carried over.
pub fn chunk_words(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as CoreResult;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, text: &str) -> CoreResult<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[test]
    fn test_chunk_words_no_overlap() {
        let chunks = chunk_words("a b c d e f", 2, 0);
        assert_eq!(chunks, vec!["a b", "c d", "e f"]);
    }

    #[test]
    fn test_chunk_words_with_overlap() {
        let chunks = chunk_words("a b c d e", 3, 1);
        assert_eq!(chunks, vec!["a b c", "c d e"]);
    }

    #[test]
    fn test_chunk_words_short_input() {
        let chunks = chunk_words("only two", 100, 10);
        assert_eq!(chunks, vec!["only two"]);
    }

    #[test]
    fn test_chunk_words_empty() {
        assert!(chunk_words("   ", 10, 2).is_empty());
    }

    #[tokio::test]
    async fn test_ingest_reports_per_file() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = IngestionPipeline::new(Arc::new(FixedEmbedder), store.clone(), 3, 0);

        let report = pipeline
            .ingest(vec![
                IngestFile {
                    name: "notes.txt".to_string(),
                    content: "one two three four five".to_string(),
                    document_type: "generic".to_string(),
                },
                IngestFile {
                    name: "empty.txt".to_string(),
                    content: String::new(),
                    document_type: "generic".to_string(),
                },
            ])
            .await
            .unwrap();

        assert_eq!(report.chunks_written, 2);
        assert_eq!(report.per_file_status.len(), 2);
        assert_eq!(report.per_file_status[0].status, "ingested");
        assert_eq!(report.per_file_status[1].chunks, 0);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.vector_count, 2);
        assert_eq!(stats.source_count, 1);
    }
}
