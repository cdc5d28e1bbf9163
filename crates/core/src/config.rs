//! # Settings
//!
//! Environment-driven configuration for the whole system. Every knob has a
//! working default so a local Qdrant plus an API key is enough to start.

use serde::{Deserialize, Serialize};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Global configuration, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// OpenAI-compatible chat completions endpoint (Perplexity by default)
    pub llm_base_url: String,
    /// API key for the LLM endpoint
    pub llm_api_key: Option<String>,
    /// Model used for generation and analysis calls
    pub chat_model: String,
    /// Model used for reflection calls
    pub reasoning_model: String,

    /// OpenAI-compatible embeddings endpoint
    pub embedding_base_url: String,
    /// API key for the embeddings endpoint (falls back to `llm_api_key`)
    pub embedding_api_key: Option<String>,
    /// Embedding model name
    pub embedding_model: String,
    /// Expected embedding dimension
    pub vector_dimension: usize,

    /// Qdrant base URL
    pub qdrant_url: String,
    /// Optional Qdrant API key
    pub qdrant_api_key: Option<String>,
    /// Qdrant collection name
    pub qdrant_collection_name: String,

    /// Chunks retrieved per search
    pub top_k: usize,
    /// Ingestion chunk size in words
    pub chunk_size: usize,
    /// Ingestion chunk overlap in words
    pub chunk_overlap: usize,

    /// Maximum ExecuteRag passes before forced finalization
    pub max_retries: u32,
    /// Skip reflection when generation confidence exceeds this and sources exist
    pub fast_path_confidence: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_base_url: "https://api.perplexity.ai".to_string(),
            llm_api_key: None,
            chat_model: "sonar-pro".to_string(),
            reasoning_model: "sonar-reasoning-pro".to_string(),
            embedding_base_url: "http://localhost:11434/v1".to_string(),
            embedding_api_key: None,
            embedding_model: "all-minilm".to_string(),
            vector_dimension: 384,
            qdrant_url: "http://localhost:6333".to_string(),
            qdrant_api_key: None,
            qdrant_collection_name: "lodestone_documents".to_string(),
            top_k: 10,
            chunk_size: 200,
            chunk_overlap: 20,
            max_retries: 3,
            fast_path_confidence: 0.7,
        }
    }
}

impl Settings {
    /// Load settings from environment variables, using defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            llm_base_url: env_or("LLM_BASE_URL", &defaults.llm_base_url),
            llm_api_key: std::env::var("PERPLEXITY_API_KEY")
                .or_else(|_| std::env::var("LLM_API_KEY"))
                .ok(),
            chat_model: env_or("CHAT_MODEL", &defaults.chat_model),
            reasoning_model: env_or("REASONING_MODEL", &defaults.reasoning_model),
            embedding_base_url: env_or("EMBEDDING_BASE_URL", &defaults.embedding_base_url),
            embedding_api_key: std::env::var("EMBEDDING_API_KEY").ok(),
            embedding_model: env_or("EMBEDDING_MODEL", &defaults.embedding_model),
            vector_dimension: env_parse("VECTOR_DIMENSION", defaults.vector_dimension),
            qdrant_url: env_or("QDRANT_URL", &defaults.qdrant_url),
            qdrant_api_key: std::env::var("QDRANT_API_KEY").ok(),
            qdrant_collection_name: env_or(
                "QDRANT_COLLECTION_NAME",
                &defaults.qdrant_collection_name,
            ),
            top_k: env_parse("RETRIEVAL_TOP_K", defaults.top_k),
            chunk_size: env_parse("CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_parse("CHUNK_OVERLAP", defaults.chunk_overlap),
            max_retries: env_parse("MAX_RETRIES", defaults.max_retries),
            fast_path_confidence: env_parse("FAST_PATH_CONFIDENCE", defaults.fast_path_confidence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_retries, 3);
        assert!((settings.fast_path_confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(settings.vector_dimension, 384);
    }
}
