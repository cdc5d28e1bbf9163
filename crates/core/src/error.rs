//! # Error Taxonomy
//!
//! One variant per recoverable failure class. Advisory failures (analysis,
//! reflection) are absorbed inside the agents with conservative defaults;
//! retrieval-side failures degrade the generation output; only an unreachable
//! language model escapes `Orchestrator::run`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LodestoneError {
    /// The language model endpoint could not be reached or rejected the call.
    #[error("language model request failed: {0}")]
    LlmUnavailable(String),

    /// The model responded, but not with anything we could use.
    #[error("language model returned malformed output: {0}")]
    MalformedOutput(String),

    /// The embedding endpoint failed or returned a bad vector.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// A vector store operation failed.
    #[error("vector store request failed: {0}")]
    Store(String),

    /// Bad or missing configuration (e.g. no API key).
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LodestoneError>;
