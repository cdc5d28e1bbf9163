//! # Agents
//!
//! One agent per node of the query state machine. Each agent wraps a single
//! LLM concern and writes its structured output into the shared `RunState`.

pub mod analyzer;
pub mod clarifier;
pub mod enricher;
pub mod prompts;
pub mod reflector;
pub mod retriever;

pub use analyzer::QueryAnalyzer;
pub use clarifier::ClarificationSimulator;
pub use enricher::{derive_suggestions, EnrichmentSynthesizer};
pub use reflector::CompletenessReflector;
pub use retriever::RetrievalAnswerer;
