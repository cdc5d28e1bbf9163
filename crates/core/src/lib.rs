//! # Lodestone Core
//!
//! The "Brain" of the Lodestone system - agentic retrieval-augmented
//! question answering with a bounded self-correction loop.
//!
//! ## Architecture
//!
//! - `agents/` - One agent per node of the query state machine
//! - `orchestrator/` - The state machine itself: run state, routing, the loop
//! - `store/` - Vector store trait with Qdrant and in-memory backends
//! - `ingest` - Document chunking and embedding pipeline
//! - `llm` / `embed` - OpenAI-compatible chat and embedding clients
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lodestone_core::config::Settings;
//! use lodestone_core::orchestrator::Orchestrator;
//!
//! let settings = Settings::from_env();
//! let orchestrator = Orchestrator::new(llm, embedder, store, &settings);
//! let response = orchestrator.run("What was the Q3 revenue?").await?;
//! ```

pub mod agents;
pub mod config;
pub mod embed;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod orchestrator;
pub mod store;

pub use config::Settings;
pub use error::{LodestoneError, Result};
pub use orchestrator::state::FinalResponse;
pub use orchestrator::Orchestrator;
