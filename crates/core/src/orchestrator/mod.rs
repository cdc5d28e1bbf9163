//! # Orchestrator
//!
//! The query state machine: an explicit loop over `Node` with transitions
//! supplied by the pure predicates in [`routing`]. Every run terminates in
//! `GenerateFinalAnswer` because the retry counter only moves up and the
//! bound check has top priority in routing.

pub mod routing;
pub mod state;

use crate::agents::{
    derive_suggestions, ClarificationSimulator, CompletenessReflector, EnrichmentSynthesizer,
    QueryAnalyzer, RetrievalAnswerer,
};
use crate::config::Settings;
use crate::embed::Embedder;
use crate::error::Result;
use crate::llm::ChatLlm;
use crate::store::VectorStore;
use routing::Node;
use state::{FinalResponse, RunState};
use std::sync::Arc;

/// Knobs of the state machine itself, separated from transport settings.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_retries: u32,
    pub fast_path_confidence: f32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            fast_path_confidence: 0.7,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_retries: settings.max_retries,
            fast_path_confidence: settings.fast_path_confidence,
        }
    }
}

pub struct Orchestrator {
    analyzer: QueryAnalyzer,
    retriever: RetrievalAnswerer,
    reflector: CompletenessReflector,
    clarifier: ClarificationSimulator,
    enricher: EnrichmentSynthesizer,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn ChatLlm>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        settings: &Settings,
    ) -> Self {
        Self {
            analyzer: QueryAnalyzer::new(llm.clone()),
            retriever: RetrievalAnswerer::new(llm.clone(), embedder, store, settings.top_k),
            reflector: CompletenessReflector::new(llm.clone()),
            clarifier: ClarificationSimulator::new(llm.clone()),
            enricher: EnrichmentSynthesizer::new(llm),
            config: OrchestratorConfig::from_settings(settings),
        }
    }

    /// Execute one query to completion. The only error that escapes is an
    /// unreachable language model during generation; everything else degrades
    /// inside the loop and still produces a `FinalResponse`.
    pub async fn run(&self, query: &str) -> Result<FinalResponse> {
        let mut run_state = RunState::new(query);
        let mut node = Node::AnalyzeQuery;

        loop {
            tracing::debug!(?node, retry = run_state.retry_count, "entering node");
            match node {
                Node::AnalyzeQuery => {
                    self.analyzer.run(&mut run_state).await;
                    node = Node::ExecuteRag;
                }
                Node::ExecuteRag => {
                    self.retriever.run(&mut run_state).await?;
                    node = routing::after_rag(&run_state, &self.config);
                }
                Node::ReflectOnOutput => {
                    self.reflector.run(&mut run_state).await;
                    node = routing::after_reflection(&run_state, &self.config);
                }
                Node::HandleAmbiguity => {
                    self.clarifier.run(&mut run_state).await;
                    node = Node::ExecuteRag;
                }
                Node::EnrichData => {
                    self.enricher.run(&mut run_state).await;
                    node = Node::ExecuteRag;
                }
                Node::GenerateFinalAnswer => {
                    return Ok(finalize(&mut run_state));
                }
            }
        }
    }
}

/// Assemble the wire response from the terminal state. Writes the composed
/// answer into `final_answer`, the state's only write at finalization.
fn finalize(state: &mut RunState) -> FinalResponse {
    state.trace("Generating final answer");
    state.enrichment_suggestions = derive_suggestions(state);

    let output = state.generation_output.clone().unwrap_or_default();

    let mut answer = output.answer;
    if let Some(enriched) = state.enriched_data.as_deref().filter(|e| !e.is_empty()) {
        answer.push_str("\n\nAdditional enriched data:\n");
        answer.push_str(enriched);
    }
    state.final_answer = Some(answer.clone());

    // Reflection's verdict supersedes the generation heuristic when it ran;
    // on the fast path the generation confidence stands and the answer
    // counts as complete.
    let (confidence, is_complete, missing_info) = match &state.reflection_result {
        Some(verdict) => (
            verdict.confidence_score,
            verdict.is_complete,
            verdict.missing_elements.clone(),
        ),
        None => (output.confidence, true, Vec::new()),
    };

    FinalResponse {
        answer,
        confidence,
        is_complete,
        sources: output.sources,
        missing_info,
        enrichment_suggestions: state.enrichment_suggestions.clone(),
        enrichment_triggered: state.enriched_data.is_some(),
        clarification_triggered: state.clarification_response.is_some(),
    }
}
