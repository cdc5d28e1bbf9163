//! # Retrieval Answerer
//!
//! The ExecuteRag node: embed the (possibly augmented) query, search the
//! vector store, and ask the model for an answer grounded in the retrieved
//! chunks. Produces a `GenerationOutput` on every invocation - retrieval
//! backend failures and empty result sets degrade to an explicit
//! empty-sources, zero-confidence output instead of erroring. Only an
//! unreachable language model propagates.

use crate::agents::prompts;
use crate::embed::Embedder;
use crate::error::{LodestoneError, Result};
use crate::llm::{ChatLlm, LlmRole};
use crate::orchestrator::state::{GenerationOutput, QueryAnalysis, RunState};
use crate::store::{RetrievedChunk, VectorStore};
use std::sync::Arc;

const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "No grounding documents were found for this query. Please upload relevant documents and try again.";

/// Phrases that lower the heuristic confidence score when present in an answer.
const UNCERTAINTY_PHRASES: [&str; 5] = [
    "i don't know",
    "information is missing",
    "not in the context",
    "unable to find",
    "no information provided",
];

pub struct RetrievalAnswerer {
    llm: Arc<dyn ChatLlm>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl RetrievalAnswerer {
    pub fn new(
        llm: Arc<dyn ChatLlm>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        top_k: usize,
    ) -> Self {
        Self {
            llm,
            embedder,
            store,
            top_k,
        }
    }

    pub async fn run(&self, state: &mut RunState) -> Result<()> {
        state.retry_count += 1;
        state.trace(format!(
            "Executing retrieval (attempt {})",
            state.retry_count
        ));

        let query = augment_query(state);
        let output = self.retrieve_and_generate(&query, state).await?;

        state.trace(format!(
            "Retrieval complete: confidence={:.2}, sources={}",
            output.confidence,
            output.sources.len()
        ));
        state.generation_output = Some(output);
        Ok(())
    }

    async fn retrieve_and_generate(
        &self,
        query: &str,
        state: &mut RunState,
    ) -> Result<GenerationOutput> {
        let search_text = enhance_query(query, state.query_analysis.as_ref());

        let chunks = match self.fetch_chunks(&search_text).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(error = %e, "retrieval backend failed, degrading");
                state.trace(format!("Retrieval backend failed: {e}"));
                Vec::new()
            }
        };

        if chunks.is_empty() {
            return Ok(GenerationOutput::degraded(INSUFFICIENT_CONTEXT_ANSWER));
        }

        let prompt = build_grounding_prompt(query, &chunks);
        let answer = match self
            .llm
            .complete(LlmRole::Generation, prompts::GENERATOR, &prompt)
            .await
        {
            Ok(text) => text,
            // An unreachable model means no node can make progress; this is
            // the one failure that escapes the run.
            Err(e @ LodestoneError::LlmUnavailable(_)) => return Err(e),
            Err(e) => {
                state.trace(format!("Generation returned unusable output: {e}"));
                return Ok(GenerationOutput::degraded("No response generated."));
            }
        };

        let sources = distinct_sources(&chunks);
        let confidence = calculate_confidence(&answer, sources.len());

        Ok(GenerationOutput {
            answer,
            sources,
            confidence,
        })
    }

    async fn fetch_chunks(&self, search_text: &str) -> Result<Vec<RetrievedChunk>> {
        let embedding = self.embedder.embed(search_text).await?;
        self.store.search(&embedding, self.top_k, None).await
    }
}

/// Fold clarification and enriched context from previous cycles into the query.
fn augment_query(state: &RunState) -> String {
    let mut query = state.user_query.clone();
    if let Some(clarification) = &state.clarification_response {
        query.push_str(&format!(" [Clarification: {clarification}]"));
    }
    if let Some(enriched) = &state.enriched_data {
        query.push_str(&format!(" [Additional context: {enriched}]"));
    }
    query
}

/// Widen the search text with sub-questions and required elements from the
/// analysis, when present.
fn enhance_query(query: &str, analysis: Option<&QueryAnalysis>) -> String {
    let Some(analysis) = analysis else {
        return query.to_string();
    };

    let mut enhanced = query.to_string();
    if !analysis.sub_questions.is_empty() {
        enhanced.push(' ');
        enhanced.push_str(&analysis.sub_questions.join(" "));
    }
    if !analysis.required_data_elements.is_empty() {
        enhanced.push_str(" Relevant data: ");
        enhanced.push_str(&analysis.required_data_elements.join(", "));
    }
    enhanced
}

fn build_grounding_prompt(query: &str, chunks: &[RetrievedChunk]) -> String {
    let mut context = String::new();
    for chunk in chunks {
        context.push_str(&format!(
            "Source: {}, Chunk: {}\nContent: {}\n\n",
            chunk.source, chunk.chunk_index, chunk.text
        ));
    }
    format!("CONTEXT:\n{context}USER QUERY: {query}\n\nRESPONSE:")
}

/// Distinct source names in retrieval order.
fn distinct_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    chunks
        .iter()
        .filter(|c| c.source != "unknown" && !c.source.is_empty())
        .filter(|c| seen.insert(c.source.clone()))
        .map(|c| c.source.clone())
        .collect()
}

/// Heuristic confidence blend: source coverage, absence of uncertainty
/// phrasing, and answer length. Always in [0, 1].
fn calculate_confidence(answer: &str, source_count: usize) -> f32 {
    if answer.trim().is_empty() {
        return 0.0;
    }

    let lowered = answer.to_lowercase();
    let uncertainty: f32 = UNCERTAINTY_PHRASES
        .iter()
        .filter(|phrase| lowered.contains(*phrase))
        .count() as f32
        * 0.2;

    let source_confidence = (source_count as f32 / 5.0).min(1.0);
    let length_confidence = (answer.split_whitespace().count() as f32 / 50.0).min(1.0);

    let confidence =
        0.4 * source_confidence + 0.4 * (1.0 - uncertainty.min(1.0)) + 0.2 * length_confidence;
    confidence.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::state::QueryIntent;

    fn chunk(source: &str, index: usize) -> RetrievedChunk {
        RetrievedChunk {
            id: format!("{source}-{index}"),
            text: "some content".to_string(),
            source: source.to_string(),
            chunk_index: index,
            score: 0.9,
        }
    }

    #[test]
    fn test_confidence_clamped_and_penalized() {
        let confident = calculate_confidence(
            &"The fiscal year revenue was 4.2 million dollars. ".repeat(10),
            5,
        );
        assert!(confident > 0.7 && confident <= 1.0);

        let uncertain = calculate_confidence("I don't know, the information is missing.", 0);
        assert!(uncertain < 0.4);

        assert_eq!(calculate_confidence("   ", 3), 0.0);
    }

    #[test]
    fn test_distinct_sources_preserve_order() {
        let chunks = vec![
            chunk("b.txt", 0),
            chunk("a.txt", 1),
            chunk("b.txt", 2),
            chunk("unknown", 0),
        ];
        assert_eq!(distinct_sources(&chunks), vec!["b.txt", "a.txt"]);
    }

    #[test]
    fn test_augment_query_folds_cycle_context() {
        let mut state = RunState::new("What is the revenue?");
        assert_eq!(augment_query(&state), "What is the revenue?");

        state.clarification_response = Some("the 2025 fiscal year".to_string());
        state.enriched_data = Some("revenue placeholder".to_string());
        let augmented = augment_query(&state);
        assert!(augmented.contains("[Clarification: the 2025 fiscal year]"));
        assert!(augmented.contains("[Additional context: revenue placeholder]"));
    }

    #[test]
    fn test_enhance_query_appends_analysis() {
        let analysis = QueryAnalysis {
            intent: QueryIntent::Analytical,
            sub_questions: vec!["Which quarter?".to_string()],
            required_data_elements: vec!["revenue".to_string(), "quarter".to_string()],
            confidence: 0.8,
        };
        let enhanced = enhance_query("Revenue trend?", Some(&analysis));
        assert!(enhanced.contains("Which quarter?"));
        assert!(enhanced.contains("Relevant data: revenue, quarter"));

        assert_eq!(enhance_query("plain", None), "plain");
    }

    #[test]
    fn test_grounding_prompt_cites_chunks() {
        let prompt = build_grounding_prompt("q", &[chunk("doc.txt", 3)]);
        assert!(prompt.contains("Source: doc.txt, Chunk: 3"));
        assert!(prompt.contains("USER QUERY: q"));
    }
}
