//! # Enrichment Synthesizer
//!
//! Two jobs around detected information gaps: during the loop, synthesize
//! placeholder context for the top missing elements so the next retrieval
//! pass has something to work with; at finalization, derive the user-facing
//! upload suggestions from whatever gaps remain.

use crate::agents::prompts;
use crate::llm::{clean_model_reply, ChatLlm, LlmRole};
use crate::orchestrator::state::{
    EnrichmentSuggestion, RunState, SuggestionKind, SuggestionPriority,
};
use std::sync::Arc;

/// Placeholder synthesis covers at most this many missing elements per cycle.
const MAX_ENRICHED_ELEMENTS: usize = 2;

/// Suggestion list is capped at the top few substantive gaps.
const MAX_SUGGESTIONS: usize = 3;

/// Missing "elements" that are really process metadata, not content gaps.
const META_TERMS: [&str; 7] = [
    "confidence",
    "justification",
    "reliability",
    "confirmation",
    "verification_method",
    "score",
    "source_reliability",
];

pub struct EnrichmentSynthesizer {
    llm: Arc<dyn ChatLlm>,
}

impl EnrichmentSynthesizer {
    pub fn new(llm: Arc<dyn ChatLlm>) -> Self {
        Self { llm }
    }

    pub async fn run(&self, state: &mut RunState) {
        state.trace("Initiating dynamic data enrichment");

        let elements: Vec<String> = state
            .reflection_result
            .as_ref()
            .map(|r| {
                r.missing_elements
                    .iter()
                    .take(MAX_ENRICHED_ELEMENTS)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if elements.is_empty() {
            state.trace("No missing elements to enrich");
            state.enriched_data = Some(String::new());
            return;
        }

        let prompt = format!(
            "USER QUERY: {}\nMISSING ELEMENTS: {}",
            state.user_query,
            elements.join(", ")
        );
        let enriched = match self
            .llm
            .complete(LlmRole::Analysis, prompts::ENRICHER, &prompt)
            .await
        {
            Ok(reply) => {
                let cleaned = clean_model_reply(&reply);
                if cleaned.is_empty() {
                    simulated_enrichment(&elements)
                } else {
                    cleaned
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "enrichment call failed, using simulated data");
                simulated_enrichment(&elements)
            }
        };

        state.trace(format!("Enriched data for: {}", elements.join(", ")));
        state.enriched_data = Some(enriched);
    }
}

fn simulated_enrichment(elements: &[String]) -> String {
    elements
        .iter()
        .map(|e| format!("{e}: simulated data for {e} from an external system"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_substantive(element: &str) -> bool {
    let lowered = element.to_lowercase();
    !META_TERMS.iter().any(|term| lowered.contains(term))
}

fn humanize(element: &str) -> String {
    let spaced = element.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    for (i, word) in spaced.split_whitespace().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Derive upload suggestions from the final state. Empty when reflection
/// never ran (fast path) or everything was resolved.
pub fn derive_suggestions(state: &RunState) -> Vec<EnrichmentSuggestion> {
    let mut suggestions = Vec::new();

    let (Some(reflection), Some(output)) = (&state.reflection_result, &state.generation_output)
    else {
        return suggestions;
    };

    let substantive: Vec<&String> = reflection
        .missing_elements
        .iter()
        .filter(|e| is_substantive(e))
        .collect();

    if !reflection.is_complete && !substantive.is_empty() && output.confidence < 0.7 {
        for element in substantive.iter().take(MAX_SUGGESTIONS) {
            let readable = humanize(element);
            suggestions.push(EnrichmentSuggestion {
                kind: SuggestionKind::MissingData,
                action: format!("Consider uploading documents with information about {readable}"),
                priority: SuggestionPriority::Medium,
            });
        }
    }

    // Inline citations count as sources even when the list is empty.
    let has_inline_citations = output.answer.to_lowercase().contains("[source:");

    if output.sources.is_empty() && !has_inline_citations && output.confidence < 0.5 {
        suggestions.push(EnrichmentSuggestion {
            kind: SuggestionKind::NoSources,
            action: "Upload relevant documents to improve answer quality".to_string(),
            priority: SuggestionPriority::High,
        });
    } else if output.confidence < 0.4 && output.sources.len() < 2 {
        suggestions.push(EnrichmentSuggestion {
            kind: SuggestionKind::LowConfidence,
            action: "Consider uploading more detailed documents for better accuracy".to_string(),
            priority: SuggestionPriority::Medium,
        });
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::state::{GenerationOutput, ReflectionResult};

    fn incomplete_state(missing: Vec<&str>, confidence: f32, sources: Vec<&str>) -> RunState {
        let mut state = RunState::new("q");
        state.generation_output = Some(GenerationOutput {
            answer: "partial answer".to_string(),
            sources: sources.into_iter().map(String::from).collect(),
            confidence,
        });
        state.reflection_result = Some(ReflectionResult {
            is_complete: false,
            missing_elements: missing.into_iter().map(String::from).collect(),
            ..Default::default()
        });
        state
    }

    #[test]
    fn test_no_reflection_means_no_suggestions() {
        let mut state = RunState::new("q");
        state.generation_output = Some(GenerationOutput::degraded("x"));
        assert!(derive_suggestions(&state).is_empty());
    }

    #[test]
    fn test_missing_data_suggestions_capped_and_humanized() {
        let state = incomplete_state(
            vec!["fiscal_year", "revenue_figure", "region", "quarter"],
            0.3,
            vec!["a.txt", "b.txt"],
        );
        let suggestions = derive_suggestions(&state);
        let missing: Vec<_> = suggestions
            .iter()
            .filter(|s| s.kind == SuggestionKind::MissingData)
            .collect();
        assert_eq!(missing.len(), 3);
        assert!(missing[0].action.contains("Fiscal Year"));
    }

    #[test]
    fn test_meta_elements_filtered() {
        let state = incomplete_state(
            vec!["confidence_justification", "source_reliability"],
            0.3,
            vec!["a.txt", "b.txt"],
        );
        let suggestions = derive_suggestions(&state);
        assert!(suggestions
            .iter()
            .all(|s| s.kind != SuggestionKind::MissingData));
    }

    #[test]
    fn test_no_sources_suggestion_is_high_priority() {
        let state = incomplete_state(vec![], 0.2, vec![]);
        let suggestions = derive_suggestions(&state);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].kind, SuggestionKind::NoSources);
        assert_eq!(suggestions[0].priority, SuggestionPriority::High);
    }

    #[test]
    fn test_inline_citation_suppresses_no_sources() {
        let mut state = incomplete_state(vec![], 0.2, vec![]);
        state.generation_output.as_mut().unwrap().answer =
            "Per the filing [Source: report.txt], revenue grew.".to_string();
        let suggestions = derive_suggestions(&state);
        assert!(suggestions
            .iter()
            .all(|s| s.kind != SuggestionKind::NoSources));
        // Falls through to the low-confidence hint instead.
        assert_eq!(suggestions[0].kind, SuggestionKind::LowConfidence);
    }

    #[test]
    fn test_confident_answer_yields_nothing() {
        let state = incomplete_state(vec![], 0.9, vec!["a.txt"]);
        let mut state = state;
        state.reflection_result.as_mut().unwrap().is_complete = true;
        assert!(derive_suggestions(&state).is_empty());
    }

    #[test]
    fn test_simulated_enrichment_mentions_each_element() {
        let text = simulated_enrichment(&["date".to_string(), "region".to_string()]);
        assert!(text.contains("date"));
        assert!(text.contains("region"));
    }
}
