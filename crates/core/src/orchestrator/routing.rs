//! # Routing
//!
//! The transition table of the query state machine, expressed as two pure
//! predicates over `RunState`. Priority order in `after_reflection` is
//! load-bearing: the retry bound must be checked before every other branch,
//! or termination is no longer guaranteed.

use super::state::RunState;
use super::OrchestratorConfig;

/// Nodes of the state machine. `GenerateFinalAnswer` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    AnalyzeQuery,
    ExecuteRag,
    ReflectOnOutput,
    HandleAmbiguity,
    EnrichData,
    GenerateFinalAnswer,
}

/// After ExecuteRag: skip reflection entirely when the generation already
/// looks solid (high confidence and at least one source).
pub fn after_rag(state: &RunState, config: &OrchestratorConfig) -> Node {
    if let Some(output) = &state.generation_output {
        if output.confidence > config.fast_path_confidence && !output.sources.is_empty() {
            return Node::GenerateFinalAnswer;
        }
    }
    Node::ReflectOnOutput
}

/// After ReflectOnOutput, in strict priority order:
/// 1. retry bound hit -> finalize, overriding everything else
/// 2. verdict complete -> finalize
/// 3. ambiguity, not yet clarified this run -> ask for clarification
/// 4. missing elements, not yet enriched this run -> synthesize enrichment
/// 5. otherwise -> plain retry
pub fn after_reflection(state: &RunState, config: &OrchestratorConfig) -> Node {
    if state.retry_count >= config.max_retries {
        return Node::GenerateFinalAnswer;
    }

    let Some(verdict) = &state.reflection_result else {
        // Reflection never ran; nothing to branch on.
        return Node::GenerateFinalAnswer;
    };

    if verdict.is_complete {
        return Node::GenerateFinalAnswer;
    }
    if verdict.ambiguity_detected && state.clarification_response.is_none() {
        return Node::HandleAmbiguity;
    }
    if !verdict.missing_elements.is_empty() && state.enriched_data.is_none() {
        return Node::EnrichData;
    }
    Node::ExecuteRag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::state::{GenerationOutput, ReflectionResult};

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::default()
    }

    fn state_with_output(confidence: f32, sources: Vec<&str>) -> RunState {
        let mut state = RunState::new("q");
        state.generation_output = Some(GenerationOutput {
            answer: "a".to_string(),
            sources: sources.into_iter().map(String::from).collect(),
            confidence,
        });
        state
    }

    #[test]
    fn test_fast_path_skips_reflection() {
        let state = state_with_output(0.9, vec!["doc.txt"]);
        assert_eq!(after_rag(&state, &config()), Node::GenerateFinalAnswer);
    }

    #[test]
    fn test_high_confidence_without_sources_still_reflects() {
        let state = state_with_output(0.9, vec![]);
        assert_eq!(after_rag(&state, &config()), Node::ReflectOnOutput);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let state = state_with_output(0.7, vec!["doc.txt"]);
        assert_eq!(after_rag(&state, &config()), Node::ReflectOnOutput);
    }

    #[test]
    fn test_missing_output_reflects() {
        let state = RunState::new("q");
        assert_eq!(after_rag(&state, &config()), Node::ReflectOnOutput);
    }

    #[test]
    fn test_retry_bound_overrides_all_signals() {
        let mut state = state_with_output(0.1, vec![]);
        state.retry_count = 3;
        state.reflection_result = Some(ReflectionResult {
            is_complete: false,
            ambiguity_detected: true,
            missing_elements: vec!["date".to_string()],
            ..Default::default()
        });
        assert_eq!(after_reflection(&state, &config()), Node::GenerateFinalAnswer);
    }

    #[test]
    fn test_complete_finalizes() {
        let mut state = state_with_output(0.5, vec![]);
        state.retry_count = 1;
        state.reflection_result = Some(ReflectionResult {
            is_complete: true,
            ..Default::default()
        });
        assert_eq!(after_reflection(&state, &config()), Node::GenerateFinalAnswer);
    }

    #[test]
    fn test_ambiguity_routes_once() {
        let mut state = state_with_output(0.5, vec![]);
        state.retry_count = 1;
        state.reflection_result = Some(ReflectionResult {
            ambiguity_detected: true,
            ..Default::default()
        });
        assert_eq!(after_reflection(&state, &config()), Node::HandleAmbiguity);

        // Second ambiguous verdict after a clarification falls through to retry.
        state.clarification_response = Some("latest data".to_string());
        assert_eq!(after_reflection(&state, &config()), Node::ExecuteRag);
    }

    #[test]
    fn test_missing_elements_route_to_enrich_once() {
        let mut state = state_with_output(0.5, vec![]);
        state.retry_count = 1;
        state.reflection_result = Some(ReflectionResult {
            missing_elements: vec!["fiscal year".to_string()],
            ..Default::default()
        });
        assert_eq!(after_reflection(&state, &config()), Node::EnrichData);

        state.enriched_data = Some("synthesized".to_string());
        assert_eq!(after_reflection(&state, &config()), Node::ExecuteRag);
    }

    #[test]
    fn test_ambiguity_takes_priority_over_missing_elements() {
        let mut state = state_with_output(0.5, vec![]);
        state.retry_count = 1;
        state.reflection_result = Some(ReflectionResult {
            ambiguity_detected: true,
            missing_elements: vec!["date".to_string()],
            ..Default::default()
        });
        assert_eq!(after_reflection(&state, &config()), Node::HandleAmbiguity);
    }

    #[test]
    fn test_incomplete_without_signals_retries() {
        let mut state = state_with_output(0.5, vec![]);
        state.retry_count = 1;
        state.reflection_result = Some(ReflectionResult::default());
        assert_eq!(after_reflection(&state, &config()), Node::ExecuteRag);
    }
}
