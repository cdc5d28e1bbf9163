//! # Run State
//!
//! The single mutable record threaded through one query execution, plus the
//! structured outputs each agent writes into it and the final wire shape.
//! Each run owns its `RunState` exclusively; nothing here is shared across
//! queries.

use serde::{Deserialize, Serialize};

/// Intent categories recognized by the query analyzer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    #[default]
    FactualLookup,
    Analytical,
    Procedural,
    Ambiguous,
}

/// Query decomposition produced by the analyzer. Advisory: retrieval works
/// without it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryAnalysis {
    #[serde(default)]
    pub intent: QueryIntent,
    #[serde(default)]
    pub sub_questions: Vec<String>,
    #[serde(default)]
    pub required_data_elements: Vec<String>,
    #[serde(default)]
    pub confidence: f32,
}

/// Output of one retrieval-and-generation pass. Overwritten on every
/// ExecuteRag attempt; last write wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub answer: String,
    pub sources: Vec<String>,
    pub confidence: f32,
}

impl GenerationOutput {
    /// Degraded output for empty retrieval or backend failure: explicit
    /// empty-sources marker, zero confidence.
    pub fn degraded(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// Reflection verdict. The `Default` is the conservative parse-failure
/// fallback: incomplete, no ambiguity, zero confidence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflectionResult {
    #[serde(default)]
    pub is_complete: bool,
    #[serde(default)]
    pub missing_elements: Vec<String>,
    #[serde(default)]
    pub ambiguity_detected: bool,
    #[serde(default)]
    pub clarifying_question: Option<String>,
    #[serde(default)]
    pub confidence_score: f32,
}

/// Suggestion kind, keyed to the kind of gap detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    MissingData,
    NoSources,
    LowConfidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    High,
    Medium,
}

/// A user-facing pointer at what to upload next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSuggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub action: String,
    pub priority: SuggestionPriority,
}

/// State record for a single query execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub user_query: String,
    pub query_analysis: Option<QueryAnalysis>,
    pub generation_output: Option<GenerationOutput>,
    pub reflection_result: Option<ReflectionResult>,
    pub clarification_response: Option<String>,
    pub enriched_data: Option<String>,
    pub final_answer: Option<String>,
    pub execution_trace: Vec<String>,
    pub retry_count: u32,
    pub enrichment_suggestions: Vec<EnrichmentSuggestion>,
}

impl RunState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            user_query: query.into(),
            query_analysis: None,
            generation_output: None,
            reflection_result: None,
            clarification_response: None,
            enriched_data: None,
            final_answer: None,
            execution_trace: Vec::new(),
            retry_count: 0,
            enrichment_suggestions: Vec::new(),
        }
    }

    /// Append a trace entry. The trace is append-only, one entry per node step.
    pub fn trace(&mut self, entry: impl Into<String>) {
        self.execution_trace.push(entry.into());
    }
}

/// Wire contract returned to API clients. Field names are load-bearing for
/// the existing UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResponse {
    pub answer: String,
    pub confidence: f32,
    pub is_complete: bool,
    pub sources: Vec<String>,
    pub missing_info: Vec<String>,
    pub enrichment_suggestions: Vec<EnrichmentSuggestion>,
    pub enrichment_triggered: bool,
    pub clarification_triggered: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflection_default_is_conservative() {
        let verdict = ReflectionResult::default();
        assert!(!verdict.is_complete);
        assert!(!verdict.ambiguity_detected);
        assert!(verdict.missing_elements.is_empty());
        assert_eq!(verdict.confidence_score, 0.0);
    }

    #[test]
    fn test_suggestion_serializes_with_type_field() {
        let suggestion = EnrichmentSuggestion {
            kind: SuggestionKind::NoSources,
            action: "Upload relevant documents".to_string(),
            priority: SuggestionPriority::High,
        };
        let json = serde_json::to_value(&suggestion).unwrap();
        assert_eq!(json["type"], "no_sources");
        assert_eq!(json["priority"], "high");
    }

    #[test]
    fn test_analysis_parses_partial_json() {
        let analysis: QueryAnalysis =
            serde_json::from_str(r#"{"intent": "analytical", "confidence": 0.8}"#).unwrap();
        assert_eq!(analysis.intent, QueryIntent::Analytical);
        assert!(analysis.sub_questions.is_empty());
    }

    #[test]
    fn test_trace_is_append_only_in_order() {
        let mut state = RunState::new("q");
        state.trace("first");
        state.trace("second");
        assert_eq!(state.execution_trace, vec!["first", "second"]);
    }
}
