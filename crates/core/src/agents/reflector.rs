//! # Completeness Reflector
//!
//! Second-opinion pass: asks the reasoning model whether the current answer
//! actually covers the query. Any parse or transport failure yields the
//! conservative default verdict (incomplete, zero confidence) so the run
//! keeps working rather than silently finalizing an unchecked answer.

use crate::agents::prompts;
use crate::error::Result;
use crate::llm::{parse_json_reply, ChatLlm, LlmRole};
use crate::orchestrator::state::{ReflectionResult, RunState};
use std::sync::Arc;

pub struct CompletenessReflector {
    llm: Arc<dyn ChatLlm>,
}

impl CompletenessReflector {
    pub fn new(llm: Arc<dyn ChatLlm>) -> Self {
        Self { llm }
    }

    pub async fn run(&self, state: &mut RunState) {
        state.trace("Reflecting on retrieval output");

        let mut verdict = match self.reflect(state).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(error = %e, "reflection failed, using conservative default");
                state.trace(format!("Reflection unparseable, assuming incomplete: {e}"));
                ReflectionResult::default()
            }
        };
        // The model reports its own score; keep it inside the contract range.
        verdict.confidence_score = verdict.confidence_score.clamp(0.0, 1.0);

        state.trace(format!(
            "Reflection complete: complete={}, ambiguity={}, missing_elements={}",
            verdict.is_complete,
            verdict.ambiguity_detected,
            verdict.missing_elements.len()
        ));
        state.reflection_result = Some(verdict);
    }

    async fn reflect(&self, state: &RunState) -> Result<ReflectionResult> {
        let prompt = build_reflection_prompt(state);
        let reply = self
            .llm
            .complete(LlmRole::Reflection, prompts::REFLECTOR, &prompt)
            .await?;
        parse_json_reply(&reply)
    }
}

fn build_reflection_prompt(state: &RunState) -> String {
    let (answer, sources, confidence) = state
        .generation_output
        .as_ref()
        .map(|o| (o.answer.as_str(), o.sources.join(", "), o.confidence))
        .unwrap_or(("No answer", String::new(), 0.0));

    let (intent, required) = state
        .query_analysis
        .as_ref()
        .map(|a| {
            (
                format!("{:?}", a.intent),
                a.required_data_elements.join(", "),
            )
        })
        .unwrap_or_else(|| ("unknown".to_string(), String::new()));

    format!(
        "Analyze the following Q&A interaction for completeness and clarity:\n\n\
         ORIGINAL QUERY: {}\n\
         QUERY INTENT: {}\n\
         REQUIRED DATA: {}\n\n\
         GENERATED ANSWER: {}\n\
         SOURCES: {}\n\
         CONFIDENCE: {:.2}\n\n\
         Assess:\n\
         1. Does the answer provide what the user actually asked for?\n\
         2. Are there CRITICAL information gaps that prevent answering the question?\n\
         3. Is there ambiguity that makes the answer unusable?",
        state.user_query, intent, required, answer, sources, confidence
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::state::GenerationOutput;
    use async_trait::async_trait;

    struct CannedLlm(String);

    #[async_trait]
    impl ChatLlm for CannedLlm {
        async fn complete(&self, _role: LlmRole, _system: &str, _user: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_clamped() {
        let reflector = CompletenessReflector::new(Arc::new(CannedLlm(
            r#"{"is_complete": true, "confidence_score": 42.0}"#.to_string(),
        )));
        let mut state = RunState::new("q");
        reflector.run(&mut state).await;

        let verdict = state.reflection_result.unwrap();
        assert!(verdict.is_complete);
        assert_eq!(verdict.confidence_score, 1.0);

        let reflector = CompletenessReflector::new(Arc::new(CannedLlm(
            r#"{"is_complete": false, "confidence_score": -3.5}"#.to_string(),
        )));
        let mut state = RunState::new("q");
        reflector.run(&mut state).await;
        assert_eq!(state.reflection_result.unwrap().confidence_score, 0.0);
    }

    #[test]
    fn test_prompt_includes_answer_and_query() {
        let mut state = RunState::new("What changed in Q3?");
        state.generation_output = Some(GenerationOutput {
            answer: "Revenue grew 4%.".to_string(),
            sources: vec!["report.txt".to_string()],
            confidence: 0.6,
        });

        let prompt = build_reflection_prompt(&state);
        assert!(prompt.contains("ORIGINAL QUERY: What changed in Q3?"));
        assert!(prompt.contains("GENERATED ANSWER: Revenue grew 4%."));
        assert!(prompt.contains("SOURCES: report.txt"));
    }

    #[test]
    fn test_prompt_tolerates_missing_output() {
        let state = RunState::new("q");
        let prompt = build_reflection_prompt(&state);
        assert!(prompt.contains("GENERATED ANSWER: No answer"));
        assert!(prompt.contains("QUERY INTENT: unknown"));
    }
}
