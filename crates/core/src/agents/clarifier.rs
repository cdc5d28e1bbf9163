//! # Clarification Simulator
//!
//! Stand-in for a human-in-the-loop turn: turns the reflector's clarifying
//! question into a simulated user reply that the next retrieval pass folds
//! into the query.

use crate::agents::prompts;
use crate::llm::{clean_model_reply, ChatLlm, LlmRole};
use crate::orchestrator::state::RunState;
use std::sync::Arc;

const DEFAULT_CLARIFYING_QUESTION: &str = "Could you please provide more details?";
const FALLBACK_RESPONSE: &str = "Please provide the most recent available data";

pub struct ClarificationSimulator {
    llm: Arc<dyn ChatLlm>,
}

impl ClarificationSimulator {
    pub fn new(llm: Arc<dyn ChatLlm>) -> Self {
        Self { llm }
    }

    pub async fn run(&self, state: &mut RunState) {
        state.trace("Handling ambiguity - clarification needed");

        let question = state
            .reflection_result
            .as_ref()
            .and_then(|r| r.clarifying_question.clone())
            .unwrap_or_else(|| DEFAULT_CLARIFYING_QUESTION.to_string());

        state.trace(format!("Asking for clarification: {question}"));

        let prompt = format!(
            "ORIGINAL QUERY: {}\nCLARIFYING QUESTION: {}",
            state.user_query, question
        );
        let response = match self
            .llm
            .complete(LlmRole::Analysis, prompts::CLARIFIER, &prompt)
            .await
        {
            Ok(reply) => {
                let cleaned = clean_model_reply(&reply);
                if cleaned.is_empty() {
                    FALLBACK_RESPONSE.to_string()
                } else {
                    cleaned
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "clarification call failed, using canned response");
                FALLBACK_RESPONSE.to_string()
            }
        };

        state.trace(format!("Simulated clarification: {response}"));
        state.clarification_response = Some(response);
    }
}
