//! # Query Analyzer
//!
//! Decomposes the user query into intent, sub-questions and required data
//! elements. Advisory: any failure leaves `query_analysis` unset and the run
//! continues.

use crate::agents::prompts;
use crate::error::Result;
use crate::llm::{parse_json_reply, ChatLlm, LlmRole};
use crate::orchestrator::state::{QueryAnalysis, RunState};
use std::sync::Arc;

pub struct QueryAnalyzer {
    llm: Arc<dyn ChatLlm>,
}

impl QueryAnalyzer {
    pub fn new(llm: Arc<dyn ChatLlm>) -> Self {
        Self { llm }
    }

    pub async fn run(&self, state: &mut RunState) {
        state.trace("Starting query analysis");

        match self.analyze(&state.user_query).await {
            Ok(analysis) => {
                state.trace(format!(
                    "Query analyzed: intent={:?}, confidence={:.2}",
                    analysis.intent, analysis.confidence
                ));
                state.query_analysis = Some(analysis);
            }
            Err(e) => {
                tracing::warn!(error = %e, "query analysis failed, continuing without it");
                state.trace(format!("Query analysis failed, continuing without it: {e}"));
            }
        }
    }

    async fn analyze(&self, query: &str) -> Result<QueryAnalysis> {
        let reply = self
            .llm
            .complete(LlmRole::Analysis, prompts::ANALYZER, query)
            .await?;
        parse_json_reply(&reply)
    }
}
