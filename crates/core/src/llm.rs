//! # LLM Client
//!
//! OpenAI-compatible chat completions client plus the defensive reply
//! parsing shared by every agent. Reasoning models wrap their output in
//! `<think>` blocks and markdown fences; `parse_json_reply` strips both
//! before deserializing.

use crate::config::Settings;
use crate::error::{LodestoneError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Which hat the model wears for a given call. Selects the model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmRole {
    /// Grounded answer generation
    Generation,
    /// Query decomposition
    Analysis,
    /// Completeness critique of a prior answer
    Reflection,
}

/// Object-safe seam over the chat endpoint so tests can script replies.
#[async_trait]
pub trait ChatLlm: Send + Sync {
    async fn complete(&self, role: LlmRole, system: &str, user: &str) -> Result<String>;
}

/// Production client against an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiChatLlm {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    reasoning_model: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl OpenAiChatLlm {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| LodestoneError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.llm_base_url.trim_end_matches('/').to_string(),
            api_key: settings.llm_api_key.clone(),
            chat_model: settings.chat_model.clone(),
            reasoning_model: settings.reasoning_model.clone(),
        })
    }

    fn model_for(&self, role: LlmRole) -> &str {
        match role {
            LlmRole::Generation | LlmRole::Analysis => &self.chat_model,
            LlmRole::Reflection => &self.reasoning_model,
        }
    }
}

#[async_trait]
impl ChatLlm for OpenAiChatLlm {
    async fn complete(&self, role: LlmRole, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model_for(role),
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": 0.1,
            "max_tokens": 1000
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LodestoneError::LlmUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LodestoneError::LlmUnavailable(format!(
                "HTTP {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LodestoneError::MalformedOutput(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LodestoneError::MalformedOutput("response had no choices".to_string()))
    }
}

/// Strip `<think>` transcripts and markdown code fences from a model reply.
pub fn clean_model_reply(text: &str) -> String {
    let mut cleaned = text.trim();

    // Reasoning models prefix their answer with a <think>...</think> block.
    if let Some(idx) = cleaned.rfind("</think>") {
        cleaned = cleaned[idx + "</think>".len()..].trim();
    }

    // ```json ... ``` or generic ``` ... ``` fences.
    if let Some(start) = cleaned.find("```") {
        let after = &cleaned[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            cleaned = after[..end].trim();
        }
    }

    cleaned.to_string()
}

/// Deserialize a model reply, falling back to the first `{...}` substring
/// when the model wrapped the JSON in prose.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T> {
    let cleaned = clean_model_reply(text);

    if let Ok(value) = serde_json::from_str(&cleaned) {
        return Ok(value);
    }

    let start = cleaned
        .find('{')
        .ok_or_else(|| LodestoneError::MalformedOutput("no JSON object in reply".to_string()))?;
    let end = cleaned
        .rfind('}')
        .ok_or_else(|| LodestoneError::MalformedOutput("unterminated JSON object".to_string()))?;
    if end < start {
        return Err(LodestoneError::MalformedOutput(
            "unterminated JSON object".to_string(),
        ));
    }

    serde_json::from_str(&cleaned[start..=end])
        .map_err(|e| LodestoneError::MalformedOutput(e.to_string()))
}
