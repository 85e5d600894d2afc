//! OpenAI-compatible chat completion backend.
//!
//! Works with OpenAI's API and any compatible endpoint.
//! Exports `pub(crate)` helpers reused by the moderation client.

use async_trait::async_trait;
use scribe_core::{
    context::{ApiMessage, Context},
    error::ScribeError,
    traits::CompletionBackend,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

/// OpenAI-compatible completion backend.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiProvider {
    /// Create from config values.
    pub fn from_config(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            max_tokens,
        }
    }
}

/// Join a base URL and an endpoint path.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

#[derive(Serialize, Deserialize, Clone)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&ApiMessage> for ChatMessage {
    fn from(m: &ApiMessage) -> Self {
        Self {
            role: m.role.clone(),
            content: m.content.clone(),
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Deserialize)]
pub(crate) struct ChatCompletionResponse {
    pub choices: Option<Vec<ChatChoice>>,
    pub usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessage>,
}

#[derive(Deserialize)]
pub(crate) struct ChatUsage {
    pub total_tokens: Option<u64>,
}

/// Pull the first choice's text out of a response, trimmed.
///
/// A response without any choice text is an error: the caller decides
/// what the user sees instead.
pub(crate) fn extract_reply(parsed: &ChatCompletionResponse) -> Result<String, ScribeError> {
    parsed
        .choices
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.message.as_ref())
        .map(|m| m.content.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ScribeError::Provider("openai: response had no content".to_string()))
}

#[async_trait]
impl CompletionBackend for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<String, ScribeError> {
        let start = Instant::now();
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: context.to_api_messages().iter().map(ChatMessage::from).collect(),
            max_tokens: self.max_tokens,
        };

        let url = endpoint(&self.base_url, "chat/completions");
        debug!("openai: POST {url} model={} messages={}", self.model, body.messages.len());

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScribeError::Provider(format!("openai request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ScribeError::Provider(format!(
                "openai returned {status}: {text}"
            )));
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| ScribeError::Provider(format!("openai: failed to parse response: {e}")))?;

        let reply = extract_reply(&parsed)?;
        debug!(
            "openai: {} tokens in {}ms",
            parsed
                .usage
                .as_ref()
                .and_then(|u| u.total_tokens)
                .unwrap_or_default(),
            start.elapsed().as_millis()
        );
        Ok(reply)
    }

    async fn is_available(&self) -> bool {
        if self.api_key.is_empty() {
            warn!("openai: no API key configured");
            return false;
        }
        let url = endpoint(&self.base_url, "models");
        match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!("openai not available: {e}");
                false
            }
        }
    }
}
