//! OpenAI moderation endpoint client.

use async_trait::async_trait;
use scribe_core::{error::ScribeError, traits::ModerationBackend};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::openai::endpoint;

/// Classifies text with `POST {base_url}/moderations`.
pub struct OpenAiModeration {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiModeration {
    pub fn from_config(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }
}

#[derive(Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Deserialize)]
struct ModerationResult {
    flagged: bool,
}

/// `flagged` of the first result. A response without results is malformed.
fn first_flag(resp: &ModerationResponse) -> Result<bool, ScribeError> {
    resp.results
        .first()
        .map(|r| r.flagged)
        .ok_or_else(|| ScribeError::Provider("moderation: empty results".to_string()))
}

#[async_trait]
impl ModerationBackend for OpenAiModeration {
    fn name(&self) -> &str {
        "openai-moderation"
    }

    async fn is_flagged(&self, text: &str) -> Result<bool, ScribeError> {
        let url = endpoint(&self.base_url, "moderations");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&ModerationRequest { input: text })
            .send()
            .await
            .map_err(|e| ScribeError::Provider(format!("moderation request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ScribeError::Provider(format!(
                "moderation returned {status}: {body}"
            )));
        }

        let parsed: ModerationResponse = resp.json().await.map_err(|e| {
            ScribeError::Provider(format!("moderation: failed to parse response: {e}"))
        })?;

        let flagged = first_flag(&parsed)?;
        debug!("moderation: flagged={flagged}");
        Ok(flagged)
    }
}
