//! LanguageTool HTTP grammar engine.
//!
//! Posts text to `{base_url}/check` and applies the first suggested
//! replacement of every match. Offsets in LanguageTool responses count
//! UTF-16 code units.
//! Docs: <https://languagetool.org/http-api/>

use async_trait::async_trait;
use scribe_core::{error::ScribeError, traits::GrammarEngine};
use serde::Deserialize;
use tracing::debug;

/// LanguageTool client.
pub struct LanguageTool {
    client: reqwest::Client,
    base_url: String,
    language: String,
}

impl LanguageTool {
    pub fn from_config(base_url: String, language: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            language,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<LtMatch>,
}

#[derive(Debug, Deserialize)]
struct LtMatch {
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<LtReplacement>,
}

#[derive(Debug, Deserialize)]
struct LtReplacement {
    value: String,
}

/// Apply the first replacement of each match, left to right.
///
/// Matches without suggestions, overlapping an earlier match, or pointing
/// past the end of the text are skipped.
fn apply_matches(text: &str, matches: &[LtMatch]) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut fixable: Vec<&LtMatch> = matches
        .iter()
        .filter(|m| !m.replacements.is_empty())
        .collect();
    fixable.sort_by_key(|m| m.offset);

    let mut out: Vec<u16> = Vec::with_capacity(units.len());
    let mut cursor = 0;

    for m in fixable {
        let Some(end) = m
            .offset
            .checked_add(m.length)
            .filter(|&end| end <= units.len())
        else {
            continue;
        };
        if m.offset < cursor {
            continue;
        }
        out.extend_from_slice(&units[cursor..m.offset]);
        out.extend(m.replacements[0].value.encode_utf16());
        cursor = end;
    }

    out.extend_from_slice(&units[cursor..]);
    String::from_utf16_lossy(&out)
}

#[async_trait]
impl GrammarEngine for LanguageTool {
    fn name(&self) -> &str {
        "languagetool"
    }

    async fn correct(&self, text: &str) -> Result<String, ScribeError> {
        let url = format!("{}/check", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .form(&[("text", text), ("language", self.language.as_str())])
            .send()
            .await
            .map_err(|e| ScribeError::Provider(format!("languagetool request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ScribeError::Provider(format!(
                "languagetool returned {status}: {body}"
            )));
        }

        let parsed: CheckResponse = resp.json().await.map_err(|e| {
            ScribeError::Provider(format!("languagetool: failed to parse response: {e}"))
        })?;

        debug!("languagetool: {} matches", parsed.matches.len());
        Ok(apply_matches(text, &parsed.matches))
    }
}
