//! Text repair: grammar engine with a deterministic local fallback.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::{command::RepairMode, traits::GrammarEngine};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([?.!,])").unwrap());

/// Which branch produced a repaired text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairSource {
    Engine,
    LocalFallback,
}

/// Repaired text tagged with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub text: String,
    pub source: RepairSource,
}

/// Text repair adapter.
///
/// `RepairMode::Article` is accepted but currently repairs exactly like
/// `RepairMode::Terse`: neither the engine nor the fallback has a distinct
/// long-form rewrite yet.
#[derive(Clone, Default)]
pub struct TextRepairer {
    engine: Option<Arc<dyn GrammarEngine>>,
}

impl TextRepairer {
    pub fn new(engine: Option<Arc<dyn GrammarEngine>>) -> Self {
        Self { engine }
    }

    /// Name of the configured engine, if any.
    pub fn engine_name(&self) -> Option<&str> {
        self.engine.as_deref().map(|e| e.name())
    }

    /// Repair `text`, delegating to the engine when one is configured.
    pub async fn repair(&self, text: &str, mode: RepairMode) -> Repair {
        debug!("repair: mode={mode:?} len={}", text.len());

        if let Some(engine) = &self.engine {
            match engine.correct(text).await {
                Ok(corrected) => {
                    return Repair {
                        text: corrected,
                        source: RepairSource::Engine,
                    }
                }
                Err(e) => warn!("repair: {} failed, using local fallback: {e}", engine.name()),
            }
        }

        Repair {
            text: local_repair(text),
            source: RepairSource::LocalFallback,
        }
    }
}

/// Deterministic local fixes:
/// - collapse whitespace runs to one space and trim
/// - drop whitespace before `?`, `.`, `!` and `,`
/// - uppercase the first letter of the text and after each `.`/`?`/`!`
///   followed by whitespace
pub fn local_repair(text: &str) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(text, " ");
    let tightened = SPACE_BEFORE_PUNCT.replace_all(collapsed.trim(), "$1");
    capitalize_sentences(&tightened)
}

fn capitalize_sentences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_sentence_start = true;
    let mut prev: Option<char> = None;

    for c in text.chars() {
        if c.is_whitespace() {
            if matches!(prev, Some('.' | '?' | '!')) {
                at_sentence_start = true;
            }
            out.push(c);
        } else if at_sentence_start {
            out.extend(c.to_uppercase());
            at_sentence_start = false;
        } else {
            out.push(c);
        }
        prev = Some(c);
    }

    out
}
