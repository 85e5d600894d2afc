//! Content safety gate.
//!
//! Two layers, checked in order:
//! - a case-insensitive whole-word denylist (local, no I/O)
//! - an optional external moderation backend
//!
//! The backend layer fails open: if the call errors, the text is treated
//! as safe and the failure is logged. Callers that need to tell the
//! branches apart use [`SafetyGate::check`] and inspect the [`Verdict`].

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, warn};

use crate::{error::ScribeError, traits::ModerationBackend};

/// Outcome of a safety check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No denylist hit and the backend (if any) did not flag the text.
    Clean,
    /// A denylisted term matched. The backend was not consulted.
    Denylisted(String),
    /// The moderation backend flagged the text.
    Flagged,
    /// The moderation backend failed; treated as safe.
    ModerationUnavailable,
}

impl Verdict {
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Clean | Self::ModerationUnavailable)
    }
}

/// Decides whether text may be processed or sent further.
#[derive(Clone)]
pub struct SafetyGate {
    denylist: Option<Regex>,
    backend: Option<Arc<dyn ModerationBackend>>,
}

impl SafetyGate {
    /// Build a gate from denylist terms and an optional backend.
    pub fn new(
        terms: &[String],
        backend: Option<Arc<dyn ModerationBackend>>,
    ) -> Result<Self, ScribeError> {
        Ok(Self {
            denylist: compile_denylist(terms)?,
            backend,
        })
    }

    /// Name of the configured backend, if any.
    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.name())
    }

    /// The first denylisted term found in `text`, lowercased.
    pub fn denylist_match(&self, text: &str) -> Option<String> {
        self.denylist
            .as_ref()?
            .find(text)
            .map(|m| m.as_str().to_lowercase())
    }

    /// Run both layers and report which branch decided.
    pub async fn check(&self, text: &str) -> Verdict {
        if text.trim().is_empty() {
            return Verdict::Clean;
        }

        if let Some(term) = self.denylist_match(text) {
            debug!("safety: denylisted term '{term}'");
            return Verdict::Denylisted(term);
        }

        let Some(backend) = &self.backend else {
            return Verdict::Clean;
        };

        match backend.is_flagged(text).await {
            Ok(true) => Verdict::Flagged,
            Ok(false) => Verdict::Clean,
            Err(e) => {
                warn!("safety: {} unavailable, failing open: {e}", backend.name());
                Verdict::ModerationUnavailable
            }
        }
    }

    pub async fn is_safe(&self, text: &str) -> bool {
        self.check(text).await.is_safe()
    }
}

/// Compile denylist terms into a single `\b(?:a|b|...)\b` pattern.
fn compile_denylist(terms: &[String]) -> Result<Option<Regex>, ScribeError> {
    let alternatives: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect();

    if alternatives.is_empty() {
        return Ok(None);
    }

    let pattern = format!(r"(?i)\b(?:{})\b", alternatives.join("|"));
    Regex::new(&pattern)
        .map(Some)
        .map_err(|e| ScribeError::Config(format!("invalid denylist: {e}")))
}
