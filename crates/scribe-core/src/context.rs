use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ScribeError;

/// Fixed instruction prepended to every completion request.
pub const SYSTEM_PROMPT: &str =
    "You are a friendly, helpful assistant. Always be polite and avoid profanity.";

/// Who produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ScribeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(ScribeError::Storage(format!("unknown role: {other}"))),
        }
    }
}

/// A single entry in the conversation window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub role: Role,
    pub content: String,
}

/// Conversation context passed to a completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    /// System prompt prepended to every request.
    pub system_prompt: String,
    /// Conversation window (oldest first).
    pub history: Vec<ContextEntry>,
    /// The current user message.
    pub current_message: String,
}

/// A structured message for API-based backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl Context {
    /// Create a context with the default system prompt and no history.
    pub fn new(message: &str) -> Self {
        Self::with_history(Vec::new(), message)
    }

    /// Create a context from a loaded window and the new user turn.
    pub fn with_history(history: Vec<ContextEntry>, message: &str) -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            history,
            current_message: message.to_string(),
        }
    }

    /// The ordered prompt: system instruction, history oldest-first, then
    /// the new user turn.
    pub fn to_api_messages(&self) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);

        if !self.system_prompt.is_empty() {
            messages.push(ApiMessage {
                role: "system".to_string(),
                content: self.system_prompt.clone(),
            });
        }

        for entry in &self.history {
            messages.push(ApiMessage {
                role: entry.role.as_str().to_string(),
                content: entry.content.clone(),
            });
        }

        messages.push(ApiMessage {
            role: Role::User.as_str().to_string(),
            content: self.current_message.clone(),
        });

        messages
    }
}
