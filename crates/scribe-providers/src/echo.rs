//! Local completion stand-in used when no API key is configured.

use async_trait::async_trait;
use scribe_core::{context::Context, error::ScribeError, traits::CompletionBackend};

/// Deterministic echo reply. Never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoProvider;

/// The reply the echo backend produces for `text`.
pub fn echo_reply(text: &str) -> String {
    format!(
        "You said: {text}\n\n(You can enable smarter replies by adding OPENAI_API_KEY to your .env.)"
    )
}

#[async_trait]
impl CompletionBackend for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn complete(&self, context: &Context) -> Result<String, ScribeError> {
        Ok(echo_reply(&context.current_message))
    }

    async fn is_available(&self) -> bool {
        true
    }
}
