//! Chat turn: a user replied to one of the bot's messages.

use super::Gateway;
use scribe_core::{
    context::{Context, Role},
    message::{OutgoingMessage, PlatformMessage},
};
use tracing::{error, info, warn};

pub(super) const REFUSE_INPUT: &str = "Sorry — I can't respond to that content.";
pub(super) const REFUSE_OUTPUT: &str = "Sorry — I can't share that content.";
pub(super) const COMPLETION_APOLOGY: &str =
    "Sorry — I'm having trouble accessing the AI service right now. Please try again later.";

/// What a chat turn produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum TurnOutcome {
    /// Input failed the safety gate; nothing was persisted.
    Refused,
    /// The reply that was persisted and sent.
    Replied(String),
}

impl Gateway {
    /// Run one chat turn and persist both sides of it.
    ///
    /// The prompt is the `context_window` most recent entries written before
    /// this turn, followed by the current message. The current message is
    /// therefore sent once, not also as the tail of the history window.
    pub(super) async fn handle_chat_turn(&self, msg: &PlatformMessage) -> TurnOutcome {
        let channel_id = msg.channel_id;
        let user_text = msg.content.as_str();

        if !self.safety.is_safe(user_text).await {
            info!("[{channel_id}] refusing unsafe input from {}", msg.author.id);
            self.send(channel_id, OutgoingMessage::text(REFUSE_INPUT))
                .await;
            return TurnOutcome::Refused;
        }

        let user_row = match self.memory.append(channel_id, Role::User, user_text).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!("[{channel_id}] failed to persist user turn: {e}");
                None
            }
        };

        // One extra row so the window still holds K entries after the
        // current user turn is dropped from it.
        let history = match self
            .memory
            .load_recent(channel_id, self.context_window + 1)
            .await
        {
            Ok(entries) => {
                let mut window: Vec<_> = entries
                    .into_iter()
                    .filter(|e| Some(e.id) != user_row)
                    .map(|e| e.to_context())
                    .collect();
                let excess = window.len().saturating_sub(self.context_window);
                window.drain(..excess);
                window
            }
            Err(e) => {
                error!("[{channel_id}] failed to load history: {e}");
                Vec::new()
            }
        };

        let context = Context::with_history(history, user_text);
        let reply = match self.completion.complete(&context).await {
            Ok(text) => text,
            Err(e) => {
                warn!("[{channel_id}] {} failed: {e}", self.completion.name());
                COMPLETION_APOLOGY.to_string()
            }
        };

        let reply = if self.safety.is_safe(&reply).await {
            reply
        } else {
            info!("[{channel_id}] withholding unsafe reply");
            REFUSE_OUTPUT.to_string()
        };

        if let Err(e) = self
            .memory
            .append(channel_id, Role::Assistant, &reply)
            .await
        {
            error!("[{channel_id}] failed to persist assistant turn: {e}");
        }

        self.send(channel_id, OutgoingMessage::reply(reply.clone(), msg.id))
            .await;
        TurnOutcome::Replied(reply)
    }
}
