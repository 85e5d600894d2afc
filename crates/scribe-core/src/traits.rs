use crate::{
    command::{InteractionHandle, InteractionResponse, ModerationAction},
    context::Context,
    error::ScribeError,
    message::{InboundEvent, OutgoingMessage, PlatformMessage},
};
use async_trait::async_trait;

/// Chat-completion backend.
///
/// Selected once at startup: a live API client when a key is configured,
/// otherwise the deterministic local echo variant.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Whether this backend calls an external service.
    fn is_live(&self) -> bool;

    /// Send the prompt and return the reply text.
    async fn complete(&self, context: &Context) -> Result<String, ScribeError>;

    /// Check if the backend is reachable.
    async fn is_available(&self) -> bool;
}

/// External content classification service.
#[async_trait]
pub trait ModerationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Returns `true` when the service flags the text.
    async fn is_flagged(&self, text: &str) -> Result<bool, ScribeError>;
}

/// External grammar-correction engine.
#[async_trait]
pub trait GrammarEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Return the corrected text.
    async fn correct(&self, text: &str) -> Result<String, ScribeError>;
}

/// Chat platform client: inbound event feed plus the outbound response API.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Human-readable platform name.
    fn name(&self) -> &str;

    /// The bot's own user ID, known once the connection is ready.
    fn bot_user_id(&self) -> Option<u64>;

    /// Start listening. Returns a receiver that yields inbound events.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<InboundEvent>, ScribeError>;

    /// Post a message in a channel.
    async fn send(&self, channel_id: u64, message: OutgoingMessage) -> Result<(), ScribeError>;

    /// Answer an interaction (defer, initial response, or follow-up).
    async fn respond(
        &self,
        interaction: &InteractionHandle,
        response: InteractionResponse,
    ) -> Result<(), ScribeError>;

    /// Fetch one message by ID from a channel.
    async fn fetch_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<PlatformMessage, ScribeError>;

    /// Look a channel up in cached guild state.
    fn cached_channel(&self, guild_id: u64, channel_id: u64) -> Option<u64>;

    /// Look a channel up with a live request.
    async fn fetch_channel(&self, channel_id: u64) -> Result<u64, ScribeError>;

    /// The most recent messages in a channel, newest first.
    async fn recent_messages(
        &self,
        channel_id: u64,
        limit: u8,
    ) -> Result<Vec<PlatformMessage>, ScribeError>;

    /// Apply a moderation action to a guild member.
    async fn moderate(
        &self,
        guild_id: u64,
        target_id: u64,
        action: ModerationAction,
        reason: Option<&str>,
    ) -> Result<(), ScribeError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), ScribeError>;
}
