//! Locates the message a repair command targets.
//!
//! Resolution order, each step short-circuiting on success:
//! 1. a bare numeric ID, fetched from the invoking channel
//! 2. a message link, whose channel comes from cache or a live lookup
//! 3. the most recent message in the invoking channel not written by a bot
//!
//! Lookup failures at any step fall through to the next one.

use super::Gateway;
use once_cell::sync::Lazy;
use regex::Regex;
use scribe_core::message::PlatformMessage;
use tracing::debug;

static MESSAGE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"channels/(\d+)/(\d+)/(\d+)").unwrap());

/// How many recent messages the inference step scans.
const LOOKBACK: u8 = 10;

/// How a target message was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MessageReference {
    MessageId(u64),
    Link {
        guild_id: u64,
        channel_id: u64,
        message_id: u64,
    },
    /// Most recent non-bot message in the invoking channel.
    Inferred,
}

/// Classify a user-supplied identifier. Bare digits win over the link pattern.
pub(super) fn parse_identifier(identifier: &str) -> Option<MessageReference> {
    let identifier = identifier.trim();
    if !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit()) {
        return identifier.parse().ok().map(MessageReference::MessageId);
    }

    let caps = MESSAGE_LINK.captures(identifier)?;
    Some(MessageReference::Link {
        guild_id: caps[1].parse().ok()?,
        channel_id: caps[2].parse().ok()?,
        message_id: caps[3].parse().ok()?,
    })
}

impl Gateway {
    pub(super) async fn resolve_target(
        &self,
        channel_id: u64,
        identifier: Option<&str>,
    ) -> Option<(MessageReference, PlatformMessage)> {
        if let Some(reference) = identifier.and_then(parse_identifier) {
            if let Some(msg) = self.fetch_reference(channel_id, reference).await {
                return Some((reference, msg));
            }
        }

        let recent = match self.platform.recent_messages(channel_id, LOOKBACK).await {
            Ok(messages) => messages,
            Err(e) => {
                debug!("resolver: recent messages in {channel_id} unavailable: {e}");
                return None;
            }
        };
        recent
            .into_iter()
            .find(|m| !m.author.is_bot)
            .map(|m| (MessageReference::Inferred, m))
    }

    async fn fetch_reference(
        &self,
        current_channel: u64,
        reference: MessageReference,
    ) -> Option<PlatformMessage> {
        let (channel_id, message_id) = match reference {
            MessageReference::MessageId(message_id) => (current_channel, message_id),
            MessageReference::Link {
                guild_id,
                channel_id,
                message_id,
            } => {
                let channel = match self.platform.cached_channel(guild_id, channel_id) {
                    Some(channel) => channel,
                    None => match self.platform.fetch_channel(channel_id).await {
                        Ok(channel) => channel,
                        Err(e) => {
                            debug!("resolver: channel {channel_id} lookup failed: {e}");
                            return None;
                        }
                    },
                };
                (channel, message_id)
            }
            MessageReference::Inferred => return None,
        };

        match self.platform.fetch_message(channel_id, message_id).await {
            Ok(msg) => Some(msg),
            Err(e) => {
                debug!("resolver: message {message_id} in {channel_id} not found: {e}");
                None
            }
        }
    }
}
