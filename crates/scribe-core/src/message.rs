use serde::{Deserialize, Serialize};

use crate::command::Invocation;

/// Maximum length of a single Discord message.
pub const MESSAGE_LIMIT: usize = 2000;

/// The author of a platform message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    pub display_name: String,
    /// Whether the author is any bot account (including this one).
    pub is_bot: bool,
}

/// A message as seen on the platform, either delivered or fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformMessage {
    pub id: u64,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub author: Author,
    pub content: String,
    /// The resolved message this one replies to, if any.
    #[serde(default)]
    pub referenced: Option<Box<PlatformMessage>>,
}

impl PlatformMessage {
    /// Whether this message replies directly to a message authored by `user_id`.
    pub fn is_reply_to(&self, user_id: u64) -> bool {
        self.referenced
            .as_ref()
            .is_some_and(|r| r.author.id == user_id)
    }
}

/// Everything the platform delivers to the gateway.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A regular channel message.
    Message(PlatformMessage),
    /// A slash command or context-menu invocation.
    Command(Invocation),
}

/// A rich embed (title, link, colored side bar, fields).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub url: Option<String>,
    pub color: u32,
    pub thumbnail: Option<String>,
    /// `(name, value)` pairs.
    pub fields: Vec<(String, String)>,
    pub footer: Option<String>,
}

/// An outgoing message to post in a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub embed: Option<Embed>,
    /// Post as a reply to this message ID.
    #[serde(default)]
    pub reply_to: Option<u64>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn reply(text: impl Into<String>, message_id: u64) -> Self {
        Self {
            text: text.into(),
            embed: None,
            reply_to: Some(message_id),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Default::default()
        }
    }
}

/// Split text into chunks of at most `max_len` bytes, preferring newline
/// boundaries and never cutting through a UTF-8 character.
pub fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let break_at = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|i| start + i + 1)
                .unwrap_or(end)
        } else {
            end
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(id: u64) -> Author {
        Author {
            id,
            display_name: format!("user{id}"),
            is_bot: false,
        }
    }

    #[test]
    fn test_split_short_message() {
        let chunks = split_message("hello", MESSAGE_LIMIT);
        assert_eq!(chunks, vec!["hello"]);
    }

    #[test]
    fn test_split_long_message_on_newlines() {
        let text = "a\n".repeat(1500);
        let chunks = split_message(&text, MESSAGE_LIMIT);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.len() <= MESSAGE_LIMIT);
            assert!(chunk.ends_with('\n'));
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let text = "é".repeat(1500);
        let chunks = split_message(&text, MESSAGE_LIMIT);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.len() <= MESSAGE_LIMIT));
    }

    #[test]
    fn test_is_reply_to() {
        let parent = PlatformMessage {
            id: 1,
            channel_id: 10,
            guild_id: None,
            author: author(99),
            content: "hi".into(),
            referenced: None,
        };
        let child = PlatformMessage {
            id: 2,
            channel_id: 10,
            guild_id: None,
            author: author(5),
            content: "hello back".into(),
            referenced: Some(Box::new(parent.clone())),
        };
        assert!(child.is_reply_to(99));
        assert!(!child.is_reply_to(5));
        assert!(!parent.is_reply_to(99));
    }
}
