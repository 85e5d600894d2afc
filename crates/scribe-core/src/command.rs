//! Slash-command and context-menu invocations, decoded into platform-neutral values.

use serde::{Deserialize, Serialize};

use crate::message::{OutgoingMessage, PlatformMessage};

/// Registered names for every command the bot exposes.
pub mod names {
    pub const EDIT: &str = "edit";
    pub const EDIT_ARTICLE: &str = "editarticle";
    pub const ADVERTISE_BOOK: &str = "advertisebook";
    pub const ADVERTISE_LOGOS: &str = "advertiselogos";
    pub const KICK: &str = "kick";
    pub const BAN: &str = "ban";
    pub const TIMEOUT: &str = "timeout";
    pub const EDIT_MESSAGE_MENU: &str = "Edit message (AI)";
    pub const EDIT_ARTICLE_MENU: &str = "Edit article (AI)";
}

/// Opaque handle used to answer an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionHandle {
    pub id: u64,
    pub token: String,
}

/// Role grants relevant to moderation, snapshotted at invocation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPermissions {
    pub kick_members: bool,
    pub ban_members: bool,
    pub moderate_members: bool,
}

/// The user who triggered an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub id: u64,
    pub display_name: String,
    pub permissions: MemberPermissions,
}

/// A guild member targeted by a moderation command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: u64,
    pub display_name: String,
}

impl Member {
    /// Platform mention markup for this member.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }
}

/// Rewrite style requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepairMode {
    /// Typo and grammar fixes.
    Terse,
    /// Long-form rewrite for clarity and flow.
    Article,
}

/// Moderation action with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationAction {
    Kick,
    Ban,
    /// `minutes == 0` lifts an existing timeout.
    Timeout { minutes: i64 },
}

impl ModerationAction {
    /// Verb used in user-facing messages and the audit log.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Ban => "ban",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Whether the given role grants allow this action.
    pub fn permitted_by(&self, permissions: &MemberPermissions) -> bool {
        match self {
            Self::Kick => permissions.kick_members,
            Self::Ban => permissions.ban_members,
            Self::Timeout { .. } => permissions.moderate_members,
        }
    }

    /// Phrase used in the confirmation line ("I'll {phrase} {target}").
    pub fn confirmation_phrase(&self) -> String {
        match self {
            Self::Timeout { minutes } => format!("timeout for {minutes} minutes"),
            other => other.verb().to_string(),
        }
    }
}

/// A moderation command, ready for permission checks and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationRequest {
    pub actor: Invoker,
    pub target: Member,
    pub action: ModerationAction,
    pub reason: Option<String>,
}

impl ModerationRequest {
    /// Role grants or the configured owner bypass.
    pub fn is_authorized(&self, owner: Option<u64>) -> bool {
        self.action.permitted_by(&self.actor.permissions) || owner == Some(self.actor.id)
    }

    /// Reason text for user-facing messages.
    pub fn reason_or(&self, fallback: &str) -> String {
        self.reason
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

/// Decoded command payload.
#[derive(Debug, Clone)]
pub enum SlashCommand {
    /// `/edit` or `/editarticle` with an optional message link/ID.
    Repair {
        identifier: Option<String>,
        mode: RepairMode,
    },
    /// Context-menu variant with the target message pre-bound.
    RepairMessage {
        target: Box<PlatformMessage>,
        mode: RepairMode,
    },
    AdvertiseBook,
    AdvertiseLogos,
    Moderate {
        target: Member,
        action: ModerationAction,
        reason: Option<String>,
    },
}

/// A full command invocation as delivered by the platform.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub interaction: InteractionHandle,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub invoker: Invoker,
    pub command: SlashCommand,
}

/// A response to an interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionResponse {
    /// Acknowledge now and show a "thinking" indicator.
    Defer,
    /// The initial response.
    Message {
        message: OutgoingMessage,
        ephemeral: bool,
    },
    /// A follow-up after `Defer` or an initial `Message`.
    Followup {
        message: OutgoingMessage,
        ephemeral: bool,
    },
}
