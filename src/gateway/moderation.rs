//! Kick, ban, and timeout.
//!
//! Requested -> permission checked -> confirmed -> executed (success or failure).
//! A rejected request never reaches the confirmation.

use super::Gateway;
use scribe_core::{
    command::{InteractionResponse, Invocation, ModerationAction, ModerationRequest},
    error::ScribeError,
    message::OutgoingMessage,
};
use scribe_memory::{AuditEntry, AuditOutcome};
use std::time::Duration;
use tracing::{error, info, warn};

pub(super) const GUILD_ONLY: &str = "This command can only be used in a server.";

/// Where a moderation request stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ModerationOutcome {
    Denied,
    InvalidDuration,
    NotInGuild,
    Succeeded,
    /// The platform rejected the action; carries its reason.
    Failed(String),
}

pub(super) fn confirmation(request: &ModerationRequest) -> String {
    format!(
        "Sure! I’ll {} {} immediately for **{}**.",
        request.action.confirmation_phrase(),
        request.target.display_name,
        request.reason_or("no reason provided")
    )
}

pub(super) fn success_message(request: &ModerationRequest) -> String {
    let mention = request.target.mention();
    let reason = request.reason_or("No reason provided.");
    match request.action {
        ModerationAction::Kick => format!("{mention} has been kicked. Reason: {reason}"),
        ModerationAction::Ban => format!("{mention} has been banned. Reason: {reason}"),
        ModerationAction::Timeout { minutes: 0 } => {
            format!("{mention} timeout removed. Reason: {reason}")
        }
        ModerationAction::Timeout { minutes } => {
            format!("{mention} has been timed out for {minutes} minutes. Reason: {reason}")
        }
    }
}

/// The platform's own wording, without the error-kind prefix.
fn failure_reason(err: &ScribeError) -> String {
    match err {
        ScribeError::Platform(reason) => reason.clone(),
        other => other.to_string(),
    }
}

impl Gateway {
    pub(super) async fn handle_moderation(
        &self,
        inv: &Invocation,
        request: ModerationRequest,
    ) -> ModerationOutcome {
        let verb = request.action.verb();

        if !request.is_authorized(self.owner) {
            info!(
                "[{}] {} denied {verb} on {}",
                inv.channel_id, request.actor.id, request.target.id
            );
            self.reply_ephemeral(inv, &format!("You don't have permission to {verb} members."))
                .await;
            return ModerationOutcome::Denied;
        }

        if let ModerationAction::Timeout { minutes } = request.action {
            let max = self.moderation.max_timeout_minutes;
            if !(0..=max).contains(&minutes) {
                self.reply_ephemeral(inv, &format!("Minutes must be between 0 and {max}."))
                    .await;
                return ModerationOutcome::InvalidDuration;
            }
        }

        let Some(guild_id) = inv.guild_id else {
            self.reply_ephemeral(inv, GUILD_ONLY).await;
            return ModerationOutcome::NotInGuild;
        };

        self.respond(
            inv,
            InteractionResponse::Message {
                message: OutgoingMessage::text(confirmation(&request)),
                ephemeral: false,
            },
        )
        .await;

        if self.moderation.confirmation_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.moderation.confirmation_delay_ms)).await;
        }

        let result = self
            .platform
            .moderate(
                guild_id,
                request.target.id,
                request.action,
                request.reason.as_deref(),
            )
            .await;

        let (outcome, text) = match result {
            Ok(()) => {
                info!("[{guild_id}] {verb} applied to {}", request.target.id);
                (ModerationOutcome::Succeeded, success_message(&request))
            }
            Err(e) => {
                let reason = failure_reason(&e);
                warn!("[{guild_id}] {verb} on {} failed: {reason}", request.target.id);
                let text = format!(
                    "Failed to {verb} {}: {reason}",
                    request.target.display_name
                );
                (ModerationOutcome::Failed(reason), text)
            }
        };
        self.send(inv.channel_id, OutgoingMessage::text(text)).await;

        let entry = AuditEntry {
            guild_id,
            channel_id: inv.channel_id,
            actor_id: request.actor.id,
            target_id: request.target.id,
            action: verb.to_string(),
            minutes: match request.action {
                ModerationAction::Timeout { minutes } => Some(minutes),
                _ => None,
            },
            reason: request.reason.clone(),
            outcome: match outcome {
                ModerationOutcome::Succeeded => AuditOutcome::Success,
                _ => AuditOutcome::Failure,
            },
            detail: match &outcome {
                ModerationOutcome::Failed(reason) => Some(reason.clone()),
                _ => None,
            },
        };
        if let Err(e) = self.audit.log(&entry).await {
            error!("[{guild_id}] failed to write moderation audit entry: {e}");
        }

        outcome
    }
}
