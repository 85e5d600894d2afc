//! Text repair flow for `/edit`, `/editarticle`, and their context-menu twins.

use super::Gateway;
use scribe_core::{
    command::{InteractionResponse, Invocation, RepairMode},
    message::{OutgoingMessage, PlatformMessage},
};
use tracing::{debug, info};

pub(super) const NOT_FOUND_TERSE: &str = "Couldn't find the target message. You can use the message context menu (right-click message -> Apps -> Edit message (AI)) or provide a message link/ID.";
pub(super) const NOT_FOUND_ARTICLE: &str =
    "Couldn't find the target message. Use the message context menu or provide a message link/ID.";
pub(super) const BOT_TARGET: &str = "I won't edit bot messages.";
pub(super) const UNSAFE_TARGET: &str =
    "The target message contains disallowed content and cannot be edited.";
pub(super) const UNSAFE_MENU_TARGET: &str =
    "The message contains disallowed content and cannot be edited.";

fn not_found(mode: RepairMode) -> &'static str {
    match mode {
        RepairMode::Terse => NOT_FOUND_TERSE,
        RepairMode::Article => NOT_FOUND_ARTICLE,
    }
}

pub(super) fn acknowledgement(mode: RepairMode) -> &'static str {
    match mode {
        RepairMode::Terse => "Sure! I'll edit that message for typos and grammar and post the improved version below.",
        RepairMode::Article => "I'll rewrite the article for clarity, flow, and grammar and post it below.",
    }
}

/// The repaired text attributed to the requester.
pub(super) fn attributed(mode: RepairMode, requester: &str, text: &str) -> String {
    match mode {
        RepairMode::Terse => format!("**Edited (by {requester}):**\n{text}"),
        RepairMode::Article => format!("**Article rewrite (by {requester}):**\n{text}"),
    }
}

impl Gateway {
    /// Slash-command variant: the target comes from the identifier or is inferred.
    pub(super) async fn handle_repair(
        &self,
        inv: &Invocation,
        identifier: Option<&str>,
        mode: RepairMode,
    ) {
        self.respond(inv, InteractionResponse::Defer).await;

        let Some((reference, target)) = self.resolve_target(inv.channel_id, identifier).await
        else {
            self.followup(inv, not_found(mode)).await;
            return;
        };
        debug!("repair: resolved {} via {reference:?}", target.id);

        self.repair_target(inv, &target, mode, UNSAFE_TARGET).await;
    }

    /// Context-menu variant: the target message is pre-bound.
    pub(super) async fn handle_repair_message(
        &self,
        inv: &Invocation,
        target: &PlatformMessage,
        mode: RepairMode,
    ) {
        self.respond(inv, InteractionResponse::Defer).await;
        self.repair_target(inv, target, mode, UNSAFE_MENU_TARGET)
            .await;
    }

    async fn repair_target(
        &self,
        inv: &Invocation,
        target: &PlatformMessage,
        mode: RepairMode,
        unsafe_reply: &str,
    ) {
        if target.author.is_bot {
            self.followup(inv, BOT_TARGET).await;
            return;
        }
        if !self.safety.is_safe(&target.content).await {
            self.followup(inv, unsafe_reply).await;
            return;
        }

        let repair = self.repairer.repair(&target.content, mode).await;
        info!(
            "[{}] repaired message {} ({:?})",
            inv.channel_id, target.id, repair.source
        );

        self.followup(inv, acknowledgement(mode)).await;
        let text = attributed(mode, &inv.invoker.display_name, &repair.text);
        self.send(inv.channel_id, OutgoingMessage::text(text)).await;
    }
}
