//! Gateway: the event loop connecting the platform, the text services, and memory.
//!
//! Every inbound event is handled on its own task. Handlers never return
//! errors: each external failure degrades to a fallback or a user-facing
//! message at the call site.

mod chat;
mod moderation;
mod repair;
mod resolver;

#[cfg(test)]
mod tests;

use crate::promo;
use crate::provider_builder::Backends;
use scribe_core::{
    command::{InteractionResponse, Invocation, ModerationRequest, SlashCommand},
    config::{Config, ModerationConfig},
    message::{Embed, InboundEvent, OutgoingMessage},
    repair::TextRepairer,
    safety::SafetyGate,
    traits::{CompletionBackend, Platform},
};
use scribe_memory::{ModerationAudit, Store};
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Routes platform events to the chat, repair, moderation, and promo flows.
pub struct Gateway {
    pub(super) platform: Arc<dyn Platform>,
    pub(super) completion: Arc<dyn CompletionBackend>,
    pub(super) safety: SafetyGate,
    pub(super) repairer: TextRepairer,
    pub(super) memory: Store,
    pub(super) audit: ModerationAudit,
    /// Identity allowed to moderate without role grants.
    pub(super) owner: Option<u64>,
    /// History entries fed to each completion request.
    pub(super) context_window: usize,
    pub(super) moderation: ModerationConfig,
}

impl Gateway {
    pub fn new(
        platform: Arc<dyn Platform>,
        backends: Backends,
        memory: Store,
        cfg: &Config,
    ) -> Self {
        let audit = ModerationAudit::new(memory.pool().clone());
        Self {
            platform,
            completion: backends.completion,
            safety: backends.safety,
            repairer: backends.repairer,
            memory,
            audit,
            owner: cfg.discord.owner(),
            context_window: cfg.memory.context_window,
            moderation: cfg.moderation.clone(),
        }
    }

    /// Run the main event loop until Ctrl-C or the platform feed closes.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "Scribe gateway running | platform: {} | completion: {} | moderation: {} | grammar: {}",
            self.platform.name(),
            self.completion.name(),
            self.safety.backend_name().unwrap_or("denylist only"),
            self.repairer.engine_name().unwrap_or("local fallback"),
        );

        let mut rx = self
            .platform
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start {}: {e}", self.platform.name()))?;

        let mut handlers = JoinSet::new();
        loop {
            tokio::select! {
                event = rx.recv() => {
                    let Some(event) = event else {
                        warn!("platform event feed closed");
                        break;
                    };
                    self.spawn_handler(&mut handlers, event);
                }
                Some(done) = handlers.join_next(), if !handlers.is_empty() => {
                    log_handler_exit(done);
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        drop(rx);
        self.shutdown(handlers).await;
        Ok(())
    }

    /// Handle one event on its own task, tracked in `handlers`.
    pub(super) fn spawn_handler(self: &Arc<Self>, handlers: &mut JoinSet<()>, event: InboundEvent) {
        let gw = Arc::clone(self);
        handlers.spawn(async move { gw.dispatch_event(event).await });
    }

    /// Let in-flight handlers finish, then stop the platform and close the store.
    pub(super) async fn shutdown(&self, mut handlers: JoinSet<()>) {
        if !handlers.is_empty() {
            info!("waiting for {} in-flight handlers", handlers.len());
        }
        while let Some(done) = handlers.join_next().await {
            log_handler_exit(done);
        }

        if let Err(e) = self.platform.stop().await {
            warn!("failed to stop {}: {e}", self.platform.name());
        }
        self.memory.close().await;
        info!("Scribe shut down");
    }

    /// Single entry point for every inbound event.
    pub(super) async fn dispatch_event(&self, event: InboundEvent) {
        match event {
            InboundEvent::Message(msg) => {
                if msg.author.is_bot {
                    return;
                }
                let Some(bot_id) = self.platform.bot_user_id() else {
                    debug!("ignoring message received before ready");
                    return;
                };
                if !msg.is_reply_to(bot_id) {
                    return;
                }
                info!(
                    "[{}] {} replied: {}",
                    msg.channel_id,
                    msg.author.display_name,
                    preview(&msg.content)
                );
                self.handle_chat_turn(&msg).await;
            }
            InboundEvent::Command(invocation) => self.handle_command(invocation).await,
        }
    }

    async fn handle_command(&self, inv: Invocation) {
        info!(
            "[{}] {} invoked {}",
            inv.channel_id,
            inv.invoker.display_name,
            command_label(&inv.command)
        );

        match &inv.command {
            SlashCommand::Repair { identifier, mode } => {
                self.handle_repair(&inv, identifier.as_deref(), *mode)
                    .await
            }
            SlashCommand::RepairMessage { target, mode } => {
                self.handle_repair_message(&inv, target, *mode).await
            }
            SlashCommand::AdvertiseBook => self.handle_promo(&inv, promo::book_embed()).await,
            SlashCommand::AdvertiseLogos => self.handle_promo(&inv, promo::logos_embed()).await,
            SlashCommand::Moderate {
                target,
                action,
                reason,
            } => {
                let request = ModerationRequest {
                    actor: inv.invoker.clone(),
                    target: target.clone(),
                    action: *action,
                    reason: reason.clone(),
                };
                self.handle_moderation(&inv, request).await;
            }
        }
    }

    async fn handle_promo(&self, inv: &Invocation, embed: Embed) {
        self.respond(inv, InteractionResponse::Defer).await;
        self.respond(
            inv,
            InteractionResponse::Followup {
                message: OutgoingMessage::embed(embed),
                ephemeral: false,
            },
        )
        .await;
    }

    /// Answer an interaction, logging failures.
    pub(super) async fn respond(&self, inv: &Invocation, response: InteractionResponse) {
        if let Err(e) = self.platform.respond(&inv.interaction, response).await {
            warn!("interaction {} response failed: {e}", inv.interaction.id);
        }
    }

    pub(super) async fn followup(&self, inv: &Invocation, text: &str) {
        self.respond(
            inv,
            InteractionResponse::Followup {
                message: OutgoingMessage::text(text),
                ephemeral: false,
            },
        )
        .await;
    }

    /// Initial response visible only to the invoking user.
    pub(super) async fn reply_ephemeral(&self, inv: &Invocation, text: &str) {
        self.respond(
            inv,
            InteractionResponse::Message {
                message: OutgoingMessage::text(text),
                ephemeral: true,
            },
        )
        .await;
    }

    /// Post in a channel, logging failures.
    pub(super) async fn send(&self, channel_id: u64, message: OutgoingMessage) {
        if let Err(e) = self.platform.send(channel_id, message).await {
            warn!("send to channel {channel_id} failed: {e}");
        }
    }
}

fn log_handler_exit(result: Result<(), JoinError>) {
    if let Err(e) = result {
        error!("event handler aborted: {e}");
    }
}

fn command_label(command: &SlashCommand) -> String {
    match command {
        SlashCommand::Repair { mode, .. } => format!("repair ({mode:?})"),
        SlashCommand::RepairMessage { mode, .. } => format!("repair menu ({mode:?})"),
        SlashCommand::AdvertiseBook => "advertisebook".to_string(),
        SlashCommand::AdvertiseLogos => "advertiselogos".to_string(),
        SlashCommand::Moderate { action, target, .. } => {
            format!("{} on {}", action.verb(), target.id)
        }
    }
}

/// First 60 characters of `text`, for logs.
fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(60).collect();
    if text.chars().nth(60).is_some() {
        out.push_str("...");
    }
    out
}
