//! REST calls and the Platform trait implementation.

use super::convert::{
    callback_body, command_definitions, message_body, to_platform_message, UNRECOGNIZED_COMMAND,
};
use super::gateway;
use super::types::{DcApiError, DcChannel, DcMessage};
use super::{DiscordChannel, DiscordState};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{header::AUTHORIZATION, Method};
use scribe_core::{
    command::{InteractionHandle, InteractionResponse, ModerationAction},
    error::ScribeError,
    message::{split_message, InboundEvent, OutgoingMessage, PlatformMessage, MESSAGE_LIMIT},
    traits::Platform,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Human-readable error from a failed REST response.
pub(crate) fn api_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<DcApiError>(body) {
        Ok(err) if !err.message.is_empty() => format!("{} (HTTP {status})", err.message),
        _ => format!("HTTP {status}: {body}"),
    }
}

/// Body for `PATCH /guilds/{g}/members/{u}` applying or lifting a timeout.
pub(crate) fn timeout_body(minutes: i64, now: DateTime<Utc>) -> Value {
    if minutes <= 0 {
        return json!({ "communication_disabled_until": null });
    }
    let until = now + Duration::minutes(minutes);
    json!({ "communication_disabled_until": until.to_rfc3339() })
}

impl DiscordState {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        audit_reason: Option<&str>,
    ) -> Result<reqwest::Response, ScribeError> {
        let url = format!("{}{path}", self.api_base);
        let mut req = self
            .client
            .request(method.clone(), &url)
            .header(AUTHORIZATION, format!("Bot {}", self.token));
        if let Some(body) = body {
            req = req.json(body);
        }
        if let Some(reason) = audit_reason.filter(|r| !r.trim().is_empty()) {
            req = req.header("X-Audit-Log-Reason", urlencoding::encode(reason).into_owned());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ScribeError::Platform(format!("discord {method} {path} failed: {e}")))?;

        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        Err(ScribeError::Platform(api_error_message(status, &text)))
    }

    pub(super) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ScribeError> {
        let resp = self.request(Method::GET, path, None, None).await?;
        resp.json()
            .await
            .map_err(|e| ScribeError::Platform(format!("discord: failed to parse {path}: {e}")))
    }

    /// Bulk-overwrite the bot's commands, guild-scoped when a guild is configured.
    /// `POST /interactions/{id}/{token}/callback`.
    async fn interaction_callback(
        &self,
        interaction: &InteractionHandle,
        body: &Value,
    ) -> Result<(), ScribeError> {
        let path = format!(
            "/interactions/{}/{}/callback",
            interaction.id, interaction.token
        );
        self.request(Method::POST, &path, Some(body), None).await?;
        Ok(())
    }

    /// Answer an undecodable command privately.
    pub(super) async fn reject_interaction(&self, interaction: &InteractionHandle) {
        let response = InteractionResponse::Message {
            message: OutgoingMessage::text(UNRECOGNIZED_COMMAND),
            ephemeral: true,
        };
        let Some(body) = callback_body(&response) else {
            return;
        };
        if let Err(e) = self.interaction_callback(interaction, &body).await {
            warn!("discord: failed to answer interaction {}: {e}", interaction.id);
        }
    }

    pub(super) async fn register_commands(&self) {
        let Some(app_id) = self.application_id() else {
            warn!("discord: cannot register commands before READY");
            return;
        };
        let path = match self.guild_id {
            Some(guild) => format!("/applications/{app_id}/guilds/{guild}/commands"),
            None => format!("/applications/{app_id}/commands"),
        };
        let commands = command_definitions();
        let count = commands.as_array().map(Vec::len).unwrap_or_default();

        match self.request(Method::PUT, &path, Some(&commands), None).await {
            Ok(_) => match self.guild_id {
                Some(guild) => info!("discord: registered {count} commands in guild {guild}"),
                None => info!("discord: registered {count} global commands"),
            },
            Err(e) => warn!("discord: command registration failed: {e}"),
        }
    }
}

#[async_trait]
impl Platform for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn bot_user_id(&self) -> Option<u64> {
        self.state.bot_user_id()
    }

    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, ScribeError> {
        if self.state.running.swap(true, Ordering::SeqCst) {
            return Err(ScribeError::Platform(
                "discord gateway already running".to_string(),
            ));
        }
        self.state.shutdown.send_replace(false);

        let (tx, rx) = mpsc::channel(64);
        info!("Discord channel connecting to gateway...");
        tokio::spawn(gateway::run(Arc::clone(&self.state), tx));
        Ok(rx)
    }

    async fn send(&self, channel_id: u64, message: OutgoingMessage) -> Result<(), ScribeError> {
        let path = format!("/channels/{channel_id}/messages");
        let chunks = split_message(&message.text, MESSAGE_LIMIT);

        for (i, chunk) in chunks.into_iter().enumerate() {
            let part = OutgoingMessage {
                text: chunk.to_string(),
                embed: if i == 0 { message.embed.clone() } else { None },
                reply_to: if i == 0 { message.reply_to } else { None },
            };
            let body = message_body(&part, false);
            self.state
                .request(Method::POST, &path, Some(&body), None)
                .await?;
        }
        Ok(())
    }

    async fn respond(
        &self,
        interaction: &InteractionHandle,
        response: InteractionResponse,
    ) -> Result<(), ScribeError> {
        if let Some(body) = callback_body(&response) {
            return self.state.interaction_callback(interaction, &body).await;
        }

        if let InteractionResponse::Followup { message, ephemeral } = response {
            let app_id = self.state.application_id().ok_or_else(|| {
                ScribeError::Platform("application id unknown before READY".to_string())
            })?;
            let path = format!("/webhooks/{app_id}/{}", interaction.token);
            let body = message_body(&message, ephemeral);
            self.state
                .request(Method::POST, &path, Some(&body), None)
                .await?;
        }
        Ok(())
    }

    async fn fetch_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<PlatformMessage, ScribeError> {
        let msg: DcMessage = self
            .state
            .get_json(&format!("/channels/{channel_id}/messages/{message_id}"))
            .await?;
        Ok(to_platform_message(msg))
    }

    fn cached_channel(&self, guild_id: u64, channel_id: u64) -> Option<u64> {
        self.state.cached_channel(guild_id, channel_id)
    }

    async fn fetch_channel(&self, channel_id: u64) -> Result<u64, ScribeError> {
        let channel: DcChannel = self
            .state
            .get_json(&format!("/channels/{channel_id}"))
            .await?;
        if let Some(guild_id) = channel.guild_id {
            self.state.cache_channel(guild_id, channel.id);
        }
        Ok(channel.id)
    }

    async fn recent_messages(
        &self,
        channel_id: u64,
        limit: u8,
    ) -> Result<Vec<PlatformMessage>, ScribeError> {
        let messages: Vec<DcMessage> = self
            .state
            .get_json(&format!("/channels/{channel_id}/messages?limit={limit}"))
            .await?;
        Ok(messages.into_iter().map(to_platform_message).collect())
    }

    async fn moderate(
        &self,
        guild_id: u64,
        target_id: u64,
        action: ModerationAction,
        reason: Option<&str>,
    ) -> Result<(), ScribeError> {
        match action {
            ModerationAction::Kick => {
                let path = format!("/guilds/{guild_id}/members/{target_id}");
                self.state.request(Method::DELETE, &path, None, reason).await?;
            }
            ModerationAction::Ban => {
                let path = format!("/guilds/{guild_id}/bans/{target_id}");
                let body = json!({ "delete_message_seconds": 0 });
                self.state
                    .request(Method::PUT, &path, Some(&body), reason)
                    .await?;
            }
            ModerationAction::Timeout { minutes } => {
                let path = format!("/guilds/{guild_id}/members/{target_id}");
                let body = timeout_body(minutes, Utc::now());
                self.state
                    .request(Method::PATCH, &path, Some(&body), reason)
                    .await?;
            }
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), ScribeError> {
        self.state.shutdown.send_replace(true);
        info!("Discord channel stopped");
        Ok(())
    }
}
