//! Discord channel.
//!
//! Receives events over the Gateway WebSocket and answers through the REST API.
//! Docs: <https://discord.com/developers/docs/reference>

mod convert;
mod gateway;
mod rest;
pub(crate) mod types;


use scribe_core::config::DiscordConfig;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// GUILDS | GUILD_MEMBERS | GUILD_MESSAGES | MESSAGE_CONTENT
const GATEWAY_INTENTS: u64 = (1 << 0) | (1 << 1) | (1 << 9) | (1 << 15);

/// Connection state shared between the gateway task and the REST side.
pub(crate) struct DiscordState {
    token: String,
    /// Register commands in this guild only (instant propagation).
    guild_id: Option<u64>,
    api_base: String,
    client: reqwest::Client,
    /// 0 until `READY` arrives.
    bot_user_id: AtomicU64,
    application_id: AtomicU64,
    /// Channel IDs per guild, learned from `GUILD_CREATE` and channel events.
    guild_channels: RwLock<HashMap<u64, HashSet<u64>>>,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl DiscordState {
    fn new(config: &DiscordConfig, api_base: &str) -> Self {
        Self {
            token: config.token.clone(),
            guild_id: config.guild_id,
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            bot_user_id: AtomicU64::new(0),
            application_id: AtomicU64::new(0),
            guild_channels: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
            shutdown: watch::channel(false).0,
        }
    }

    fn bot_user_id(&self) -> Option<u64> {
        Some(self.bot_user_id.load(Ordering::SeqCst)).filter(|id| *id != 0)
    }

    fn application_id(&self) -> Option<u64> {
        Some(self.application_id.load(Ordering::SeqCst)).filter(|id| *id != 0)
    }

    fn cache_guild(&self, guild_id: u64, channels: impl IntoIterator<Item = u64>) {
        if let Ok(mut cache) = self.guild_channels.write() {
            cache.insert(guild_id, channels.into_iter().collect());
        }
    }

    fn forget_guild(&self, guild_id: u64) {
        if let Ok(mut cache) = self.guild_channels.write() {
            cache.remove(&guild_id);
        }
    }

    fn cache_channel(&self, guild_id: u64, channel_id: u64) {
        if let Ok(mut cache) = self.guild_channels.write() {
            cache.entry(guild_id).or_default().insert(channel_id);
        }
    }

    fn forget_channel(&self, guild_id: u64, channel_id: u64) {
        if let Ok(mut cache) = self.guild_channels.write() {
            if let Some(channels) = cache.get_mut(&guild_id) {
                channels.remove(&channel_id);
            }
        }
    }

    fn cached_channel(&self, guild_id: u64, channel_id: u64) -> Option<u64> {
        let cache = self.guild_channels.read().ok()?;
        cache
            .get(&guild_id)
            .filter(|channels| channels.contains(&channel_id))
            .map(|_| channel_id)
    }
}

/// Discord bot connection.
pub struct DiscordChannel {
    state: Arc<DiscordState>,
}

impl DiscordChannel {
    /// Create a new Discord channel from config.
    pub fn new(config: &DiscordConfig) -> Self {
        Self::with_api_base(config, DISCORD_API_BASE)
    }

    /// Point the REST client at a different API root.
    pub fn with_api_base(config: &DiscordConfig, api_base: &str) -> Self {
        Self {
            state: Arc::new(DiscordState::new(config, api_base)),
        }
    }
}
