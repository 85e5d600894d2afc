//! Discord API deserialization types.
//!
//! Only the fields the bot reads are modeled. Snowflakes arrive as strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

/// Gateway opcodes.
pub(crate) mod op {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Interaction type for slash commands and context menus.
pub(crate) const INTERACTION_APPLICATION_COMMAND: u8 = 2;

/// Application command types.
pub(crate) const COMMAND_CHAT_INPUT: u8 = 1;
pub(crate) const COMMAND_MESSAGE: u8 = 3;

fn snowflake<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(d)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn optional_snowflake<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    match Option::<String>::deserialize(d)? {
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcHello {
    pub heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcGatewayBot {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcReady {
    pub user: DcUser,
    pub application: DcApplication,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcApplication {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DcUser {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DcMember {
    #[serde(default)]
    pub user: Option<DcUser>,
    #[serde(default)]
    pub nick: Option<String>,
    /// Computed permission bitset, present on interaction members.
    #[serde(default)]
    pub permissions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DcMessage {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    #[serde(deserialize_with = "snowflake")]
    pub channel_id: u64,
    #[serde(default, deserialize_with = "optional_snowflake")]
    pub guild_id: Option<u64>,
    pub author: DcUser,
    #[serde(default)]
    pub member: Option<DcMember>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub referenced_message: Option<Box<DcMessage>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcChannel {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    #[serde(default, deserialize_with = "optional_snowflake")]
    pub guild_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcGuildCreate {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    #[serde(default)]
    pub channels: Vec<DcChannel>,
    #[serde(default)]
    pub threads: Vec<DcChannel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcUnavailableGuild {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcInteraction {
    #[serde(deserialize_with = "snowflake")]
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<DcCommandData>,
    #[serde(default, deserialize_with = "optional_snowflake")]
    pub guild_id: Option<u64>,
    #[serde(default, deserialize_with = "optional_snowflake")]
    pub channel_id: Option<u64>,
    #[serde(default)]
    pub member: Option<DcMember>,
    /// Set instead of `member` outside guilds.
    #[serde(default)]
    pub user: Option<DcUser>,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcCommandData {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub options: Vec<DcOption>,
    #[serde(default)]
    pub resolved: DcResolved,
    #[serde(default, deserialize_with = "optional_snowflake")]
    pub target_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DcOption {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// Objects referenced by command options, keyed by snowflake string.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct DcResolved {
    #[serde(default)]
    pub users: HashMap<String, DcUser>,
    #[serde(default)]
    pub members: HashMap<String, DcMember>,
    #[serde(default)]
    pub messages: HashMap<String, DcMessage>,
}

/// Error body returned by the REST API.
#[derive(Debug, Deserialize)]
pub(crate) struct DcApiError {
    #[serde(default)]
    pub message: String,
}
