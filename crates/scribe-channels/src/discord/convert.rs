//! Conversions between Discord payloads and scribe's platform-neutral types.

use super::types::{
    DcCommandData, DcInteraction, DcMember, DcMessage, DcUser, COMMAND_CHAT_INPUT,
    COMMAND_MESSAGE, INTERACTION_APPLICATION_COMMAND,
};
use scribe_core::{
    command::{
        names, InteractionResponse, Invocation, InteractionHandle, Invoker, Member,
        MemberPermissions, ModerationAction, RepairMode, SlashCommand,
    },
    message::{Author, Embed, OutgoingMessage, PlatformMessage},
};
use serde_json::{json, Map, Value};
use tracing::warn;

const KICK_MEMBERS: u64 = 1 << 1;
const BAN_MEMBERS: u64 = 1 << 2;
const ADMINISTRATOR: u64 = 1 << 3;
const MODERATE_MEMBERS: u64 = 1 << 40;

/// Message flag that limits a response to the invoking user.
const EPHEMERAL: u64 = 1 << 6;

/// Interaction callback types.
const CALLBACK_CHANNEL_MESSAGE: u8 = 4;
const CALLBACK_DEFERRED_CHANNEL_MESSAGE: u8 = 5;

// Application command option types.
const OPTION_STRING: u8 = 3;
const OPTION_INTEGER: u8 = 4;
const OPTION_USER: u8 = 6;

/// Server nickname, then global display name, then username.
pub(crate) fn display_name(user: &DcUser, member: Option<&DcMember>) -> String {
    member
        .and_then(|m| m.nick.clone())
        .or_else(|| user.global_name.clone())
        .unwrap_or_else(|| user.username.clone())
}

pub(crate) fn to_platform_message(msg: DcMessage) -> PlatformMessage {
    let display_name = display_name(&msg.author, msg.member.as_ref());
    PlatformMessage {
        id: msg.id,
        channel_id: msg.channel_id,
        guild_id: msg.guild_id,
        author: Author {
            id: msg.author.id,
            display_name,
            is_bot: msg.author.bot,
        },
        content: msg.content,
        referenced: msg
            .referenced_message
            .map(|r| Box::new(to_platform_message(*r))),
    }
}

/// Decode the computed permission bitset of an interaction member.
pub(crate) fn parse_permissions(raw: Option<&str>) -> MemberPermissions {
    let bits = raw.and_then(|r| r.parse::<u64>().ok()).unwrap_or(0);
    let has = |flag: u64| bits & ADMINISTRATOR != 0 || bits & flag != 0;
    MemberPermissions {
        kick_members: has(KICK_MEMBERS),
        ban_members: has(BAN_MEMBERS),
        moderate_members: has(MODERATE_MEMBERS),
    }
}

fn option<'a>(data: &'a DcCommandData, name: &str) -> Option<&'a Value> {
    data.options
        .iter()
        .find(|o| o.name == name)
        .map(|o| &o.value)
}

fn string_option(data: &DcCommandData, name: &str) -> Option<String> {
    option(data, name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .filter(|s| !s.trim().is_empty())
}

fn resolve_member(data: &DcCommandData) -> Option<Member> {
    let key = option(data, "member")?.as_str()?;
    let user = data.resolved.users.get(key)?;
    Some(Member {
        id: user.id,
        display_name: display_name(user, data.resolved.members.get(key)),
    })
}

fn decode_moderation(data: &DcCommandData) -> Option<SlashCommand> {
    let action = match data.name.as_str() {
        names::KICK => ModerationAction::Kick,
        names::BAN => ModerationAction::Ban,
        names::TIMEOUT => ModerationAction::Timeout {
            minutes: option(data, "minutes")?.as_i64()?,
        },
        _ => return None,
    };
    Some(SlashCommand::Moderate {
        target: resolve_member(data)?,
        action,
        reason: string_option(data, "reason"),
    })
}

fn decode_command(data: &DcCommandData, guild_id: Option<u64>) -> Option<SlashCommand> {
    if data.kind == COMMAND_MESSAGE {
        let mode = match data.name.as_str() {
            names::EDIT_MESSAGE_MENU => RepairMode::Terse,
            names::EDIT_ARTICLE_MENU => RepairMode::Article,
            _ => return None,
        };
        let key = data.target_id?.to_string();
        let mut target = to_platform_message(data.resolved.messages.get(&key)?.clone());
        target.guild_id = target.guild_id.or(guild_id);
        return Some(SlashCommand::RepairMessage {
            target: Box::new(target),
            mode,
        });
    }

    match data.name.as_str() {
        names::EDIT => Some(SlashCommand::Repair {
            identifier: string_option(data, "message_identifier"),
            mode: RepairMode::Terse,
        }),
        names::EDIT_ARTICLE => Some(SlashCommand::Repair {
            identifier: string_option(data, "message_identifier"),
            mode: RepairMode::Article,
        }),
        names::ADVERTISE_BOOK => Some(SlashCommand::AdvertiseBook),
        names::ADVERTISE_LOGOS => Some(SlashCommand::AdvertiseLogos),
        _ => decode_moderation(data),
    }
}

/// Ephemeral answer to a command that could not be decoded.
pub(crate) const UNRECOGNIZED_COMMAND: &str = "Sorry, I couldn't understand that command.";

/// Result of decoding an `INTERACTION_CREATE` payload.
#[derive(Debug)]
pub(crate) enum DecodedInteraction {
    Invocation(Invocation),
    /// An application command that could not be decoded. It still needs an
    /// answer or Discord reports the interaction as failed.
    Unrecognized(InteractionHandle),
    /// Not an application command.
    Ignored,
}

pub(crate) fn decode_interaction(interaction: DcInteraction) -> DecodedInteraction {
    if interaction.kind != INTERACTION_APPLICATION_COMMAND {
        return DecodedInteraction::Ignored;
    }
    let handle = InteractionHandle {
        id: interaction.id,
        token: interaction.token.clone(),
    };

    match decode_invocation(&interaction, handle.clone()) {
        Some(invocation) => DecodedInteraction::Invocation(invocation),
        None => {
            warn!(
                "discord: could not decode command '{}'",
                interaction.data.as_ref().map_or("?", |d| d.name.as_str())
            );
            DecodedInteraction::Unrecognized(handle)
        }
    }
}

/// `None` for unknown commands and for missing required arguments.
fn decode_invocation(interaction: &DcInteraction, handle: InteractionHandle) -> Option<Invocation> {
    let data = interaction.data.as_ref()?;
    let channel_id = interaction.channel_id?;

    let (user, member) = match (&interaction.member, &interaction.user) {
        (Some(member), _) => (member.user.as_ref()?, Some(member)),
        (None, Some(user)) => (user, None),
        (None, None) => return None,
    };

    let command = decode_command(data, interaction.guild_id)?;

    Some(Invocation {
        interaction: handle,
        channel_id,
        guild_id: interaction.guild_id,
        invoker: Invoker {
            id: user.id,
            display_name: display_name(user, member),
            permissions: parse_permissions(member.and_then(|m| m.permissions.as_deref())),
        },
        command,
    })
}

fn embed_json(embed: &Embed) -> Value {
    let mut obj = Map::new();
    obj.insert("title".into(), json!(embed.title));
    obj.insert("description".into(), json!(embed.description));
    obj.insert("color".into(), json!(embed.color));
    if let Some(url) = &embed.url {
        obj.insert("url".into(), json!(url));
    }
    if let Some(thumb) = &embed.thumbnail {
        obj.insert("thumbnail".into(), json!({ "url": thumb }));
    }
    if !embed.fields.is_empty() {
        let fields: Vec<Value> = embed
            .fields
            .iter()
            .map(|(name, value)| json!({ "name": name, "value": value, "inline": false }))
            .collect();
        obj.insert("fields".into(), Value::Array(fields));
    }
    if let Some(footer) = &embed.footer {
        obj.insert("footer".into(), json!({ "text": footer }));
    }
    Value::Object(obj)
}

/// JSON body for a channel message, interaction message, or follow-up.
pub(crate) fn message_body(message: &OutgoingMessage, ephemeral: bool) -> Value {
    let mut obj = Map::new();
    if !message.text.is_empty() {
        obj.insert("content".into(), json!(message.text));
    }
    if let Some(embed) = &message.embed {
        obj.insert("embeds".into(), json!([embed_json(embed)]));
    }
    if let Some(id) = message.reply_to {
        obj.insert(
            "message_reference".into(),
            json!({ "message_id": id.to_string(), "fail_if_not_exists": false }),
        );
    }
    if ephemeral {
        obj.insert("flags".into(), json!(EPHEMERAL));
    }
    Value::Object(obj)
}

/// Body for `POST /interactions/{id}/{token}/callback`.
///
/// Returns `None` for follow-ups, which go to the webhook endpoint instead.
pub(crate) fn callback_body(response: &InteractionResponse) -> Option<Value> {
    match response {
        InteractionResponse::Defer => Some(json!({ "type": CALLBACK_DEFERRED_CHANNEL_MESSAGE })),
        InteractionResponse::Message { message, ephemeral } => Some(json!({
            "type": CALLBACK_CHANNEL_MESSAGE,
            "data": message_body(message, *ephemeral),
        })),
        InteractionResponse::Followup { .. } => None,
    }
}

/// Every command the bot registers, as a bulk-overwrite payload.
pub(crate) fn command_definitions() -> Value {
    let identifier = |description: &str| {
        json!([{
            "type": OPTION_STRING,
            "name": "message_identifier",
            "description": description,
            "required": false,
        }])
    };
    let member = |description: &str| {
        json!({ "type": OPTION_USER, "name": "member", "description": description, "required": true })
    };
    let reason = |description: &str| {
        json!({ "type": OPTION_STRING, "name": "reason", "description": description, "required": false })
    };

    json!([
        {
            "type": COMMAND_CHAT_INPUT,
            "name": names::EDIT,
            "description": "Edit a message for typos/grammar. Use as context menu or provide a message link/ID.",
            "options": identifier("Message link or ID (optional). If omitted, the bot will try to infer a recent message."),
        },
        {
            "type": COMMAND_CHAT_INPUT,
            "name": names::EDIT_ARTICLE,
            "description": "Rewrite an article for clarity and grammar. Use as context menu or give message link/ID.",
            "options": identifier("Message link or ID (optional)."),
        },
        {
            "type": COMMAND_CHAT_INPUT,
            "name": names::ADVERTISE_BOOK,
            "description": "Post the promotional embed for the book.",
        },
        {
            "type": COMMAND_CHAT_INPUT,
            "name": names::ADVERTISE_LOGOS,
            "description": "Post the promotional embed for logoscompany.store",
        },
        {
            "type": COMMAND_CHAT_INPUT,
            "name": names::KICK,
            "description": "Kick a user. Provide a reason if you want.",
            "options": [member("Member to kick"), reason("Reason for kick (optional)")],
        },
        {
            "type": COMMAND_CHAT_INPUT,
            "name": names::BAN,
            "description": "Ban a user. Provide a reason if you want.",
            "options": [member("Member to ban"), reason("Reason for ban (optional)")],
        },
        {
            "type": COMMAND_CHAT_INPUT,
            "name": names::TIMEOUT,
            "description": "Put a user in timeout for a number of minutes.",
            "options": [
                member("Member to timeout"),
                {
                    "type": OPTION_INTEGER,
                    "name": "minutes",
                    "description": "Duration in minutes (0 to remove timeout)",
                    "required": true,
                },
                reason("Reason (optional)"),
            ],
        },
        { "type": COMMAND_MESSAGE, "name": names::EDIT_MESSAGE_MENU },
        { "type": COMMAND_MESSAGE, "name": names::EDIT_ARTICLE_MENU },
    ])
}
