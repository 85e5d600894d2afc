//! Gateway WebSocket session loop.

use super::convert::{decode_interaction, to_platform_message, DecodedInteraction};
use super::types::{
    op, DcChannel, DcGatewayBot, DcGuildCreate, DcHello, DcInteraction, DcMessage, DcReady,
    DcUnavailableGuild, GatewayPayload,
};
use super::{DiscordState, GATEWAY_INTENTS};
use futures_util::{SinkExt, StreamExt};
use scribe_core::{error::ScribeError, message::InboundEvent};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

/// Close codes after which reconnecting cannot succeed.
const FATAL_CLOSE_CODES: [u16; 6] = [4004, 4010, 4011, 4012, 4013, 4014];

#[derive(Debug, PartialEq, Eq)]
pub(super) enum SessionEnd {
    Reconnect,
    Stopped,
    Fatal(String),
}

/// Keep a gateway session alive until shutdown or the receiver is dropped.
pub(super) async fn run(state: Arc<DiscordState>, tx: mpsc::Sender<InboundEvent>) {
    let mut backoff_secs: u64 = 1;

    loop {
        match session(&state, &tx).await {
            Ok(SessionEnd::Stopped) => break,
            Ok(SessionEnd::Fatal(reason)) => {
                error!("discord: gateway closed permanently: {reason}");
                break;
            }
            Ok(SessionEnd::Reconnect) => {
                info!("discord: reconnecting to gateway");
                backoff_secs = 1;
            }
            Err(e) => {
                error!("discord gateway error (retry in {backoff_secs}s): {e}");
            }
        }

        if *state.shutdown.borrow() || tx.is_closed() {
            break;
        }
        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
        backoff_secs = (backoff_secs * 2).min(60);
    }

    state.running.store(false, Ordering::SeqCst);
    info!("discord: gateway loop ended");
}

pub(super) fn identify_payload(token: &str) -> Value {
    json!({
        "op": op::IDENTIFY,
        "d": {
            "token": token,
            "intents": GATEWAY_INTENTS,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "scribe",
                "device": "scribe",
            },
        },
    })
}

pub(super) fn close_outcome(frame: Option<CloseFrame<'_>>) -> SessionEnd {
    match frame {
        Some(frame) if FATAL_CLOSE_CODES.contains(&u16::from(frame.code)) => SessionEnd::Fatal(
            format!("close code {}: {}", u16::from(frame.code), frame.reason),
        ),
        _ => SessionEnd::Reconnect,
    }
}

async fn gateway_url(state: &DiscordState) -> Result<String, ScribeError> {
    let bot: DcGatewayBot = state.get_json("/gateway/bot").await?;
    Ok(format!("{}/?v=10&encoding=json", bot.url.trim_end_matches('/')))
}

async fn session(
    state: &Arc<DiscordState>,
    tx: &mpsc::Sender<InboundEvent>,
) -> Result<SessionEnd, ScribeError> {
    let mut shutdown = state.shutdown.subscribe();
    if *shutdown.borrow() {
        return Ok(SessionEnd::Stopped);
    }

    let url = gateway_url(state).await?;
    debug!("discord: connecting to {url}");
    let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| ScribeError::Platform(format!("gateway connect failed: {e}")))?;
    let (mut write, mut read) = ws.split();

    let hello = match read.next().await {
        Some(Ok(WsMessage::Text(text))) => serde_json::from_str::<GatewayPayload>(&text)?,
        other => {
            return Err(ScribeError::Platform(format!(
                "expected Hello from gateway, got {other:?}"
            )))
        }
    };
    if hello.op != op::HELLO {
        return Err(ScribeError::Platform(format!(
            "expected Hello (op 10), got op {}",
            hello.op
        )));
    }
    let hello: DcHello = serde_json::from_value(hello.d)?;

    send(&mut write, identify_payload(&state.token)).await?;

    let mut heartbeat = tokio::time::interval(Duration::from_millis(hello.heartbeat_interval));
    heartbeat.tick().await;
    let mut seq: Option<u64> = None;
    let mut awaiting_ack = false;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if awaiting_ack {
                    warn!("discord: heartbeat not acknowledged");
                    return Ok(SessionEnd::Reconnect);
                }
                send(&mut write, json!({ "op": op::HEARTBEAT, "d": seq })).await?;
                awaiting_ack = true;
            }
            _ = shutdown.changed() => {
                let _ = write.send(WsMessage::Close(None)).await;
                return Ok(SessionEnd::Stopped);
            }
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(frame))) => return Ok(close_outcome(frame)),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        return Err(ScribeError::Platform(format!("gateway read failed: {e}")))
                    }
                    None => return Ok(SessionEnd::Reconnect),
                };

                let payload: GatewayPayload = match serde_json::from_str(&text) {
                    Ok(p) => p,
                    Err(e) => {
                        debug!("discord: unparseable gateway frame: {e}");
                        continue;
                    }
                };
                if payload.s.is_some() {
                    seq = payload.s;
                }

                match payload.op {
                    op::DISPATCH => {
                        let event = payload.t.unwrap_or_default();
                        if !dispatch(state, &event, payload.d, tx).await {
                            return Ok(SessionEnd::Stopped);
                        }
                    }
                    op::HEARTBEAT => {
                        send(&mut write, json!({ "op": op::HEARTBEAT, "d": seq })).await?;
                    }
                    op::HEARTBEAT_ACK => awaiting_ack = false,
                    op::RECONNECT | op::INVALID_SESSION => return Ok(SessionEnd::Reconnect),
                    other => debug!("discord: ignoring gateway op {other}"),
                }
            }
        }
    }
}

async fn send<S>(write: &mut S, payload: Value) -> Result<(), ScribeError>
where
    S: futures_util::Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    write
        .send(WsMessage::Text(payload.to_string()))
        .await
        .map_err(|e| ScribeError::Platform(format!("gateway write failed: {e}")))
}

fn parse<T: DeserializeOwned>(event: &str, d: Value) -> Option<T> {
    match serde_json::from_value(d) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("discord: failed to parse {event}: {e}");
            None
        }
    }
}

/// Handle one dispatch event. Returns `false` once the receiver is gone.
pub(super) async fn dispatch(
    state: &Arc<DiscordState>,
    event: &str,
    d: Value,
    tx: &mpsc::Sender<InboundEvent>,
) -> bool {
    match event {
        "READY" => {
            let Some(ready) = parse::<DcReady>(event, d) else {
                return true;
            };
            state.bot_user_id.store(ready.user.id, Ordering::SeqCst);
            state
                .application_id
                .store(ready.application.id, Ordering::SeqCst);
            info!(
                "discord: connected as {} ({})",
                ready.user.username, ready.user.id
            );
            let state = Arc::clone(state);
            tokio::spawn(async move { state.register_commands().await });
        }
        "GUILD_CREATE" => {
            if let Some(guild) = parse::<DcGuildCreate>(event, d) {
                let channels = guild.channels.iter().chain(&guild.threads).map(|c| c.id);
                state.cache_guild(guild.id, channels);
            }
        }
        "GUILD_DELETE" => {
            if let Some(guild) = parse::<DcUnavailableGuild>(event, d) {
                state.forget_guild(guild.id);
            }
        }
        "CHANNEL_CREATE" | "THREAD_CREATE" => {
            if let Some(DcChannel {
                id,
                guild_id: Some(guild_id),
            }) = parse::<DcChannel>(event, d)
            {
                state.cache_channel(guild_id, id);
            }
        }
        "CHANNEL_DELETE" | "THREAD_DELETE" => {
            if let Some(DcChannel {
                id,
                guild_id: Some(guild_id),
            }) = parse::<DcChannel>(event, d)
            {
                state.forget_channel(guild_id, id);
            }
        }
        "MESSAGE_CREATE" => {
            if let Some(msg) = parse::<DcMessage>(event, d) {
                let msg = to_platform_message(msg);
                if tx.send(InboundEvent::Message(msg)).await.is_err() {
                    debug!("discord: event receiver dropped");
                    return false;
                }
            }
        }
        "INTERACTION_CREATE" => {
            let Some(interaction) = parse::<DcInteraction>(event, d) else {
                return true;
            };
            match decode_interaction(interaction) {
                DecodedInteraction::Invocation(invocation) => {
                    if tx.send(InboundEvent::Command(invocation)).await.is_err() {
                        debug!("discord: event receiver dropped");
                        return false;
                    }
                }
                DecodedInteraction::Unrecognized(handle) => {
                    let state = Arc::clone(state);
                    tokio::spawn(async move { state.reject_interaction(&handle).await });
                }
                DecodedInteraction::Ignored => {}
            }
        }
        _ => {}
    }
    true
}
