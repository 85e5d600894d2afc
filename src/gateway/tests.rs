use super::chat::{TurnOutcome, COMPLETION_APOLOGY, REFUSE_INPUT, REFUSE_OUTPUT};
use super::moderation::GUILD_ONLY;
use super::repair::{BOT_TARGET, NOT_FOUND_TERSE, UNSAFE_MENU_TARGET, UNSAFE_TARGET};
use super::resolver::MessageReference;
use super::*;
use async_trait::async_trait;
use scribe_core::{
    command::{
        InteractionHandle, Invoker, Member, MemberPermissions, ModerationAction, RepairMode,
    },
    context::{ApiMessage, Context, Role},
    error::ScribeError,
    message::{Author, PlatformMessage},
};
use scribe_providers::echo::{echo_reply, EchoProvider};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const BOT_ID: u64 = 1;
const OWNER_ID: u64 = 99;
const CHANNEL: u64 = 500;
const GUILD: u64 = 600;

// --- Mocks ---

type ModerateCall = (u64, u64, ModerationAction, Option<String>);

#[derive(Default)]
struct MockPlatform {
    /// Fetchable messages keyed by (channel, message).
    messages: HashMap<(u64, u64), PlatformMessage>,
    /// Recent messages per channel, newest first.
    recent: HashMap<u64, Vec<PlatformMessage>>,
    cached: HashSet<(u64, u64)>,
    /// Channels a live lookup can find.
    live_channels: HashSet<u64>,
    moderate_error: Option<String>,

    sent: Mutex<Vec<(u64, OutgoingMessage)>>,
    responses: Mutex<Vec<InteractionResponse>>,
    fetches: Mutex<Vec<(u64, u64)>>,
    channel_lookups: Mutex<Vec<u64>>,
    moderations: Mutex<Vec<ModerateCall>>,
}

impl MockPlatform {
    fn sent(&self) -> Vec<(u64, OutgoingMessage)> {
        self.sent.lock().unwrap().clone()
    }

    fn responses(&self) -> Vec<InteractionResponse> {
        self.responses.lock().unwrap().clone()
    }

    fn moderations(&self) -> Vec<ModerateCall> {
        self.moderations.lock().unwrap().clone()
    }

    fn followup_texts(&self) -> Vec<String> {
        self.responses()
            .into_iter()
            .filter_map(|r| match r {
                InteractionResponse::Followup { message, .. } => Some(message.text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn name(&self) -> &str {
        "mock"
    }

    fn bot_user_id(&self) -> Option<u64> {
        Some(BOT_ID)
    }

    async fn start(&self) -> Result<mpsc::Receiver<InboundEvent>, ScribeError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, channel_id: u64, message: OutgoingMessage) -> Result<(), ScribeError> {
        self.sent.lock().unwrap().push((channel_id, message));
        Ok(())
    }

    async fn respond(
        &self,
        _interaction: &InteractionHandle,
        response: InteractionResponse,
    ) -> Result<(), ScribeError> {
        self.responses.lock().unwrap().push(response);
        Ok(())
    }

    async fn fetch_message(
        &self,
        channel_id: u64,
        message_id: u64,
    ) -> Result<PlatformMessage, ScribeError> {
        self.fetches.lock().unwrap().push((channel_id, message_id));
        self.messages
            .get(&(channel_id, message_id))
            .cloned()
            .ok_or_else(|| ScribeError::Platform("Unknown Message (HTTP 404)".into()))
    }

    fn cached_channel(&self, guild_id: u64, channel_id: u64) -> Option<u64> {
        self.cached
            .contains(&(guild_id, channel_id))
            .then_some(channel_id)
    }

    async fn fetch_channel(&self, channel_id: u64) -> Result<u64, ScribeError> {
        self.channel_lookups.lock().unwrap().push(channel_id);
        if self.live_channels.contains(&channel_id) {
            Ok(channel_id)
        } else {
            Err(ScribeError::Platform("Unknown Channel (HTTP 404)".into()))
        }
    }

    async fn recent_messages(
        &self,
        channel_id: u64,
        limit: u8,
    ) -> Result<Vec<PlatformMessage>, ScribeError> {
        Ok(self
            .recent
            .get(&channel_id)
            .map(|m| m.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn moderate(
        &self,
        guild_id: u64,
        target_id: u64,
        action: ModerationAction,
        reason: Option<&str>,
    ) -> Result<(), ScribeError> {
        self.moderations.lock().unwrap().push((
            guild_id,
            target_id,
            action,
            reason.map(str::to_string),
        ));
        match &self.moderate_error {
            Some(e) => Err(ScribeError::Platform(e.clone())),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> Result<(), ScribeError> {
        Ok(())
    }
}

/// Completion backend with a fixed result that records every prompt.
struct MockCompletion {
    reply: Result<String, String>,
    prompts: Mutex<Vec<Vec<ApiMessage>>>,
}

impl MockCompletion {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: Err("connection refused".to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl CompletionBackend for MockCompletion {
    fn name(&self) -> &str {
        "mock-completion"
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<String, ScribeError> {
        self.prompts
            .lock()
            .unwrap()
            .push(context.to_api_messages());
        self.reply.clone().map_err(ScribeError::Provider)
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Completion backend that takes a while to answer.
struct SlowCompletion(Duration);

#[async_trait]
impl CompletionBackend for SlowCompletion {
    fn name(&self) -> &str {
        "slow-completion"
    }

    fn is_live(&self) -> bool {
        true
    }

    async fn complete(&self, context: &Context) -> Result<String, ScribeError> {
        tokio::time::sleep(self.0).await;
        Ok(format!("late reply to {}", context.current_message))
    }

    async fn is_available(&self) -> bool {
        true
    }
}

// --- Fixtures ---

fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.discord.owner_id = OWNER_ID;
    cfg.memory.db_path = ":memory:".to_string();
    cfg.memory.context_window = 4;
    cfg.moderation.confirmation_delay_ms = 0;
    cfg
}

async fn gateway_with_config(
    cfg: &Config,
    platform: Arc<MockPlatform>,
    completion: Arc<dyn CompletionBackend>,
) -> Gateway {
    let memory = Store::new(&cfg.memory).await.unwrap();
    let backends = Backends {
        completion,
        safety: SafetyGate::new(&cfg.safety.denylist, None).unwrap(),
        repairer: TextRepairer::default(),
    };
    Gateway::new(platform, backends, memory, cfg)
}

async fn gateway(platform: Arc<MockPlatform>, completion: Arc<dyn CompletionBackend>) -> Gateway {
    gateway_with_config(&test_config(), platform, completion).await
}

fn author(id: u64, name: &str, is_bot: bool) -> Author {
    Author {
        id,
        display_name: name.to_string(),
        is_bot,
    }
}

fn message(id: u64, author: Author, content: &str) -> PlatformMessage {
    PlatformMessage {
        id,
        channel_id: CHANNEL,
        guild_id: Some(GUILD),
        author,
        content: content.to_string(),
        referenced: None,
    }
}

/// A human reply to one of the bot's messages.
fn reply_to_bot(id: u64, content: &str) -> PlatformMessage {
    let mut msg = message(id, author(10, "alice", false), content);
    msg.referenced = Some(Box::new(message(id - 1, author(BOT_ID, "scribe", true), "hi")));
    msg
}

fn invocation(command: SlashCommand, permissions: MemberPermissions) -> Invocation {
    Invocation {
        interaction: InteractionHandle {
            id: 777,
            token: "tok".into(),
        },
        channel_id: CHANNEL,
        guild_id: Some(GUILD),
        invoker: Invoker {
            id: 10,
            display_name: "Alice".into(),
            permissions,
        },
        command,
    }
}

/// A moderation command against member 77 ("Target").
fn moderate(action: ModerationAction, reason: Option<&str>) -> SlashCommand {
    SlashCommand::Moderate {
        target: Member {
            id: 77,
            display_name: "Target".into(),
        },
        action,
        reason: reason.map(str::to_string),
    }
}

fn moderate_perms() -> MemberPermissions {
    MemberPermissions {
        kick_members: true,
        ban_members: true,
        moderate_members: true,
    }
}

// --- Chat turn ---

#[tokio::test]
async fn test_chat_turn_appends_user_then_assistant() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let msg = reply_to_bot(101, "how are you");
    let outcome = gw.handle_chat_turn(&msg).await;

    let expected = echo_reply("how are you");
    assert_eq!(outcome, TurnOutcome::Replied(expected.clone()));

    let rows = gw.memory.load_recent(CHANNEL, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].role, Role::User);
    assert_eq!(rows[0].content, "how are you");
    assert_eq!(rows[1].role, Role::Assistant);
    assert_eq!(rows[1].content, expected);

    let sent = platform.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, CHANNEL);
    assert_eq!(sent[0].1, OutgoingMessage::reply(expected, 101));
}

#[tokio::test]
async fn test_chat_turn_completion_error_sends_and_persists_apology() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), MockCompletion::failing()).await;

    let outcome = gw.handle_chat_turn(&reply_to_bot(101, "hello?")).await;
    assert_eq!(outcome, TurnOutcome::Replied(COMPLETION_APOLOGY.to_string()));

    let rows = gw.memory.load_recent(CHANNEL, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].content, COMPLETION_APOLOGY);
    assert_eq!(platform.sent()[0].1.text, COMPLETION_APOLOGY);
}

#[tokio::test]
async fn test_chat_turn_refuses_denylisted_input() {
    let platform = Arc::new(MockPlatform::default());
    let completion = MockCompletion::replying("never used");
    let gw = gateway(platform.clone(), completion.clone()).await;

    let outcome = gw.handle_chat_turn(&reply_to_bot(101, "you BADWORD1")).await;
    assert_eq!(outcome, TurnOutcome::Refused);

    assert_eq!(gw.memory.count_entries(Some(CHANNEL)).await.unwrap(), 0);
    assert!(completion.prompts.lock().unwrap().is_empty());
    let sent = platform.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, OutgoingMessage::text(REFUSE_INPUT));
}

#[tokio::test]
async fn test_chat_turn_replaces_unsafe_reply() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), MockCompletion::replying("well badword2 to you")).await;

    let outcome = gw.handle_chat_turn(&reply_to_bot(101, "say something")).await;
    assert_eq!(outcome, TurnOutcome::Replied(REFUSE_OUTPUT.to_string()));

    let rows = gw.memory.load_recent(CHANNEL, 10).await.unwrap();
    assert_eq!(rows[1].content, REFUSE_OUTPUT);
    assert!(!platform.sent()[0].1.text.contains("badword2"));
}

#[tokio::test]
async fn test_chat_prompt_window_excludes_current_turn() {
    let platform = Arc::new(MockPlatform::default());
    let completion = MockCompletion::replying("fine");
    let gw = gateway(platform.clone(), completion.clone()).await;

    for i in 0..6 {
        let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
        gw.memory.append(CHANNEL, role, &format!("old{i}")).await.unwrap();
    }

    gw.handle_chat_turn(&reply_to_bot(101, "current")).await;

    let prompts = completion.prompts.lock().unwrap();
    let prompt = &prompts[0];
    let contents: Vec<&str> = prompt.iter().map(|m| m.content.as_str()).collect();
    // System prompt, the 4-entry window oldest-first, then the new turn once.
    assert_eq!(prompt.len(), 6);
    assert_eq!(prompt[0].role, "system");
    assert_eq!(&contents[1..], &["old2", "old3", "old4", "old5", "current"]);
    assert_eq!(contents.iter().filter(|c| **c == "current").count(), 1);
}

#[tokio::test]
async fn test_plain_messages_are_ignored_unless_replying_to_bot() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    // Not a reply.
    let msg = message(200, author(10, "alice", false), "hello everyone");
    gw.dispatch_event(InboundEvent::Message(msg)).await;

    // A reply, but to another human.
    let mut msg = message(201, author(10, "alice", false), "agreed");
    msg.referenced = Some(Box::new(message(199, author(11, "bob", false), "hm")));
    gw.dispatch_event(InboundEvent::Message(msg)).await;

    // A bot replying to the bot.
    let mut msg = reply_to_bot(203, "beep");
    msg.author = author(12, "otherbot", true);
    gw.dispatch_event(InboundEvent::Message(msg)).await;

    assert!(platform.sent().is_empty());
    assert_eq!(gw.memory.count_entries(None).await.unwrap(), 0);

    gw.dispatch_event(InboundEvent::Message(reply_to_bot(205, "hi bot")))
        .await;
    assert_eq!(platform.sent().len(), 1);
    assert_eq!(gw.memory.count_entries(None).await.unwrap(), 2);
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_chat_turn() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = test_config();
    cfg.memory.db_path = dir.path().join("memory.db").to_string_lossy().into_owned();

    let platform = Arc::new(MockPlatform::default());
    let completion = Arc::new(SlowCompletion(Duration::from_millis(200)));
    let gw = Arc::new(gateway_with_config(&cfg, platform.clone(), completion).await);

    let mut handlers = JoinSet::new();
    gw.spawn_handler(&mut handlers, InboundEvent::Message(reply_to_bot(101, "hi")));
    tokio::time::sleep(Duration::from_millis(50)).await;
    gw.shutdown(handlers).await;

    assert_eq!(platform.sent().len(), 1);
    assert_eq!(platform.sent()[0].1.text, "late reply to hi");

    let reopened = Store::new(&cfg.memory).await.unwrap();
    let rows = reopened.load_recent(CHANNEL, 10).await.unwrap();
    let turns: Vec<(Role, &str)> = rows.iter().map(|r| (r.role, r.content.as_str())).collect();
    assert_eq!(
        turns,
        vec![(Role::User, "hi"), (Role::Assistant, "late reply to hi")]
    );
    reopened.close().await;
}

// --- Identifier resolution and repair ---

#[tokio::test]
async fn test_edit_without_identifier_picks_latest_human_message() {
    let mut platform = MockPlatform::default();
    platform.recent.insert(
        CHANNEL,
        vec![
            message(302, author(BOT_ID, "scribe", true), "I am the bot"),
            message(301, author(10, "bob", false), "this  is a test . it works"),
            message(300, author(11, "carol", false), "older"),
        ],
    );
    let platform = Arc::new(platform);
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let inv = invocation(
        SlashCommand::Repair {
            identifier: None,
            mode: RepairMode::Terse,
        },
        MemberPermissions::default(),
    );
    gw.handle_command(inv).await;

    let responses = platform.responses();
    assert_eq!(responses[0], InteractionResponse::Defer);
    assert_eq!(
        platform.followup_texts(),
        vec![super::repair::acknowledgement(RepairMode::Terse).to_string()]
    );

    let sent = platform.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.text, "**Edited (by Alice):**\nThis is a test. It works");
}

#[tokio::test]
async fn test_numeric_identifier_takes_precedence() {
    let id = 123456789012345678;
    let mut platform = MockPlatform::default();
    platform.messages.insert(
        (CHANNEL, id),
        message(id, author(10, "bob", false), "exact target"),
    );
    platform.recent.insert(
        CHANNEL,
        vec![message(1, author(11, "carol", false), "recent message")],
    );
    let platform = Arc::new(platform);
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let (reference, msg) = gw
        .resolve_target(CHANNEL, Some("123456789012345678"))
        .await
        .unwrap();
    assert_eq!(reference, MessageReference::MessageId(id));
    assert_eq!(msg.content, "exact target");
    assert_eq!(*platform.fetches.lock().unwrap(), vec![(CHANNEL, id)]);
    assert!(platform.channel_lookups.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_link_uses_cache_then_live_lookup() {
    let mut platform = MockPlatform::default();
    platform.cached.insert((GUILD, 42));
    platform.live_channels.insert(43);
    platform
        .messages
        .insert((42, 1), message(1, author(10, "bob", false), "in cached"));
    platform
        .messages
        .insert((43, 2), message(2, author(10, "bob", false), "in fetched"));
    let platform = Arc::new(platform);
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let cached_link = format!("https://discord.com/channels/{GUILD}/42/1");
    let (_, msg) = gw
        .resolve_target(CHANNEL, Some(cached_link.as_str()))
        .await
        .unwrap();
    assert_eq!(msg.content, "in cached");
    assert!(platform.channel_lookups.lock().unwrap().is_empty());

    let live_link = format!("https://discord.com/channels/{GUILD}/43/2");
    let (reference, msg) = gw
        .resolve_target(CHANNEL, Some(live_link.as_str()))
        .await
        .unwrap();
    assert_eq!(msg.content, "in fetched");
    assert_eq!(*platform.channel_lookups.lock().unwrap(), vec![43]);
    assert!(matches!(reference, MessageReference::Link { channel_id: 43, .. }));
}

#[tokio::test]
async fn test_failed_lookup_falls_back_to_inference() {
    let mut platform = MockPlatform::default();
    platform.recent.insert(
        CHANNEL,
        vec![message(9, author(10, "bob", false), "fallback target")],
    );
    let platform = Arc::new(platform);
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let (reference, msg) = gw.resolve_target(CHANNEL, Some("555")).await.unwrap();
    assert_eq!(reference, MessageReference::Inferred);
    assert_eq!(msg.id, 9);

    let (reference, _) = gw
        .resolve_target(CHANNEL, Some("https://discord.com/channels/1/404/5"))
        .await
        .unwrap();
    assert_eq!(reference, MessageReference::Inferred);
}

#[tokio::test]
async fn test_edit_not_found() {
    let mut platform = MockPlatform::default();
    platform.recent.insert(
        CHANNEL,
        vec![message(1, author(BOT_ID, "scribe", true), "only bots here")],
    );
    let platform = Arc::new(platform);
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let inv = invocation(
        SlashCommand::Repair {
            identifier: Some("nonsense".into()),
            mode: RepairMode::Terse,
        },
        MemberPermissions::default(),
    );
    gw.handle_command(inv).await;

    assert_eq!(platform.followup_texts(), vec![NOT_FOUND_TERSE.to_string()]);
    assert!(platform.sent().is_empty());
}

#[tokio::test]
async fn test_repair_rejects_bot_authored_target() {
    let mut platform = MockPlatform::default();
    platform.messages.insert(
        (CHANNEL, 5),
        message(5, author(BOT_ID, "scribe", true), "my own words"),
    );
    let platform = Arc::new(platform);
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let inv = invocation(
        SlashCommand::Repair {
            identifier: Some("5".into()),
            mode: RepairMode::Article,
        },
        MemberPermissions::default(),
    );
    gw.handle_command(inv).await;

    assert_eq!(platform.followup_texts(), vec![BOT_TARGET.to_string()]);
    assert!(platform.sent().is_empty());
}

#[tokio::test]
async fn test_repair_rejects_unsafe_target() {
    let mut platform = MockPlatform::default();
    platform.messages.insert(
        (CHANNEL, 5),
        message(5, author(10, "bob", false), "badword1 everywhere"),
    );
    let platform = Arc::new(platform);
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let inv = invocation(
        SlashCommand::Repair {
            identifier: Some("5".into()),
            mode: RepairMode::Terse,
        },
        MemberPermissions::default(),
    );
    gw.handle_command(inv).await;
    assert_eq!(platform.followup_texts(), vec![UNSAFE_TARGET.to_string()]);

    let target = message(6, author(10, "bob", false), "more badword2");
    let inv = invocation(
        SlashCommand::RepairMessage {
            target: Box::new(target),
            mode: RepairMode::Terse,
        },
        MemberPermissions::default(),
    );
    gw.handle_command(inv).await;
    assert_eq!(platform.followup_texts()[1], UNSAFE_MENU_TARGET);
    assert!(platform.sent().is_empty());
}

#[tokio::test]
async fn test_context_menu_article_rewrite() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let target = message(8, author(10, "bob", false), "long   article text , really");
    let inv = invocation(
        SlashCommand::RepairMessage {
            target: Box::new(target),
            mode: RepairMode::Article,
        },
        MemberPermissions::default(),
    );
    gw.handle_command(inv).await;

    assert_eq!(
        platform.followup_texts(),
        vec!["I'll rewrite the article for clarity, flow, and grammar and post it below.".to_string()]
    );
    assert_eq!(
        platform.sent()[0].1.text,
        "**Article rewrite (by Alice):**\nLong article text, really"
    );
}

// --- Moderation ---

#[tokio::test]
async fn test_timeout_out_of_range_is_rejected() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let inv = invocation(
        moderate(ModerationAction::Timeout { minutes: 50000 }, None),
        moderate_perms(),
    );
    gw.handle_command(inv).await;

    assert!(platform.moderations().is_empty());
    assert!(platform.sent().is_empty());
    assert_eq!(
        platform.responses(),
        vec![InteractionResponse::Message {
            message: OutgoingMessage::text("Minutes must be between 0 and 40320."),
            ephemeral: true,
        }]
    );
    assert!(gw.audit.recent(GUILD, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_kick_without_permission_is_denied() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let perms = MemberPermissions {
        ban_members: true,
        ..Default::default()
    };
    let inv = invocation(moderate(ModerationAction::Kick, Some("spam")), perms);
    gw.handle_command(inv).await;

    assert!(platform.moderations().is_empty());
    assert!(platform.sent().is_empty());
    assert_eq!(
        platform.responses(),
        vec![InteractionResponse::Message {
            message: OutgoingMessage::text("You don't have permission to kick members."),
            ephemeral: true,
        }]
    );
}

#[tokio::test]
async fn test_owner_bypass_kick_succeeds() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let mut inv = invocation(
        moderate(ModerationAction::Kick, Some("spam")),
        MemberPermissions::default(),
    );
    inv.invoker.id = OWNER_ID;
    gw.handle_command(inv).await;

    assert_eq!(
        platform.moderations(),
        vec![(GUILD, 77, ModerationAction::Kick, Some("spam".to_string()))]
    );
    assert_eq!(
        platform.responses(),
        vec![InteractionResponse::Message {
            message: OutgoingMessage::text("Sure! I’ll kick Target immediately for **spam**."),
            ephemeral: false,
        }]
    );
    assert_eq!(platform.sent()[0].1.text, "<@77> has been kicked. Reason: spam");

    let audit = gw.audit.recent(GUILD, 10).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, "kick");
    assert_eq!(audit[0].outcome, "success");
}

#[tokio::test]
async fn test_platform_failure_is_reported() {
    let platform = Arc::new(MockPlatform {
        moderate_error: Some("Missing Permissions (HTTP 403)".into()),
        ..Default::default()
    });
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    gw.handle_command(invocation(
        moderate(ModerationAction::Ban, None),
        moderate_perms(),
    ))
    .await;

    assert_eq!(platform.moderations().len(), 1);
    assert_eq!(
        platform.sent()[0].1.text,
        "Failed to ban Target: Missing Permissions (HTTP 403)"
    );
    let audit = gw.audit.recent(GUILD, 10).await.unwrap();
    assert_eq!(audit[0].outcome, "failure");
    assert_eq!(audit[0].detail.as_deref(), Some("Missing Permissions (HTTP 403)"));
}

#[tokio::test]
async fn test_timeout_messages() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    gw.handle_command(invocation(
        moderate(ModerationAction::Timeout { minutes: 15 }, None),
        moderate_perms(),
    ))
    .await;
    gw.handle_command(invocation(
        moderate(ModerationAction::Timeout { minutes: 0 }, Some("calm now")),
        moderate_perms(),
    ))
    .await;

    assert_eq!(
        platform.responses()[0],
        InteractionResponse::Message {
            message: OutgoingMessage::text(
                "Sure! I’ll timeout for 15 minutes Target immediately for **no reason provided**."
            ),
            ephemeral: false,
        }
    );
    let texts: Vec<String> = platform.sent().into_iter().map(|(_, m)| m.text).collect();
    assert_eq!(
        texts,
        vec![
            "<@77> has been timed out for 15 minutes. Reason: No reason provided.".to_string(),
            "<@77> timeout removed. Reason: calm now".to_string(),
        ]
    );
    assert_eq!(
        platform.moderations()[1].2,
        ModerationAction::Timeout { minutes: 0 }
    );
}

#[tokio::test]
async fn test_moderation_outside_guild() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    let mut inv = invocation(moderate(ModerationAction::Ban, None), moderate_perms());
    inv.guild_id = None;
    gw.handle_command(inv).await;

    assert!(platform.moderations().is_empty());
    assert_eq!(
        platform.responses(),
        vec![InteractionResponse::Message {
            message: OutgoingMessage::text(GUILD_ONLY),
            ephemeral: true,
        }]
    );
}

// --- Promo ---

#[tokio::test]
async fn test_advertise_book_defers_then_posts_embed() {
    let platform = Arc::new(MockPlatform::default());
    let gw = gateway(platform.clone(), Arc::new(EchoProvider)).await;

    gw.handle_command(invocation(
        SlashCommand::AdvertiseBook,
        MemberPermissions::default(),
    ))
    .await;

    let responses = platform.responses();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0], InteractionResponse::Defer);
    match &responses[1] {
        InteractionResponse::Followup { message, ephemeral } => {
            assert!(!ephemeral);
            assert_eq!(message.embed.as_ref().unwrap().title, "Recommended Read");
        }
        other => panic!("unexpected response: {other:?}"),
    }
}
