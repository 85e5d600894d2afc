use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ScribeError;

/// Environment variable holding the Discord bot token.
pub const ENV_DISCORD_TOKEN: &str = "DISCORD_TOKEN";
/// Environment variable holding the optional OpenAI API key.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Environment variable holding the optional owner user ID.
pub const ENV_BOT_OWNER_ID: &str = "BOT_OWNER_ID";
/// Environment variable overriding the history database path.
pub const ENV_DB_PATH: &str = "SCRIBE_DB_PATH";

/// Top-level Scribe configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub scribe: ScribeConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub grammar: GrammarConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScribeConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Discord connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    /// User ID allowed to run moderation commands regardless of role grants.
    /// `0` disables the bypass.
    #[serde(default)]
    pub owner_id: u64,
    /// Register commands on this guild only (instant propagation).
    /// `None` registers them globally.
    #[serde(default)]
    pub guild_id: Option<u64>,
}

impl DiscordConfig {
    /// The owner bypass identity, if one is configured.
    pub fn owner(&self) -> Option<u64> {
        (self.owner_id != 0).then_some(self.owner_id)
    }
}

/// OpenAI-compatible backend config (chat completion + moderation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Use the moderation endpoint when an API key is present.
    #[serde(default = "default_true")]
    pub moderation: bool,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            max_tokens: default_max_tokens(),
            moderation: true,
        }
    }
}

impl OpenAiConfig {
    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// LanguageTool grammar engine config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrammarConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_grammar_base_url")]
    pub base_url: String,
    #[serde(default = "default_grammar_language")]
    pub language: String,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_grammar_base_url(),
            language: default_grammar_language(),
        }
    }
}

/// Local denylist for the content safety gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            denylist: default_denylist(),
        }
    }
}

/// History store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// How many recent entries feed a completion request.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Retention cap per channel. `0` keeps everything.
    #[serde(default = "default_max_entries")]
    pub max_entries_per_channel: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            context_window: default_context_window(),
            max_entries_per_channel: default_max_entries(),
        }
    }
}

/// Moderation command settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Pause between the confirmation message and the action.
    #[serde(default = "default_confirmation_delay_ms")]
    pub confirmation_delay_ms: u64,
    /// Platform maximum for a timeout (28 days on Discord).
    #[serde(default = "default_max_timeout_minutes")]
    pub max_timeout_minutes: i64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            confirmation_delay_ms: default_confirmation_delay_ms(),
            max_timeout_minutes: default_max_timeout_minutes(),
        }
    }
}

// --- Default value functions ---

fn default_name() -> String {
    "Scribe".to_string()
}
fn default_data_dir() -> String {
    "~/.scribe".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_max_tokens() -> u32 {
    400
}
fn default_grammar_base_url() -> String {
    "https://api.languagetool.org/v2".to_string()
}
fn default_grammar_language() -> String {
    "en-US".to_string()
}
fn default_denylist() -> Vec<String> {
    vec!["badword1".into(), "badword2".into()]
}
fn default_db_path() -> String {
    "~/.scribe/memory.db".to_string()
}
fn default_context_window() -> usize {
    10
}
fn default_max_entries() -> usize {
    1000
}
fn default_confirmation_delay_ms() -> u64 {
    1000
}
fn default_max_timeout_minutes() -> i64 {
    40_320
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// Falls back to defaults if the file does not exist. Does not validate;
/// call [`Config::validate`] before starting the bot.
pub fn load(path: &str) -> Result<Config, ScribeError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScribeError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ScribeError::Config(format!("failed to parse config: {}", e)))?
    } else {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;
    Ok(config)
}

impl Config {
    /// Overlay environment-sourced values on top of the file config.
    ///
    /// Empty values are ignored so an unset `.env` entry never clears a
    /// value from the file.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ScribeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(ENV_DISCORD_TOKEN) {
            self.discord.token = token;
        }
        if let Some(key) = get(ENV_OPENAI_API_KEY) {
            self.openai.api_key = key;
        }
        if let Some(owner) = get(ENV_BOT_OWNER_ID) {
            self.discord.owner_id = owner.trim().parse().map_err(|_| {
                ScribeError::Config(format!("{ENV_BOT_OWNER_ID} must be a numeric user ID"))
            })?;
        }
        if let Some(db_path) = get(ENV_DB_PATH) {
            self.memory.db_path = db_path;
        }
        Ok(())
    }

    /// Reject configurations the bot cannot start with.
    pub fn validate(&self) -> Result<(), ScribeError> {
        if self.discord.token.trim().is_empty() {
            return Err(ScribeError::Config(format!(
                "{ENV_DISCORD_TOKEN} missing. Set it in the environment, .env, or [discord].token"
            )));
        }
        if self.memory.context_window == 0 {
            return Err(ScribeError::Config(
                "memory.context_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
