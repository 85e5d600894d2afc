//! Moderation audit log: one row per executed kick, ban, or timeout.

use scribe_core::error::ScribeError;
use sqlx::SqlitePool;
use tracing::debug;

/// An entry to write to the audit log.
pub struct AuditEntry {
    pub guild_id: u64,
    pub channel_id: u64,
    pub actor_id: u64,
    pub target_id: u64,
    pub action: String,
    pub minutes: Option<i64>,
    pub reason: Option<String>,
    pub outcome: AuditOutcome,
    /// Platform error text for failures.
    pub detail: Option<String>,
}

/// Result of an executed moderation action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
}

impl AuditOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// A row read back from the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub target_id: u64,
    pub action: String,
    pub outcome: String,
    pub detail: Option<String>,
}

/// Audit logger sharing the store's pool.
#[derive(Clone)]
pub struct ModerationAudit {
    pool: SqlitePool,
}

impl ModerationAudit {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write an entry to the audit log.
    pub async fn log(&self, entry: &AuditEntry) -> Result<(), ScribeError> {
        sqlx::query(
            "INSERT INTO moderation_log \
             (guild_id, channel_id, actor_id, target_id, action, minutes, reason, outcome, detail) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.guild_id as i64)
        .bind(entry.channel_id as i64)
        .bind(entry.actor_id as i64)
        .bind(entry.target_id as i64)
        .bind(&entry.action)
        .bind(entry.minutes)
        .bind(&entry.reason)
        .bind(entry.outcome.as_str())
        .bind(&entry.detail)
        .execute(&self.pool)
        .await
        .map_err(|e| ScribeError::Storage(format!("audit log write failed: {e}")))?;

        debug!(
            "audit: {} {} -> {} [{}]",
            entry.action,
            entry.actor_id,
            entry.target_id,
            entry.outcome.as_str()
        );

        Ok(())
    }

    /// Most recent entries for a guild, newest first.
    pub async fn recent(&self, guild_id: u64, limit: i64) -> Result<Vec<AuditRecord>, ScribeError> {
        let rows: Vec<(i64, String, String, Option<String>)> = sqlx::query_as(
            "SELECT target_id, action, outcome, detail FROM moderation_log \
             WHERE guild_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(guild_id as i64)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ScribeError::Storage(format!("audit query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(target_id, action, outcome, detail)| AuditRecord {
                target_id: target_id as u64,
                action,
                outcome,
                detail,
            })
            .collect())
    }
}
