//! Per-channel conversation log.

use super::Store;
use scribe_core::{
    context::{ContextEntry, Role},
    error::ScribeError,
};
use tracing::{debug, warn};

/// One persisted conversation turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: i64,
    pub channel_id: u64,
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl HistoryEntry {
    pub fn to_context(&self) -> ContextEntry {
        ContextEntry {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

type HistoryRow = (i64, i64, String, String, String);

fn from_row((id, channel_id, role, content, created_at): HistoryRow) -> Result<HistoryEntry, ScribeError> {
    Ok(HistoryEntry {
        id,
        channel_id: channel_id as u64,
        role: role.parse()?,
        content,
        created_at,
    })
}

impl Store {
    /// Append one entry and return its row ID.
    ///
    /// The row is committed before this returns. When a retention cap is
    /// configured, the channel's oldest rows beyond the cap are dropped
    /// afterwards; a failed prune is logged and does not fail the append.
    pub async fn append(
        &self,
        channel_id: u64,
        role: Role,
        content: &str,
    ) -> Result<i64, ScribeError> {
        let result = sqlx::query("INSERT INTO history (channel_id, role, content) VALUES (?, ?, ?)")
            .bind(channel_id as i64)
            .bind(role.as_str())
            .bind(content)
            .execute(&self.pool)
            .await
            .map_err(|e| ScribeError::Storage(format!("insert failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!("history: channel {channel_id} += {role} #{id}");

        if self.max_entries_per_channel > 0 {
            if let Err(e) = self
                .prune_channel(channel_id, self.max_entries_per_channel)
                .await
            {
                warn!("history: retention prune failed for channel {channel_id}: {e}");
            }
        }

        Ok(id)
    }

    /// The last `limit` entries for a channel, oldest first.
    ///
    /// Returns everything available when the channel holds fewer entries.
    pub async fn load_recent(
        &self,
        channel_id: u64,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, ScribeError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<HistoryRow> = sqlx::query_as(
            "SELECT id, channel_id, role, content, created_at FROM history \
             WHERE channel_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(channel_id as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ScribeError::Storage(format!("query failed: {e}")))?;

        // Newest-first from SQL; callers want oldest-first.
        rows.into_iter().rev().map(from_row).collect()
    }

    /// Keep only the newest `keep` entries of a channel. Returns rows deleted.
    pub async fn prune_channel(&self, channel_id: u64, keep: usize) -> Result<u64, ScribeError> {
        let result = sqlx::query(
            "DELETE FROM history WHERE channel_id = ? AND id NOT IN \
             (SELECT id FROM history WHERE channel_id = ? ORDER BY id DESC LIMIT ?)",
        )
        .bind(channel_id as i64)
        .bind(channel_id as i64)
        .bind(keep as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| ScribeError::Storage(format!("prune failed: {e}")))?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            debug!("history: pruned {deleted} rows from channel {channel_id}");
        }
        Ok(deleted)
    }

    /// Total persisted entries, for one channel or across all channels.
    pub async fn count_entries(&self, channel_id: Option<u64>) -> Result<i64, ScribeError> {
        let count: (i64,) = match channel_id {
            Some(id) => sqlx::query_as("SELECT COUNT(*) FROM history WHERE channel_id = ?")
                .bind(id as i64)
                .fetch_one(&self.pool)
                .await,
            None => sqlx::query_as("SELECT COUNT(*) FROM history")
                .fetch_one(&self.pool)
                .await,
        }
        .map_err(|e| ScribeError::Storage(format!("count failed: {e}")))?;

        Ok(count.0)
    }
}
