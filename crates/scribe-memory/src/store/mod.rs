//! SQLite-backed persistent store. The conversation log lives in `history`.

mod history;


pub use history::HistoryEntry;

use scribe_core::{config::MemoryConfig, error::ScribeError, shellexpand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Path value that selects a private in-memory database.
const IN_MEMORY: &str = ":memory:";

/// Persistent store backed by SQLite.
///
/// Opened once at startup and handed to the gateway; call [`Store::close`]
/// on shutdown so pending writes are flushed.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    max_entries_per_channel: usize,
}

impl Store {
    /// Open the store, running migrations on first use.
    pub async fn new(config: &MemoryConfig) -> Result<Self, ScribeError> {
        let pool = if config.db_path == IN_MEMORY {
            Self::connect_in_memory().await?
        } else {
            Self::connect_file(&shellexpand(&config.db_path)).await?
        };

        Self::run_migrations(&pool).await?;
        info!("History store initialized at {}", config.db_path);

        Ok(Self {
            pool,
            max_entries_per_channel: config.max_entries_per_channel,
        })
    }

    async fn connect_file(db_path: &str) -> Result<SqlitePool, ScribeError> {
        // Ensure parent directory exists.
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ScribeError::Storage(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| ScribeError::Storage(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| ScribeError::Storage(format!("failed to connect to sqlite: {e}")))
    }

    /// Each connection to `:memory:` is its own database, so the pool is
    /// pinned to one connection that never expires.
    async fn connect_in_memory() -> Result<SqlitePool, ScribeError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| ScribeError::Storage(format!("invalid db path: {e}")))?;

        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|e| ScribeError::Storage(format!("failed to open in-memory sqlite: {e}")))
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection. Further calls fail with a storage error.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("History store closed");
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), ScribeError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| ScribeError::Storage(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[
            ("001_history", include_str!("../../migrations/001_history.sql")),
            (
                "002_moderation_log",
                include_str!("../../migrations/002_moderation_log.sql"),
            ),
        ];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        ScribeError::Storage(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| ScribeError::Storage(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    ScribeError::Storage(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}
