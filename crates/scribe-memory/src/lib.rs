//! # scribe-memory
//!
//! Persistent storage for Scribe (SQLite-backed): the per-channel
//! conversation history and the moderation audit log.

pub mod audit;
pub mod store;

pub use audit::{AuditEntry, AuditOutcome, AuditRecord, ModerationAudit};
pub use store::{HistoryEntry, Store};
