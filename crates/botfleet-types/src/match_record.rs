//! Persisted match records.
//!
//! The conversation loop files every newly seen platform match with the
//! match-persistence collaborator so operators can review them; duplicates
//! (same platform match id) are skipped, not errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bot::BotId;

/// A stored match row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub bot_id: BotId,
    /// Platform-scoped match id; unique across the table.
    pub match_id: String,
    pub peer: String,
    pub name: String,
    pub gender: Option<String>,
    /// Match recency as epoch seconds, as reported by the platform.
    pub matched_at: i64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatchRecord {
    pub bot_id: BotId,
    pub match_id: String,
    pub peer: String,
    pub name: String,
    pub gender: Option<String>,
    pub matched_at: i64,
}

/// Outcome of a match insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchInsert {
    Created,
    /// A record with the same platform match id already exists.
    Duplicate,
}
