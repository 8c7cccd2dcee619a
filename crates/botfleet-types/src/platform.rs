//! Wire-format-agnostic types exchanged with platform adapters.
//!
//! Adapters translate their platform's HTML/JSON/binary payloads into these
//! shapes; the engine never sees raw protocol data.

use serde::{Deserialize, Serialize};

/// A profile the bot may interact with (like / swipe).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Platform-scoped user id.
    pub user_id: String,
    pub name: String,
    pub gender: Option<String>,
    /// Birth date as reported by the platform, if any (freeform).
    pub birth_date: Option<String>,
}

/// Filter passed to candidate fetches; interpretation is adapter-specific.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateFilter {
    pub gender: Option<String>,
    pub min_age: Option<u8>,
    pub max_age: Option<u8>,
    /// Free-text location hint (city name, region code, ...).
    pub location: Option<String>,
}

/// A mutual match as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Platform-scoped match id, unique per conversation.
    pub match_id: String,
    /// Peer handle used to address conversation and message calls.
    pub peer: String,
    pub candidate: Candidate,
    /// Match recency as epoch seconds; drives processing order.
    pub matched_at: i64,
}

/// One message in a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    /// True when the peer sent it, false for our own outbound messages.
    pub inbound: bool,
    /// Epoch seconds, when the platform reports it.
    pub sent_at: Option<i64>,
}

/// Result of a message send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub delivered: bool,
    /// Raw adapter response, kept for operator diagnostics.
    pub raw_response: String,
    /// Platform-recommended pause before the next send, in seconds.
    pub retry_after_secs: u64,
}
