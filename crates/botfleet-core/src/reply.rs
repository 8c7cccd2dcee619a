//! Reply-generation port.
//!
//! The conversation loop asks this collaborator for a reply given the
//! ordered message history and the bot's persona instructions. The concrete
//! backend (an LLM chat service with per-peer threads) lives outside this
//! workspace; the engine only needs a string back or a clear "unavailable".

use botfleet_types::bot::{BotId, BotIdentity};
use botfleet_types::platform::ChatMessage;
use thiserror::Error;

/// Reply used when generation fails; the stale thread is discarded so the
/// next attempt starts a fresh one.
pub const FALLBACK_REPLY: &str = "Sorry, i am bussy now";

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("reply backend unavailable: {0}")]
    Unavailable(String),
}

/// Generates conversation replies for a bot.
pub trait ReplyGenerator: Send + Sync {
    /// Produce a reply to `history` (oldest to newest) on behalf of `bot`.
    /// The bot's `instructions` and `contact_link` are part of the context.
    fn generate(
        &self,
        bot: &BotIdentity,
        peer: &str,
        history: &[ChatMessage],
    ) -> impl std::future::Future<Output = Result<String, ReplyError>> + Send;

    /// Drop any cached conversation-thread reference for `(bot, peer)`.
    /// Called after a generation failure so stale state cannot poison the
    /// next attempt.
    fn discard_thread(
        &self,
        bot_id: BotId,
        peer: &str,
    ) -> impl std::future::Future<Output = ()> + Send;
}
