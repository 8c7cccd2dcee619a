//! Bot identity repository trait definition.
//!
//! Bot configuration is owned by the admin surface; the engine reads
//! identities and flips their `is_active` / auth flags.

use botfleet_types::bot::{AuthFlags, BotId, BotIdentity};
use botfleet_types::error::RepositoryError;

/// Repository trait for bot identity persistence.
///
/// Implementations live in botfleet-infra (e.g., SqliteBotRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait BotRepository: Send + Sync {
    /// Get a bot by ID. Returns None if unknown.
    fn get(
        &self,
        id: BotId,
    ) -> impl std::future::Future<Output = Result<Option<BotIdentity>, RepositoryError>> + Send;

    /// All known bots.
    fn list_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<BotIdentity>, RepositoryError>> + Send;

    /// Bots currently flagged active. Must read consistently against
    /// concurrent flag updates from the admin surface: it feeds restart
    /// recovery.
    fn list_active(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<BotIdentity>, RepositoryError>> + Send;

    /// Set the active flag. Fails with `NotFound` for an unknown id.
    fn set_active(
        &self,
        id: BotId,
        active: bool,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist both authorization flags in one update.
    fn set_auth_flags(
        &self,
        id: BotId,
        flags: AuthFlags,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
