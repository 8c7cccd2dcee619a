//! Platform client capability contract.
//!
//! One external service = one adapter implementing [`PlatformClient`] over
//! its wire protocol (HTML scraping, JSON API, binary framing -- not this
//! crate's concern). The engine drives every adapter through this uniform
//! surface. [`PlatformError::AuthExpired`] is the one failure the engine
//! treats as fatal to the owning automation; everything else stays local
//! to the calling loop iteration.

use botfleet_types::bot::BotIdentity;
use botfleet_types::error::PlatformError;
use botfleet_types::platform::{Candidate, CandidateFilter, ChatMessage, MatchSummary, SendOutcome};

/// Capability surface a platform adapter must provide.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait PlatformClient: Send + Sync + 'static {
    /// Ask the platform to send a one-time passcode for this account.
    /// Returns whether the platform accepted the request.
    fn request_authorize(
        &self,
        bot: &BotIdentity,
    ) -> impl std::future::Future<Output = Result<bool, PlatformError>> + Send;

    /// Complete the handshake with the received passcode. The code is
    /// single-use; this call must not be retried blindly.
    fn confirm_authorize(
        &self,
        bot: &BotIdentity,
        code: &str,
    ) -> impl std::future::Future<Output = Result<(bool, String), PlatformError>> + Send;

    /// Like / swipe a candidate. Returns whether the platform accepted it.
    fn send_like(
        &self,
        candidate: &Candidate,
    ) -> impl std::future::Future<Output = Result<bool, PlatformError>> + Send;

    /// Fetch profiles eligible for interaction under `filter`.
    fn fetch_candidates(
        &self,
        filter: &CandidateFilter,
    ) -> impl std::future::Future<Output = Result<Vec<Candidate>, PlatformError>> + Send;

    /// Fetch the account's current matches.
    fn fetch_matches(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<MatchSummary>, PlatformError>> + Send;

    /// Fetch the conversation with `peer`, ordered oldest to newest.
    fn fetch_conversation(
        &self,
        peer: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, PlatformError>> + Send;

    /// Send one message. At most one attempt per cycle; the outcome carries
    /// the platform-recommended pause before the next send.
    fn send_message(
        &self,
        peer: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<SendOutcome, PlatformError>> + Send;
}

/// Builds a client bound to one identity and its proxy.
///
/// The auth service opens a fresh client per call, mirroring the
/// short-lived connections the adapters maintain.
pub trait PlatformClientFactory: Send + Sync {
    type Client: PlatformClient;

    fn client_for(
        &self,
        bot: &BotIdentity,
    ) -> impl std::future::Future<Output = Result<Self::Client, PlatformError>> + Send;
}
