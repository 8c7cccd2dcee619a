//! OTP authorization state machine.
//!
//! `LoggedOut -> OtpRequested -> Authorized`, with a cancel edge back to
//! `LoggedOut` from either later state. The service itself is stateless:
//! every call reads the flags from the bot repository, talks to a fresh
//! platform client where needed, and persists the resulting flags. A single
//! request never sets `otp_requested` and `is_auth` together from scratch;
//! only the valid transitions are reachable.

use botfleet_types::bot::{AuthFlags, AuthState, BotId, BotIdentity};
use botfleet_types::error::AuthFlowError;

use std::sync::Arc;

use crate::platform::{PlatformClient, PlatformClientFactory};
use crate::repository::bot::BotRepository;

/// Stateless orchestrator for the authorization handshake.
pub struct AuthService<R: BotRepository, F: PlatformClientFactory> {
    repo: Arc<R>,
    clients: F,
}

impl<R: BotRepository, F: PlatformClientFactory> AuthService<R, F> {
    pub fn new(repo: Arc<R>, clients: F) -> Self {
        Self { repo, clients }
    }

    async fn require(&self, id: BotId) -> Result<BotIdentity, AuthFlowError> {
        self.repo
            .get(id)
            .await?
            .ok_or(AuthFlowError::NotFound(id))
    }

    pub async fn is_authorized(&self, id: BotId) -> Result<bool, AuthFlowError> {
        Ok(self.require(id).await?.is_auth)
    }

    pub async fn is_otp_requested(&self, id: BotId) -> Result<bool, AuthFlowError> {
        Ok(self.require(id).await?.otp_requested)
    }

    /// Request a passcode (`enable = true`) or cancel the handshake
    /// (`enable = false`).
    ///
    /// Requesting needs `LoggedOut` and fails with `AlreadyRequested`
    /// otherwise. Cancelling needs `OtpRequested` or `Authorized`, clears
    /// both flags without a platform call, and fails with `NotRequested`
    /// from `LoggedOut`.
    pub async fn request_authorize(&self, id: BotId, enable: bool) -> Result<(), AuthFlowError> {
        let bot = self.require(id).await?;

        if enable {
            if bot.auth_state() != AuthState::LoggedOut {
                return Err(AuthFlowError::AlreadyRequested);
            }
            let client = self.clients.client_for(&bot).await?;
            let accepted = client.request_authorize(&bot).await?;
            if !accepted {
                tracing::warn!(bot_id = %id, "platform did not acknowledge the passcode request");
            }
            self.repo.set_auth_flags(id, AuthFlags::REQUESTED).await?;
            tracing::info!(bot_id = %id, "passcode requested");
        } else {
            if bot.auth_state() == AuthState::LoggedOut {
                return Err(AuthFlowError::NotRequested);
            }
            self.repo.set_auth_flags(id, AuthFlags::CLEARED).await?;
            tracing::info!(bot_id = %id, "authorization cancelled");
        }

        Ok(())
    }

    /// Complete the handshake with the single-use passcode.
    ///
    /// Requires an outstanding request (`OtpRequested`, or `Authorized` for
    /// a re-confirm); fails with `NotRequested` from `LoggedOut`. Returns
    /// the platform's acceptance flag and message.
    pub async fn confirm_authorize(
        &self,
        id: BotId,
        code: &str,
    ) -> Result<(bool, String), AuthFlowError> {
        let bot = self.require(id).await?;

        if !bot.otp_requested {
            return Err(AuthFlowError::NotRequested);
        }

        let client = self.clients.client_for(&bot).await?;
        let (accepted, message) = client.confirm_authorize(&bot, code).await?;
        self.repo.set_auth_flags(id, AuthFlags::CONFIRMED).await?;
        tracing::info!(bot_id = %id, accepted, "passcode confirmed");

        Ok((accepted, message))
    }
}
