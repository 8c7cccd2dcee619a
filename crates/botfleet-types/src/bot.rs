use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a bot, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BotId(pub Uuid);

impl BotId {
    /// Create a new BotId using UUID v7 (time-sortable, guaranteed ordering).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a BotId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for BotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BotId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One external account driven by the engine.
///
/// Bot configuration is owned by the admin surface; the engine reads the
/// record and flips its `is_active` / auth flags through `BotRepository`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: BotId,
    /// Rotating proxy URL all platform traffic for this account goes through.
    pub proxy: String,
    /// Freeform display name for operator listings.
    pub display_name: String,
    /// Operator-written persona instructions handed to reply generation.
    pub instructions: Option<String>,
    /// Off-platform contact link appended to reply generation context.
    pub contact_link: Option<String>,
    /// Whether an automation should be running for this bot.
    pub is_active: bool,
    /// Whether the authorization handshake has been completed.
    pub is_auth: bool,
    /// Whether a one-time passcode has been requested and not yet cancelled.
    pub otp_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BotIdentity {
    /// Current position in the authorization handshake, derived from flags.
    pub fn auth_state(&self) -> AuthState {
        if self.is_auth {
            AuthState::Authorized
        } else if self.otp_requested {
            AuthState::OtpRequested
        } else {
            AuthState::LoggedOut
        }
    }
}

/// Authorization handshake states.
///
/// `LoggedOut -> OtpRequested -> Authorized`, with a cancel edge back to
/// `LoggedOut` from either of the later states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    LoggedOut,
    OtpRequested,
    Authorized,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::LoggedOut => write!(f, "logged_out"),
            AuthState::OtpRequested => write!(f, "otp_requested"),
            AuthState::Authorized => write!(f, "authorized"),
        }
    }
}

/// Persisted pair of authorization flags.
///
/// The state machine in `botfleet-core::auth` only ever writes one of the
/// three valid combinations; `Requested` and `Confirmed` are never produced
/// by the same request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthFlags {
    pub otp_requested: bool,
    pub is_auth: bool,
}

impl AuthFlags {
    /// OTP sent, confirmation pending.
    pub const REQUESTED: Self = Self {
        otp_requested: true,
        is_auth: false,
    };

    /// Handshake completed.
    pub const CONFIRMED: Self = Self {
        otp_requested: true,
        is_auth: true,
    };

    /// Cancelled / forced re-authentication.
    pub const CLEARED: Self = Self {
        otp_requested: false,
        is_auth: false,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(otp_requested: bool, is_auth: bool) -> BotIdentity {
        let now = Utc::now();
        BotIdentity {
            id: BotId::new(),
            proxy: "http://proxy.example:3128".to_string(),
            display_name: "Test Bot".to_string(),
            instructions: None,
            contact_link: None,
            is_active: false,
            is_auth,
            otp_requested,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_bot_id_display_roundtrip() {
        let id = BotId::new();
        let parsed: BotId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_auth_state_from_flags() {
        assert_eq!(identity(false, false).auth_state(), AuthState::LoggedOut);
        assert_eq!(identity(true, false).auth_state(), AuthState::OtpRequested);
        assert_eq!(identity(true, true).auth_state(), AuthState::Authorized);
    }

    #[test]
    fn test_auth_flags_constants() {
        assert!(AuthFlags::REQUESTED.otp_requested);
        assert!(!AuthFlags::REQUESTED.is_auth);
        assert!(AuthFlags::CONFIRMED.is_auth);
        assert!(!AuthFlags::CLEARED.otp_requested);
        assert!(!AuthFlags::CLEARED.is_auth);
    }
}
