use thiserror::Error;

use crate::bot::BotId;

/// Errors from repository operations (used by trait definitions in botfleet-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by a platform adapter.
///
/// `AuthExpired` is the only variant the engine treats specially: it is
/// fatal to the owning automation. Everything else is local to the calling
/// loop iteration.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("remote rejected session credentials")]
    AuthExpired,

    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl PlatformError {
    /// Whether this failure must tear down the whole automation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PlatformError::AuthExpired)
    }
}

/// Errors from the per-identity session bundle.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Writing a field the adapter never declared; never creates state.
    #[error("undeclared session field '{0}'")]
    UndeclaredField(String),

    #[error("session store error: {0}")]
    Store(#[from] RepositoryError),

    #[error("session value for '{field}' failed to serialize: {reason}")]
    Serialize { field: String, reason: String },
}

/// Invalid transitions and failures in the authorization state machine.
#[derive(Debug, Error)]
pub enum AuthFlowError {
    #[error("bot {0} not found")]
    NotFound(BotId),

    #[error("authorization already requested")]
    AlreadyRequested,

    #[error("authorization not requested")]
    NotRequested,

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Automation manager failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("automation {0} already exists")]
    AlreadyExists(BotId),

    #[error("pre-start failed for bot {bot_id}: {reason}")]
    PreStartFailed { bot_id: BotId, reason: String },

    /// Session save failed during stop. Cancellation has already been
    /// applied by the time this is raised.
    #[error("session save failed for bot {bot_id}: {reason}")]
    SessionSave { bot_id: BotId, reason: String },
}

/// Bot service façade failures, exposed to the control surface.
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("bot {0} not found")]
    NotFound(BotId),

    #[error("failed to build automation: {0}")]
    BuildFailed(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
