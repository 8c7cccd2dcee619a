//! Per-bot unit of work.
//!
//! An [`Automation`] is one running agent bound to one external account. It
//! declares an ordered list of background loops; the manager spawns one
//! task per loop and supervises them. [`BotAutomation`] is the concrete
//! automation used for every platform: it composes a platform client, a
//! session bundle, the match-persistence collaborator, and the reply
//! generator -- scheduling never touches wire logic.

mod conversation;
mod interaction;

pub use conversation::order_by_recency;

use botfleet_types::bot::{BotId, BotIdentity};
use botfleet_types::config::LoopTiming;
use botfleet_types::error::SessionError;
use botfleet_types::platform::CandidateFilter;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::platform::PlatformClient;
use crate::reply::ReplyGenerator;
use crate::repository::matches::MatchRepository;
use crate::session::{Session, SessionBackend};

/// The two canonical background loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    /// Poll matches and answer inbound messages.
    Messaging,
    /// Like batches of interaction candidates.
    Liking,
}

impl std::fmt::Display for LoopKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoopKind::Messaging => write!(f, "messaging"),
            LoopKind::Liking => write!(f, "liking"),
        }
    }
}

/// Fatal loop outcome. Cancellation is not an error: a cancelled loop
/// returns `Ok(())`.
#[derive(Debug, Error)]
pub enum LoopError {
    /// The remote rejected the session credentials; the whole automation
    /// must come down.
    #[error("session credentials expired")]
    AuthExpired,
}

/// Pre-start validation failure; registration is aborted before any loop
/// is spawned.
#[derive(Debug, Error)]
pub enum PreStartError {
    #[error("authentication required: {0}")]
    AuthRequired(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One running agent for one bot.
///
/// Uses RPITIT; the manager is generic over the implementation.
pub trait Automation: Send + Sync + 'static {
    fn bot_id(&self) -> BotId;

    /// Declared loops, in spawn order.
    fn loops(&self) -> Vec<LoopKind>;

    /// Platform-specific validation before any loop is spawned. Typically:
    /// the session must load and be complete enough to authenticate.
    fn pre_start(&self) -> impl std::future::Future<Output = Result<(), PreStartError>> + Send;

    /// Run one declared loop until it fails fatally or `cancel` fires.
    fn run_loop(
        self: Arc<Self>,
        kind: LoopKind,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = Result<(), LoopError>> + Send;

    /// Flip the running flag; loops observe it at their next checkpoint.
    /// Returns without waiting for loop exit.
    fn halt(&self);

    /// Best-effort session save, called by the manager on stop.
    fn save_session(&self) -> impl std::future::Future<Output = Result<(), SessionError>> + Send;
}

/// Generic automation over a platform client and the engine collaborators.
pub struct BotAutomation<C, S, M, G>
where
    C: PlatformClient,
    S: SessionBackend + 'static,
    M: MatchRepository + 'static,
    G: ReplyGenerator + 'static,
{
    bot: BotIdentity,
    client: C,
    session: tokio::sync::Mutex<Session<S>>,
    matches: Arc<M>,
    replies: Arc<G>,
    filter: CandidateFilter,
    timing: LoopTiming,
    running: AtomicBool,
    last_activity: std::sync::Mutex<DateTime<Utc>>,
}

impl<C, S, M, G> BotAutomation<C, S, M, G>
where
    C: PlatformClient,
    S: SessionBackend + 'static,
    M: MatchRepository + 'static,
    G: ReplyGenerator + 'static,
{
    pub fn new(
        bot: BotIdentity,
        client: C,
        session: Session<S>,
        matches: Arc<M>,
        replies: Arc<G>,
        filter: CandidateFilter,
        timing: LoopTiming,
    ) -> Self {
        Self {
            bot,
            client,
            session: tokio::sync::Mutex::new(session),
            matches,
            replies,
            filter,
            timing,
            running: AtomicBool::new(false),
            last_activity: std::sync::Mutex::new(Utc::now()),
        }
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.bot
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Timestamp of the last successful outbound action (like or message).
    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock().expect("last_activity poisoned")
    }

    pub(crate) fn client(&self) -> &C {
        &self.client
    }

    pub(crate) fn timing(&self) -> &LoopTiming {
        &self.timing
    }

    pub(crate) fn filter(&self) -> &CandidateFilter {
        &self.filter
    }

    pub(crate) fn match_repo(&self) -> &M {
        &self.matches
    }

    pub(crate) fn replies(&self) -> &G {
        &self.replies
    }

    pub(crate) fn touch(&self) {
        *self.last_activity.lock().expect("last_activity poisoned") = Utc::now();
    }

    /// True while the loop should keep iterating.
    pub(crate) fn active(&self, cancel: &CancellationToken) -> bool {
        self.is_running() && !cancel.is_cancelled()
    }
}

impl<C, S, M, G> Automation for BotAutomation<C, S, M, G>
where
    C: PlatformClient,
    S: SessionBackend + 'static,
    M: MatchRepository + 'static,
    G: ReplyGenerator + 'static,
{
    fn bot_id(&self) -> BotId {
        self.bot.id
    }

    fn loops(&self) -> Vec<LoopKind> {
        vec![LoopKind::Messaging, LoopKind::Liking]
    }

    async fn pre_start(&self) -> Result<(), PreStartError> {
        let mut session = self.session.lock().await;
        session.load().await?;
        if !session.is_auth_complete() {
            return Err(PreStartError::AuthRequired(format!(
                "session for bot {} has no usable credentials",
                self.bot.id
            )));
        }
        Ok(())
    }

    async fn run_loop(
        self: Arc<Self>,
        kind: LoopKind,
        cancel: CancellationToken,
    ) -> Result<(), LoopError> {
        self.running.store(true, Ordering::SeqCst);
        let result = match kind {
            LoopKind::Liking => self.run_liking(&cancel).await,
            LoopKind::Messaging => self.run_messaging(&cancel).await,
        };
        self.running.store(false, Ordering::SeqCst);
        match &result {
            Ok(()) => tracing::info!(bot_id = %self.bot.id, %kind, "loop stopped"),
            Err(err) => tracing::error!(bot_id = %self.bot.id, %kind, %err, "loop failed"),
        }
        result
    }

    fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn save_session(&self) -> Result<(), SessionError> {
        self.session.lock().await.save().await
    }
}

/// Sleep for `secs`, waking early on cancellation.
///
/// Returns false when the loop should unwind instead of continuing.
pub(crate) async fn idle(cancel: &CancellationToken, secs: u64) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(Duration::from_secs(secs)) => true,
    }
}
