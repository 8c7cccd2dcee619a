//! Shared in-memory doubles for the engine's ports.
//!
//! Everything here is test-only plumbing: scripted platform clients,
//! hashmap-backed repositories, and a controllable [`TestAutomation`] for
//! exercising the manager without real loops.

use botfleet_types::bot::{AuthFlags, BotId, BotIdentity};
use botfleet_types::error::{PlatformError, RepositoryError, SessionError};
use botfleet_types::match_record::{MatchInsert, MatchRecord, NewMatchRecord};
use botfleet_types::platform::{
    Candidate, CandidateFilter, ChatMessage, MatchSummary, SendOutcome,
};
use botfleet_types::session::{SessionField, SessionSpec};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::automation::{Automation, LoopError, LoopKind, PreStartError};
use crate::platform::{PlatformClient, PlatformClientFactory};
use crate::reply::{ReplyError, ReplyGenerator};
use crate::repository::bot::BotRepository;
use crate::repository::matches::MatchRepository;
use crate::session::{Session, SessionBackend};

/// Fresh identity with no flags set.
pub fn identity() -> BotIdentity {
    let now = Utc::now();
    BotIdentity {
        id: BotId::new(),
        proxy: "http://proxy.test:3128".to_string(),
        display_name: "Test Bot".to_string(),
        instructions: Some("be friendly".to_string()),
        contact_link: None,
        is_active: false,
        is_auth: false,
        otp_requested: false,
        created_at: now,
        updated_at: now,
    }
}

/// Session with one required token field and one optional field, on the
/// given backend (or a fresh one).
pub fn test_session(
    identity: &str,
    backend: Option<Arc<MemorySessionBackend>>,
) -> Session<MemorySessionBackend> {
    let spec = SessionSpec::new(vec![
        SessionField::required("access_token"),
        SessionField::optional("profile"),
    ]);
    Session::new(identity, spec, backend.unwrap_or_default())
}

/// `n` candidates with ids `u-0 .. u-{n-1}`.
pub fn candidates(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| Candidate {
            user_id: format!("u-{i}"),
            name: format!("Candidate {i}"),
            gender: Some("f".to_string()),
            birth_date: None,
        })
        .collect()
}

pub fn match_summary(match_id: &str, peer: &str, matched_at: i64) -> MatchSummary {
    MatchSummary {
        match_id: match_id.to_string(),
        peer: peer.to_string(),
        candidate: Candidate {
            user_id: format!("user-{peer}"),
            name: peer.to_string(),
            gender: None,
            birth_date: None,
        },
        matched_at,
    }
}

/// Hashmap-backed session store with fault injection.
#[derive(Default)]
pub struct MemorySessionBackend {
    values: Mutex<HashMap<(String, String), String>>,
    fail_next_store: AtomicBool,
}

impl MemorySessionBackend {
    /// Overwrite a stored field with text that is not valid JSON.
    pub fn corrupt(&self, identity: &str, field: &str) {
        self.values
            .lock()
            .unwrap()
            .insert((identity.to_string(), field.to_string()), "{not json".to_string());
    }

    /// Make the next `store_all` fail without touching stored values.
    pub fn fail_next_store(&self) {
        self.fail_next_store.store(true, Ordering::SeqCst);
    }
}

impl SessionBackend for MemorySessionBackend {
    async fn fetch(&self, identity: &str, field: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(&(identity.to_string(), field.to_string()))
            .cloned())
    }

    async fn store_all(
        &self,
        identity: &str,
        entries: &[(String, String)],
    ) -> Result<(), RepositoryError> {
        if self.fail_next_store.swap(false, Ordering::SeqCst) {
            return Err(RepositoryError::Connection);
        }
        let mut values = self.values.lock().unwrap();
        for (field, text) in entries {
            values.insert((identity.to_string(), field.clone()), text.clone());
        }
        Ok(())
    }

    async fn remove_all(&self, identity: &str, fields: &[String]) -> Result<(), RepositoryError> {
        let mut values = self.values.lock().unwrap();
        for field in fields {
            values.remove(&(identity.to_string(), field.clone()));
        }
        Ok(())
    }
}

/// Hashmap-backed bot repository.
#[derive(Default)]
pub struct MockBotRepository {
    bots: Mutex<HashMap<BotId, BotIdentity>>,
}

impl MockBotRepository {
    pub fn insert(&self, bot: BotIdentity) {
        self.bots.lock().unwrap().insert(bot.id, bot);
    }
}

impl BotRepository for MockBotRepository {
    async fn get(&self, id: BotId) -> Result<Option<BotIdentity>, RepositoryError> {
        Ok(self.bots.lock().unwrap().get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<BotIdentity>, RepositoryError> {
        Ok(self.bots.lock().unwrap().values().cloned().collect())
    }

    async fn list_active(&self) -> Result<Vec<BotIdentity>, RepositoryError> {
        Ok(self
            .bots
            .lock()
            .unwrap()
            .values()
            .filter(|bot| bot.is_active)
            .cloned()
            .collect())
    }

    async fn set_active(&self, id: BotId, active: bool) -> Result<(), RepositoryError> {
        let mut bots = self.bots.lock().unwrap();
        let bot = bots.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        bot.is_active = active;
        bot.updated_at = Utc::now();
        Ok(())
    }

    async fn set_auth_flags(&self, id: BotId, flags: AuthFlags) -> Result<(), RepositoryError> {
        let mut bots = self.bots.lock().unwrap();
        let bot = bots.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        bot.otp_requested = flags.otp_requested;
        bot.is_auth = flags.is_auth;
        bot.updated_at = Utc::now();
        Ok(())
    }
}

/// Scripted platform client.
///
/// Fetches drain queued batches (empty queue means an empty, successful
/// fetch); sends record their arguments. Failure sets inject per-target or
/// global errors.
#[derive(Default)]
pub struct ScriptedClient {
    pub candidate_batches: Mutex<VecDeque<Result<Vec<Candidate>, PlatformError>>>,
    pub match_batches: Mutex<VecDeque<Result<Vec<MatchSummary>, PlatformError>>>,
    pub conversations: Mutex<HashMap<String, Vec<ChatMessage>>>,
    pub fail_conversations_for: Mutex<HashSet<String>>,
    pub liked: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail_likes_for: Mutex<HashSet<String>>,
    pub like_auth_expired: AtomicBool,
    candidate_calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn fetch_candidate_calls(&self) -> usize {
        self.candidate_calls.load(Ordering::SeqCst)
    }
}

impl PlatformClient for ScriptedClient {
    async fn request_authorize(&self, _bot: &BotIdentity) -> Result<bool, PlatformError> {
        Ok(true)
    }

    async fn confirm_authorize(
        &self,
        _bot: &BotIdentity,
        _code: &str,
    ) -> Result<(bool, String), PlatformError> {
        Ok((true, "ok".to_string()))
    }

    async fn send_like(&self, candidate: &Candidate) -> Result<bool, PlatformError> {
        if self.like_auth_expired.load(Ordering::SeqCst) {
            return Err(PlatformError::AuthExpired);
        }
        if self.fail_likes_for.lock().unwrap().contains(&candidate.user_id) {
            return Err(PlatformError::Network("connection reset".to_string()));
        }
        self.liked.lock().unwrap().push(candidate.user_id.clone());
        Ok(true)
    }

    async fn fetch_candidates(
        &self,
        _filter: &CandidateFilter,
    ) -> Result<Vec<Candidate>, PlatformError> {
        self.candidate_calls.fetch_add(1, Ordering::SeqCst);
        self.candidate_batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_matches(&self) -> Result<Vec<MatchSummary>, PlatformError> {
        self.match_batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_conversation(&self, peer: &str) -> Result<Vec<ChatMessage>, PlatformError> {
        if self.fail_conversations_for.lock().unwrap().contains(peer) {
            return Err(PlatformError::Network("connection reset".to_string()));
        }
        Ok(self
            .conversations
            .lock()
            .unwrap()
            .get(peer)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(&self, peer: &str, text: &str) -> Result<SendOutcome, PlatformError> {
        self.sent
            .lock()
            .unwrap()
            .push((peer.to_string(), text.to_string()));
        Ok(SendOutcome {
            delivered: true,
            raw_response: "ok".to_string(),
            retry_after_secs: 0,
        })
    }
}

/// Hands out a fresh [`ScriptedClient`] per call.
#[derive(Default)]
pub struct ScriptedClientFactory;

impl PlatformClientFactory for ScriptedClientFactory {
    type Client = ScriptedClient;

    async fn client_for(&self, _bot: &BotIdentity) -> Result<ScriptedClient, PlatformError> {
        Ok(ScriptedClient::default())
    }
}

/// Match repository that records every accepted insert.
#[derive(Default)]
pub struct RecordingMatchRepo {
    pub records: Mutex<Vec<NewMatchRecord>>,
}

impl MatchRepository for RecordingMatchRepo {
    async fn add(&self, record: &NewMatchRecord) -> Result<MatchInsert, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.match_id == record.match_id) {
            return Ok(MatchInsert::Duplicate);
        }
        records.push(record.clone());
        Ok(MatchInsert::Created)
    }

    async fn get_by_match_id(&self, match_id: &str) -> Result<Option<MatchRecord>, RepositoryError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.match_id == match_id)
            .map(|r| MatchRecord {
                bot_id: r.bot_id,
                match_id: r.match_id.clone(),
                peer: r.peer.clone(),
                name: r.name.clone(),
                gender: r.gender.clone(),
                matched_at: r.matched_at,
                created_at: Utc::now(),
            }))
    }
}

/// Reply generator returning a canned line, with a failure switch and a log
/// of discarded threads.
#[derive(Default)]
pub struct NullReplies {
    pub fail: AtomicBool,
    pub discarded: Mutex<Vec<(BotId, String)>>,
}

impl ReplyGenerator for NullReplies {
    async fn generate(
        &self,
        _bot: &BotIdentity,
        peer: &str,
        _history: &[ChatMessage],
    ) -> Result<String, ReplyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReplyError::Unavailable("scripted outage".to_string()));
        }
        Ok(format!("hey {peer}!"))
    }

    async fn discard_thread(&self, bot_id: BotId, peer: &str) {
        self.discarded
            .lock()
            .unwrap()
            .push((bot_id, peer.to_string()));
    }
}

/// Observer handle into a [`TestAutomation`].
#[derive(Clone, Default)]
pub struct Probe(Arc<ProbeInner>);

#[derive(Default)]
struct ProbeInner {
    release: CancellationToken,
    saves: AtomicUsize,
    halted: AtomicBool,
    cancelled_loops: AtomicUsize,
}

impl Probe {
    /// Unblock every loop waiting on the release gate.
    pub fn release(&self) {
        self.0.release.cancel();
    }

    pub fn saves(&self) -> usize {
        self.0.saves.load(Ordering::SeqCst)
    }

    pub fn halted(&self) -> bool {
        self.0.halted.load(Ordering::SeqCst)
    }

    /// Loops that observed cancellation and exited cleanly.
    pub fn cancelled_loops(&self) -> usize {
        self.0.cancelled_loops.load(Ordering::SeqCst)
    }
}

/// Manager-facing automation double with two declared loops.
///
/// Loops park until cancelled; fatal variants instead fail with
/// `AuthExpired` once the probe's release gate opens.
pub struct TestAutomation {
    id: BotId,
    fail_pre_start: bool,
    failing_save: bool,
    fatal_loops: HashSet<LoopKind>,
    probe: Probe,
}

impl TestAutomation {
    fn base(id: BotId) -> Self {
        Self {
            id,
            fail_pre_start: false,
            failing_save: false,
            fatal_loops: HashSet::new(),
            probe: Probe::default(),
        }
    }

    /// Both loops park until cancelled.
    pub fn idle(id: BotId) -> Self {
        Self::base(id)
    }

    pub fn failing_pre_start(id: BotId) -> Self {
        Self {
            fail_pre_start: true,
            ..Self::base(id)
        }
    }

    /// The liking loop fails fatally on release; messaging parks.
    pub fn auth_expiring(id: BotId) -> Self {
        Self {
            fatal_loops: HashSet::from([LoopKind::Liking]),
            ..Self::base(id)
        }
    }

    /// Every loop fails fatally on release.
    pub fn auth_expiring_all(id: BotId) -> Self {
        Self {
            fatal_loops: HashSet::from([LoopKind::Messaging, LoopKind::Liking]),
            ..Self::base(id)
        }
    }

    pub fn with_failing_save(mut self) -> Self {
        self.failing_save = true;
        self
    }

    pub fn probe(&self) -> Probe {
        self.probe.clone()
    }
}

impl Automation for TestAutomation {
    fn bot_id(&self) -> BotId {
        self.id
    }

    fn loops(&self) -> Vec<LoopKind> {
        vec![LoopKind::Messaging, LoopKind::Liking]
    }

    async fn pre_start(&self) -> Result<(), PreStartError> {
        if self.fail_pre_start {
            return Err(PreStartError::AuthRequired("no stored session".to_string()));
        }
        Ok(())
    }

    async fn run_loop(
        self: Arc<Self>,
        kind: LoopKind,
        cancel: CancellationToken,
    ) -> Result<(), LoopError> {
        if self.fatal_loops.contains(&kind) {
            tokio::select! {
                _ = self.probe.0.release.cancelled() => return Err(LoopError::AuthExpired),
                _ = cancel.cancelled() => {}
            }
        } else {
            cancel.cancelled().await;
        }
        self.probe.0.cancelled_loops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn halt(&self) {
        self.probe.0.halted.store(true, Ordering::SeqCst);
    }

    async fn save_session(&self) -> Result<(), SessionError> {
        self.probe.0.saves.fetch_add(1, Ordering::SeqCst);
        if self.failing_save {
            return Err(SessionError::Store(RepositoryError::Connection));
        }
        Ok(())
    }
}
