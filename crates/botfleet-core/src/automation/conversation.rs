//! Conversation (messaging) loop.
//!
//! Each cycle: fetch matches, file any newly seen one with the match
//! store, then walk matches by descending recency and answer every
//! conversation whose latest message is inbound. Reply generation failures
//! fall back to a fixed apology and drop the stale thread reference.
//! Per-match errors are skipped; only expired credentials abort the loop.

use botfleet_types::match_record::{MatchInsert, NewMatchRecord};
use botfleet_types::platform::MatchSummary;
use tokio_util::sync::CancellationToken;

use super::{Automation, BotAutomation, LoopError, idle};
use crate::platform::PlatformClient;
use crate::reply::{FALLBACK_REPLY, ReplyGenerator};
use crate::repository::matches::MatchRepository;
use crate::session::SessionBackend;

/// Sort matches newest-first; this is the processing order.
pub fn order_by_recency(mut matches: Vec<MatchSummary>) -> Vec<MatchSummary> {
    matches.sort_by(|a, b| b.matched_at.cmp(&a.matched_at));
    matches
}

impl<C, S, M, G> BotAutomation<C, S, M, G>
where
    C: PlatformClient,
    S: SessionBackend + 'static,
    M: MatchRepository + 'static,
    G: ReplyGenerator + 'static,
{
    pub(super) async fn run_messaging(&self, cancel: &CancellationToken) -> Result<(), LoopError> {
        let bot_id = self.bot_id();
        while self.active(cancel) {
            let matches = match self.client().fetch_matches().await {
                Ok(matches) => matches,
                Err(err) if err.is_fatal() => return Err(LoopError::AuthExpired),
                Err(err) => {
                    tracing::error!(bot_id = %bot_id, %err, "match fetch failed");
                    if !idle(cancel, self.timing().fetch_retry_secs).await {
                        break;
                    }
                    continue;
                }
            };

            self.persist_matches(&matches).await;

            if !matches.is_empty() {
                let count = matches.len();
                self.process_matches(matches, cancel).await?;
                tracing::debug!(bot_id = %bot_id, count, "match pass completed");
            }

            if !idle(cancel, self.timing().message_poll_secs).await {
                break;
            }
        }
        Ok(())
    }

    /// File every match not already known. Duplicates are skipped and
    /// per-match store errors never abort the pass.
    pub(crate) async fn persist_matches(&self, matches: &[MatchSummary]) {
        let bot_id = self.bot_id();
        for m in matches {
            match self.match_repo().get_by_match_id(&m.match_id).await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(bot_id = %bot_id, match_id = %m.match_id, %err, "match lookup failed");
                    continue;
                }
            }

            let record = NewMatchRecord {
                bot_id,
                match_id: m.match_id.clone(),
                peer: m.peer.clone(),
                name: m.candidate.name.clone(),
                gender: m.candidate.gender.clone(),
                matched_at: m.matched_at,
            };
            match self.match_repo().add(&record).await {
                Ok(MatchInsert::Created) => {
                    tracing::debug!(bot_id = %bot_id, match_id = %m.match_id, "new match recorded");
                }
                // Lost the race against another writer; same as known.
                Ok(MatchInsert::Duplicate) => {}
                Err(err) => {
                    tracing::error!(bot_id = %bot_id, match_id = %m.match_id, %err, "match insert failed");
                }
            }
        }
    }

    /// Answer matches in descending recency order.
    pub(crate) async fn process_matches(
        &self,
        matches: Vec<MatchSummary>,
        cancel: &CancellationToken,
    ) -> Result<(), LoopError> {
        let bot_id = self.bot_id();
        for m in order_by_recency(matches) {
            if !self.active(cancel) {
                break;
            }

            let conversation = match self.client().fetch_conversation(&m.peer).await {
                Ok(conversation) if conversation.is_empty() => {
                    tracing::warn!(bot_id = %bot_id, peer = %m.peer, "empty conversation");
                    continue;
                }
                Ok(conversation) => conversation,
                Err(err) if err.is_fatal() => return Err(LoopError::AuthExpired),
                Err(err) => {
                    tracing::error!(bot_id = %bot_id, peer = %m.peer, %err, "conversation fetch failed");
                    continue;
                }
            };

            // Only reply when the peer spoke last.
            let awaiting_reply = conversation.last().is_some_and(|msg| msg.inbound);
            if !awaiting_reply {
                continue;
            }

            let reply = match self
                .replies()
                .generate(self.identity(), &m.peer, &conversation)
                .await
            {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(bot_id = %bot_id, peer = %m.peer, %err, "reply generation failed");
                    self.replies().discard_thread(bot_id, &m.peer).await;
                    FALLBACK_REPLY.to_string()
                }
            };

            match self.client().send_message(&m.peer, &reply).await {
                Ok(outcome) => {
                    if outcome.delivered {
                        self.touch();
                        tracing::info!(bot_id = %bot_id, peer = %m.peer, "message sent");
                    } else {
                        tracing::error!(
                            bot_id = %bot_id,
                            peer = %m.peer,
                            response = %outcome.raw_response,
                            "message rejected"
                        );
                    }
                    if !idle(cancel, outcome.retry_after_secs).await {
                        break;
                    }
                }
                Err(err) if err.is_fatal() => return Err(LoopError::AuthExpired),
                Err(err) => {
                    tracing::error!(bot_id = %bot_id, peer = %m.peer, %err, "message send failed");
                }
            }
        }
        Ok(())
    }
}
