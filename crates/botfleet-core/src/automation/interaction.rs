//! Interaction (liking) loop.
//!
//! Each cycle: sample a batch size and cooldown, fetch candidates, like a
//! random subsample with a short delay between attempts, then cool down.
//! Individual failures are skipped; only expired credentials abort the
//! loop.

use botfleet_types::platform::Candidate;
use rand::Rng;
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;

use super::{Automation, BotAutomation, LoopError, idle};
use crate::platform::PlatformClient;
use crate::reply::ReplyGenerator;
use crate::repository::matches::MatchRepository;
use crate::session::SessionBackend;

impl<C, S, M, G> BotAutomation<C, S, M, G>
where
    C: PlatformClient,
    S: SessionBackend + 'static,
    M: MatchRepository + 'static,
    G: ReplyGenerator + 'static,
{
    pub(super) async fn run_liking(&self, cancel: &CancellationToken) -> Result<(), LoopError> {
        let bot_id = self.bot_id();
        while self.active(cancel) {
            let (batch_size, cooldown_secs) = {
                let mut rng = rand::thread_rng();
                (
                    rng.gen_range(self.timing().like_batch_range()) as usize,
                    rng.gen_range(self.timing().cooldown_range()),
                )
            };

            match self.client().fetch_candidates(self.filter()).await {
                Ok(candidates) if candidates.is_empty() => {
                    tracing::debug!(bot_id = %bot_id, "no interaction candidates, cooling down");
                }
                Ok(candidates) => {
                    let available = candidates.len();
                    let liked = self.like_batch(candidates, batch_size, cancel).await?;
                    tracing::info!(
                        bot_id = %bot_id,
                        liked,
                        batch_size,
                        available,
                        "like batch completed"
                    );
                }
                Err(err) if err.is_fatal() => return Err(LoopError::AuthExpired),
                Err(err) => {
                    tracing::error!(bot_id = %bot_id, %err, "candidate fetch failed");
                }
            }

            if !idle(cancel, cooldown_secs).await {
                break;
            }
        }
        Ok(())
    }

    /// Like a random subsample of `min(batch_size, |candidates|)` profiles,
    /// in subsample order. Returns the number of accepted likes.
    pub(crate) async fn like_batch(
        &self,
        candidates: Vec<Candidate>,
        batch_size: usize,
        cancel: &CancellationToken,
    ) -> Result<usize, LoopError> {
        let bot_id = self.bot_id();
        let targets: Vec<Candidate> = {
            let mut rng = rand::thread_rng();
            let take = batch_size.min(candidates.len());
            candidates.choose_multiple(&mut rng, take).cloned().collect()
        };

        let mut liked = 0usize;
        for candidate in targets {
            if !self.active(cancel) {
                break;
            }
            match self.client().send_like(&candidate).await {
                Ok(true) => {
                    self.touch();
                    liked += 1;
                }
                Ok(false) => {
                    tracing::debug!(bot_id = %bot_id, user_id = %candidate.user_id, "like rejected");
                }
                Err(err) if err.is_fatal() => return Err(LoopError::AuthExpired),
                Err(err) => {
                    tracing::error!(
                        bot_id = %bot_id,
                        user_id = %candidate.user_id,
                        %err,
                        "like attempt failed"
                    );
                }
            }

            let delay = rand::thread_rng().gen_range(self.timing().like_delay_range());
            if !idle(cancel, delay).await {
                break;
            }
        }
        Ok(liked)
    }
}
