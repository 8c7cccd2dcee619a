//! Bot service façade.
//!
//! The one surface a control plane talks to: start/stop per bot, fleet-wide
//! best-effort batches, and restart recovery from the persisted active
//! flags. The service keeps the repository's `is_active` flag in step with
//! the manager's registry, and a background listener deactivates bots whose
//! automations halt on their own.

use botfleet_types::bot::{AuthFlags, BotId, BotIdentity};
use botfleet_types::error::FleetError;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use std::sync::Arc;

use crate::automation::Automation;
use crate::event::EngineEvent;
use crate::manager::AutomationManager;
use crate::repository::bot::BotRepository;

/// Builds a ready-to-register automation for one bot identity.
///
/// Implementations wire the platform client, session bundle, and reply
/// generator for their platform; the service never sees those parts.
pub trait AutomationFactory: Send + Sync {
    type Automation: Automation;

    fn build(
        &self,
        bot: &BotIdentity,
    ) -> impl std::future::Future<Output = Result<Self::Automation, FleetError>> + Send;
}

/// Fleet lifecycle orchestrator over one bot repository and one manager.
pub struct BotService<R, F>
where
    R: BotRepository + 'static,
    F: AutomationFactory + 'static,
{
    repo: Arc<R>,
    factory: F,
    manager: Arc<AutomationManager<F::Automation>>,
}

impl<R, F> BotService<R, F>
where
    R: BotRepository + 'static,
    F: AutomationFactory + 'static,
{
    pub fn new(repo: Arc<R>, factory: F) -> Self {
        Self {
            repo,
            factory,
            manager: Arc::new(AutomationManager::new()),
        }
    }

    pub fn manager(&self) -> &Arc<AutomationManager<F::Automation>> {
        &self.manager
    }

    async fn require(&self, id: BotId) -> Result<BotIdentity, FleetError> {
        self.repo.get(id).await?.ok_or(FleetError::NotFound(id))
    }

    /// Build, register, and start the automation for `id`, then mark the
    /// bot active.
    ///
    /// On any failure the bot stays inactive and nothing is registered.
    pub async fn start(&self, id: BotId) -> Result<(), FleetError> {
        let bot = self.require(id).await?;
        let automation = self.factory.build(&bot).await?;
        self.manager.add_automation(automation).await?;
        self.repo.set_active(id, true).await?;
        tracing::info!(bot_id = %id, "bot started");
        Ok(())
    }

    /// Stop the automation for `id` and mark the bot inactive.
    ///
    /// Stopping a known bot with no running automation still clears the
    /// active flag. A failed session save propagates before the flag is
    /// cleared; the automation is deregistered either way.
    pub async fn stop(&self, id: BotId) -> Result<(), FleetError> {
        self.require(id).await?;
        self.manager.stop_automation(id).await?;
        self.repo.set_active(id, false).await?;
        tracing::info!(bot_id = %id, "bot stopped");
        Ok(())
    }

    /// Start every known bot not already running. Best-effort: failures are
    /// collected per bot, never aborting the batch.
    pub async fn start_all(&self) -> Result<Vec<(BotId, FleetError)>, FleetError> {
        let bots = self.repo.list_all().await?;
        Ok(self.start_batch(bots).await)
    }

    /// Stop every known bot and clear its active flag, best-effort.
    ///
    /// Walks all bots, not just the active-flagged ones: an automation can
    /// outlive its flag when the flag update failed after registration.
    pub async fn stop_all(&self) -> Result<Vec<(BotId, FleetError)>, FleetError> {
        let bots = self.repo.list_all().await?;

        let stops = bots.iter().map(|bot| async move {
            self.stop(bot.id).await.err().map(|err| (bot.id, err))
        });
        let failures: Vec<(BotId, FleetError)> = futures_util::future::join_all(stops)
            .await
            .into_iter()
            .flatten()
            .collect();

        tracing::info!(
            count = bots.len(),
            failed = failures.len(),
            "stop_all completed"
        );
        Ok(failures)
    }

    /// Restart recovery: bring up every bot whose persisted active flag is
    /// set. Called once after process start.
    pub async fn load_started(&self) -> Result<Vec<(BotId, FleetError)>, FleetError> {
        let bots = self.repo.list_active().await?;
        tracing::info!(count = bots.len(), "recovering active bots");
        Ok(self.start_batch(bots).await)
    }

    async fn start_batch(&self, bots: Vec<BotIdentity>) -> Vec<(BotId, FleetError)> {
        let starts = bots.into_iter().map(|bot| async move {
            if self.manager.contains(bot.id).await {
                return None;
            }
            self.start(bot.id).await.err().map(|err| {
                tracing::error!(bot_id = %bot.id, %err, "bot failed to start");
                (bot.id, err)
            })
        });
        futures_util::future::join_all(starts)
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Subscribe to engine events and deactivate any bot whose automation
    /// halts on its own (pre-start failure or fatal loop error). Runs until
    /// the event bus closes.
    pub fn spawn_halt_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut events = service.manager.events().subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(EngineEvent::AutomationHalted { bot_id, reason }) => {
                        tracing::warn!(bot_id = %bot_id, ?reason, "automation halted, deactivating bot");
                        service.deactivate(bot_id).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "halt listener lagged behind engine events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Clear the auth flags and the active flag after a self-halt, so the
    /// operator sees the bot as needing re-authorization.
    async fn deactivate(&self, bot_id: BotId) {
        if let Err(err) = self.repo.set_auth_flags(bot_id, AuthFlags::CLEARED).await {
            tracing::warn!(bot_id = %bot_id, %err, "failed to clear auth flags");
        }
        if let Err(err) = self.repo.set_active(bot_id, false).await {
            tracing::warn!(bot_id = %bot_id, %err, "failed to clear active flag");
        }
    }
}
