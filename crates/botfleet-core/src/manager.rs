//! Automation manager: concurrency-safe registry and scheduler.
//!
//! Holds at most one automation per bot id. Registration runs the
//! automation's pre-start check, spawns one task per declared loop with a
//! completion observer, and registers everything atomically under a single
//! mutex. A loop that ends with a fatal error escalates through a detached
//! task: claim the registry entry, publish the halt event, tear the rest
//! down. Claiming under the mutex makes concurrent failures from sibling
//! loops of the same bot converge to a single notification and teardown.

use botfleet_types::bot::BotId;
use botfleet_types::error::EngineError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use std::collections::HashMap;
use std::sync::Arc;

use crate::automation::Automation;
use crate::event::{EngineEvent, EventBus, HaltReason};

struct RegistryEntry<A: Automation> {
    automation: Arc<A>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// Registry of running automations.
pub struct AutomationManager<A: Automation> {
    registry: Mutex<HashMap<BotId, RegistryEntry<A>>>,
    events: EventBus,
}

impl<A: Automation> Default for AutomationManager<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Automation> AutomationManager<A> {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            events: EventBus::default(),
        }
    }

    /// Lifecycle events: started, halted (pre-start failure or fatal loop
    /// error). The bot service façade subscribes here.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Number of registered automations.
    pub async fn len(&self) -> usize {
        self.registry.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.registry.lock().await.is_empty()
    }

    pub async fn contains(&self, bot_id: BotId) -> bool {
        self.registry.lock().await.contains_key(&bot_id)
    }

    /// Task handles currently held for `bot_id`, if registered.
    pub async fn task_count(&self, bot_id: BotId) -> Option<usize> {
        self.registry
            .lock()
            .await
            .get(&bot_id)
            .map(|entry| entry.handles.len())
    }

    /// Register `automation` and spawn its loops.
    ///
    /// Fails with `AlreadyExists` when the id is registered, leaving the
    /// existing automation untouched. Runs `pre_start` outside the lock; on
    /// failure publishes the halt event and fails with `PreStartFailed`
    /// without registering anything.
    pub async fn add_automation(self: &Arc<Self>, automation: A) -> Result<(), EngineError> {
        let bot_id = automation.bot_id();

        if self.contains(bot_id).await {
            return Err(EngineError::AlreadyExists(bot_id));
        }

        if let Err(err) = automation.pre_start().await {
            tracing::error!(bot_id = %bot_id, %err, "pre-start failed");
            self.events.publish(EngineEvent::AutomationHalted {
                bot_id,
                reason: HaltReason::PreStartFailed,
            });
            return Err(EngineError::PreStartFailed {
                bot_id,
                reason: err.to_string(),
            });
        }

        let automation = Arc::new(automation);
        let cancel = CancellationToken::new();

        let mut registry = self.registry.lock().await;
        // Re-check: another start may have won while pre_start ran unlocked.
        if registry.contains_key(&bot_id) {
            return Err(EngineError::AlreadyExists(bot_id));
        }

        let loops = automation.loops();
        let mut handles = Vec::with_capacity(loops.len());
        for kind in loops {
            let fut = Arc::clone(&automation).run_loop(kind, cancel.child_token());
            let manager = Arc::clone(self);
            handles.push(tokio::spawn(async move {
                if let Err(err) = fut.await {
                    tracing::error!(bot_id = %bot_id, %kind, %err, "loop task failed, escalating");
                    // Detached so teardown survives the abort of this task.
                    tokio::spawn(async move { manager.escalate(bot_id).await });
                }
            }));
        }

        let loop_count = handles.len();
        registry.insert(
            bot_id,
            RegistryEntry {
                automation,
                cancel,
                handles,
            },
        );
        drop(registry);

        self.events.publish(EngineEvent::AutomationStarted { bot_id, loop_count });
        tracing::info!(bot_id = %bot_id, loop_count, "automation started");
        Ok(())
    }

    /// Claim the entry for `bot_id`, removing it from the registry.
    async fn remove_entry(&self, bot_id: BotId) -> Option<RegistryEntry<A>> {
        self.registry.lock().await.remove(&bot_id)
    }

    /// Cancel a claimed entry, then save its session.
    ///
    /// Every task is cancelled before the save runs; a save failure is
    /// re-raised, but cancellation has already taken effect regardless.
    async fn teardown(&self, bot_id: BotId, entry: RegistryEntry<A>) -> Result<(), EngineError> {
        entry.automation.halt();
        entry.cancel.cancel();
        for handle in &entry.handles {
            handle.abort();
        }

        if let Err(err) = entry.automation.save_session().await {
            tracing::error!(bot_id = %bot_id, %err, "session save failed on stop");
            return Err(EngineError::SessionSave {
                bot_id,
                reason: err.to_string(),
            });
        }

        tracing::info!(bot_id = %bot_id, "automation stopped");
        Ok(())
    }

    /// Stop and deregister `bot_id`. No-op for unknown ids.
    pub async fn stop_automation(&self, bot_id: BotId) -> Result<(), EngineError> {
        match self.remove_entry(bot_id).await {
            Some(entry) => self.teardown(bot_id, entry).await,
            None => Ok(()),
        }
    }

    /// Stop every registered automation, best-effort.
    ///
    /// Each stop proceeds independently; per-id failures are collected and
    /// returned, never blocking the others.
    pub async fn close_all(&self) -> Vec<(BotId, EngineError)> {
        let ids: Vec<BotId> = self.registry.lock().await.keys().copied().collect();

        let stops = ids.iter().map(|&id| async move {
            self.stop_automation(id).await.err().map(|err| (id, err))
        });
        let failures: Vec<(BotId, EngineError)> = futures_util::future::join_all(stops)
            .await
            .into_iter()
            .flatten()
            .collect();

        if failures.is_empty() {
            tracing::info!(count = ids.len(), "all automations closed");
        } else {
            tracing::error!(
                count = ids.len(),
                failed = failures.len(),
                "close_all finished with failures"
            );
        }
        failures
    }

    /// Teardown after a fatal loop error, from a detached task.
    ///
    /// Only the claimant of the registry entry notifies and tears down, so
    /// sibling escalations and concurrent operator stops stay silent.
    async fn escalate(self: Arc<Self>, bot_id: BotId) {
        let Some(entry) = self.remove_entry(bot_id).await else {
            return;
        };
        self.events.publish(EngineEvent::AutomationHalted {
            bot_id,
            reason: HaltReason::LoopFailed,
        });
        if let Err(err) = self.teardown(bot_id, entry).await {
            tracing::error!(bot_id = %bot_id, %err, "teardown after loop failure also failed");
        }
    }
}
