//! Broadcast bus for engine lifecycle events.
//!
//! The automation manager publishes here and the bot service façade
//! subscribes, which keeps the Manager -> BotService notification explicit
//! instead of threading callbacks through every automation. Built on
//! `tokio::sync::broadcast`; publishing with no subscribers is a no-op.

use botfleet_types::bot::BotId;
use tokio::sync::broadcast;

/// Why an automation went away without an operator stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// `pre_start` validation failed; the automation was never registered.
    PreStartFailed,
    /// A background loop ended with a fatal error (expired credentials).
    LoopFailed,
}

/// Engine lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// An automation was registered and its loop tasks spawned.
    AutomationStarted { bot_id: BotId, loop_count: usize },
    /// An automation halted on its own; the bot should be deactivated.
    AutomationHalted { bot_id: BotId, reason: HaltReason },
}

/// Multi-consumer bus for [`EngineEvent`].
///
/// Cloning the bus clones the sender, allowing multiple producers and
/// consumers.
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
