//! Engine configuration types.
//!
//! `FleetConfig` represents the top-level `config.toml`. All fields have
//! defaults matching production cadence, so an empty or missing file is a
//! valid configuration.

use serde::{Deserialize, Serialize};

use std::ops::RangeInclusive;

/// Top-level configuration for the Botfleet engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetConfig {
    /// SQLite database URL. When absent, the loader derives one from the
    /// data directory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Loop cadence overrides.
    #[serde(default)]
    pub timing: LoopTiming,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            timing: LoopTiming::default(),
        }
    }
}

/// Cadence of the per-bot background loops.
///
/// Ranges are sampled uniformly per batch so that fleets of bots do not
/// act in lockstep. Tests shrink these to near-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopTiming {
    /// Like batch size range per interaction cycle.
    #[serde(default = "default_like_batch_min")]
    pub like_batch_min: u32,
    #[serde(default = "default_like_batch_max")]
    pub like_batch_max: u32,

    /// Cooldown between interaction cycles, seconds.
    #[serde(default = "default_cooldown_secs_min")]
    pub cooldown_secs_min: u64,
    #[serde(default = "default_cooldown_secs_max")]
    pub cooldown_secs_max: u64,

    /// Delay between individual like attempts, seconds.
    #[serde(default = "default_like_delay_secs_min")]
    pub like_delay_secs_min: u64,
    #[serde(default = "default_like_delay_secs_max")]
    pub like_delay_secs_max: u64,

    /// Conversation loop polling interval, seconds.
    #[serde(default = "default_message_poll_secs")]
    pub message_poll_secs: u64,

    /// Pause after a failed (non-fatal) match fetch before re-polling, seconds.
    #[serde(default = "default_fetch_retry_secs")]
    pub fetch_retry_secs: u64,
}

fn default_like_batch_min() -> u32 {
    25
}
fn default_like_batch_max() -> u32 {
    50
}
fn default_cooldown_secs_min() -> u64 {
    1800
}
fn default_cooldown_secs_max() -> u64 {
    3600
}
fn default_like_delay_secs_min() -> u64 {
    2
}
fn default_like_delay_secs_max() -> u64 {
    3
}
fn default_message_poll_secs() -> u64 {
    600
}
fn default_fetch_retry_secs() -> u64 {
    60
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            like_batch_min: default_like_batch_min(),
            like_batch_max: default_like_batch_max(),
            cooldown_secs_min: default_cooldown_secs_min(),
            cooldown_secs_max: default_cooldown_secs_max(),
            like_delay_secs_min: default_like_delay_secs_min(),
            like_delay_secs_max: default_like_delay_secs_max(),
            message_poll_secs: default_message_poll_secs(),
            fetch_retry_secs: default_fetch_retry_secs(),
        }
    }
}

impl LoopTiming {
    /// A cadence with no sleeps and single-like batches, for tests.
    pub fn immediate() -> Self {
        Self {
            like_batch_min: 1,
            like_batch_max: 1,
            cooldown_secs_min: 0,
            cooldown_secs_max: 0,
            like_delay_secs_min: 0,
            like_delay_secs_max: 0,
            message_poll_secs: 0,
            fetch_retry_secs: 0,
        }
    }

    pub fn like_batch_range(&self) -> RangeInclusive<u32> {
        self.like_batch_min..=self.like_batch_max
    }

    pub fn cooldown_range(&self) -> RangeInclusive<u64> {
        self.cooldown_secs_min..=self.cooldown_secs_max
    }

    pub fn like_delay_range(&self) -> RangeInclusive<u64> {
        self.like_delay_secs_min..=self.like_delay_secs_max
    }
}
