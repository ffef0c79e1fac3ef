use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Run polling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Backoff and deadline for polling a run until it reaches a terminal state.
///
/// The interval starts at `initial_interval_ms`, is multiplied by
/// `multiplier` after every non-terminal poll and never exceeds
/// `max_interval_ms`. `timeout_ms` is a wall-clock deadline for the whole
/// poll, measured from the first status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "d_initial")]
    pub initial_interval_ms: u64,
    #[serde(default = "d_max")]
    pub max_interval_ms: u64,
    #[serde(default = "d_multiplier")]
    pub multiplier: f64,
    #[serde(default = "d_timeout")]
    pub timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: d_initial(),
            max_interval_ms: d_max(),
            multiplier: d_multiplier(),
            timeout_ms: d_timeout(),
        }
    }
}

impl PollingConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn d_initial() -> u64 {
    1_000
}
fn d_max() -> u64 {
    5_000
}
fn d_multiplier() -> f64 {
    1.5
}
fn d_timeout() -> u64 {
    60_000
}
