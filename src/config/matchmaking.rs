//! Engine configuration read by every sweep

use crate::error::{MatchmakingError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Immutable matchmaking policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchmakerConfig {
    /// Settling period: entries younger than this are left alone
    pub minimum_wait_time: Duration,
    /// Bound on how long an under-full group may wait
    pub maximum_wait_time: Duration,
    /// Uniformly permute each group before pairing
    pub shuffle_players: bool,
    /// Accept under-full groups after the maximum wait time
    pub enable_bot_fill: bool,
    /// Time between sweep starts
    pub sweep_interval: Duration,
}

impl Default for MatchmakerConfig {
    fn default() -> Self {
        Self {
            minimum_wait_time: Duration::from_secs(5),
            maximum_wait_time: Duration::from_secs(30),
            shuffle_players: true,
            enable_bot_fill: true,
            sweep_interval: Duration::from_secs(1),
        }
    }
}

impl MatchmakerConfig {
    /// Deterministic policy: no settling period, no shuffling
    pub fn immediate() -> Self {
        Self {
            minimum_wait_time: Duration::ZERO,
            shuffle_players: false,
            ..Self::default()
        }
    }

    pub fn with_wait_times(mut self, minimum: Duration, maximum: Duration) -> Self {
        self.minimum_wait_time = minimum;
        self.maximum_wait_time = maximum;
        self
    }

    pub fn with_shuffle(mut self, shuffle_players: bool) -> Self {
        self.shuffle_players = shuffle_players;
        self
    }

    pub fn with_bot_fill(mut self, enable_bot_fill: bool) -> Self {
        self.enable_bot_fill = enable_bot_fill;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(MatchmakingError::ConfigurationError {
                message: "sweep_interval must be greater than 0".to_string(),
            }
            .into());
        }

        if self.maximum_wait_time < self.minimum_wait_time {
            return Err(MatchmakingError::ConfigurationError {
                message: format!(
                    "maximum_wait_time ({:?}) must not be shorter than minimum_wait_time ({:?})",
                    self.maximum_wait_time, self.minimum_wait_time
                ),
            }
            .into());
        }

        Ok(())
    }
}
