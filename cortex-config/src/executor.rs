//! Inference executor tuning (spec §4.4): call timeout, token ceilings,
//! stream backpressure.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pool::humantime_secs;

/// Tuning for the C4 decode loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorConfig {
    /// Default per-call deadline when `ProviderRequest::timeout` is absent.
    #[serde(with = "humantime_secs", default = "default_timeout")]
    pub default_timeout: Duration,
    /// Upper bound enforced on `parameters.max_tokens` regardless of caller input.
    #[serde(default = "default_max_tokens_hard_cap")]
    pub max_tokens_hard_cap: u32,
    /// Max unconsumed stream chunks buffered before the producer pauses
    /// (spec §4.4/§5 backpressure high-water mark).
    #[serde(default = "default_stream_high_water_mark")]
    pub stream_high_water_mark: u32,
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}
fn default_max_tokens_hard_cap() -> u32 {
    4096
}
fn default_stream_high_water_mark() -> u32 {
    64
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout: default_timeout(),
            max_tokens_hard_cap: default_max_tokens_hard_cap(),
            stream_high_water_mark: default_stream_high_water_mark(),
        }
    }
}

impl ExecutorConfig {
    /// Clamp a caller-requested `max_tokens` to the hard cap.
    pub fn clamp_max_tokens(&self, requested: u32) -> u32 {
        requested.min(self.max_tokens_hard_cap).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_respects_hard_cap() {
        let config = ExecutorConfig {
            max_tokens_hard_cap: 100,
            ..ExecutorConfig::default()
        };
        assert_eq!(config.clamp_max_tokens(500), 100);
        assert_eq!(config.clamp_max_tokens(50), 50);
    }

    #[test]
    fn clamp_never_returns_zero() {
        let config = ExecutorConfig::default();
        assert_eq!(config.clamp_max_tokens(0), 1);
    }
}
