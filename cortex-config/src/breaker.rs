//! Circuit breaker tuning (spec §4.5): `failureThreshold`, `openDuration`,
//! `halfOpenPermits`, `halfOpenSuccessThreshold`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pool::humantime_secs;

/// Tuning for the C5 circuit breaker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerConfig {
    /// Consecutive failures that trip `CLOSED -> OPEN`.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long the breaker stays `OPEN` before allowing a trial call.
    #[serde(with = "humantime_secs", default = "default_open_duration")]
    pub open_duration: Duration,
    /// Concurrent trial calls allowed while `HALF_OPEN`.
    #[serde(default = "default_half_open_permits")]
    pub half_open_permits: u32,
    /// Consecutive trial successes required to close the breaker again.
    #[serde(default = "default_half_open_success_threshold")]
    pub half_open_success_threshold: u32,
}

fn default_failure_threshold() -> u32 {
    5
}
fn default_open_duration() -> Duration {
    Duration::from_secs(30)
}
fn default_half_open_permits() -> u32 {
    1
}
fn default_half_open_success_threshold() -> u32 {
    2
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            open_duration: default_open_duration(),
            half_open_permits: default_half_open_permits(),
            half_open_success_threshold: default_half_open_success_threshold(),
        }
    }
}

impl BreakerConfig {
    /// `failureThreshold >= 1`, `halfOpenPermits >= 1`, `halfOpenSuccessThreshold >= 1`.
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failureThreshold must be >= 1".to_string());
        }
        if self.half_open_permits == 0 {
            return Err("halfOpenPermits must be >= 1".to_string());
        }
        if self.half_open_success_threshold == 0 {
            return Err("halfOpenSuccessThreshold must be >= 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(BreakerConfig::default().validate().is_ok());
    }

    #[test]
    fn s3_scenario_values_parse() {
        let toml_str = r#"
            failureThreshold = 3
            openDuration = 1
            halfOpenPermits = 1
            halfOpenSuccessThreshold = 2
        "#;
        let config: BreakerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.open_duration, Duration::from_secs(1));
    }

    #[test]
    fn rejects_zero_failure_threshold() {
        let config = BreakerConfig {
            failure_threshold: 0,
            ..BreakerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
