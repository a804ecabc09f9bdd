//! Session pool sizing (spec §4.3): `minSize`, `maxSize`, `idleTTL`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-`(tenantId, modelId)` pool sizing and idle-reap policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPoolConfig {
    /// Sessions kept warm even when idle.
    #[serde(default = "default_min_size")]
    pub min_size: u32,
    /// Hard cap on sessions held by one pool entry.
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    /// How long an idle, unlocked session may sit before the reaper closes it.
    #[serde(with = "humantime_secs", default = "default_idle_ttl")]
    pub idle_ttl: Duration,
}

fn default_min_size() -> u32 {
    0
}
fn default_max_size() -> u32 {
    4
}
fn default_idle_ttl() -> Duration {
    Duration::from_secs(300)
}

impl Default for SessionPoolConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            max_size: default_max_size(),
            idle_ttl: default_idle_ttl(),
        }
    }
}

impl SessionPoolConfig {
    /// Validate the invariants spec §4.3 assumes: `minSize <= maxSize`,
    /// `maxSize >= 1`.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_size == 0 {
            return Err("maxSize must be >= 1".to_string());
        }
        if self.min_size > self.max_size {
            return Err(format!(
                "minSize ({}) must be <= maxSize ({})",
                self.min_size, self.max_size
            ));
        }
        Ok(())
    }
}

pub(crate) mod humantime_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let config = SessionPoolConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_min_greater_than_max() {
        let config = SessionPoolConfig {
            min_size: 8,
            max_size: 4,
            ..SessionPoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_max_size() {
        let config = SessionPoolConfig {
            max_size: 0,
            ..SessionPoolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn deserializes_from_toml() {
        let toml_str = r#"
            minSize = 1
            maxSize = 8
            idleTtl = 60
        "#;
        let config: SessionPoolConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.min_size, 1);
        assert_eq!(config.max_size, 8);
        assert_eq!(config.idle_ttl, Duration::from_secs(60));
    }
}
