//! TOML-plus-environment config loading.
//!
//! Matches the teacher's `neuron-env-local` preference for plain, explicit
//! merging over a `config`-crate style layered provider: read a TOML file,
//! then let a short list of `CORTEX_*` environment variables override
//! specific scalar fields. No crate dependency beyond `serde` + `toml`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::breaker::BreakerConfig;
use crate::error::ConfigError;
use crate::executor::ExecutorConfig;
use crate::mcp::McpServersFile;
use crate::pool::SessionPoolConfig;

/// The full, merged configuration for one cortex process.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CortexConfig {
    /// Session pool sizing, shared by every `(tenantId, modelId)` entry
    /// unless a tenant-specific override is added later.
    #[serde(default)]
    pub pool: SessionPoolConfig,
    /// Circuit breaker tuning.
    #[serde(default)]
    pub breaker: BreakerConfig,
    /// Decode loop tuning.
    #[serde(default)]
    pub executor: ExecutorConfig,
    /// MCP servers to connect at startup.
    #[serde(default)]
    pub mcp: McpServersFile,
    /// Directory scanned for model manifests/artifacts.
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
}

fn default_models_dir() -> String {
    "./models".to_string()
}

impl CortexConfig {
    /// Load from a TOML file at `path`, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: CortexConfig = toml::from_str(&raw).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })?;
        config.apply_env_overrides(std::env::vars())?;
        Ok(config)
    }

    /// Start from defaults and apply only environment overrides — useful
    /// for tests and for running without a config file on disk.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = CortexConfig::default();
        config.apply_env_overrides(std::env::vars())?;
        Ok(config)
    }

    /// Apply a fixed set of `CORTEX_*` scalar overrides on top of whatever
    /// was loaded from TOML. Unrecognized variables are ignored so the
    /// process environment can carry unrelated settings.
    fn apply_env_overrides(
        &mut self,
        vars: impl Iterator<Item = (String, String)>,
    ) -> Result<(), ConfigError> {
        for (name, value) in vars {
            match name.as_str() {
                "CORTEX_POOL_MAX_SIZE" => self.pool.max_size = parse_env(&name, &value)?,
                "CORTEX_POOL_MIN_SIZE" => self.pool.min_size = parse_env(&name, &value)?,
                "CORTEX_BREAKER_FAILURE_THRESHOLD" => {
                    self.breaker.failure_threshold = parse_env(&name, &value)?
                }
                "CORTEX_EXECUTOR_MAX_TOKENS_HARD_CAP" => {
                    self.executor.max_tokens_hard_cap = parse_env(&name, &value)?
                }
                "CORTEX_MODELS_DIR" => self.models_dir = value,
                _ => continue,
            }
        }
        Ok(())
    }

    /// Validate nested configs, surfacing the first failure.
    pub fn validate(&self) -> Result<(), String> {
        self.pool.validate()?;
        self.breaker.validate()?;
        for (name, server) in &self.mcp.mcp_servers {
            server.validate(name)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvValue {
        name: name.to_string(),
        value: value.to_string(),
        reason: format!("expected {}", std::any::type_name::<T>()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        let config = CortexConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            modelsDir = "/srv/models"

            [pool]
            maxSize = 10

            [breaker]
            failureThreshold = 3
            "#
        )
        .unwrap();
        let config = CortexConfig::load(file.path()).unwrap();
        assert_eq!(config.models_dir, "/srv/models");
        assert_eq!(config.pool.max_size, 10);
        assert_eq!(config.breaker.failure_threshold, 3);
    }

    #[test]
    fn env_override_wins_over_toml() {
        let mut config = CortexConfig::default();
        config
            .apply_env_overrides(
                vec![("CORTEX_POOL_MAX_SIZE".to_string(), "16".to_string())].into_iter(),
            )
            .unwrap();
        assert_eq!(config.pool.max_size, 16);
    }

    #[test]
    fn invalid_env_value_errors() {
        let mut config = CortexConfig::default();
        let result = config.apply_env_overrides(
            vec![("CORTEX_POOL_MAX_SIZE".to_string(), "not-a-number".to_string())].into_iter(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn unrecognized_env_vars_are_ignored() {
        let mut config = CortexConfig::default();
        config
            .apply_env_overrides(vec![("PATH".to_string(), "/usr/bin".to_string())].into_iter())
            .unwrap();
        assert_eq!(config, CortexConfig::default());
    }
}
