//! `mcpServers` registry document (spec §6), owned by the external
//! collaborator that writes it and consumed read-only by `cortex-mcp-client`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Which [`cortex-mcp-transport`] implementation to connect a server over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpTransportKind {
    Stdio,
    Http,
    Websocket,
}

/// One entry of the `mcpServers` document: `{ transport, command?, args?,
/// env?, url?, enabled? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServerConfig {
    /// Which transport to dial this server over.
    pub transport: McpTransportKind,
    /// Executable to spawn. Required when `transport = stdio`.
    #[serde(default)]
    pub command: Option<String>,
    /// Arguments passed to `command`.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables set on the spawned process, merged over the
    /// parent environment.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Endpoint URL. Required when `transport` is `http` or `websocket`.
    #[serde(default)]
    pub url: Option<String>,
    /// Whether this server should be connected at startup. Defaults to true.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl McpServerConfig {
    /// Validate the fields required for `transport` are present.
    pub fn validate(&self, name: &str) -> Result<(), String> {
        match self.transport {
            McpTransportKind::Stdio if self.command.is_none() => {
                Err(format!("mcpServers.{name}: stdio transport requires `command`"))
            }
            McpTransportKind::Http | McpTransportKind::Websocket if self.url.is_none() => {
                Err(format!(
                    "mcpServers.{name}: {:?} transport requires `url`",
                    self.transport
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Top-level `{ mcpServers: { <name>: McpServerConfig } }` document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpServersFile {
    /// Server name to configuration.
    #[serde(default)]
    pub mcp_servers: HashMap<String, McpServerConfig>,
}

impl McpServersFile {
    /// Parse a JSON `mcpServers` document (the format external tooling writes).
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Servers with `enabled = true`, in name-sorted order for deterministic
    /// connect-at-startup ordering.
    pub fn enabled_servers(&self) -> Vec<(&str, &McpServerConfig)> {
        let mut servers: Vec<_> = self
            .mcp_servers
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .map(|(name, cfg)| (name.as_str(), cfg))
            .collect();
        servers.sort_by_key(|(name, _)| *name);
        servers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stdio_server() {
        let raw = r#"{
            "mcpServers": {
                "filesystem": {
                    "transport": "stdio",
                    "command": "mcp-server-filesystem",
                    "args": ["/workspace"]
                }
            }
        }"#;
        let file = McpServersFile::from_json(raw).unwrap();
        let fs = &file.mcp_servers["filesystem"];
        assert_eq!(fs.transport, McpTransportKind::Stdio);
        assert_eq!(fs.command.as_deref(), Some("mcp-server-filesystem"));
        assert!(fs.enabled);
    }

    #[test]
    fn stdio_without_command_fails_validation() {
        let config = McpServerConfig {
            transport: McpTransportKind::Stdio,
            command: None,
            args: vec![],
            env: HashMap::new(),
            url: None,
            enabled: true,
        };
        assert!(config.validate("bad").is_err());
    }

    #[test]
    fn http_without_url_fails_validation() {
        let config = McpServerConfig {
            transport: McpTransportKind::Http,
            command: None,
            args: vec![],
            env: HashMap::new(),
            url: None,
            enabled: true,
        };
        assert!(config.validate("bad").is_err());
    }

    #[test]
    fn enabled_servers_excludes_disabled_and_sorts() {
        let raw = r#"{
            "mcpServers": {
                "zeta": {"transport": "http", "url": "http://z", "enabled": true},
                "alpha": {"transport": "http", "url": "http://a", "enabled": true},
                "off": {"transport": "http", "url": "http://o", "enabled": false}
            }
        }"#;
        let file = McpServersFile::from_json(raw).unwrap();
        let names: Vec<&str> = file.enabled_servers().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
