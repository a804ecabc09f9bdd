//! `McpConnection`: initialize handshake, catalog discovery, and the
//! operations exposed upward (spec §4.8).

use std::time::Duration;

use tokio::sync::Mutex;

use cortex_config::McpServerConfig;
use cortex_mcp_transport::{NotificationHandler, Transport};
use cortex_types::{Prompt, PromptMessages, Resource, ResourceContents, Tool};

use crate::error::McpError;

/// Protocol versions offered, newest first (spec §4.8 step 1).
const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-11-05", "2025-03-26", "2024-11-05"];

/// `serverInfo` as reported by `initialize` (spec §4.8 step 2).
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// `serverCapabilities` as reported by `initialize` (spec §4.8 step 2):
/// gates which of `tools/list`, `resources/list`, `prompts/list` get issued.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerCapabilities {
    pub tools: bool,
    pub resources: bool,
    pub prompts: bool,
}

/// Discovered catalog for one connection (spec §4.8 step 4).
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub tools: Vec<Tool>,
    pub resources: Vec<Resource>,
    pub prompts: Vec<Prompt>,
}

struct ConnectionState {
    server_info: ServerInfo,
    capabilities: ServerCapabilities,
    catalog: Catalog,
}

/// A live MCP connection: one transport, one negotiated session, one
/// discovered catalog (spec §4.8).
pub struct McpConnection {
    transport: Transport,
    state: Mutex<ConnectionState>,
}

impl McpConnection {
    /// `Connect()` (spec §4.8 steps 1-4): establish the transport, negotiate
    /// the protocol version, send `notifications/initialized`, and discover
    /// every catalog the server's capabilities advertise.
    pub async fn connect(
        config: &McpServerConfig,
        default_timeout: Duration,
        on_notification: NotificationHandler,
    ) -> Result<Self, McpError> {
        let transport = Transport::connect(config, default_timeout, on_notification).await?;

        let init_params = serde_json::json!({
            "protocolVersion": SUPPORTED_PROTOCOL_VERSIONS[0],
            "capabilities": { "roots": { "listChanged": true }, "sampling": {} },
            "clientInfo": { "name": "cortex", "version": env!("CARGO_PKG_VERSION") },
        });
        let init_result = transport.send_request("initialize", Some(init_params)).await?;

        let negotiated_version = init_result
            .get("protocolVersion")
            .and_then(|v| v.as_str())
            .ok_or_else(|| McpError::Protocol("initialize result missing protocolVersion".to_string()))?;
        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&negotiated_version) {
            return Err(McpError::Protocol(format!(
                "server negotiated unsupported protocol version {negotiated_version}"
            )));
        }

        let server_info = parse_server_info(&init_result);
        let capabilities = parse_server_capabilities(&init_result);

        transport
            .send_notification("notifications/initialized", None)
            .await?;

        let catalog = discover_catalog(&transport, capabilities).await?;

        Ok(Self {
            transport,
            state: Mutex::new(ConnectionState {
                server_info,
                capabilities,
                catalog,
            }),
        })
    }

    pub async fn server_info(&self) -> ServerInfo {
        self.state.lock().await.server_info.clone()
    }

    pub async fn capabilities(&self) -> ServerCapabilities {
        self.state.lock().await.capabilities
    }

    pub async fn catalog(&self) -> Catalog {
        self.state.lock().await.catalog.clone()
    }

    /// `CallTool(name, arguments) -> Response` (spec §4.8).
    pub async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<serde_json::Value, McpError> {
        let params = serde_json::json!({ "name": name, "arguments": arguments });
        self.transport
            .send_request("tools/call", Some(params))
            .await
            .map_err(McpError::from)
    }

    /// `ReadResource(uri) -> Response` (spec §4.8). Caching is the caller's
    /// concern (C9); this always hits the server.
    pub async fn read_resource(&self, uri: &str) -> Result<ResourceContents, McpError> {
        let params = serde_json::json!({ "uri": uri });
        let result = self.transport.send_request("resources/read", Some(params)).await?;
        parse_resource_contents(uri, &result)
    }

    /// `GetPrompt(name, arguments) -> PromptResult` (spec §4.8).
    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<PromptMessages, McpError> {
        let params = serde_json::json!({ "name": name, "arguments": arguments });
        let result = self.transport.send_request("prompts/get", Some(params)).await?;
        parse_prompt_messages(&result)
    }

    /// Disconnect: clears the catalog and tears down the transport (spec
    /// §4.8 "Disconnect clears the catalogs and tears down the transport").
    pub async fn disconnect(&self) {
        self.state.lock().await.catalog = Catalog::default();
        self.transport.disconnect().await;
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }
}

fn parse_server_info(init_result: &serde_json::Value) -> ServerInfo {
    let info = init_result.get("serverInfo");
    ServerInfo {
        name: info
            .and_then(|i| i.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or("unknown")
            .to_string(),
        version: info
            .and_then(|i| i.get("version"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string(),
    }
}

fn parse_server_capabilities(init_result: &serde_json::Value) -> ServerCapabilities {
    let capabilities = init_result.get("capabilities");
    ServerCapabilities {
        tools: capabilities.and_then(|c| c.get("tools")).is_some(),
        resources: capabilities.and_then(|c| c.get("resources")).is_some(),
        prompts: capabilities.and_then(|c| c.get("prompts")).is_some(),
    }
}

async fn discover_catalog(transport: &Transport, capabilities: ServerCapabilities) -> Result<Catalog, McpError> {
    let mut catalog = Catalog::default();

    if capabilities.tools {
        let result = transport.send_request("tools/list", None).await?;
        catalog.tools = parse_list(&result, "tools")?;
    }
    if capabilities.resources {
        let result = transport.send_request("resources/list", None).await?;
        catalog.resources = parse_list(&result, "resources")?;
    }
    if capabilities.prompts {
        let result = transport.send_request("prompts/list", None).await?;
        catalog.prompts = parse_list(&result, "prompts")?;
    }

    Ok(catalog)
}

fn parse_list<T: serde::de::DeserializeOwned>(result: &serde_json::Value, key: &str) -> Result<Vec<T>, McpError> {
    let Some(items) = result.get(key) else {
        return Ok(Vec::new());
    };
    serde_json::from_value(items.clone())
        .map_err(|e| McpError::Malformed(format!("{key} list: {e}")))
}

fn parse_resource_contents(uri: &str, result: &serde_json::Value) -> Result<ResourceContents, McpError> {
    let contents = result
        .get("contents")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| McpError::Malformed("resources/read result missing contents".to_string()))?;

    Ok(ResourceContents {
        uri: contents.get("uri").and_then(|u| u.as_str()).unwrap_or(uri).to_string(),
        mime_type: contents.get("mimeType").and_then(|m| m.as_str()).map(str::to_string),
        text: contents.get("text").and_then(|t| t.as_str()).unwrap_or("").to_string(),
    })
}

fn parse_prompt_messages(result: &serde_json::Value) -> Result<PromptMessages, McpError> {
    serde_json::from_value(result.clone()).map_err(|e| McpError::Malformed(format!("prompts/get result: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_server_info_falls_back_when_missing() {
        let info = parse_server_info(&serde_json::json!({}));
        assert_eq!(info.name, "unknown");
        assert_eq!(info.version, "");
    }

    #[test]
    fn parse_server_capabilities_reads_presence_not_value() {
        let init_result = serde_json::json!({
            "capabilities": { "tools": {}, "prompts": {} }
        });
        let caps = parse_server_capabilities(&init_result);
        assert!(caps.tools);
        assert!(caps.prompts);
        assert!(!caps.resources);
    }

    #[test]
    fn parse_list_defaults_to_empty_when_key_absent() {
        let tools: Vec<Tool> = parse_list(&serde_json::json!({}), "tools").unwrap();
        assert!(tools.is_empty());
    }

    #[test]
    fn parse_list_rejects_malformed_entries() {
        let result = serde_json::json!({ "tools": [{"name": 1}] });
        let err = parse_list::<Tool>(&result, "tools").unwrap_err();
        assert!(matches!(err, McpError::Malformed(_)));
    }

    #[test]
    fn parse_resource_contents_extracts_first_entry() {
        let result = serde_json::json!({
            "contents": [{ "uri": "file:///a.txt", "mimeType": "text/plain", "text": "hello" }]
        });
        let contents = parse_resource_contents("file:///a.txt", &result).unwrap();
        assert_eq!(contents.text, "hello");
        assert_eq!(contents.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn parse_prompt_messages_round_trips() {
        let result = serde_json::json!({
            "description": "summary prompt",
            "messages": [{ "role": "user", "content": "summarize this" }]
        });
        let prompt = parse_prompt_messages(&result).unwrap();
        assert_eq!(prompt.messages.len(), 1);
        assert_eq!(prompt.messages[0].role, "user");
    }
}
