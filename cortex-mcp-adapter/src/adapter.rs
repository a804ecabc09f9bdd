//! `McpAdapter`: routes an inference request through MCP (spec §4.10).
//!
//! Grounded on `ToolRegistry::execute`'s name-lookup-then-dispatch shape
//! (`agent-tool::registry`): a plain `HashMap<ConnectionId, Arc<McpConnection>>`
//! behind a lock, looked up by name before every call.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::RwLock;

use cortex_mcp_client::McpConnection;
use cortex_mcp_registry::{ConnectionCatalog, ConnectionId, McpRegistry, ResourceCache};
use cortex_types::{FinishReason, InferenceResponse, InferenceResponseMetadata, ProviderRequest};

use crate::error::AdapterError;

/// Holds the live connections and catalog registry an [`ProviderRequest`]
/// with an MCP-preferred provider is routed through.
pub struct McpAdapter {
    registry: Arc<McpRegistry>,
    cache: Arc<ResourceCache>,
    connections: RwLock<HashMap<ConnectionId, Arc<McpConnection>>>,
}

impl McpAdapter {
    pub fn new(registry: Arc<McpRegistry>, cache: Arc<ResourceCache>) -> Self {
        Self { registry, cache, connections: RwLock::new(HashMap::new()) }
    }

    /// Record a freshly connected [`McpConnection`]: its catalog goes into
    /// the shared registry, the connection itself into this adapter's pool.
    pub async fn register_connection(
        &self,
        id: ConnectionId,
        connection: Arc<McpConnection>,
        catalog: ConnectionCatalog,
    ) {
        self.registry.register_connection(id.clone(), catalog);
        self.connections.write().await.insert(id, connection);
    }

    /// Unregister a connection: removes its catalog entries and drops the
    /// pooled handle. Does not disconnect the transport; the caller already
    /// owns that lifecycle.
    pub async fn unregister_connection(&self, id: &str) {
        self.registry.unregister_connection(id);
        self.connections.write().await.remove(id);
    }

    /// Route `request` through MCP per the four-branch decision order (spec
    /// §4.10).
    pub async fn handle(&self, request: &ProviderRequest) -> Result<InferenceResponse, AdapterError> {
        let started = Instant::now();

        if !request.parameters.tools.is_empty() {
            return self.handle_tools(request, started).await;
        }
        if let Some(prompt_name) = &request.parameters.prompt {
            return self.handle_prompt(request, prompt_name, started).await;
        }
        if !request.parameters.resources.is_empty() {
            return self.handle_resources(request, started).await;
        }
        Ok(self.passthrough(request, started))
    }

    async fn handle_tools(&self, request: &ProviderRequest, started: Instant) -> Result<InferenceResponse, AdapterError> {
        let mut lines = Vec::with_capacity(request.parameters.tools.len());
        for invocation in &request.parameters.tools {
            let line = match self.call_tool(&invocation.name, invocation.arguments.clone()).await {
                Ok(result) => format!("Tool: {}\n{}", invocation.name, render_tool_result(&result)),
                Err(err) => format!("Tool {} failed: {err}", invocation.name),
            };
            lines.push(line);
        }
        Ok(self.respond(request, lines.join("\n\n"), started))
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, AdapterError> {
        let (connection_id, _tool) =
            self.registry.lookup_tool(name).ok_or_else(|| AdapterError::UnknownTool(name.to_string()))?;
        let connection = self.connection(&connection_id).await?;
        Ok(connection.call_tool(name, arguments).await?)
    }

    async fn handle_prompt(
        &self,
        request: &ProviderRequest,
        prompt_name: &str,
        started: Instant,
    ) -> Result<InferenceResponse, AdapterError> {
        let (connection_id, _prompt) = self
            .registry
            .lookup_prompt(prompt_name)
            .ok_or_else(|| AdapterError::UnknownPrompt(prompt_name.to_string()))?;
        let connection = self.connection(&connection_id).await?;

        let arguments = serde_json::to_value(&request.parameters.prompt_arguments).unwrap_or(Value::Null);
        let result = connection.get_prompt(prompt_name, arguments).await?;
        let content = result.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
        Ok(self.respond(request, content, started))
    }

    async fn handle_resources(&self, request: &ProviderRequest, started: Instant) -> Result<InferenceResponse, AdapterError> {
        let mut parts = Vec::with_capacity(request.parameters.resources.len());
        for uri in &request.parameters.resources {
            parts.push(self.read_resource(uri).await?.text);
        }
        Ok(self.respond(request, parts.join("\n\n"), started))
    }

    async fn read_resource(&self, uri: &str) -> Result<cortex_types::ResourceContents, AdapterError> {
        if let Some(cached) = self.cache.get(uri).await {
            return Ok(cached);
        }
        let (connection_id, _resource) =
            self.registry.lookup_resource(uri).ok_or_else(|| AdapterError::UnknownResource(uri.to_string()))?;
        let connection = self.connection(&connection_id).await?;
        let contents = connection.read_resource(uri).await?;
        self.cache.insert(uri.to_string(), contents.clone()).await;
        Ok(contents)
    }

    /// Branch 4: no MCP-specific field was set, so the conversation passes
    /// through unchanged (spec §4.10 step 4).
    fn passthrough(&self, request: &ProviderRequest, started: Instant) -> InferenceResponse {
        let content = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.respond(request, content, started)
    }

    async fn connection(&self, id: &str) -> Result<Arc<McpConnection>, AdapterError> {
        self.connections
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AdapterError::ConnectionUnavailable(id.to_string()))
    }

    fn respond(&self, request: &ProviderRequest, content: String, started: Instant) -> InferenceResponse {
        InferenceResponse {
            request_id: request.request_id.clone(),
            content,
            model: request.model.clone(),
            tokens_used: 0,
            duration_ms: started.elapsed().as_millis() as u64,
            metadata: InferenceResponseMetadata {
                prompt_tokens: 0,
                completion_tokens: 0,
                finish_reason: FinishReason::Stop,
            },
        }
    }
}

/// A `tools/call` result is `{ content: [{ type: "text", text }, ...], isError }`
/// per the MCP tool-result shape; render its text parts, falling back to the
/// raw JSON for anything else a server might return.
fn render_tool_result(result: &Value) -> String {
    if let Some(items) = result.get("content").and_then(|c| c.as_array()) {
        let text: Vec<&str> = items.iter().filter_map(|item| item.get("text").and_then(|t| t.as_str())).collect();
        if !text.is_empty() {
            return text.join("\n");
        }
    }
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_tool_result_extracts_text_blocks() {
        let result = serde_json::json!({
            "content": [{"type": "text", "text": "first"}, {"type": "text", "text": "second"}]
        });
        assert_eq!(render_tool_result(&result), "first\nsecond");
    }

    #[test]
    fn render_tool_result_falls_back_to_raw_json() {
        let result = serde_json::json!({"ok": true});
        assert_eq!(render_tool_result(&result), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn passthrough_echoes_last_message_when_no_mcp_field_is_set() {
        use cortex_types::{ConversationMessage, SamplingParameters};
        use std::collections::HashMap as Map;
        use std::time::Duration;

        let adapter = McpAdapter::new(Arc::new(McpRegistry::new()), Arc::new(ResourceCache::default()));
        let request = ProviderRequest {
            request_id: "r1".into(),
            model: "m".into(),
            messages: vec![ConversationMessage::user("hello there")],
            parameters: SamplingParameters::default(),
            streaming: false,
            timeout: Duration::from_secs(5),
            metadata: Map::new(),
        };
        let response = adapter.handle(&request).await.unwrap();
        assert_eq!(response.content, "hello there");
    }

    #[tokio::test]
    async fn unknown_tool_call_becomes_an_inline_failure_line_not_an_error() {
        use cortex_types::{SamplingParameters, ToolInvocation};
        use std::collections::HashMap as Map;
        use std::time::Duration;

        let adapter = McpAdapter::new(Arc::new(McpRegistry::new()), Arc::new(ResourceCache::default()));
        let mut parameters = SamplingParameters::default();
        parameters.tools = vec![ToolInvocation { name: "missing_tool".into(), arguments: Value::Null }];
        let request = ProviderRequest {
            request_id: "r1".into(),
            model: "m".into(),
            messages: vec![],
            parameters,
            streaming: false,
            timeout: Duration::from_secs(5),
            metadata: Map::new(),
        };
        let response = adapter.handle(&request).await.unwrap();
        assert!(response.content.contains("Tool missing_tool failed"));
    }
}
