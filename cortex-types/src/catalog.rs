//! MCP catalog item types — tools, resources, prompts (spec §3 "Catalog Item").

use serde::{Deserialize, Serialize};

/// A single entry in the unified MCP catalog.
///
/// The registry (C9) keys on `(serverId, name/uri)` but callers address
/// items by name alone, so collisions are resolved by last-registered-wins
/// with a displacement log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogItem {
    Tool(Tool),
    Resource(Resource),
    Prompt(Prompt),
}

impl CatalogItem {
    /// The name/uri callers use to address this item.
    pub fn key(&self) -> &str {
        match self {
            CatalogItem::Tool(t) => &t.name,
            CatalogItem::Resource(r) => &r.uri,
            CatalogItem::Prompt(p) => &p.name,
        }
    }
}

/// An invocable tool, as returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique tool name within its server.
    pub name: String,
    /// Human-readable description surfaced to the model.
    #[serde(default)]
    pub description: Option<String>,
    /// JSON Schema for `tools/call` arguments.
    pub input_schema: serde_json::Value,
}

/// A readable resource, as returned by `resources/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource identifier, opaque to everything but the owning server.
    pub uri: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// MIME type of the resource body, if known ahead of a read.
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A reusable prompt template, as returned by `prompts/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Unique prompt name within its server.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Named arguments the prompt template accepts.
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A single named argument of a [`Prompt`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name, matched against `prompt_arguments` keys at call time.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the argument must be supplied.
    #[serde(default)]
    pub required: bool,
}

/// Result of `resources/read`: the body plus the server it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceContents {
    /// The resource's own uri, echoed back.
    pub uri: String,
    /// MIME type, if the server reported one.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// UTF-8 text body. Binary resources are out of scope (spec §2 Non-goals).
    pub text: String,
}

/// Result of `prompts/get`: rendered messages ready to splice into a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessages {
    /// Optional server-supplied description of the rendered prompt.
    #[serde(default)]
    pub description: Option<String>,
    /// Rendered messages, in `role: "user" | "assistant"` pairs per the
    /// MCP prompt result shape (not `crate::message::ConversationMessage`,
    /// which the adapter maps these into).
    pub messages: Vec<PromptMessage>,
}

/// One message of a [`PromptMessages`] result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// Text content of the message.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_item_key_dispatches_by_variant() {
        let tool = CatalogItem::Tool(Tool {
            name: "search".into(),
            description: None,
            input_schema: serde_json::json!({"type": "object"}),
        });
        assert_eq!(tool.key(), "search");

        let resource = CatalogItem::Resource(Resource {
            uri: "file:///a.txt".into(),
            name: None,
            description: None,
            mime_type: None,
        });
        assert_eq!(resource.key(), "file:///a.txt");

        let prompt = CatalogItem::Prompt(Prompt {
            name: "summarize".into(),
            description: None,
            arguments: vec![],
        });
        assert_eq!(prompt.key(), "summarize");
    }

    #[test]
    fn catalog_item_tags_kind_on_serialize() {
        let tool = CatalogItem::Tool(Tool {
            name: "search".into(),
            description: Some("web search".into()),
            input_schema: serde_json::json!({"type": "object"}),
        });
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["kind"], "tool");
        assert_eq!(json["name"], "search");
    }

    #[test]
    fn prompt_argument_required_defaults_false() {
        let json = serde_json::json!({"name": "topic"});
        let arg: PromptArgument = serde_json::from_value(json).unwrap();
        assert!(!arg.required);
    }
}
