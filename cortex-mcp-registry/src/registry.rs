//! Process-wide `toolName`/`resourceUri`/`promptName` → `(connectionId, item)`
//! registries (spec §4.9).
//!
//! Plain `HashMap` state behind a single lock, in the bookkeeping style the
//! teacher uses for its context-compaction strategies: no external map/cache
//! crate, just the data structure the invariant actually calls for.

use std::collections::HashMap;
use std::sync::RwLock;

use cortex_types::{Prompt, Resource, Tool};

use crate::ConnectionId;

/// Record of a name/uri collision: the later registration won, the earlier
/// owner is recorded here (spec §4.9 "the later registration wins and the
/// displacement is recorded").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Displacement {
    pub kind: &'static str,
    pub key: String,
    pub previous_owner: ConnectionId,
    pub new_owner: ConnectionId,
}

/// One connection's discovered catalog, as handed to [`McpRegistry::register_connection`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionCatalog {
    pub tools: Vec<Tool>,
    pub resources: Vec<Resource>,
    pub prompts: Vec<Prompt>,
}

#[derive(Default)]
struct Inner {
    tools: HashMap<String, (ConnectionId, Tool)>,
    resources: HashMap<String, (ConnectionId, Resource)>,
    prompts: HashMap<String, (ConnectionId, Prompt)>,
    displacements: Vec<Displacement>,
}

/// Process-wide registry mapping catalog item names to the connection that
/// owns them (spec §4.9).
#[derive(Default)]
pub struct McpRegistry {
    inner: RwLock<Inner>,
}

impl McpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every item of `catalog` under `connection_id`. A name/uri
    /// already owned by a different connection is overwritten and the
    /// displacement recorded (spec §4.9 "registering a connection overwrites
    /// any prior entries with colliding names").
    pub fn register_connection(&self, connection_id: ConnectionId, catalog: ConnectionCatalog) {
        let mut inner = self.inner.write().expect("registry lock poisoned");

        for tool in catalog.tools {
            insert_displacing(&mut inner.tools, &mut inner.displacements, "tool", tool.name.clone(), connection_id.clone(), tool);
        }
        for resource in catalog.resources {
            insert_displacing(
                &mut inner.resources,
                &mut inner.displacements,
                "resource",
                resource.uri.clone(),
                connection_id.clone(),
                resource,
            );
        }
        for prompt in catalog.prompts {
            insert_displacing(
                &mut inner.prompts,
                &mut inner.displacements,
                "prompt",
                prompt.name.clone(),
                connection_id.clone(),
                prompt,
            );
        }
    }

    /// Remove every entry owned by `connection_id` (spec §4.9 "unregistering
    /// removes all of its entries").
    pub fn unregister_connection(&self, connection_id: &str) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner.tools.retain(|_, (owner, _)| owner != connection_id);
        inner.resources.retain(|_, (owner, _)| owner != connection_id);
        inner.prompts.retain(|_, (owner, _)| owner != connection_id);
    }

    pub fn lookup_tool(&self, name: &str) -> Option<(ConnectionId, Tool)> {
        self.inner.read().expect("registry lock poisoned").tools.get(name).cloned()
    }

    pub fn lookup_resource(&self, uri: &str) -> Option<(ConnectionId, Resource)> {
        self.inner.read().expect("registry lock poisoned").resources.get(uri).cloned()
    }

    pub fn lookup_prompt(&self, name: &str) -> Option<(ConnectionId, Prompt)> {
        self.inner.read().expect("registry lock poisoned").prompts.get(name).cloned()
    }

    /// Substring match over tool name and description, case-insensitive
    /// (spec §4.9 "supports keyword search by substring match over name and
    /// description").
    pub fn search_tools(&self, keyword: &str) -> Vec<(ConnectionId, Tool)> {
        let needle = keyword.to_lowercase();
        self.inner
            .read()
            .expect("registry lock poisoned")
            .tools
            .values()
            .filter(|(_, tool)| {
                tool.name.to_lowercase().contains(&needle)
                    || tool
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    pub fn displacements(&self) -> Vec<Displacement> {
        self.inner.read().expect("registry lock poisoned").displacements.clone()
    }
}

fn insert_displacing<V>(
    map: &mut HashMap<String, (ConnectionId, V)>,
    displacements: &mut Vec<Displacement>,
    kind: &'static str,
    key: String,
    owner: ConnectionId,
    value: V,
) {
    if let Some((previous_owner, _)) = map.get(&key) {
        if *previous_owner != owner {
            displacements.push(Displacement {
                kind,
                key: key.clone(),
                previous_owner: previous_owner.clone(),
                new_owner: owner.clone(),
            });
        }
    }
    map.insert(key, (owner, value));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, description: &str) -> Tool {
        Tool {
            name: name.to_string(),
            description: Some(description.to_string()),
            input_schema: serde_json::json!({"type": "object"}),
        }
    }

    #[test]
    fn registers_and_looks_up_tools() {
        let registry = McpRegistry::new();
        registry.register_connection(
            "filesystem".to_string(),
            ConnectionCatalog { tools: vec![tool("read_file", "reads a file")], ..Default::default() },
        );
        let (owner, found) = registry.lookup_tool("read_file").unwrap();
        assert_eq!(owner, "filesystem");
        assert_eq!(found.name, "read_file");
    }

    #[test]
    fn later_registration_wins_and_is_logged() {
        let registry = McpRegistry::new();
        registry.register_connection(
            "server-a".to_string(),
            ConnectionCatalog { tools: vec![tool("search", "search server a")], ..Default::default() },
        );
        registry.register_connection(
            "server-b".to_string(),
            ConnectionCatalog { tools: vec![tool("search", "search server b")], ..Default::default() },
        );

        let (owner, found) = registry.lookup_tool("search").unwrap();
        assert_eq!(owner, "server-b");
        assert_eq!(found.description.as_deref(), Some("search server b"));

        let displacements = registry.displacements();
        assert_eq!(displacements.len(), 1);
        assert_eq!(displacements[0].previous_owner, "server-a");
        assert_eq!(displacements[0].new_owner, "server-b");
    }

    #[test]
    fn unregister_removes_all_entries_of_a_connection() {
        let registry = McpRegistry::new();
        registry.register_connection(
            "filesystem".to_string(),
            ConnectionCatalog {
                tools: vec![tool("read_file", "reads")],
                resources: vec![Resource {
                    uri: "file:///a.txt".into(),
                    name: None,
                    description: None,
                    mime_type: None,
                }],
                ..Default::default()
            },
        );
        registry.unregister_connection("filesystem");
        assert!(registry.lookup_tool("read_file").is_none());
        assert!(registry.lookup_resource("file:///a.txt").is_none());
    }

    #[test]
    fn search_tools_matches_name_or_description_case_insensitively() {
        let registry = McpRegistry::new();
        registry.register_connection(
            "filesystem".to_string(),
            ConnectionCatalog {
                tools: vec![tool("read_file", "Reads a FILE from disk"), tool("list_dir", "lists a directory")],
                ..Default::default()
            },
        );
        let results = registry.search_tools("file");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].1.name, "read_file");
    }
}
