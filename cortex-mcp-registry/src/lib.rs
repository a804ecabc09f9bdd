//! Process-wide MCP catalog registries and the resource content cache
//! (spec §4.9).

mod cache;
mod registry;

/// Identifies the connection that owns a registered catalog item. Opaque to
/// this crate; callers supply the same id they used to register and
/// disconnect a connection.
pub type ConnectionId = String;

pub use cache::{CacheStats, ResourceCache, DEFAULT_MAX_SIZE, DEFAULT_TTL};
pub use registry::{ConnectionCatalog, Displacement, McpRegistry};
