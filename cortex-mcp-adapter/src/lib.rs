//! Routes an inference request through MCP: detect tool calls, read
//! resources, materialize prompts (spec §4.10).

mod adapter;
mod error;

pub use adapter::McpAdapter;
pub use error::AdapterError;
