//! Shared domain types for the cortex inference core and MCP client.
//!
//! These are the lingua franca between `cortex-provider`, `cortex-executor`,
//! `cortex-session`, and the MCP crates. Nothing here talks to a native
//! library, a socket, or a child process — it's plain data.

pub mod catalog;
pub mod error;
pub mod message;
pub mod model;
pub mod provider;
pub mod rpc;

pub use catalog::*;
pub use error::*;
pub use message::*;
pub use model::*;
pub use provider::*;
pub use rpc::*;
