//! Configuration documents for the cortex workspace.
//!
//! Each component crate owns its own config struct; this crate only
//! defines the shapes and the TOML-plus-environment loading glue so
//! nothing downstream needs its own parsing logic.

pub mod breaker;
pub mod error;
pub mod executor;
pub mod load;
pub mod mcp;
pub mod pool;

pub use breaker::BreakerConfig;
pub use error::ConfigError;
pub use executor::ExecutorConfig;
pub use load::CortexConfig;
pub use mcp::{McpServerConfig, McpServersFile, McpTransportKind};
pub use pool::SessionPoolConfig;
