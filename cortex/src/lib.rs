#![deny(missing_docs)]
//! # cortex — umbrella crate
//!
//! Single import surface over the local LLM inference core: GGUF metadata,
//! the llama.cpp binding, the session pool, the decode loop, the circuit
//! breaker, the provider facade, and (behind `mcp`) the MCP transport,
//! connection, registry, and inference-adapter layer.

#[cfg(feature = "core")]
pub use cortex_breaker;
#[cfg(feature = "core")]
pub use cortex_config;
#[cfg(feature = "core")]
pub use cortex_executor;
#[cfg(feature = "core")]
pub use cortex_gguf;
#[cfg(feature = "mcp")]
pub use cortex_mcp_adapter;
#[cfg(feature = "mcp")]
pub use cortex_mcp_client;
#[cfg(feature = "mcp")]
pub use cortex_mcp_registry;
#[cfg(feature = "mcp")]
pub use cortex_mcp_transport;
#[cfg(feature = "core")]
pub use cortex_native;
#[cfg(feature = "core")]
pub use cortex_provider;
#[cfg(feature = "core")]
pub use cortex_session;
#[cfg(feature = "core")]
pub use cortex_types;

/// Happy-path imports for embedding the inference core.
pub mod prelude {
    #[cfg(feature = "core")]
    pub use cortex_breaker::{BreakerError, BreakerPermit, BreakerState, CircuitBreaker};

    #[cfg(feature = "core")]
    pub use cortex_config::{BreakerConfig, ConfigError, CortexConfig, ExecutorConfig, SessionPoolConfig};

    #[cfg(feature = "core")]
    pub use cortex_executor::CancellationToken;

    #[cfg(feature = "core")]
    pub use cortex_provider::{CortexProvider, ProviderError};

    #[cfg(feature = "core")]
    pub use cortex_session::{Session, SessionGuard, SessionManager};

    #[cfg(feature = "core")]
    pub use cortex_types::{
        ErrorKind, ErrorPayload, InferenceResponse, ProviderCapabilities, ProviderHealth, ProviderRequest,
        SamplingParameters, StreamChunk,
    };

    #[cfg(feature = "mcp")]
    pub use cortex_config::{McpServerConfig, McpServersFile, McpTransportKind};

    #[cfg(feature = "mcp")]
    pub use cortex_mcp_adapter::{AdapterError, McpAdapter};

    #[cfg(feature = "mcp")]
    pub use cortex_mcp_client::{McpConnection, McpError};

    #[cfg(feature = "mcp")]
    pub use cortex_mcp_registry::{ConnectionCatalog, McpRegistry, ResourceCache};

    #[cfg(feature = "mcp")]
    pub use cortex_mcp_transport::{Transport, TransportError};
}
