//! Provider facade over the session pool, decode-loop executor, and circuit
//! breaker (spec §4.6 "Provider facade").

mod error;
mod facade;

pub use error::ProviderError;
pub use facade::CortexProvider;
