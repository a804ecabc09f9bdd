//! Circuit breaker guarding the inference executor (spec §4.5/§8.7).
//!
//! No teacher crate implements a breaker; this follows the state-machine
//! style `layer0::operator` uses elsewhere in the pack — an enum state plus
//! typed transition methods, rather than a generic "circuit-breaker" crate.

mod state;

pub use state::{BreakerError, BreakerPermit, BreakerState, CircuitBreaker};
