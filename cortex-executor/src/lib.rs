//! Prompt construction and the native decode loop (spec §4.4).
//!
//! `cortex-executor` knows how to turn a message list and sampling
//! parameters into generated text or a sequence of token deltas against an
//! already-leased [`cortex_session::SessionGuard`]; it does not itself lease
//! sessions, resolve tenants, or talk to the circuit breaker — that's
//! `cortex-provider`'s job.

pub mod cancel;
pub mod decode_loop;
pub mod error;
pub mod prompt;

pub use cancel::CancellationToken;
pub use decode_loop::{run_streaming, run_unary, GenerationOutcome, StreamEvent};
pub use error::ExecutorError;
pub use prompt::build_prompt;
