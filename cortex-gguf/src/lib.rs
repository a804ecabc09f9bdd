//! Binary GGUF header and key/value metadata parser (spec §4.2).
//!
//! This is a from-scratch, dependency-free parser — the teacher never reads
//! a binary model format itself, so there's no wire-format crate to lean on
//! here, just the teacher's habit of modeling wire shapes as plain typed
//! structs instead of a parser-combinator DSL.

pub mod error;
pub mod reader;
pub mod resolve;
pub mod value;

pub use error::GgufError;
pub use reader::{load_model_metadata, read_gguf_metadata, GgufHeader};
pub use resolve::resolve_model_path;
pub use value::MetadataValue;
