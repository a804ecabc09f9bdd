//! The opaque token id type shared by every C1 operation (spec §4.1).

/// An opaque vocabulary token id. Callers must not assume any meaning
/// beyond "pass back to `Detokenize`/`Decode`/`Sample`".
pub type TokenId = i32;
