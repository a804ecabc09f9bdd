//! Typed GGUF metadata values (spec §4.2's "supported value types").

use std::fmt;

/// GGUF value-type ids this reader understands well enough to both decode
/// and store. Anything else is skipped if its size is statically known
/// (8-byte scalars, arrays of known-sized elements) and otherwise errors.
pub(crate) mod type_id {
    pub const U8: u32 = 0;
    pub const I8: u32 = 1;
    pub const U16: u32 = 2;
    pub const I16: u32 = 3;
    pub const U32: u32 = 4;
    pub const I32: u32 = 5;
    pub const F32: u32 = 6;
    pub const BOOL: u32 = 7;
    pub const STRING: u32 = 8;
    pub const ARRAY: u32 = 9;
    pub const U64: u32 = 10;
    pub const I64: u32 = 11;
    pub const F64: u32 = 12;
}

/// A decoded, stored metadata value.
///
/// Only the scalar types spec §4.2 calls "supported" are kept; 64-bit
/// scalars and arrays are parsed far enough to skip correctly but are not
/// retained (spec: "log and skip").
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    F32(f32),
    Bool(bool),
    String(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::U8(v) => write!(f, "{v}"),
            MetadataValue::I16(v) => write!(f, "{v}"),
            MetadataValue::U16(v) => write!(f, "{v}"),
            MetadataValue::I32(v) => write!(f, "{v}"),
            MetadataValue::U32(v) => write!(f, "{v}"),
            MetadataValue::F32(v) => write!(f, "{v}"),
            MetadataValue::Bool(v) => write!(f, "{v}"),
            MetadataValue::String(v) => write!(f, "{v}"),
        }
    }
}

impl MetadataValue {
    /// Best-effort conversion to `u32`, used for `contextSize`/`vocabularySize`/
    /// `embeddingSize` lookups which may have been written as any integer width.
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            MetadataValue::U8(v) => Some(v as u32),
            MetadataValue::U16(v) => Some(v as u32),
            MetadataValue::U32(v) => Some(v),
            MetadataValue::I16(v) if v >= 0 => Some(v as u32),
            MetadataValue::I32(v) if v >= 0 => Some(v as u32),
            _ => None,
        }
    }

    /// Best-effort conversion to `&str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}
