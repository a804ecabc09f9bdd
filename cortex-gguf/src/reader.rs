//! GGUF header + key/value metadata parsing (spec §4.2).

use std::collections::HashMap;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::GgufError;
use crate::value::{type_id, MetadataValue};
use cortex_types::ModelMetadata;

const GGUF_MAGIC: u32 = 0x4655_4747; // ASCII "GGUF" read as little-endian u32

/// Header and derived fields parsed out of a GGUF file (spec §4.2 "Derived fields").
#[derive(Debug, Clone, PartialEq)]
pub struct GgufHeader {
    /// GGUF format version. Mismatches from the version this reader was
    /// written against are logged, never fatal.
    pub version: u32,
    /// Number of tensors declared in the file (not validated against the
    /// tensor info section, which this reader does not parse).
    pub tensor_count: u64,
    /// `general.architecture`.
    pub architecture: String,
    /// `<architecture>.context_length`, default `2048`.
    pub context_size: u32,
    /// `<architecture>.vocab_size`, default `32000`.
    pub vocab_size: u32,
    /// `<architecture>.embedding_length`, default `4096`.
    pub embedding_size: u32,
    /// Value of the first key containing `"quantization"` or `"type"`, if any.
    pub quantization: Option<String>,
    /// Every supported-type KV entry, keyed by its full dotted key.
    pub metadata: HashMap<String, MetadataValue>,
}

/// Parse the GGUF header and metadata out of `bytes`, and compute its
/// SHA-256 checksum in the same pass (spec: "Checksum ... computed once on
/// first read").
pub fn read_gguf_metadata(bytes: &[u8]) -> Result<(GgufHeader, String), GgufError> {
    let mut cursor = Cursor::new(bytes);

    let magic = cursor.read_u32("magic")?;
    if magic != GGUF_MAGIC {
        return Err(GgufError::BadMagic { found: magic });
    }

    let version = cursor.read_u32("version")?;
    let tensor_count = cursor.read_u64("tensor_count")?;
    let metadata_kv_count = cursor.read_u64("metadata_kv_count")?;

    let mut metadata = HashMap::with_capacity(metadata_kv_count as usize);
    for _ in 0..metadata_kv_count {
        let key = cursor.read_string("metadata key")?;
        let value_type = cursor.read_u32("metadata value type")?;
        match decode_value(&mut cursor, value_type)? {
            Some(value) => {
                metadata.insert(key, value);
            }
            None => {
                tracing::debug!(key, value_type, "skipped unsupported GGUF metadata value");
            }
        }
    }

    let architecture = metadata
        .get("general.architecture")
        .and_then(MetadataValue::as_str)
        .unwrap_or("unknown")
        .to_string();

    let context_size = metadata
        .get(&format!("{architecture}.context_length"))
        .and_then(MetadataValue::as_u32)
        .unwrap_or(2048);
    let vocab_size = metadata
        .get(&format!("{architecture}.vocab_size"))
        .and_then(MetadataValue::as_u32)
        .unwrap_or(32000);
    let embedding_size = metadata
        .get(&format!("{architecture}.embedding_length"))
        .and_then(MetadataValue::as_u32)
        .unwrap_or(4096);

    let quantization = metadata
        .iter()
        .find(|(key, _)| key.contains("quantization") || key.contains("type"))
        .map(|(_, value)| value.to_string());

    let header = GgufHeader {
        version,
        tensor_count,
        architecture,
        context_size,
        vocab_size,
        embedding_size,
        quantization,
        metadata,
    };

    let checksum = format!("{:x}", Sha256::digest(bytes));
    Ok((header, checksum))
}

/// Read a GGUF file from disk and fold its header into a [`ModelMetadata`]
/// record ready for the process-wide cache (spec §4.2/§3).
pub fn load_model_metadata(model_id: &str, path: &Path) -> Result<ModelMetadata, GgufError> {
    let bytes = std::fs::read(path).map_err(|source| GgufError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let (header, checksum) = read_gguf_metadata(&bytes)?;
    if header.version != 3 {
        tracing::warn!(
            version = header.version,
            "GGUF version mismatch, proceeding anyway"
        );
    }

    let parameters = header
        .metadata
        .iter()
        .map(|(key, value)| (key.clone(), value.to_string()))
        .collect();

    Ok(ModelMetadata {
        model_id: model_id.to_string(),
        path: path.display().to_string(),
        file_size_bytes: bytes.len() as u64,
        architecture: header.architecture,
        quantization: header.quantization,
        context_window: header.context_size,
        vocab_size: header.vocab_size,
        embedding_size: header.embedding_size,
        checksum,
        parameters,
    })
}

fn decode_value(cursor: &mut Cursor<'_>, value_type: u32) -> Result<Option<MetadataValue>, GgufError> {
    match value_type {
        type_id::U8 => Ok(Some(MetadataValue::U8(cursor.read_u8("u8 value")?))),
        type_id::I8 => {
            cursor.read_u8("i8 value")?;
            Ok(None)
        }
        type_id::U16 => Ok(Some(MetadataValue::U16(cursor.read_u16("u16 value")?))),
        type_id::I16 => Ok(Some(MetadataValue::I16(cursor.read_i16("i16 value")?))),
        type_id::U32 => Ok(Some(MetadataValue::U32(cursor.read_u32("u32 value")?))),
        type_id::I32 => Ok(Some(MetadataValue::I32(cursor.read_i32("i32 value")?))),
        type_id::F32 => Ok(Some(MetadataValue::F32(cursor.read_f32("f32 value")?))),
        type_id::BOOL => Ok(Some(MetadataValue::Bool(cursor.read_u8("bool value")? != 0))),
        type_id::STRING => Ok(Some(MetadataValue::String(cursor.read_string("string value")?))),
        type_id::U64 => {
            cursor.read_u64("u64 value")?;
            Ok(None)
        }
        type_id::I64 => {
            cursor.read_u64("i64 value")?;
            Ok(None)
        }
        type_id::F64 => {
            cursor.read_u64("f64 value")?;
            Ok(None)
        }
        type_id::ARRAY => {
            skip_array(cursor)?;
            Ok(None)
        }
        other => Err(GgufError::UnknownValueType { type_id: other }),
    }
}

/// Arrays carry their own element type + count; skip every element using
/// the same size rules as a top-level value, recursing once for nested arrays.
fn skip_array(cursor: &mut Cursor<'_>) -> Result<(), GgufError> {
    let element_type = cursor.read_u32("array element type")?;
    let count = cursor.read_u64("array count")?;
    for _ in 0..count {
        decode_value(cursor, element_type)?;
    }
    Ok(())
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], GgufError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(GgufError::UnexpectedEof { context })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self, context: &'static str) -> Result<u8, GgufError> {
        Ok(self.take(1, context)?[0])
    }

    fn read_u16(&mut self, context: &'static str) -> Result<u16, GgufError> {
        Ok(u16::from_le_bytes(self.take(2, context)?.try_into().unwrap()))
    }

    fn read_i16(&mut self, context: &'static str) -> Result<i16, GgufError> {
        Ok(i16::from_le_bytes(self.take(2, context)?.try_into().unwrap()))
    }

    fn read_u32(&mut self, context: &'static str) -> Result<u32, GgufError> {
        Ok(u32::from_le_bytes(self.take(4, context)?.try_into().unwrap()))
    }

    fn read_i32(&mut self, context: &'static str) -> Result<i32, GgufError> {
        Ok(i32::from_le_bytes(self.take(4, context)?.try_into().unwrap()))
    }

    fn read_f32(&mut self, context: &'static str) -> Result<f32, GgufError> {
        Ok(f32::from_le_bytes(self.take(4, context)?.try_into().unwrap()))
    }

    fn read_u64(&mut self, context: &'static str) -> Result<u64, GgufError> {
        Ok(u64::from_le_bytes(self.take(8, context)?.try_into().unwrap()))
    }

    fn read_string(&mut self, context: &'static str) -> Result<String, GgufError> {
        let len = self.read_u64(context)? as usize;
        let bytes = self.take(len, context)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| GgufError::InvalidUtf8 { context })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_string(buf: &mut Vec<u8>, s: &str) {
        buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
        buf.extend_from_slice(s.as_bytes());
    }

    fn write_kv_string(buf: &mut Vec<u8>, key: &str, value: &str) {
        write_string(buf, key);
        buf.extend_from_slice(&type_id::STRING.to_le_bytes());
        write_string(buf, value);
    }

    fn write_kv_u32(buf: &mut Vec<u8>, key: &str, value: u32) {
        write_string(buf, key);
        buf.extend_from_slice(&type_id::U32.to_le_bytes());
        buf.extend_from_slice(&value.to_le_bytes());
    }

    fn minimal_gguf(entries: Vec<(&str, GgufKv)>) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&GGUF_MAGIC.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes()); // version
        buf.extend_from_slice(&0u64.to_le_bytes()); // tensor_count
        buf.extend_from_slice(&(entries.len() as u64).to_le_bytes());
        for (key, value) in entries {
            match value {
                GgufKv::Str(s) => write_kv_string(&mut buf, key, s),
                GgufKv::U32(n) => write_kv_u32(&mut buf, key, n),
            }
        }
        buf
    }

    enum GgufKv<'a> {
        Str(&'a str),
        U32(u32),
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 16];
        let err = read_gguf_metadata(&bytes).unwrap_err();
        assert!(matches!(err, GgufError::BadMagic { .. }));
    }

    #[test]
    fn parses_architecture_and_derived_fields() {
        let bytes = minimal_gguf(vec![
            ("general.architecture", GgufKv::Str("llama")),
            ("llama.context_length", GgufKv::U32(8192)),
            ("llama.vocab_size", GgufKv::U32(128_256)),
            ("llama.embedding_length", GgufKv::U32(4096)),
        ]);
        let (header, checksum) = read_gguf_metadata(&bytes).unwrap();
        assert_eq!(header.architecture, "llama");
        assert_eq!(header.context_size, 8192);
        assert_eq!(header.vocab_size, 128_256);
        assert_eq!(header.embedding_size, 4096);
        assert_eq!(checksum.len(), 64);
    }

    #[test]
    fn derived_fields_fall_back_to_defaults() {
        let bytes = minimal_gguf(vec![("general.architecture", GgufKv::Str("llama"))]);
        let (header, _) = read_gguf_metadata(&bytes).unwrap();
        assert_eq!(header.context_size, 2048);
        assert_eq!(header.vocab_size, 32000);
        assert_eq!(header.embedding_size, 4096);
    }

    #[test]
    fn quantization_matches_any_key_containing_quantization_or_type() {
        let bytes = minimal_gguf(vec![
            ("general.architecture", GgufKv::Str("llama")),
            ("general.file_type", GgufKv::Str("Q4_K_M")),
        ]);
        let (header, _) = read_gguf_metadata(&bytes).unwrap();
        assert_eq!(header.quantization.as_deref(), Some("Q4_K_M"));
    }

    #[test]
    fn truncated_file_is_unexpected_eof() {
        let mut bytes = GGUF_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&3u32.to_le_bytes());
        // missing tensor_count/metadata_kv_count entirely
        let err = read_gguf_metadata(&bytes).unwrap_err();
        assert!(matches!(err, GgufError::UnexpectedEof { .. }));
    }

    #[test]
    fn unknown_value_type_errors() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&GGUF_MAGIC.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&1u64.to_le_bytes());
        write_string(&mut buf, "weird.key");
        buf.extend_from_slice(&255u32.to_le_bytes()); // bogus type id
        let err = read_gguf_metadata(&buf).unwrap_err();
        assert!(matches!(err, GgufError::UnknownValueType { type_id: 255 }));
    }

    #[test]
    fn u64_scalar_is_skipped_not_stored() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&GGUF_MAGIC.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&2u64.to_le_bytes());
        write_string(&mut buf, "general.architecture");
        buf.extend_from_slice(&type_id::STRING.to_le_bytes());
        write_string(&mut buf, "llama");
        write_string(&mut buf, "llama.rope.freq_base_u64");
        buf.extend_from_slice(&type_id::U64.to_le_bytes());
        buf.extend_from_slice(&10000u64.to_le_bytes());
        let (header, _) = read_gguf_metadata(&buf).unwrap();
        assert_eq!(header.metadata.len(), 1);
        assert!(!header.metadata.contains_key("llama.rope.freq_base_u64"));
    }
}
