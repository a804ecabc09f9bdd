//! Model artifact and metadata types (spec §3 "Model Manifest" / "Model Metadata").

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Artifact format of a model file. Only `Gguf` is loadable by `cortex-native`
/// today; the others are recognized so manifests from mixed fleets parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Gguf,
    Safetensors,
    Onnx,
}

/// Tenant-facing record of a model made available for loading.
///
/// Populated from the models directory scan (spec §4.1) and consulted by
/// the session pool before a load is attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Stable identifier used in `ProviderRequest::model`.
    pub model_id: String,
    /// Owning tenant; `None` means shared across all tenants.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Artifact format.
    pub format: ModelFormat,
    /// Absolute paths to the artifact file(s) backing this model.
    pub artifacts: Vec<String>,
    /// Total size in bytes across all artifacts.
    pub size_bytes: u64,
    /// When this manifest entry was created.
    pub created_at: DateTime<Utc>,
    /// When the manifest was last refreshed by a directory scan.
    pub updated_at: DateTime<Utc>,
}

/// Derived metadata read out of a GGUF file's header (spec §4.2).
///
/// One of these is cached per resolved model path so repeated loads (e.g.
/// across sessions) skip re-parsing the header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Same id as the owning [`ModelManifest`].
    pub model_id: String,
    /// Resolved absolute path to the `.gguf` file actually opened.
    pub path: String,
    /// File size in bytes, as observed at parse time.
    pub file_size_bytes: u64,
    /// `general.architecture` KV, e.g. `"llama"`.
    pub architecture: String,
    /// Quantization label, e.g. `"Q4_K_M"`. Absent for F16/F32 artifacts.
    #[serde(default)]
    pub quantization: Option<String>,
    /// `<arch>.context_length` KV.
    pub context_window: u32,
    /// Tokenizer vocabulary size.
    pub vocab_size: u32,
    /// `<arch>.embedding_length` KV.
    pub embedding_size: u32,
    /// SHA-256 of the full artifact, hex-encoded.
    pub checksum: String,
    /// Every other scalar KV entry, stringified, for diagnostics and the
    /// health/introspection surface.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_format_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ModelFormat::Gguf).unwrap(), "\"gguf\"");
    }

    #[test]
    fn manifest_tenant_id_defaults_absent() {
        let json = serde_json::json!({
            "model_id": "llama-3-8b",
            "format": "gguf",
            "artifacts": ["/models/llama-3-8b.gguf"],
            "size_bytes": 4_000_000_000u64,
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
        });
        let manifest: ModelManifest = serde_json::from_value(json).unwrap();
        assert!(manifest.tenant_id.is_none());
    }

    #[test]
    fn metadata_roundtrips_through_json() {
        let mut parameters = HashMap::new();
        parameters.insert("llama.rope.freq_base".to_string(), "10000".to_string());
        let metadata = ModelMetadata {
            model_id: "llama-3-8b".into(),
            path: "/models/llama-3-8b.gguf".into(),
            file_size_bytes: 4_000_000_000,
            architecture: "llama".into(),
            quantization: Some("Q4_K_M".into()),
            context_window: 8192,
            vocab_size: 128_256,
            embedding_size: 4096,
            checksum: "a".repeat(64),
            parameters,
        };
        let json = serde_json::to_value(&metadata).unwrap();
        let back: ModelMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(metadata, back);
    }
}
