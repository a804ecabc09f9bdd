//! Provider request/response wire types (spec §6 "External Interfaces").

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::ConversationMessage;

/// Sampling and generation parameters for a single inference call.
///
/// Defaults match spec §6 exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SamplingParameters {
    /// Sampling temperature, clamped to `0.0..=2.0` by the executor.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling threshold, clamped to `0.0..=1.0`.
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Top-k sampling cutoff, must be `>= 1`.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Repetition penalty applied over the trailing token window.
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,
    /// Maximum tokens to generate, must be `>= 1`.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// RNG seed; `-1` requests a nondeterministic seed.
    #[serde(default = "default_seed")]
    pub seed: i64,
    /// Pin the call to an already-leased session.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Override the model file path instead of resolving by id.
    #[serde(default)]
    pub model_path: Option<String>,
    /// GBNF grammar constraining sampling, if any.
    #[serde(default)]
    pub grammar: Option<String>,
    /// Mirostat mode/parameters passthrough.
    #[serde(default)]
    pub mirostat: Option<serde_json::Value>,
    /// Request JSON-constrained output from the model.
    #[serde(default)]
    pub json_mode: bool,
    /// Per-call deadline in milliseconds, independent of the transport-level timeout.
    #[serde(default)]
    pub inference_timeout_ms: Option<u64>,
    /// Tool names the caller wants dispatched via MCP (C10).
    #[serde(default)]
    pub tools: Vec<ToolInvocation>,
    /// Name of an MCP prompt to materialize instead of the raw messages.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Arguments for `prompt`.
    #[serde(default)]
    pub prompt_arguments: HashMap<String, serde_json::Value>,
    /// MCP resource URIs to read and splice into the response.
    #[serde(default)]
    pub resources: Vec<String>,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.9
}
fn default_top_k() -> u32 {
    40
}
fn default_repeat_penalty() -> f32 {
    1.1
}
fn default_max_tokens() -> u32 {
    512
}
fn default_seed() -> i64 {
    -1
}

impl Default for SamplingParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            repeat_penalty: default_repeat_penalty(),
            max_tokens: default_max_tokens(),
            seed: default_seed(),
            session_id: None,
            model_path: None,
            grammar: None,
            mirostat: None,
            json_mode: false,
            inference_timeout_ms: None,
            tools: Vec::new(),
            prompt: None,
            prompt_arguments: HashMap::new(),
            resources: Vec::new(),
        }
    }
}

/// A single `{name, arguments}` tool call requested by the caller (C10 step 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Tool name as registered in the MCP catalog.
    pub name: String,
    /// Arguments passed through verbatim to `tools/call`.
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Request boundary of the inference core (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Caller-supplied request id, echoed back on every response/chunk.
    pub request_id: String,
    /// Model identifier to resolve via the GGUF metadata cache.
    pub model: String,
    /// Ordered conversation.
    pub messages: Vec<ConversationMessage>,
    /// Sampling/generation parameters.
    #[serde(default)]
    pub parameters: SamplingParameters,
    /// Whether the caller wants a token stream instead of a single response.
    #[serde(default)]
    pub streaming: bool,
    /// Overall call timeout, independent of `inference_timeout_ms`.
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    /// Freeform metadata; always carries `tenantId` and `requestId`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ProviderRequest {
    /// `metadata["tenantId"]`, defaulting to `"default"` (spec §4.6 tenant resolution).
    pub fn tenant_id(&self) -> &str {
        self.metadata
            .get("tenantId")
            .map(String::as_str)
            .unwrap_or("default")
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Why generation stopped (spec §4.4 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model emitted an end-of-generation token.
    Stop,
    /// `max_tokens` was reached before EOS.
    Length,
    /// The per-call deadline elapsed.
    Timeout,
    /// The caller cancelled the call.
    Cancelled,
}

/// Token/duration accounting shared by unary responses and terminal stream chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Tokens in the rendered prompt.
    pub prompt_tokens: u32,
    /// Tokens generated by the model.
    pub completion_tokens: u32,
    /// `prompt_tokens + completion_tokens`.
    pub total_tokens: u32,
    /// Wall-clock duration of the call.
    pub duration_ms: u64,
}

/// Unary inference response (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Echoes `ProviderRequest::request_id`.
    pub request_id: String,
    /// Concatenated generated text.
    pub content: String,
    /// Model that actually served the request.
    pub model: String,
    /// Total tokens (prompt + completion).
    pub tokens_used: u32,
    /// Wall-clock duration of the call.
    pub duration_ms: u64,
    /// Usage/finish-reason metadata.
    pub metadata: InferenceResponseMetadata,
}

/// Metadata attached to [`InferenceResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponseMetadata {
    /// Prompt token count.
    pub prompt_tokens: u32,
    /// Completion token count.
    pub completion_tokens: u32,
    /// Why generation stopped.
    pub finish_reason: FinishReason,
}

/// One chunk of a streaming response (spec §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Echoes `ProviderRequest::request_id`.
    pub request_id: String,
    /// Zero-based, strictly increasing index within the stream.
    pub chunk_index: u32,
    /// Token text for this chunk. Empty on the terminal chunk unless the
    /// final token itself carries text.
    pub delta: String,
    /// True only for the last chunk of the stream (spec §8 property 3).
    pub is_final: bool,
    /// Present (non-default) only on the terminal chunk.
    #[serde(default)]
    pub metadata: Option<InferenceResponseMetadata>,
}

impl StreamChunk {
    /// Build a non-terminal token chunk.
    pub fn delta(request_id: impl Into<String>, chunk_index: u32, delta: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            chunk_index,
            delta: delta.into(),
            is_final: false,
            metadata: None,
        }
    }

    /// Build the terminal chunk carrying aggregate counts.
    pub fn terminal(
        request_id: impl Into<String>,
        chunk_index: u32,
        delta: impl Into<String>,
        metadata: InferenceResponseMetadata,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            chunk_index,
            delta: delta.into(),
            is_final: true,
            metadata: Some(metadata),
        }
    }
}

/// Provider capability advertisement (spec §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Whether `Stream` is supported.
    pub streaming: bool,
    /// Whether MCP tool dispatch is supported.
    pub tools: bool,
    /// Whether multimodal (image) input is supported.
    pub multimodal: bool,
    /// Largest context window across loaded models.
    pub max_context_tokens: u32,
    /// Supported model artifact formats (e.g. `["gguf"]`).
    pub formats: Vec<String>,
    /// Whether GPU offload is enabled.
    pub gpu_enabled: bool,
    /// Number of layers offloaded to GPU, if any.
    pub gpu_layers: u32,
}

/// Provider health snapshot (spec §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
    /// Whether the backend has completed one-shot initialization.
    pub initialized: bool,
    /// Circuit breaker state, as a label (`"closed" | "open" | "half_open"`).
    pub circuit_state: String,
    /// Distinct model ids currently loaded.
    pub loaded_models: Vec<String>,
    /// Count of sessions currently leased.
    pub active_sessions: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_defaults_match_spec() {
        let p = SamplingParameters::default();
        assert_eq!(p.temperature, 0.7);
        assert_eq!(p.top_p, 0.9);
        assert_eq!(p.top_k, 40);
        assert_eq!(p.repeat_penalty, 1.1);
        assert_eq!(p.max_tokens, 512);
        assert_eq!(p.seed, -1);
        assert!(!p.json_mode);
    }

    #[test]
    fn tenant_id_defaults_to_default() {
        let req = ProviderRequest {
            request_id: "r1".into(),
            model: "m".into(),
            messages: vec![],
            parameters: SamplingParameters::default(),
            streaming: false,
            timeout: Duration::from_secs(30),
            metadata: HashMap::new(),
        };
        assert_eq!(req.tenant_id(), "default");
    }

    #[test]
    fn tenant_id_reads_metadata() {
        let mut metadata = HashMap::new();
        metadata.insert("tenantId".to_string(), "acme".to_string());
        let req = ProviderRequest {
            request_id: "r1".into(),
            model: "m".into(),
            messages: vec![],
            parameters: SamplingParameters::default(),
            streaming: false,
            timeout: Duration::from_secs(30),
            metadata,
        };
        assert_eq!(req.tenant_id(), "acme");
    }

    #[test]
    fn request_roundtrips_through_json() {
        let req = ProviderRequest {
            request_id: "r1".into(),
            model: "m".into(),
            messages: vec![ConversationMessage::user("hi")],
            parameters: SamplingParameters::default(),
            streaming: true,
            timeout: Duration::from_millis(1500),
            metadata: HashMap::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        let back: ProviderRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req, back);
    }

    #[test]
    fn stream_chunk_terminal_carries_metadata() {
        let chunk = StreamChunk::terminal(
            "r1",
            3,
            "",
            InferenceResponseMetadata {
                prompt_tokens: 5,
                completion_tokens: 4,
                finish_reason: FinishReason::Stop,
            },
        );
        assert!(chunk.is_final);
        assert!(chunk.metadata.is_some());
    }

    #[test]
    fn stream_chunk_delta_is_not_final() {
        let chunk = StreamChunk::delta("r1", 0, "Hel");
        assert!(!chunk.is_final);
        assert!(chunk.metadata.is_none());
    }

    #[test]
    fn finish_reason_serde_roundtrip() {
        for reason in [
            FinishReason::Stop,
            FinishReason::Length,
            FinishReason::Timeout,
            FinishReason::Cancelled,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            let back: FinishReason = serde_json::from_str(&json).unwrap();
            assert_eq!(reason, back);
        }
    }
}
