//! The decode loop itself (spec §4.4 "Algorithm").

use std::future::Future;
use std::sync::Arc;

use futures::Stream;
use tokio::time::Instant;

use cortex_native::{MirostatParams, SamplerChain, SamplerParams};
use cortex_session::SessionGuard;
use cortex_types::{FinishReason, InferenceResponseMetadata, SamplingParameters};

use crate::cancel::CancellationToken;
use crate::error::ExecutorError;

/// Validated, clamp-checked view over [`SamplingParameters`] (spec §4.4 step 4).
fn validate_parameters(params: &SamplingParameters) -> Result<(), ExecutorError> {
    if !(0.0..=2.0).contains(&params.temperature) {
        return Err(ExecutorError::Validation {
            reason: format!("temperature {} outside 0..=2", params.temperature),
        });
    }
    if !(0.0..=1.0).contains(&params.top_p) {
        return Err(ExecutorError::Validation {
            reason: format!("top_p {} outside 0..=1", params.top_p),
        });
    }
    if params.top_k < 1 {
        return Err(ExecutorError::Validation {
            reason: "top_k must be >= 1".to_string(),
        });
    }
    if params.max_tokens < 1 {
        return Err(ExecutorError::Validation {
            reason: "max_tokens must be >= 1".to_string(),
        });
    }
    Ok(())
}

/// llama.cpp's own sentinel for "pick a nondeterministic seed".
const LLAMA_DEFAULT_SEED: u32 = 0xFFFF_FFFF;

fn sampler_params(params: &SamplingParameters) -> SamplerParams {
    let seed = if params.seed < 0 {
        LLAMA_DEFAULT_SEED
    } else {
        params.seed as u32
    };
    let mirostat = params.mirostat.as_ref().and_then(|value| {
        let version = value.get("version")?.as_u64()? as u8;
        let tau = value.get("tau")?.as_f64()? as f32;
        let eta = value.get("eta")?.as_f64()? as f32;
        Some(MirostatParams { version, tau, eta })
    });
    SamplerParams {
        temperature: params.temperature,
        top_p: params.top_p,
        top_k: params.top_k,
        repeat_penalty: params.repeat_penalty,
        seed,
        min_p: None,
        typical_p: None,
        mirostat,
        grammar: params.grammar.clone(),
    }
}

/// Accumulated result of running the decode loop to completion (spec §4.4
/// step 6).
pub struct GenerationOutcome {
    pub text: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub finish_reason: FinishReason,
}

impl GenerationOutcome {
    pub fn metadata(&self) -> InferenceResponseMetadata {
        InferenceResponseMetadata {
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            finish_reason: self.finish_reason,
        }
    }
}

/// One generated token, yielded by [`run_streaming`]/collected by [`run_unary`].
struct GeneratedToken {
    text: String,
    index: u32,
}

/// Shared step of the decode loop: prepares the prompt, builds the sampler,
/// and drives token generation, awaiting `on_token` for each token produced
/// so a caller can apply backpressure (spec §5 "bounded internal buffering
/// per stream") before the next token is sampled. Returns once generation
/// stops, whatever the reason.
async fn drive<F, Fut>(
    guard: &mut SessionGuard,
    prompt: &str,
    params: &SamplingParameters,
    deadline: Instant,
    cancel: &CancellationToken,
    mut on_token: F,
) -> Result<(u32, u32, FinishReason), ExecutorError>
where
    F: FnMut(GeneratedToken) -> Fut,
    Fut: Future<Output = ()>,
{
    validate_parameters(params)?;

    let model = Arc::clone(guard.session().model());
    let prompt_tokens = cortex_native::tokenize(&model, prompt, true)?;
    guard.decode(&prompt_tokens)?;

    let sampler = SamplerChain::build(&sampler_params(params))?;

    let mut completion_tokens = 0u32;
    let mut finish_reason = FinishReason::Length;

    for i in 0..params.max_tokens {
        let token = guard.sample(&sampler);

        if model.is_end_of_generation(token) {
            finish_reason = FinishReason::Stop;
            break;
        }

        let text = cortex_native::detokenize(&model, token);
        on_token(GeneratedToken { text, index: i }).await;
        completion_tokens += 1;

        guard.decode(&[token])?;

        if cancel.is_cancelled() {
            finish_reason = FinishReason::Cancelled;
            break;
        }
        if Instant::now() >= deadline {
            finish_reason = FinishReason::Timeout;
            break;
        }
    }

    Ok((prompt_tokens.len() as u32, completion_tokens, finish_reason))
}

/// Run the decode loop to completion and return the concatenated text
/// (spec §4.4 "unary ... concatenates and emits once").
pub async fn run_unary(
    guard: &mut SessionGuard,
    prompt: &str,
    params: &SamplingParameters,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<GenerationOutcome, ExecutorError> {
    let mut text = String::new();
    let (prompt_tokens, completion_tokens, finish_reason) =
        drive(guard, prompt, params, deadline, cancel, |token| {
            text.push_str(&token.text);
            std::future::ready(())
        })
        .await?;

    Ok(GenerationOutcome {
        text,
        prompt_tokens,
        completion_tokens,
        finish_reason,
    })
}

/// One item of the [`run_streaming`] chunk sequence: a generated token's
/// text and index, or the accounting that closes the stream.
pub enum StreamEvent {
    /// A generated token, in order.
    Token {
        /// Decoded text for this token.
        text: String,
        /// Zero-based, strictly increasing index within the stream.
        index: u32,
    },
    /// Generation has stopped; the terminal item of the sequence.
    Done(InferenceResponseMetadata),
}

/// Depth of the channel backing [`run_streaming`]: the decode loop blocks
/// after this many ungenerated tokens pile up, bounding how far generation
/// can run ahead of a slow consumer (spec §5 "bounded internal buffering
/// per stream").
const STREAM_BUFFER: usize = 8;

/// Run the decode loop as an async chunk sequence, yielding one
/// [`StreamEvent::Token`] per generated token followed by a single
/// [`StreamEvent::Done`] (spec §4.4 "streaming emits per-token",
/// spec §4.6 `Stream → AsyncChunkSequence`).
///
/// Takes the session guard by value because generation runs on its own
/// task so the returned stream can be polled independently of the caller;
/// the guard (and the task) is dropped once the sequence is fully drained
/// or the caller stops polling.
pub fn run_streaming(
    mut guard: SessionGuard,
    prompt: String,
    params: SamplingParameters,
    deadline: Instant,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<StreamEvent, ExecutorError>> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(STREAM_BUFFER);

    tokio::spawn(async move {
        let result = drive(&mut guard, &prompt, &params, deadline, &cancel, |token| {
            let tx = tx.clone();
            async move {
                let _ = tx
                    .send(Ok(StreamEvent::Token {
                        text: token.text,
                        index: token.index,
                    }))
                    .await;
            }
        })
        .await;

        let terminal = result.map(|(prompt_tokens, completion_tokens, finish_reason)| {
            StreamEvent::Done(InferenceResponseMetadata {
                prompt_tokens,
                completion_tokens,
                finish_reason,
            })
        });
        let _ = tx.send(terminal).await;
    });

    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield event;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_temperature_out_of_range() {
        let params = SamplingParameters {
            temperature: 3.0,
            ..SamplingParameters::default()
        };
        let err = validate_parameters(&params).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn rejects_top_p_out_of_range() {
        let params = SamplingParameters {
            top_p: 1.5,
            ..SamplingParameters::default()
        };
        assert!(validate_parameters(&params).is_err());
    }

    #[test]
    fn rejects_zero_top_k() {
        let params = SamplingParameters {
            top_k: 0,
            ..SamplingParameters::default()
        };
        assert!(validate_parameters(&params).is_err());
    }

    #[test]
    fn rejects_zero_max_tokens() {
        let params = SamplingParameters {
            max_tokens: 0,
            ..SamplingParameters::default()
        };
        assert!(validate_parameters(&params).is_err());
    }

    #[test]
    fn accepts_defaults() {
        assert!(validate_parameters(&SamplingParameters::default()).is_ok());
    }

    #[test]
    fn negative_seed_maps_to_llama_default_seed() {
        let params = SamplingParameters {
            seed: -1,
            ..SamplingParameters::default()
        };
        assert_eq!(sampler_params(&params).seed, LLAMA_DEFAULT_SEED);
    }

    #[test]
    fn non_negative_seed_passes_through() {
        let params = SamplingParameters {
            seed: 42,
            ..SamplingParameters::default()
        };
        assert_eq!(sampler_params(&params).seed, 42);
    }
}
