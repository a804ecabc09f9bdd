//! `CortexProvider`: Id/Capabilities/Infer/Stream/Health (spec §4.6).

use std::sync::Arc;

use futures::stream::{BoxStream, StreamExt};

use cortex_breaker::CircuitBreaker;
use cortex_config::{BreakerConfig, ExecutorConfig};
use cortex_executor::{build_prompt, run_streaming, run_unary, CancellationToken, StreamEvent};
use cortex_session::SessionManager;
use cortex_types::{InferenceResponse, ProviderCapabilities, ProviderHealth, ProviderRequest, StreamChunk};

use crate::error::ProviderError;

/// The public inference surface: one `CortexProvider` per process, wrapping
/// the session pool, the decode-loop executor, and the circuit breaker.
pub struct CortexProvider {
    id: String,
    executor_config: ExecutorConfig,
    sessions: Arc<SessionManager>,
    breaker: Arc<CircuitBreaker>,
}

impl CortexProvider {
    pub fn new(id: impl Into<String>, executor_config: ExecutorConfig, sessions: Arc<SessionManager>, breaker_config: BreakerConfig) -> Self {
        Self {
            id: id.into(),
            executor_config,
            sessions,
            breaker: Arc::new(CircuitBreaker::new(breaker_config)),
        }
    }

    /// `Id()` (spec §4.6) — stable identifier used by the provider registry.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `Capabilities()` (spec §4.6).
    pub async fn capabilities(&self) -> ProviderCapabilities {
        let model_cache = self.sessions.model_cache();
        let load_params = model_cache.load_params();
        ProviderCapabilities {
            streaming: true,
            tools: false,
            multimodal: false,
            max_context_tokens: model_cache.max_context_window().await,
            formats: vec!["gguf".to_string()],
            gpu_enabled: load_params.gpu_layers != 0,
            gpu_layers: load_params.gpu_layers.max(0) as u32,
        }
    }

    /// `Health()` (spec §4.6).
    pub async fn health(&self) -> ProviderHealth {
        ProviderHealth {
            initialized: true,
            circuit_state: breaker_state_label(self.breaker.state().await),
            loaded_models: self.sessions.model_cache().loaded_model_ids().await,
            active_sessions: self.sessions.active_session_count().await,
        }
    }

    fn deadline(&self, request: &ProviderRequest) -> tokio::time::Instant {
        let timeout = if request.timeout.is_zero() {
            self.executor_config.default_timeout
        } else {
            request.timeout
        };
        tokio::time::Instant::now() + timeout
    }

    /// `Infer(ProviderRequest)` (spec §4.6) — unary inference.
    ///
    /// `cancel` is the caller's own signal (spec §5 "every public operation
    /// accepts a cancellation signal"): call `cancel.cancel()` from another
    /// task to stop generation between tokens.
    pub async fn infer(
        &self,
        request: &ProviderRequest,
        cancel: &CancellationToken,
    ) -> Result<InferenceResponse, ProviderError> {
        let permit = self.breaker.try_acquire().await?;
        let start = tokio::time::Instant::now();
        let tenant_id = request.tenant_id().to_string();

        let session = match self.sessions.get_session(&tenant_id, &request.model).await {
            Ok(session) => session,
            Err(err) => {
                let retryable = err.is_retryable();
                resolve_failure(&self.breaker, permit, retryable).await;
                return Err(err.into());
            }
        };

        let prompt = build_prompt(&request.messages);
        let deadline = self.deadline(request);
        let max_tokens = self.executor_config.clamp_max_tokens(request.parameters.max_tokens);
        let mut parameters = request.parameters.clone();
        parameters.max_tokens = max_tokens;

        let mut guard = session.lock().await;
        let outcome = run_unary(&mut guard, &prompt, &parameters, deadline, cancel).await;
        drop(guard);
        self.sessions.return_session(session).await;

        match outcome {
            Ok(outcome) => {
                permit.succeed(&self.breaker).await;
                Ok(InferenceResponse {
                    request_id: request.request_id.clone(),
                    content: outcome.text.clone(),
                    model: request.model.clone(),
                    tokens_used: outcome.prompt_tokens + outcome.completion_tokens,
                    duration_ms: start.elapsed().as_millis() as u64,
                    metadata: outcome.metadata(),
                })
            }
            Err(err) => {
                resolve_failure(&self.breaker, permit, err.is_retryable()).await;
                Err(err.into())
            }
        }
    }

    /// `Stream(ProviderRequest)` (spec §4.6 `Stream → AsyncChunkSequence`) —
    /// yields one [`StreamChunk`] per generated token as soon as it's
    /// produced, followed by a terminal chunk carrying aggregate counts.
    /// Leasing the session happens before this returns, so a
    /// `ResourceExhausted`/`CircuitOpen` failure is reported immediately
    /// rather than as the stream's first item.
    ///
    /// `cancel` is the caller's own signal: cloning it before the call and
    /// invoking `cancel()` on the clone stops generation after the
    /// in-flight token (spec §5, scenario S2).
    pub async fn stream(
        &self,
        request: &ProviderRequest,
        cancel: CancellationToken,
    ) -> Result<BoxStream<'static, Result<StreamChunk, ProviderError>>, ProviderError> {
        let permit = self.breaker.try_acquire().await?;
        let tenant_id = request.tenant_id().to_string();

        let session = match self.sessions.get_session(&tenant_id, &request.model).await {
            Ok(session) => session,
            Err(err) => {
                resolve_failure(&self.breaker, permit, err.is_retryable()).await;
                return Err(err.into());
            }
        };

        let prompt = build_prompt(&request.messages);
        let deadline = self.deadline(request);
        let max_tokens = self.executor_config.clamp_max_tokens(request.parameters.max_tokens);
        let mut parameters = request.parameters.clone();
        parameters.max_tokens = max_tokens;

        let guard = session.lock().await;
        let mut events = Box::pin(run_streaming(guard, prompt, parameters, deadline, cancel));

        let request_id = request.request_id.clone();
        let sessions = Arc::clone(&self.sessions);
        let breaker = Arc::clone(&self.breaker);

        let stream = async_stream::stream! {
            let mut chunk_index = 0u32;
            let mut failure = None;

            while let Some(event) = events.next().await {
                match event {
                    Ok(StreamEvent::Token { text, .. }) => {
                        yield Ok(StreamChunk::delta(&request_id, chunk_index, text));
                        chunk_index += 1;
                    }
                    Ok(StreamEvent::Done(metadata)) => {
                        yield Ok(StreamChunk::terminal(&request_id, chunk_index, String::new(), metadata));
                    }
                    Err(err) => {
                        failure = Some(err.is_retryable());
                        yield Err(ProviderError::from(err));
                    }
                }
            }

            sessions.return_session(session).await;
            match failure {
                Some(retryable) => resolve_failure(&breaker, permit, retryable).await,
                None => permit.succeed(&breaker).await,
            }
        };

        Ok(stream.boxed())
    }
}

/// Resolve a breaker permit after a failed call, per spec §4.5's
/// classification rule: retryable failures count against the breaker,
/// validation/load/cancellation errors are ignored instead.
async fn resolve_failure(breaker: &CircuitBreaker, permit: cortex_breaker::BreakerPermit, retryable: bool) {
    if retryable {
        permit.fail(breaker).await;
    } else {
        permit.ignore(breaker).await;
    }
}

fn breaker_state_label(state: cortex_breaker::BreakerState) -> String {
    match state {
        cortex_breaker::BreakerState::Closed => "closed",
        cortex_breaker::BreakerState::Open => "open",
        cortex_breaker::BreakerState::HalfOpen => "half_open",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_state_labels_match_spec_strings() {
        assert_eq!(breaker_state_label(cortex_breaker::BreakerState::Closed), "closed");
        assert_eq!(breaker_state_label(cortex_breaker::BreakerState::Open), "open");
        assert_eq!(
            breaker_state_label(cortex_breaker::BreakerState::HalfOpen),
            "half_open"
        );
    }
}
