//! The CLOSED / OPEN / HALF_OPEN state machine itself.

use std::time::Instant;

use tokio::sync::Mutex;

use cortex_config::BreakerConfig;

/// Observable breaker state (spec §3 "Circuit Breaker State").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Failure raised when a call is rejected without reaching the executor.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BreakerError {
    /// The breaker is `OPEN` and not yet past `openDuration`.
    #[error("circuit open, retry after {retry_after_ms}ms")]
    CircuitOpen {
        /// Milliseconds remaining until a trial call may be attempted.
        retry_after_ms: u64,
    },
    /// The breaker is `HALF_OPEN` but all trial permits are already issued.
    #[error("circuit half-open, all {permits} trial permits in use")]
    HalfOpenExhausted {
        /// Configured `halfOpenPermits`.
        permits: u32,
    },
}

impl BreakerError {
    /// Breaker rejections never themselves count as executor failures —
    /// the call never reached C4.
    pub fn is_retryable(&self) -> bool {
        true
    }
}

struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_permits_issued: u32,
    half_open_successes: u32,
}

/// The breaker itself — one instance per provider (spec treats it as a
/// singleton guarding C4, but nothing here prevents per-model instances).
pub struct CircuitBreaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Build a new breaker, starting `CLOSED`.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                half_open_permits_issued: 0,
                half_open_successes: 0,
            }),
        }
    }

    /// Current state, after lazily applying the `OPEN -> HALF_OPEN` timeout
    /// transition if `openDuration` has elapsed.
    pub async fn state(&self) -> BreakerState {
        let mut inner = self.inner.lock().await;
        self.advance_open_to_half_open(&mut inner);
        inner.state
    }

    /// Ask permission to make a call. Returns a [`BreakerPermit`] that the
    /// caller must resolve with [`BreakerPermit::succeed`] or
    /// [`BreakerPermit::fail`] once the call completes.
    pub async fn try_acquire(&self) -> Result<BreakerPermit, BreakerError> {
        let mut inner = self.inner.lock().await;
        self.advance_open_to_half_open(&mut inner);

        match inner.state {
            BreakerState::Closed => Ok(BreakerPermit { half_open: false }),
            BreakerState::Open => {
                let opened_at = inner.opened_at.expect("OPEN state always sets opened_at");
                let elapsed = opened_at.elapsed();
                let retry_after_ms = self
                    .config
                    .open_duration
                    .saturating_sub(elapsed)
                    .as_millis() as u64;
                Err(BreakerError::CircuitOpen { retry_after_ms })
            }
            BreakerState::HalfOpen => {
                if inner.half_open_permits_issued >= self.config.half_open_permits {
                    return Err(BreakerError::HalfOpenExhausted {
                        permits: self.config.half_open_permits,
                    });
                }
                inner.half_open_permits_issued += 1;
                Ok(BreakerPermit { half_open: true })
            }
        }
    }

    async fn resolve(&self, half_open: bool, success: bool) {
        let mut inner = self.inner.lock().await;
        match (inner.state, half_open, success) {
            (BreakerState::Closed, _, true) => {
                inner.consecutive_failures = 0;
            }
            (BreakerState::Closed, _, false) => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.trip_open(&mut inner);
                }
            }
            (BreakerState::HalfOpen, true, true) => {
                inner.half_open_successes += 1;
                inner.half_open_permits_issued = inner.half_open_permits_issued.saturating_sub(1);
                if inner.half_open_successes >= self.config.half_open_success_threshold {
                    tracing::info!("circuit breaker closing after half-open recovery");
                    inner.state = BreakerState::Closed;
                    inner.consecutive_failures = 0;
                    inner.opened_at = None;
                    inner.half_open_permits_issued = 0;
                    inner.half_open_successes = 0;
                }
            }
            (BreakerState::HalfOpen, true, false) => {
                inner.half_open_permits_issued = inner.half_open_permits_issued.saturating_sub(1);
                self.trip_open(&mut inner);
            }
            // A permit issued while CLOSED/HALF_OPEN resolving after a state
            // transition already moved us elsewhere: nothing to do beyond
            // what the transition already recorded.
            _ => {}
        }
    }

    fn trip_open(&self, inner: &mut Inner) {
        tracing::warn!(
            failures = inner.consecutive_failures,
            "circuit breaker opening"
        );
        inner.state = BreakerState::Open;
        inner.opened_at = Some(Instant::now());
        inner.half_open_successes = 0;
        inner.half_open_permits_issued = 0;
    }

    fn advance_open_to_half_open(&self, inner: &mut Inner) {
        if inner.state == BreakerState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= self.config.open_duration {
                    tracing::info!("circuit breaker entering half-open trial period");
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_successes = 0;
                    inner.half_open_permits_issued = 0;
                }
            }
        }
    }
}

/// A permit acquired from [`CircuitBreaker::try_acquire`]. The caller
/// resolves it with [`BreakerPermit::succeed`] or [`BreakerPermit::fail`]
/// once the guarded call completes.
#[must_use = "resolve with .succeed() or .fail() so the breaker can observe the outcome"]
pub struct BreakerPermit {
    half_open: bool,
}

impl BreakerPermit {
    /// Report that the guarded call succeeded.
    pub async fn succeed(self, breaker: &CircuitBreaker) {
        breaker.resolve(self.half_open, true).await;
    }

    /// Report that the guarded call failed.
    pub async fn fail(self, breaker: &CircuitBreaker) {
        breaker.resolve(self.half_open, false).await;
    }

    /// Report that the call finished with an error that C6 classified as
    /// not counting against the breaker (`ValidationError`, `LoadError` —
    /// spec §4.5). Releases a half-open trial slot without moving counters
    /// or state, so a caller mistake doesn't mask or force recovery.
    pub async fn ignore(self, breaker: &CircuitBreaker) {
        if self.half_open {
            let mut inner = breaker.inner.lock().await;
            inner.half_open_permits_issued = inner.half_open_permits_issued.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> BreakerConfig {
        BreakerConfig {
            failure_threshold: 3,
            open_duration: Duration::from_millis(50),
            half_open_permits: 1,
            half_open_success_threshold: 2,
        }
    }

    #[tokio::test]
    async fn closed_allows_calls_and_resets_on_success() {
        let breaker = CircuitBreaker::new(test_config());
        let permit = breaker.try_acquire().await.unwrap();
        permit.fail(&breaker).await;
        let permit = breaker.try_acquire().await.unwrap();
        permit.succeed(&breaker).await;
        assert_eq!(breaker.state().await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn opens_after_failure_threshold() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            let permit = breaker.try_acquire().await.unwrap();
            permit.fail(&breaker).await;
        }
        assert_eq!(breaker.state().await, BreakerState::Open);
        let err = breaker.try_acquire().await.unwrap_err();
        assert!(matches!(err, BreakerError::CircuitOpen { .. }));
    }

    #[tokio::test]
    async fn s3_scenario_three_failures_then_rejects_fast() {
        let breaker = CircuitBreaker::new(test_config());
        let mut outcomes = vec![];
        for _ in 0..5 {
            match breaker.try_acquire().await {
                Ok(permit) => {
                    permit.fail(&breaker).await;
                    outcomes.push(true);
                }
                Err(_) => outcomes.push(false),
            }
        }
        assert_eq!(outcomes, vec![true, true, true, false, false]);
    }

    #[tokio::test]
    async fn transitions_to_half_open_after_duration_and_recovers() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            let permit = breaker.try_acquire().await.unwrap();
            permit.fail(&breaker).await;
        }
        assert_eq!(breaker.state().await, BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);

        let permit = breaker.try_acquire().await.unwrap();
        permit.succeed(&breaker).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);

        let permit = breaker.try_acquire().await.unwrap();
        permit.succeed(&breaker).await;
        assert_eq!(breaker.state().await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_circuit() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            let permit = breaker.try_acquire().await.unwrap();
            permit.fail(&breaker).await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);

        let permit = breaker.try_acquire().await.unwrap();
        permit.fail(&breaker).await;
        assert_eq!(breaker.state().await, BreakerState::Open);
    }

    #[tokio::test]
    async fn ignored_outcomes_do_not_move_counters() {
        let breaker = CircuitBreaker::new(test_config());
        let permit = breaker.try_acquire().await.unwrap();
        permit.ignore(&breaker).await;
        // Two real failures: still below failureThreshold=3, so closed.
        for _ in 0..2 {
            let permit = breaker.try_acquire().await.unwrap();
            permit.fail(&breaker).await;
        }
        assert_eq!(breaker.state().await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn half_open_permits_are_bounded() {
        let breaker = CircuitBreaker::new(test_config());
        for _ in 0..3 {
            let permit = breaker.try_acquire().await.unwrap();
            permit.fail(&breaker).await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;

        let _permit = breaker.try_acquire().await.unwrap();
        let err = breaker.try_acquire().await.unwrap_err();
        assert!(matches!(err, BreakerError::HalfOpenExhausted { .. }));
    }
}
