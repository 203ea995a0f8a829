//! Reusable resilience primitives for unreliable calls.
//!
//! Three independently composable wrappers, each operating over an arbitrary
//! async call returning `Result<T, E>`:
//!
//! - [`RateLimiter`] – spaces call starts so no two calls through the same
//!   limiter begin closer together than its minimum interval.
//! - [`CircuitBreaker`] – stops calling a failing dependency until it likely
//!   recovered (`Closed → Open → HalfOpen → Closed|Open`).
//! - [`RetryPolicy`] – retries transient failures with exponential backoff
//!   and jitter; permanent failures propagate immediately.
//!
//! [`ResilienceStack`] composes the three in the order
//! `RateLimiter(CircuitBreaker(RetryPolicy(call)))`: the limiter gates the
//! start of each *logical* call, and the whole retry loop runs inside a
//! single breaker acquisition so one logical request counts at most once
//! toward the breaker, however many attempts it took.

mod circuit_breaker;
mod rate_limiter;
mod retry;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use circuit_breaker::{BreakerPermit, CircuitBreaker, CircuitState};
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;

// ── Error classification ───────────────────────────────────────────────

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Timeouts, connection failures, rate-limit responses. Retried.
    Transient,
    /// Validation and client errors. Never retried.
    Permanent,
}

/// Classification seam for errors flowing through the resilience wrappers.
///
/// Implemented by the error type of any call handed to [`RetryPolicy`] or
/// [`ResilienceStack`].
pub trait Classify {
    /// Classify this error.
    fn class(&self) -> ErrorClass;

    /// Shorthand for `self.class() == ErrorClass::Transient`.
    fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }
}

// ── ResilienceError ────────────────────────────────────────────────────

/// Failure of a resilience-wrapped call.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The circuit is open; the wrapped call was not invoked.
    #[error("circuit open; next trial permitted in {retry_in:?}")]
    CircuitOpen {
        /// Time until the breaker will allow a trial call.
        retry_in: Duration,
    },

    /// Every permitted attempt failed with a transient error.
    #[error("retries exhausted after {attempts} attempts")]
    Exhausted {
        /// Total attempts made, including the first.
        attempts: u32,
        /// The final attempt's error.
        #[source]
        source: E,
    },

    /// The call failed with an error that is not retried.
    #[error(transparent)]
    Inner(E),
}

impl<E> ResilienceError<E> {
    /// The underlying call error, when one exists.
    pub fn source_error(&self) -> Option<&E> {
        match self {
            Self::CircuitOpen { .. } => None,
            Self::Exhausted { source, .. } => Some(source),
            Self::Inner(source) => Some(source),
        }
    }

    /// True when the breaker fast-failed without invoking the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }
}

// ── Configuration ──────────────────────────────────────────────────────

/// Per-provider resilience tuning, used to build a [`ResilienceStack`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Maximum call starts per second through the limiter.
    pub calls_per_second: f64,
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before permitting a trial call.
    pub recovery_timeout: Duration,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    /// First-retry backoff; doubles per subsequent retry.
    pub backoff_base: Duration,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            calls_per_second: 2.0,
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff_base: Duration::from_millis(250),
        }
    }
}

impl ResilienceConfig {
    /// Build a stack from this configuration.
    pub fn build(&self) -> ResilienceStack {
        ResilienceStack::new(
            RateLimiter::new(self.calls_per_second),
            CircuitBreaker::new(self.failure_threshold, self.recovery_timeout),
            RetryPolicy::new(self.max_retries, self.backoff_base),
        )
    }
}

// ── ResilienceStack ────────────────────────────────────────────────────

/// The composed limiter → breaker → retry wrapper for one provider.
///
/// Shared by every concurrent call to that provider; all interior mutation
/// happens under the limiter's and breaker's own locks.
#[derive(Debug)]
pub struct ResilienceStack {
    limiter: RateLimiter,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl ResilienceStack {
    /// Compose a stack from its three primitives.
    pub fn new(limiter: RateLimiter, breaker: CircuitBreaker, retry: RetryPolicy) -> Self {
        Self {
            limiter,
            breaker,
            retry,
        }
    }

    /// The breaker's current state, for observability.
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Run `f` through the full stack.
    ///
    /// The limiter delays the start of the logical call; the breaker either
    /// fast-fails or admits it; the retry policy then drives attempts of `f`.
    /// Whatever the retry policy concludes counts as exactly one success or
    /// failure toward the breaker.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        self.limiter.acquire().await;

        let permit = self
            .breaker
            .try_acquire()
            .map_err(|retry_in| ResilienceError::CircuitOpen { retry_in })?;

        match self.retry.execute(f).await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(err) => {
                permit.record_failure();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("boom ({class:?})")]
    struct TestError {
        class: ErrorClass,
    }

    impl Classify for TestError {
        fn class(&self) -> ErrorClass {
            self.class
        }
    }

    fn transient() -> TestError {
        TestError {
            class: ErrorClass::Transient,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn one_logical_call_counts_once_toward_the_breaker() {
        let stack = ResilienceConfig {
            calls_per_second: 1000.0,
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(10),
            max_retries: 4,
            backoff_base: Duration::from_millis(1),
        }
        .build();

        let calls = AtomicU32::new(0);
        let result: Result<(), _> = stack
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(transient()) }
            })
            .await;

        // 1 initial + 4 retries, but only one breaker failure recorded.
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(matches!(
            result,
            Err(ResilienceError::Exhausted { attempts: 5, .. })
        ));
        assert_eq!(stack.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_opens_after_threshold_logical_failures() {
        let stack = ResilienceConfig {
            calls_per_second: 1000.0,
            failure_threshold: 2,
            recovery_timeout: Duration::from_secs(10),
            max_retries: 0,
            backoff_base: Duration::from_millis(1),
        }
        .build();

        for _ in 0..2 {
            let _: Result<(), _> = stack
                .execute(|| async { Err::<(), _>(transient()) })
                .await;
        }
        assert_eq!(stack.circuit_state(), CircuitState::Open);

        let result: Result<(), _> = stack
            .execute(|| async { Ok::<_, TestError>(()) })
            .await;
        assert!(matches!(result, Err(ResilienceError::CircuitOpen { .. })));
    }
}
