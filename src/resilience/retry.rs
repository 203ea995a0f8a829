//! Exponential-backoff retry for transient failures.

use std::time::Duration;

use rand::RngExt;

use super::{Classify, ResilienceError};

/// Largest exponent applied to the backoff base, to keep the doubling from
/// overflowing on pathological retry counts.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Retries a call on transient errors with exponential backoff plus jitter.
///
/// The n-th retry waits `backoff_base * 2^(n-1)`, stretched by a uniformly
/// random jitter of up to 10%. Errors classified [`Permanent`] propagate
/// immediately without a retry.
///
/// [`Permanent`]: super::ErrorClass::Permanent
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_base: Duration,
}

impl RetryPolicy {
    /// Create a policy allowing `max_retries` retries after the first
    /// attempt, starting from `backoff_base`.
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// Backoff before the given retry (1-based), before jitter.
    fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }

    /// Drive attempts of `f` until success, a permanent error, or
    /// exhaustion.
    pub async fn execute<F, Fut, T, E>(&self, mut f: F) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    if attempt > self.max_retries {
                        return Err(ResilienceError::Exhausted {
                            attempts: attempt,
                            source: err,
                        });
                    }
                    let backoff = self.backoff_for(attempt);
                    let jitter = rand::rng().random_range(0.0..0.1);
                    let delay = backoff.mul_f64(1.0 + jitter);
                    tracing::debug!(attempt, ?delay, "transient failure, backing off");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(ResilienceError::Inner(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::ErrorClass;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("err")]
    struct TestError(ErrorClass);

    impl Classify for TestError {
        fn class(&self) -> ErrorClass {
            self.0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        let calls = AtomicU32::new(0);

        let result = policy
            .execute(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError(ErrorClass::Transient))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError(ErrorClass::Permanent)) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ResilienceError::Inner(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_total_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let result: Result<(), _> = policy
            .execute(|| async { Err(TestError(ErrorClass::Transient)) })
            .await;

        match result {
            Err(ResilienceError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn backoff_doubles_per_retry() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
    }
}
