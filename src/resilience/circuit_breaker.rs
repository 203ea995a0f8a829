//! Per-dependency circuit breaker.
//!
//! State machine: `Closed → Open → HalfOpen → Closed|Open`.
//!
//! - `Closed`: calls pass through; `failure_threshold` consecutive failures
//!   open the circuit.
//! - `Open`: calls fail fast without invoking the dependency until
//!   `recovery_timeout` has elapsed since the circuit opened.
//! - `HalfOpen`: exactly one trial call is admitted. Success closes the
//!   circuit and resets the failure count; failure reopens it and restarts
//!   the recovery clock.
//!
//! All transitions happen under one lock per breaker instance, so the
//! breaker can be shared freely across concurrent calls to one provider.

use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::ResilienceError;

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls fail fast.
    Open,
    /// One trial call is in flight or pending.
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// A stateful guard that stops calling a failing dependency until it likely
/// recovered.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use textweave::resilience::{CircuitBreaker, CircuitState};
///
/// let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
/// assert_eq!(breaker.state(), CircuitState::Closed);
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a breaker that opens after `failure_threshold` consecutive
    /// failures and allows a trial call after `recovery_timeout`.
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Current state.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Ask to make a call.
    ///
    /// Returns a permit whose outcome must be recorded, or the time until
    /// the breaker will next admit a trial call.
    pub fn try_acquire(&self) -> Result<BreakerPermit<'_>, Duration> {
        let mut inner = self.inner.lock();
        match inner.state {
            CircuitState::Closed => Ok(BreakerPermit {
                breaker: self,
                trial: false,
                resolved: false,
            }),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map_or(self.recovery_timeout, |at| at.elapsed());
                if elapsed > self.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                    Ok(BreakerPermit {
                        breaker: self,
                        trial: true,
                        resolved: false,
                    })
                } else {
                    Err(self.recovery_timeout - elapsed)
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(self.recovery_timeout)
                } else {
                    inner.trial_in_flight = true;
                    Ok(BreakerPermit {
                        breaker: self,
                        trial: true,
                        resolved: false,
                    })
                }
            }
        }
    }

    /// Run `f` as one guarded call.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self
            .try_acquire()
            .map_err(|retry_in| ResilienceError::CircuitOpen { retry_in })?;
        match f().await {
            Ok(value) => {
                permit.record_success();
                Ok(value)
            }
            Err(err) => {
                permit.record_failure();
                Err(ResilienceError::Inner(err))
            }
        }
    }

    fn on_result(&self, trial: bool, success: bool) {
        let mut inner = self.inner.lock();
        if trial {
            inner.trial_in_flight = false;
            if success {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
            } else {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            return;
        }
        match inner.state {
            CircuitState::Closed => {
                if success {
                    inner.consecutive_failures = 0;
                } else {
                    inner.consecutive_failures += 1;
                    if inner.consecutive_failures >= self.failure_threshold {
                        inner.state = CircuitState::Open;
                        inner.opened_at = Some(Instant::now());
                        tracing::warn!(
                            failures = inner.consecutive_failures,
                            "circuit opened"
                        );
                    }
                }
            }
            // The circuit moved while this call was in flight; its outcome
            // no longer changes the state machine.
            CircuitState::Open | CircuitState::HalfOpen => {}
        }
    }

    fn release_trial(&self) {
        let mut inner = self.inner.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
        }
    }
}

/// Permission to make one guarded call.
///
/// Dropping a permit without recording an outcome releases a half-open
/// trial slot, so a cancelled trial call cannot wedge the breaker.
#[derive(Debug)]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    resolved: bool,
}

impl BreakerPermit<'_> {
    /// Record the guarded call as successful.
    pub fn record_success(mut self) {
        self.resolved = true;
        self.breaker.on_result(self.trial, true);
    }

    /// Record the guarded call as failed.
    pub fn record_failure(mut self) {
        self.resolved = true;
        self.breaker.on_result(self.trial, false);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.resolved && self.trial {
            self.breaker.release_trial();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    async fn failing() -> Result<(), Boom> {
        Err(Boom)
    }

    async fn succeeding() -> Result<u32, Boom> {
        Ok(1)
    }

    #[tokio::test(start_paused = true)]
    async fn closed_to_open_to_half_open_to_closed() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            let _ = breaker.execute(failing).await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        // Fast-fail without invoking the wrapped call.
        let result = breaker.execute(succeeding).await;
        assert!(matches!(
            result,
            Err(ResilienceError::CircuitOpen { .. })
        ));

        tokio::time::advance(Duration::from_secs(61)).await;
        let result = breaker.execute(succeeding).await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(10));
        let _ = breaker.execute(failing).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(11)).await;
        let _ = breaker.execute(failing).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        // The recovery clock restarted at the trial failure.
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(breaker.try_acquire().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_admits_exactly_one_trial() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(10));
        let _ = breaker.execute(failing).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        let trial = breaker.try_acquire().expect("trial permitted");
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.try_acquire().is_err(), "second trial must be refused");

        trial.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_trial_permit_frees_the_slot() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(10));
        let _ = breaker.execute(failing).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        let trial = breaker.try_acquire().expect("trial permitted");
        drop(trial);

        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.try_acquire().is_ok(), "slot should be free again");
    }

    #[tokio::test]
    async fn success_resets_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(10));
        let _ = breaker.execute(failing).await;
        let _ = breaker.execute(failing).await;
        let _ = breaker.execute(succeeding).await;
        let _ = breaker.execute(failing).await;
        let _ = breaker.execute(failing).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
