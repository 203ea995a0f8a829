//! Minimum-interval spacing of call starts.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// Spaces call starts so that no two calls through the same limiter begin
/// closer together than `1 / calls_per_second`.
///
/// Concurrent callers are queued deterministically: each [`acquire`]
/// reserves the next free start slot under the lock, then sleeps until that
/// slot arrives. No ordering is guaranteed across *different* limiter
/// instances.
///
/// [`acquire`]: RateLimiter::acquire
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing `calls_per_second` call starts per second.
    ///
    /// Values that are zero, negative, or non-finite disable limiting.
    pub fn new(calls_per_second: f64) -> Self {
        let min_interval = if calls_per_second.is_finite() && calls_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / calls_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Minimum spacing between call starts.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until this caller's reserved start slot arrives.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let wait = {
            let mut slot = self.next_slot.lock();
            let now = Instant::now();
            let start_at = slot.map_or(now, |s: Instant| s.max(now));
            *slot = Some(start_at + self.min_interval);
            start_at.saturating_duration_since(now)
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Acquire a slot, then run `f`.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.acquire().await;
        f().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sequential_calls_are_spaced() {
        let limiter = RateLimiter::new(0.5); // 2 s interval
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_each_get_a_slot() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(10.0)); // 100 ms interval
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn zero_rate_disables_limiting() {
        let limiter = RateLimiter::new(0.0);
        assert_eq!(limiter.min_interval(), Duration::ZERO);
        let value = limiter.execute(|| async { Ok::<_, ()>(7) }).await;
        assert_eq!(value, Ok(7));
    }
}
