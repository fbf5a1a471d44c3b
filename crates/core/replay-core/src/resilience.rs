//! Retry policy for fallible calls to external services

use crate::{ReplayError, Result};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Delay before the next attempt, given the 1-based attempt that just failed
pub type BackoffFn = Arc<dyn Fn(u32) -> Duration + Send + Sync>;

/// Decides whether a failure is worth another attempt
pub type RetryPredicate = Arc<dyn Fn(&ReplayError) -> bool + Send + Sync>;

/// Retry configuration: attempt cap, backoff schedule and retryable-error predicate
#[derive(Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffFn,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` counts the first call; zero is treated as one.
    pub fn new<B, P>(max_attempts: u32, backoff: B, retryable: P) -> Self
    where
        B: Fn(u32) -> Duration + Send + Sync + 'static,
        P: Fn(&ReplayError) -> bool + Send + Sync + 'static,
    {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Arc::new(backoff),
            retryable: Arc::new(retryable),
        }
    }

    /// Single attempt, never retries
    pub fn none() -> Self {
        Self::new(1, |_| Duration::ZERO, |_| false)
    }

    /// Three attempts, fixed 2 second delay, only for upstream 503 responses
    pub fn transient_unavailable() -> Self {
        Self::new(3, fixed(Duration::from_secs(2)), |err| {
            err.upstream_http_status() == Some(503)
        })
    }

    /// Same backoff and predicate with a different attempt cap
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Maximum number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        (self.backoff)(attempt)
    }

    /// Whether the error qualifies for another attempt
    pub fn is_retryable(&self, err: &ReplayError) -> bool {
        (self.retryable)(err)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Constant backoff
pub fn fixed(delay: Duration) -> impl Fn(u32) -> Duration + Send + Sync + 'static {
    move |_| delay
}

/// Exponential backoff starting at `initial`, capped at `max`
pub fn exponential(
    initial: Duration,
    max: Duration,
    multiplier: f64,
) -> impl Fn(u32) -> Duration + Send + Sync + 'static {
    move |attempt| {
        let exp = attempt.saturating_sub(1) as i32;
        let millis = (initial.as_millis() as f64) * multiplier.powi(exp);
        Duration::from_millis(millis.min(max.as_millis() as f64) as u64)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt cap is reached. The last error is returned unchanged.
pub async fn retry<F, Fut, T>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= policy.max_attempts || !policy.is_retryable(&e) {
                    if attempt > 1 {
                        error!("Giving up after {} attempts: {}", attempt, e);
                    }
                    return Err(e);
                }

                let delay = policy.delay_for(attempt);
                warn!("Attempt {} failed: {}. Retrying in {:?}", attempt, e, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick_503_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, fixed(Duration::from_millis(1)), |e| {
            e.upstream_http_status() == Some(503)
        })
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = retry(&quick_503_policy(3), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(ReplayError::upstream_status(503, "unavailable"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_at_cap() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(&quick_503_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ReplayError::upstream_status(503, "unavailable")) }
        })
        .await;

        assert_eq!(result.unwrap_err().upstream_http_status(), Some(503));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(&quick_503_policy(3), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ReplayError::upstream_status(500, "boom")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_single_attempt() {
        let calls = AtomicU32::new(0);
        let _: Result<()> = retry(&RetryPolicy::none(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ReplayError::upstream_status(503, "unavailable")) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_unavailable_preset() {
        let policy = RetryPolicy::transient_unavailable();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert!(policy.is_retryable(&ReplayError::upstream_status(503, "x")));
        assert!(!policy.is_retryable(&ReplayError::upstream_status(429, "x")));
        assert!(!policy.is_retryable(&ReplayError::auth("x")));
    }

    #[test]
    fn test_exponential_backoff_caps() {
        let backoff = exponential(Duration::from_millis(100), Duration::from_millis(500), 2.0);
        assert_eq!(backoff(1), Duration::from_millis(100));
        assert_eq!(backoff(2), Duration::from_millis(200));
        assert_eq!(backoff(3), Duration::from_millis(400));
        assert_eq!(backoff(4), Duration::from_millis(500));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::none().with_max_attempts(0).max_attempts(), 1);
    }
}
