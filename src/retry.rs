//! Retry with exponential backoff, full jitter and rate-limit awareness.
//!
//! External calls return an explicit [`CallError`] so the backoff loop can
//! decide what to do from the error kind:
//!
//! - `RateLimited`: sleep the server's `retry-after` hint (if any), then the
//!   jittered backoff, and count a rate-limit hit.
//! - `Transient`: sleep the jittered backoff.
//! - `Fatal`: give up immediately.
//!
//! Delay for retry *n* is `initial × multiplier^(n-1)`, capped at
//! `max_delay`, and the actual sleep is drawn uniformly from `[0, delay]`.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Classified failure of a single external call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CallError {
    /// HTTP 429 or an equivalent provider signal.
    #[error("rate limited: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    /// Timeouts, 5xx, connection resets and similar.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Failures that will not go away by retrying (bad request, auth).
    #[error("fatal failure: {0}")]
    Fatal(String),
}

impl CallError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, CallError::RateLimited { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, CallError::Fatal(_))
    }
}

/// Result of a single external call.
pub type CallResult<T> = std::result::Result<T, CallError>;

/// Counters collected while retrying one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallStats {
    /// Attempts made, including the first.
    pub attempts: u32,
    /// Attempts that failed and were followed by another attempt.
    pub retries: u32,
    /// Failures classified as rate limits.
    pub rate_limit_hits: u32,
}

/// A successful call with its retry counters.
#[derive(Debug, Clone)]
pub struct Attempted<T> {
    pub value: T,
    pub stats: CallStats,
}

/// A call that failed for good.
#[derive(Debug, Clone, Error)]
#[error("{error} (after {} attempts)", .stats.attempts)]
pub struct RetryFailure {
    pub error: CallError,
    pub stats: CallStats,
}

/// Backoff policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single backoff delay.
    pub max_delay: Duration,
    /// Growth factor per retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_delay: Duration::from_millis(400),
            max_delay: Duration::from_millis(8000),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Un-jittered delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64).max(0.0);
        Duration::from_millis(capped.round() as u64)
    }

    /// Full-jitter delay: uniform in `[0, backoff_for(retry)]`.
    pub fn jittered(&self, retry: u32) -> Duration {
        let ceiling = self.backoff_for(retry).as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
    }
}

/// Runs external calls under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryCaller {
    policy: RetryPolicy,
}

impl RetryCaller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `op` until it succeeds, fails fatally, or attempts run out.
    pub async fn call<T, F, Fut>(
        &self,
        label: &str,
        mut op: F,
    ) -> std::result::Result<Attempted<T>, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CallResult<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut stats = CallStats::default();

        loop {
            stats.attempts += 1;

            let error = match op().await {
                Ok(value) => {
                    if stats.retries > 0 {
                        debug!(
                            label,
                            retries = stats.retries,
                            rate_limit_hits = stats.rate_limit_hits,
                            "call succeeded after retry"
                        );
                    }
                    return Ok(Attempted { value, stats });
                }
                Err(error) => error,
            };

            if error.is_rate_limit() {
                stats.rate_limit_hits += 1;
            }

            if error.is_fatal() {
                warn!(label, %error, "non-retryable failure");
                return Err(RetryFailure { error, stats });
            }

            if stats.attempts >= max_attempts {
                warn!(label, attempts = stats.attempts, %error, "all retry attempts exhausted");
                return Err(RetryFailure { error, stats });
            }

            stats.retries += 1;

            if let CallError::RateLimited {
                retry_after: Some(hint),
                ..
            } = &error
            {
                debug!(label, wait_ms = hint.as_millis() as u64, "honouring retry-after");
                tokio::time::sleep(*hint).await;
            }

            let delay = self.policy.jittered(stats.retries);
            warn!(
                label,
                attempt = stats.attempts,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                %error,
                "call failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(800));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(1600));
        assert_eq!(policy.backoff_for(5), Duration::from_millis(6400));
        assert_eq!(policy.backoff_for(6), Duration::from_millis(8000));
        assert_eq!(policy.backoff_for(30), Duration::from_millis(8000));
    }

    #[test]
    fn test_jitter_stays_within_backoff() {
        let policy = RetryPolicy::default();
        for retry in 1..8 {
            for _ in 0..50 {
                assert!(policy.jittered(retry) <= policy.backoff_for(retry));
            }
        }
    }

    #[tokio::test]
    async fn test_five_failures_then_success() {
        let caller = RetryCaller::new(fast_policy());
        let calls = Arc::new(AtomicU32::new(0));

        let result = caller
            .call("flaky", || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 5 {
                        Err(CallError::Transient(format!("failure {}", n)))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result.value, "done");
        assert_eq!(result.stats.retries, 5);
        assert_eq!(result.stats.attempts, 6);
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_always_failing_exhausts_six_attempts() {
        let caller = RetryCaller::new(fast_policy());
        let calls = Arc::new(AtomicU32::new(0));

        let failure = caller
            .call("broken", || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(CallError::Transient(format!("failure {}", n)))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(failure.stats.attempts, 6);
        assert_eq!(failure.stats.retries, 5);
        assert_eq!(failure.error, CallError::Transient("failure 5".to_string()));
    }

    #[tokio::test]
    async fn test_rate_limit_hits_are_counted_separately() {
        let caller = RetryCaller::new(fast_policy());
        let calls = Arc::new(AtomicU32::new(0));

        let result = caller
            .call("limited", || {
                let calls = calls.clone();
                async move {
                    match calls.fetch_add(1, Ordering::SeqCst) {
                        0 => Err(CallError::RateLimited {
                            retry_after: Some(Duration::from_millis(3)),
                            message: "slow down".to_string(),
                        }),
                        1 => Err(CallError::Transient("timeout".to_string())),
                        2 => Err(CallError::RateLimited {
                            retry_after: None,
                            message: "slow down".to_string(),
                        }),
                        _ => Ok(42),
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result.value, 42);
        assert_eq!(result.stats.retries, 3);
        assert_eq!(result.stats.rate_limit_hits, 2);
    }

    #[tokio::test]
    async fn test_retry_after_hint_is_slept() {
        let caller = RetryCaller::new(RetryPolicy {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..RetryPolicy::default()
        });
        let calls = Arc::new(AtomicU32::new(0));
        let started = std::time::Instant::now();

        caller
            .call("hinted", || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(CallError::RateLimited {
                            retry_after: Some(Duration::from_millis(30)),
                            message: "429".to_string(),
                        })
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_fatal_errors_are_not_retried() {
        let caller = RetryCaller::new(fast_policy());
        let calls = Arc::new(AtomicU32::new(0));

        let failure = caller
            .call("unauthorized", || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(CallError::Fatal("401".to_string()))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(failure.stats.retries, 0);
        assert!(failure.error.is_fatal());
    }
}
