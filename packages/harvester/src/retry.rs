//! Shared retry loop with exponential backoff.
//!
//! Every remote call site (metadata requests, kernel pulls) goes through
//! [`retry`], parametrized by a [`RetryPolicy`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::HarvestError;

/// Retry parameters.
///
/// After failed attempt `k` (1-based) the loop waits
/// `initial_delay * backoff_base^(k-1)`. With the defaults that is `2^k`
/// seconds: 2, 4, 8, 16, 32.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`
    pub max_retries: u32,

    /// Multiplier between consecutive delays
    pub backoff_base: u32,

    /// Delay after the first failed attempt
    pub initial_delay: Duration,

    /// Time budget of a single attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base: 2,
            initial_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy used for kernel source pulls: 2 retries, 5s then 10s.
    pub fn for_downloads() -> Self {
        Self {
            max_retries: 2,
            backoff_base: 2,
            initial_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base; the first delay follows it (`base^1` seconds).
    pub fn with_backoff_base(mut self, base: u32) -> Self {
        self.backoff_base = base;
        self.initial_delay = Duration::from_secs(u64::from(base));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait inserted after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_base.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }

    /// Reject policies whose delays would not strictly increase.
    pub fn validate(&self) -> Result<(), HarvestError> {
        if self.backoff_base < 2 {
            return Err(HarvestError::Config(format!(
                "backoff base must be at least 2, got {}",
                self.backoff_base
            )));
        }
        if self.initial_delay.is_zero() {
            return Err(HarvestError::Config("initial retry delay must be positive".into()));
        }
        if self.timeout.is_zero() {
            return Err(HarvestError::Config("request timeout must be positive".into()));
        }
        Ok(())
    }
}

/// Final result of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T> {
    Succeeded {
        value: T,
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
        /// Backoff delays actually slept, in order
        delays: Vec<Duration>,
        last_error: String,
    },
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Some(value),
            RetryOutcome::Exhausted { .. } => None,
        }
    }
}

/// Run `operation` until it succeeds or the policy is exhausted.
///
/// `operation` receives the 1-based attempt number. Each attempt is bounded by
/// `policy.timeout`; a timeout counts as a failed attempt. Nothing is carried
/// between attempts.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut operation: F) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let total = policy.total_attempts();
    let mut delays = Vec::new();
    let mut last_error = String::new();

    for attempt in 1..=total {
        let failure = match tokio::time::timeout(policy.timeout, operation(attempt)).await {
            Ok(Ok(value)) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                }
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("timed out after {:?}", policy.timeout),
        };

        if attempt < total {
            let delay = policy.delay_after(attempt);
            warn!(
                label,
                attempt,
                retry_in_secs = delay.as_secs_f64(),
                error = %failure,
                "Attempt failed"
            );
            tokio::time::sleep(delay).await;
            delays.push(delay);
        } else {
            error!(label, attempts = attempt, error = %failure, "Retries exhausted");
        }
        last_error = failure;
    }

    RetryOutcome::Exhausted {
        attempts: total,
        delays,
        last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_delays() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=5).map(|k| policy.delay_after(k).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 32]);
        assert_eq!(policy.total_attempts(), 6);
    }

    #[test]
    fn test_download_delays() {
        let policy = RetryPolicy::for_downloads();
        assert_eq!(policy.delay_after(1), Duration::from_secs(5));
        assert_eq!(policy.delay_after(2), Duration::from_secs(10));
        assert_eq!(policy.total_attempts(), 3);
    }

    #[test]
    fn test_validate_rejects_flat_backoff() {
        assert!(RetryPolicy::default().with_backoff_base(1).validate().is_err());
        assert!(RetryPolicy::default().with_backoff_base(3).validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let outcome = retry(&RetryPolicy::default(), "flaky", |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err("connection reset")
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(outcome, RetryOutcome::Succeeded { value: 3, attempts: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_makes_max_retries_plus_one_attempts() {
        let policy = RetryPolicy::default().with_max_retries(4);
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let outcome: RetryOutcome<()> = retry(&policy, "down", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("503") }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                delays,
                last_error,
            } => {
                assert_eq!(attempts, 5);
                assert_eq!(last_error, "503");
                assert_eq!(delays.len(), 4);
                assert!(delays.windows(2).all(|w| w[0] < w[1]));
                let slept: Duration = delays.iter().sum();
                assert_eq!(slept, Duration::from_secs(2 + 4 + 8 + 16));
                assert!(start.elapsed() >= slept);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let policy = RetryPolicy::default()
            .with_max_retries(1)
            .with_timeout(Duration::from_secs(10));

        let outcome = retry(&policy, "stalled", |attempt| async move {
            if attempt == 1 {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok::<_, String>(attempt)
        })
        .await;

        assert_eq!(outcome, RetryOutcome::Succeeded { value: 2, attempts: 2 });
    }
}
