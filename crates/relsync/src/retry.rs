//! Retry utilities for upstream queries.
//!
//! Upstream failures that look transient (temporary bans, gateway errors,
//! GraphQL-level errors) are retried with a linear backoff: the n-th retry
//! waits `base_delay * n`.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{BackoffBuilder, Retryable};

/// Default delay unit for linear backoff.
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(5);

/// Default total number of attempts (first try included).
pub const DEFAULT_RETRY_ATTEMPTS: usize = 20;

/// Configuration for retry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay unit; the n-th retry waits `base_delay * n`.
    pub base_delay: Duration,
    /// Total number of attempts, including the first one.
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_RETRY_BASE_DELAY,
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(base_delay: Duration, max_attempts: usize) -> Self {
        Self {
            base_delay,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Build the linear backoff strategy for this policy.
    #[must_use]
    pub fn into_backoff(self) -> LinearBuilder {
        LinearBuilder {
            base_delay: self.base_delay,
            max_retries: self.max_attempts.saturating_sub(1),
        }
    }
}

/// Backoff builder producing `base, 2*base, 3*base, ...` for `max_retries` steps.
#[derive(Debug, Clone, Copy)]
pub struct LinearBuilder {
    base_delay: Duration,
    max_retries: usize,
}

impl BackoffBuilder for LinearBuilder {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        LinearBackoff {
            base_delay: self.base_delay,
            max_retries: self.max_retries,
            attempt: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base_delay: Duration,
    max_retries: usize,
    attempt: usize,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }
        self.attempt += 1;
        let factor = u32::try_from(self.attempt).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }
}

/// Execute an operation, retrying errors accepted by `is_retryable`.
///
/// Errors rejected by `is_retryable` are returned immediately. When the
/// attempt budget is spent the last error is returned; callers can tell the
/// two apart by running `is_retryable` on it again.
///
/// # Example
///
/// ```ignore
/// let page = with_retry(
///     || async { client.send_once(&body).await },
///     RetryPolicy::default(),
///     GraphQlError::is_retryable,
///     |e| e.to_string(),
///     "temurin17-binaries",
/// )
/// .await?;
/// ```
pub async fn with_retry<T, E, F, Fut, IsRetryable, ShortMsg>(
    mut operation: F,
    policy: RetryPolicy,
    is_retryable: IsRetryable,
    short_message: ShortMsg,
    context: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    IsRetryable: Fn(&E) -> bool,
    ShortMsg: Fn(&E) -> String,
{
    let attempt = AtomicU32::new(0);

    let retry_op = || {
        attempt.fetch_add(1, Ordering::SeqCst);
        operation()
    };

    retry_op
        .retry(policy.into_backoff())
        .notify(|err, dur| {
            tracing::info!(
                context = %context,
                attempt = attempt.load(Ordering::SeqCst),
                delay_secs = dur.as_secs(),
                error = %short_message(err),
                "Retrying upstream query"
            );
        })
        .when(|e| is_retryable(e))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay, Duration::from_secs(5));
        assert_eq!(policy.max_attempts, 20);
    }

    #[test]
    fn test_retry_policy_never_zero_attempts() {
        let policy = RetryPolicy::new(Duration::from_secs(1), 0);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.into_backoff().build().count(), 0);
    }

    #[test]
    fn linear_backoff_scales_with_attempt_number() {
        let delays: Vec<Duration> = RetryPolicy::new(Duration::from_secs(5), 4)
            .into_backoff()
            .build()
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(5),
                Duration::from_secs(10),
                Duration::from_secs(15)
            ]
        );
    }

    #[derive(Debug, Clone)]
    struct TestError {
        message: &'static str,
        transient: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl std::error::Error for TestError {}

    #[tokio::test(start_paused = true)]
    async fn with_retry_retries_transient_errors_with_linear_delays() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);
        let start = tokio::time::Instant::now();

        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                let n = calls_capture.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TestError {
                        message: "502",
                        transient: true,
                    })
                } else {
                    Ok(42u32)
                }
            }
        };

        let result = with_retry(
            operation,
            RetryPolicy::default(),
            |e: &TestError| e.transient,
            |e: &TestError| e.to_string(),
            "repo",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 5s after the first failure, 10s after the second.
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn with_retry_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError {
                    message: "503",
                    transient: true,
                })
            }
        };

        let err = with_retry(
            operation,
            RetryPolicy::new(Duration::from_secs(1), 4),
            |e: &TestError| e.transient,
            |e: &TestError| e.to_string(),
            "repo",
        )
        .await
        .expect_err("expected exhaustion");

        assert_eq!(err.to_string(), "503");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn with_retry_does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_capture = Arc::clone(&calls);

        let operation = move || {
            let calls_capture = Arc::clone(&calls_capture);
            async move {
                calls_capture.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TestError {
                    message: "boom",
                    transient: false,
                })
            }
        };

        let err = with_retry(
            operation,
            RetryPolicy::default(),
            |e: &TestError| e.transient,
            |e: &TestError| e.to_string(),
            "repo",
        )
        .await
        .expect_err("expected error");

        assert_eq!(err.to_string(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
