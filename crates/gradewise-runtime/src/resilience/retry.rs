//! Fixed-delay retry around upstream attempts.

use std::future::Future;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};

use crate::GradingError;

/// Retry policy: `max_retries` extra attempts, `delay` apart.
///
/// The delay is constant. With `max_retries = 2` an operation runs at most
/// three times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Upper bound on the number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retries run out. The last error is returned as-is.
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T, GradingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GradingError>>,
    {
        let backoff = ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.max_retries as usize);

        operation
            .retry(backoff)
            .sleep(tokio::time::sleep)
            .when(GradingError::is_retryable)
            .notify(|err: &GradingError, delay: Duration| {
                tracing::warn!(error = %err, retry_in = ?delay, "Grading attempt failed, retrying");
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> GradingError {
        GradingError::from(ProviderError::HttpError("connection reset".to_string()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::default();

        let result = policy
            .run(|| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(2, Duration::from_secs(1));

        let result: Result<(), _> = policy
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(matches!(result, Err(GradingError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), policy.max_attempts());
    }

    #[tokio::test(start_paused = true)]
    async fn test_configuration_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = RetryPolicy::default()
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GradingError::Configuration("GEMINI_API_KEY not configured".to_string()))
            })
            .await;

        assert!(matches!(result, Err(GradingError::Configuration(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_runs_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<(), _> = RetryPolicy::new(0, Duration::from_secs(1))
            .run(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
