//! Bounded retry with linearly increasing delay.
//!
//! Never applied implicitly: callers wrap a single logical operation when it
//! is safe to repeat. Writes that are not idempotent (create, delete) should
//! not be wrapped.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetrySettings;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    /// `max_attempts` below 1 is treated as 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_millis(settings.base_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause after the 0-indexed `attempt` fails: `base_delay * (attempt + 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * (attempt + 1)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts. The last error is returned unchanged.
    pub async fn retry<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                debug!(error_type = err.error_type(), "not retrying");
                return Err(err);
            }
            if attempt + 1 >= self.max_attempts {
                warn!(
                    attempts = self.max_attempts,
                    error = %err,
                    "giving up after final attempt"
                );
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            warn!(
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Shorthand for `RetryPolicy::new(max_attempts, base_delay).retry(operation)`.
pub async fn retry<T, F, Fut>(operation: F, max_attempts: u32, base_delay: Duration) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    RetryPolicy::new(max_attempts, base_delay)
        .retry(operation)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NoteError, TransportCause};
    use std::cell::{Cell, RefCell};
    use tokio::time::Instant;

    fn network_error(attempt: u32) -> NoteError {
        NoteError::Transport {
            cause: TransportCause::Network,
            message: format!("attempt {} failed", attempt),
        }
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let calls = Cell::new(0u32);
        let started = RefCell::new(Vec::new());

        let result = retry(
            || {
                calls.set(calls.get() + 1);
                started.borrow_mut().push(Instant::now());
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(network_error(n))
                    } else {
                        Ok(n)
                    }
                }
            },
            3,
            Duration::from_millis(1000),
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);

        let started = started.borrow();
        assert!(started[1] - started[0] >= Duration::from_millis(1000));
        assert!(started[2] - started[1] >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_returns_last_error() {
        let calls = Cell::new(0u32);

        let err = retry(
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { Err::<(), _>(network_error(n)) }
            },
            3,
            Duration::from_millis(1000),
        )
        .await
        .unwrap_err();

        assert_eq!(calls.get(), 3);
        assert_eq!(err.message(), "attempt 3 failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_error_not_retried() {
        let calls = Cell::new(0u32);
        let begin = Instant::now();

        let err = RetryPolicy::default()
            .retry(|| {
                calls.set(calls.get() + 1);
                async { Err::<(), _>(NoteError::Validation("'new' is not a note id".into())) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.get(), 1);
        assert!(matches!(err, NoteError::Validation(_)));
        assert_eq!(begin.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_has_no_delay() {
        let begin = Instant::now();
        let value = RetryPolicy::default().retry(|| async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);
        assert_eq!(begin.elapsed(), Duration::ZERO);
    }
}
