//! Bounded retry with linear backoff.
//!
//! Only [`TransferError::Transient`] failures are retried. Attempt `n`
//! (1-based) that fails transiently is followed by a sleep of
//! `n * base_delay` before attempt `n + 1`.

use std::future::Future;
use std::time::Duration;

use super::domain::TransferError;

/// Retry policy shared by one platform's adapter calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    base_delay: Duration,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl RetryExecutor {
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Run `operation` up to `max_attempts` times.
    ///
    /// `max_attempts == 0` behaves like 1: the first failure is final. A
    /// non-transient error is returned immediately; once attempts run out the
    /// last error is returned unchanged.
    pub async fn execute<T, F, Fut>(&self, mut operation: F, max_attempts: u32) -> Result<T, TransferError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransferError>>,
    {
        let max_attempts = max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.base_delay * attempt;
                    tracing::debug!(attempt, ?delay, "Transient failure, retrying: {}", err);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        tracing::warn!(attempts = attempt, "Giving up after retries: {}", err);
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn fast() -> RetryExecutor {
        RetryExecutor::new(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TransferError>(7)
                },
                3,
            )
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .execute(
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(TransferError::Transient(format!("attempt {n}")))
                    } else {
                        Ok(n)
                    }
                },
                3,
            )
            .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_surfaces_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .execute(
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(TransferError::Transient(format!("attempt {n}")))
                },
                4,
            )
            .await;
        assert_eq!(result, Err(TransferError::Transient("attempt 4".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_transient_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TransferError::Auth("token expired".into()))
                },
                5,
            )
            .await;
        assert!(matches!(result, Err(TransferError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_means_single_call() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TransferError::Transient("down".into()))
                },
                0,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backoff_is_linear() {
        let executor = RetryExecutor::new(Duration::from_millis(40));
        let start = Instant::now();
        let _: Result<(), _> = executor
            .execute(|| async { Err(TransferError::Transient("down".into())) }, 3)
            .await;
        // 40ms after attempt 1, 80ms after attempt 2
        assert!(start.elapsed() >= Duration::from_millis(115));
    }
}
