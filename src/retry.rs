//! Bounded retry for remote calls.
//!
//! A [`RetryPolicy`] is a plain value: maximum attempts, a fixed delay
//! between attempts, and [`StoreError::is_transient`] as the retry
//! predicate. Call sites wrap each remote operation explicitly with
//! [`RetryPolicy::run`].
//!
//! - Transient error and attempts remain → sleep `delay`, call again
//! - Transient error on the last attempt → return it
//! - Protocol error → return it immediately, no retry

use std::future::Future;
use std::time::Duration;

use bookclub_sync_core::store::StoreResult;
use tracing::{debug, warn};

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }

    /// Run `call` until it succeeds, fails with a non-transient error, or
    /// the attempt budget is spent.
    ///
    /// `operation` labels log lines (e.g. `"update Dune"`).
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut attempt = 1;
        loop {
            debug!(operation, attempt, "remote call");
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "transient failure; retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(operation, attempts = attempt, error = %err, "retries exhausted");
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
    use bookclub_sync_core::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn succeeds_first_try() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let out = instant(5)
            .run("op", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StoreError>(7)
            })
            .await;
        assert_eq!(out, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let out = instant(5)
            .run("op", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(StoreError::Transient("busy".into()))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(out, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let out: StoreResult<()> = instant(5)
            .run("op", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Transient("down".into()))
            })
            .await;
        assert_eq!(out, Err(StoreError::Transient("down".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn protocol_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let out: StoreResult<()> = instant(5)
            .run("op", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Protocol {
                    status: Some(400),
                    body: "validation_error".into(),
                })
            })
            .await;
        assert!(matches!(out, Err(StoreError::Protocol { status: Some(400), .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_fixed_delay_between_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        let start = tokio::time::Instant::now();
        let _: StoreResult<()> = policy
            .run("op", || async { Err(StoreError::Transient("down".into())) })
            .await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2), "elapsed {elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "elapsed {elapsed:?}");
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        let cfg = RetryConfig {
            max_attempts: 4,
            delay_ms: 250,
        };
        assert_eq!(
            RetryPolicy::from_config(&cfg),
            RetryPolicy::new(4, Duration::from_millis(250))
        );
    }
}
