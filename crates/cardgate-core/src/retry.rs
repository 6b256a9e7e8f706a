//! Bounded exponential-backoff retry for fallible hardware calls.
//!
//! [`RetryPolicy::run`] executes an async operation and retries it on
//! failure. The n-th retry waits `base_delay * 2^(n-1)` (no jitter), so with
//! the defaults the delays before attempts 2, 3 and 4 are 0.5s, 1s and 2s.
//! After `max_retries` retries the last error is returned wrapped in a
//! [`RetryError`] that records the operation name and the attempt count.
//!
//! Backoff sleeps use `tokio::time::sleep`, so they suspend the task instead
//! of blocking the scheduler. Dropping the future returned by `run` (for
//! example from a `tokio::select!` cancellation branch) abandons the retry at
//! its current suspension point.
//!
//! # Examples
//!
//! ```
//! use cardgate_core::RetryPolicy;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let policy = RetryPolicy::default().base_delay(Duration::from_millis(1));
//!
//! let mut calls = 0;
//! let value = policy
//!     .run("flaky", async || {
//!         calls += 1;
//!         if calls < 3 {
//!             Err(std::io::Error::other("not yet"))
//!         } else {
//!             Ok(calls)
//!         }
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(value, 3);
//! # }
//! ```

use crate::constants::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_RETRIES};
use crate::error::RetryError;
use std::time::Duration;
use tracing::{error, warn};

/// Retry configuration: how many retries and how long the first backoff is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first failed attempt. `0` means a single attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubled for every following retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with explicit limits.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Set the number of retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base backoff delay.
    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff before the given retry, counting retries from 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardgate_core::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.delay_for(1), Duration::from_millis(500));
    /// assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
    /// assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
    /// ```
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds or the retries are exhausted.
    ///
    /// Each failed attempt is logged at WARN with the delay before the next
    /// one; exhaustion is logged at ERROR.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError`] carrying the last error once `max_retries`
    /// retries have failed.
    pub async fn run<T, E, F>(&self, operation: &'static str, mut op: F) -> Result<T, RetryError<E>>
    where
        F: AsyncFnMut() -> Result<T, E>,
        E: std::error::Error + 'static,
    {
        let mut retries = 0u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    retries += 1;

                    if retries > self.max_retries {
                        error!(
                            "Operation {} failed after {} retries: {}",
                            operation, self.max_retries, e
                        );
                        return Err(RetryError {
                            operation,
                            attempts: retries,
                            source: e,
                        });
                    }

                    let delay = self.delay_for(retries);
                    warn!(
                        "Operation {} failed: {}. Retrying in {:.2}s (attempt {} of {})",
                        operation,
                        e,
                        delay.as_secs_f64(),
                        retries,
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
