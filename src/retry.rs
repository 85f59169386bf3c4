//! Bounded retry with exponential backoff.
//!
//! Used where the operator retries inside a single pass: deleting the
//! upstream cluster and re-running read-modify-write cycles that lost an
//! optimistic-concurrency race.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

/// Backoff policy for operations that may fail transiently.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor applied after each failed attempt
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 12,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Retry up to `attempts` times with no delay between attempts.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay that follows `delay` under this policy.
    ///
    /// Delays never shrink, and a growth that is not representable saturates
    /// at `max_delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        let grown = delay.as_secs_f64() * self.backoff_multiplier.max(1.0);
        Duration::try_from_secs_f64(grown).map_or(self.max_delay, |next| next.min(self.max_delay))
    }
}

/// Run `operation` until it succeeds, `should_retry` rejects its error, or
/// the attempt budget is spent. Returns the last error in the latter cases.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) => {
                if attempt >= max_attempts {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "Operation failed after max retries"
                    );
                    return Err(e);
                }

                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                delay = config.next_delay(delay);
            }
        }
    }
}
