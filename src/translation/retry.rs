/*!
 * Reusable retry policy for network operations.
 *
 * An operation reports each attempt as either finished (`Attempt::Done`) or
 * retryable with a reason. The policy decides how long to sleep before the
 * next attempt and gives up after `max_attempts`. There is no sleep after the
 * final attempt.
 */

use log::debug;
use std::future::Future;
use std::time::Duration;

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed(Duration),
    /// `base * 2^attempt`, attempt counted from zero
    Exponential { base: Duration },
}

impl Backoff {
    /// Delay after the given zero-based attempt failed
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { base } => base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX)),
        }
    }
}

/// Why an attempt should be retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// The endpoint asked us to slow down (HTTP 429)
    RateLimited,
    /// Server error, timeout or transport failure
    Transient,
}

/// Outcome of a single attempt
#[derive(Debug)]
pub enum Attempt<T> {
    Done(T),
    Retry(RetryReason),
}

/// Bounded retry with per-reason backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    // @field: Total attempts including the first
    pub max_attempts: u32,
    // @field: Schedule applied after a rate-limit response
    pub rate_limit_backoff: Backoff,
    // @field: Schedule applied after a transient failure
    pub transient_backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_backoff: Backoff::Exponential { base: Duration::from_secs(1) },
            transient_backoff: Backoff::Fixed(Duration::from_secs(1)),
        }
    }
}

impl RetryPolicy {
    /// Delay to apply after `attempt` failed for `reason`
    pub fn delay_for(&self, reason: RetryReason, attempt: u32) -> Duration {
        match reason {
            RetryReason::RateLimited => self.rate_limit_backoff.delay(attempt),
            RetryReason::Transient => self.transient_backoff.delay(attempt),
        }
    }

    /// Run `operation` until it finishes or attempts are exhausted.
    ///
    /// The closure receives the zero-based attempt number. Returns `None` when
    /// every attempt asked for a retry.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        for attempt in 0..self.max_attempts {
            match operation(attempt).await {
                Attempt::Done(value) => return Some(value),
                Attempt::Retry(reason) => {
                    if attempt + 1 >= self.max_attempts {
                        break;
                    }
                    let delay = self.delay_for(reason, attempt);
                    debug!(
                        "Attempt {}/{} failed ({:?}), retrying in {:?}",
                        attempt + 1,
                        self.max_attempts,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        None
    }
}
