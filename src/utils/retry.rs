//! Bounded fixed-interval retry
//!
//! Repeats a fallible async operation until it succeeds or a wall-clock
//! budget runs out. No backoff and no jitter: deterministic timing keeps
//! test environments predictable.

#![allow(dead_code)]

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::debug;

/// Fixed interval plus overall deadline for a retried operation.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Wait between attempts.
    pub interval: Duration,

    /// Overall wall-clock budget.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Deadline passed before the operation succeeded.
#[derive(Debug)]
pub struct RetryTimeout {
    /// Wall-clock time spent before giving up.
    pub elapsed: Duration,

    /// Number of attempts made.
    pub attempts: u32,

    /// Error from the final attempt.
    pub last_error: String,
}

impl fmt::Display for RetryTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deadline exceeded after {:?} ({} attempts): {}",
            self.elapsed, self.attempts, self.last_error
        )
    }
}

impl std::error::Error for RetryTimeout {}

/// Run `op` every `policy.interval` until it returns `Ok`, or until
/// `policy.timeout` has elapsed.
///
/// Every `Err` is treated as transient and absorbed; only the final one is
/// reported inside the returned [`RetryTimeout`]. The first attempt runs
/// immediately, and a timeout is only ever reported once the deadline has
/// actually passed.
pub async fn until_success<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, RetryTimeout>
where
    E: fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let elapsed = start.elapsed();
                if elapsed >= policy.timeout {
                    return Err(RetryTimeout {
                        elapsed,
                        attempts,
                        last_error: err.to_string(),
                    });
                }
                debug!(
                    "attempt {} failed ({}), retrying in {:?}",
                    attempts, err, policy.interval
                );
            }
        }

        sleep(policy.interval).await;
    }
}
