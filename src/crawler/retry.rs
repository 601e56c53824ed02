//! Retry policy with exponential backoff

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Largest exponent applied to the backoff base
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// How many times an operation is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first; never less than one
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay after failed attempt `attempt` (zero-based): `base * 2^attempt`
    ///
    /// Saturates at `Duration::MAX`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .checked_mul(2u32.pow(attempt.min(MAX_BACKOFF_EXPONENT)))
            .unwrap_or(Duration::MAX)
    }

    /// Runs `op` until it succeeds or the attempts are used up
    ///
    /// `op` receives the zero-based attempt number. Every failure is logged;
    /// the last one is returned to the caller. No delay follows the final
    /// attempt.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let remaining = self.max_attempts.saturating_sub(attempt + 1);
                    tracing::warn!(
                        "Attempt {}/{} failed: {}",
                        attempt + 1,
                        self.max_attempts,
                        e
                    );
                    if remaining == 0 {
                        return Err(e);
                    }
                    tokio::time::sleep(self.backoff(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
