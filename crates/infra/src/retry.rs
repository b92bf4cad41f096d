//! Bounded retry with exponential backoff.
//!
//! Used only for projection races (a document that has not caught up yet, or
//! a revision-guarded update that matched nothing). Business errors are never
//! retried.

use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one; at least 1.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based):
    /// `base * 2^(attempt-1)`, capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let pow = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(pow).min(self.max_backoff)
    }

    /// Run `op` until it yields `Some`, an error, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. Returns `Ok(None)` when every
    /// attempt came back empty.
    pub fn run<T, E>(&self, what: &str, mut op: impl FnMut(u32) -> Result<Option<T>, E>) -> Result<Option<T>, E> {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            if let Some(value) = op(attempt)? {
                return Ok(Some(value));
            }

            if attempt < attempts {
                let delay = self.backoff(attempt);
                tracing::debug!(what, attempt, delay_ms = delay.as_millis() as u64, "retrying");
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }
        }

        tracing::warn!(what, attempts, "retries exhausted");
        Ok(None)
    }
}
