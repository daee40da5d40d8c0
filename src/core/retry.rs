/*!
 * Bounded Retry Policy
 *
 * Every "try again in a moment" in the engine goes through this: removal
 * retries after termination, waiting for processes to exit, and polling
 * external tools.
 *
 * ## Backoff
 *
 * Exponential from `initial_backoff`, capped at `max_backoff`. A polling
 * policy sets both to the same interval.
 */

use super::limits::{
    MAX_RETRY_BACKOFF, REMOVAL_RETRY_ATTEMPTS, REMOVAL_RETRY_BACKOFF,
};
use super::timeout::TimeoutPolicy;
use std::time::{Duration, Instant};

/// Bounded-retry-with-timeout policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    deadline: TimeoutPolicy,
}

impl RetryPolicy {
    /// Create a policy with exponential backoff and no overall deadline
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff: MAX_RETRY_BACKOFF,
            deadline: TimeoutPolicy::None,
        }
    }

    /// Default policy for "retry direct removal" steps
    pub fn removal() -> Self {
        Self::new(REMOVAL_RETRY_ATTEMPTS, REMOVAL_RETRY_BACKOFF)
    }

    /// Single attempt, no waiting
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Poll at a fixed interval until `deadline` passes
    pub fn polling(interval: Duration, deadline: Duration) -> Self {
        Self {
            max_attempts: u32::MAX,
            initial_backoff: interval,
            max_backoff: interval,
            deadline: TimeoutPolicy::Wait(deadline),
        }
    }

    /// Set an overall deadline
    pub fn with_deadline(mut self, deadline: TimeoutPolicy) -> Self {
        self.deadline = deadline;
        self
    }

    /// Cap individual backoff sleeps
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn deadline(&self) -> TimeoutPolicy {
        self.deadline
    }

    /// Backoff before attempt `attempt + 1` (attempt is zero-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, hits a non-retryable error,
    /// runs out of attempts, or the deadline passes
    ///
    /// Returns the last error on failure.
    pub fn execute<T, E>(
        &self,
        mut operation: impl FnMut(u32) -> Result<T, E>,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E> {
        let start = Instant::now();
        let mut attempt = 0u32;

        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let next = attempt.saturating_add(1);
                    if !is_retryable(&e) || next >= self.max_attempts {
                        return Err(e);
                    }
                    if !self.sleep_within_deadline(attempt, start) {
                        return Err(e);
                    }
                    attempt = next;
                }
            }
        }
    }

    /// Poll `condition` until it holds or the policy is exhausted
    pub fn wait_until(&self, mut condition: impl FnMut() -> bool) -> bool {
        self.execute(
            |_| if condition() { Ok(()) } else { Err(()) },
            |_| true,
        )
        .is_ok()
    }

    /// Sleep the backoff for `attempt`, clamped to the deadline.
    /// Returns false when no time is left.
    fn sleep_within_deadline(&self, attempt: u32, start: Instant) -> bool {
        let backoff = self.backoff_for(attempt);
        match self.deadline.remaining(start) {
            Some(remaining) if remaining.is_zero() => false,
            Some(remaining) => {
                std::thread::sleep(backoff.min(remaining));
                true
            }
            None => {
                std::thread::sleep(backoff);
                true
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::removal()
    }
}
