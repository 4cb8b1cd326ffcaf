//! Bounded exponential reconnect policy.

use std::time::Duration;

/// Reconnect schedule parameterized by `(base_delay, max_attempts)`.
///
/// The Nth attempt (1-indexed) waits `base_delay * 2^(N-1)`. Once
/// `max_attempts` attempts have been scheduled without an intervening
/// [`reset`](Self::reset), the policy is exhausted and schedules nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    /// Creates a policy with no attempts made yet.
    ///
    /// # Examples
    ///
    /// ```
    /// use relay_broker::client::ReconnectPolicy;
    /// use std::time::Duration;
    /// let mut policy = ReconnectPolicy::new(Duration::from_millis(1000), 2);
    /// assert_eq!(policy.next_delay(), Some(Duration::from_millis(1000)));
    /// assert_eq!(policy.next_delay(), Some(Duration::from_millis(2000)));
    /// assert_eq!(policy.next_delay(), None);
    /// ```
    #[must_use]
    pub const fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts,
            attempts: 0,
        }
    }

    /// Attempts scheduled since the last reset.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Upper bound on consecutive attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns `true` once no further attempt will be scheduled.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Schedules the next attempt and returns how long to wait before it,
    /// or `None` if the policy is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let delay = 2_u32
            .checked_pow(self.attempts)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX);
        self.attempts += 1;
        Some(delay)
    }

    /// Clears the attempt counter after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
