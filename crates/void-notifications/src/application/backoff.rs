//! Exponential delay between consumer resubscription attempts.

use std::time::Duration;

/// Floor on every delay handed out by a [`Backoff`].
pub const MIN_DELAY: Duration = Duration::from_millis(10);

/// How the consumer retries after its subscription ends or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Factor applied to the delay after each retry. Values below 1 act as 1.
    pub multiplier: u32,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Consecutive failed attempts before giving up; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            multiplier: 2,
            max_delay: Duration::from_secs(30),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Starts a fresh delay sequence. Delays are clamped to at least
    /// [`MIN_DELAY`] and never shrink between attempts.
    #[must_use]
    pub fn backoff(&self) -> Backoff {
        let max_delay = self.max_delay.max(MIN_DELAY);
        let policy = Self {
            initial_delay: self.initial_delay.clamp(MIN_DELAY, max_delay),
            multiplier: self.multiplier.max(1),
            max_delay,
            max_attempts: self.max_attempts,
        };
        Backoff {
            policy,
            attempts: 0,
            current: policy.initial_delay,
        }
    }
}

/// Iterator over retry delays. Yields `None` once `max_attempts` is used up.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempts: u32,
    current: Duration,
}

impl Backoff {
    /// Restarts from the initial delay, e.g. after a subscription made
    /// progress.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current = self.policy.initial_delay;
    }

    /// Attempts handed out since the last reset.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        if self
            .policy
            .max_attempts
            .is_some_and(|max| self.attempts >= max)
        {
            return None;
        }
        self.attempts += 1;

        let delay = self.current.min(self.policy.max_delay);
        self.current = self
            .current
            .saturating_mul(self.policy.multiplier)
            .min(self.policy.max_delay);
        Some(delay)
    }
}
