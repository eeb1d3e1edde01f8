//! Retry policy for store writes.

use std::time::Duration;

use rand::Rng;
use rehost_shared::UploadConfig;

/// Delay schedule between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Retry immediately.
    None,
    /// Same delay after every failure.
    Fixed(Duration),
    /// `base * 2^(n-1)` after the n-th failure, capped at `max`.
    Exponential {
        /// Delay after the first failure.
        base: Duration,
        /// Upper bound for any single delay.
        max: Duration,
    },
}

/// Bounded, sequential retry policy for a single logical upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    jitter: bool,
    attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Default attempt budget.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// Retry up to `max_attempts` times with no delay. Zero is treated as one.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            backoff: Backoff::None,
            jitter: false,
            attempt_timeout: None,
        }
    }

    /// Build the policy described by the upload configuration.
    #[must_use]
    pub fn from_config(config: &UploadConfig) -> Self {
        let backoff = if config.retry_base_delay_ms == 0 {
            Backoff::None
        } else {
            Backoff::Exponential {
                base: Duration::from_millis(config.retry_base_delay_ms),
                max: Duration::from_millis(config.retry_max_delay_ms),
            }
        };
        let attempt_timeout = (config.attempt_timeout_secs > 0)
            .then(|| Duration::from_secs(config.attempt_timeout_secs));

        Self::immediate(config.max_attempts)
            .with_backoff(backoff)
            .with_jitter(config.retry_jitter)
            .with_attempt_timeout(attempt_timeout)
    }

    /// Set the delay schedule.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Randomize each delay in `[0, delay]`.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Bound each attempt. A timed-out attempt counts as failed.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Total attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Per-attempt timeout, if any.
    #[must_use]
    pub const fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Delay to wait after the given failed attempt (1-based), before jitter.
    #[must_use]
    pub fn base_delay(&self, failed_attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor = 1u32
                    .checked_shl(failed_attempt.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                base.checked_mul(factor).map_or(max, |d| d.min(max))
            }
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    #[must_use]
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let delay = self.base_delay(failed_attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let ceiling = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(0..=ceiling))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(Self::DEFAULT_MAX_ATTEMPTS)
    }
}
