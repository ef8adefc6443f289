//! Bounded exponential backoff.
//!
//! [`BackoffPolicy`] describes the delay schedule; [`Backoff`] walks it one
//! attempt at a time. The schedule is deterministic so that tests can pin
//! the exact delays.

use std::time::Duration;

/// Delay schedule for polling loops.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor applied after every attempt.
    pub multiplier: f64,
    /// Maximum number of attempts (0 = unbounded).
    pub max_attempts: u32,
    /// Overall budget for the whole loop.
    pub timeout: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_attempts: 0,
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl BackoffPolicy {
    /// Policy with a maximum number of attempts and no overall timeout.
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            timeout: None,
            ..Default::default()
        }
    }

    /// Starts walking the schedule.
    pub fn start(&self) -> Backoff {
        Backoff {
            policy: self.clone(),
            attempt: 0,
            next_delay: self.initial_delay,
        }
    }
}

/// Iterator-like cursor over a [`BackoffPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
    next_delay: Duration,
}

impl Backoff {
    /// Number of attempts recorded so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Records an attempt and returns the delay to wait before the next one,
    /// or `None` if the attempt budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.policy.max_attempts > 0 && self.attempt >= self.policy.max_attempts {
            return None;
        }
        let delay = self.next_delay.min(self.policy.max_delay);
        self.next_delay = Duration::from_secs_f64(
            (self.next_delay.as_secs_f64() * self.policy.multiplier)
                .min(self.policy.max_delay.as_secs_f64()),
        );
        Some(delay)
    }
}
