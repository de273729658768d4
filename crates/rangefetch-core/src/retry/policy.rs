//! Backoff policy for retrying a segment transfer inside one run.

use std::time::Duration;

/// Why a segment attempt failed, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connect or transfer timed out, or the link went below the speed floor.
    Timeout,
    /// 429 or 503.
    Throttled,
    /// Connection refused/reset, DNS failure, or a body cut short.
    Connection,
    /// Any other 5xx.
    Http5xx(u16),
    /// Not worth retrying: 4xx, unsatisfied range, local write failure, stop request.
    Other,
}

impl ErrorKind {
    pub fn is_transient(self) -> bool {
        !matches!(self, ErrorKind::Other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Exponential backoff with a cap. Built from the `[retry]` section of the
/// config file; `max_attempts = 1` disables in-run retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per segment, the first one included.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`,
    /// doubled once more when throttled, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32, kind: ErrorKind) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let mut delay = self.base_delay.saturating_mul(1u32 << shift);
        if kind == ErrorKind::Throttled {
            delay = delay.saturating_mul(2);
        }
        delay.min(self.max_delay)
    }

    /// Whether to try again after attempt `attempt` failed with `kind`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_transient() {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff(attempt, kind))
    }
}
