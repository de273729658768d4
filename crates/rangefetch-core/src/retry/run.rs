//! Retry loop: run a closure until success, policy says stop, or the run is stopped.

use super::classify;
use super::error::SegmentError;
use super::policy::{RetryDecision, RetryPolicy};
use crate::control::CancelToken;

/// Runs `f` until it succeeds or the retry policy says to stop.
/// On retryable failure, sleeps for the backoff duration then tries again.
/// The stop token is checked before each retry; once set, the last error is
/// returned without another attempt.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, stop: &CancelToken, mut f: F) -> Result<T, SegmentError>
where
    F: FnMut(u32) -> Result<T, SegmentError>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::debug!(attempt, ?kind, delay_ms = d.as_millis() as u64, "retrying after: {}", e);
                        if !stop.sleep(d) {
                            return Err(e);
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn retries_transient_then_succeeds() {
        let stop = CancelToken::new();
        let mut calls = 0;
        let r = run_with_retry(&quick_policy(3), &stop, |_| {
            calls += 1;
            if calls < 3 {
                Err(SegmentError::Http(503))
            } else {
                Ok(7u64)
            }
        });
        assert_eq!(r.unwrap(), 7);
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let stop = CancelToken::new();
        let mut calls = 0;
        let r: Result<(), _> = run_with_retry(&quick_policy(3), &stop, |_| {
            calls += 1;
            Err(SegmentError::Http(500))
        });
        assert!(matches!(r, Err(SegmentError::Http(500))));
        assert_eq!(calls, 3);
    }

    #[test]
    fn no_retry_for_non_transient() {
        let stop = CancelToken::new();
        let mut calls = 0;
        let r: Result<(), _> = run_with_retry(&quick_policy(5), &stop, |_| {
            calls += 1;
            Err(SegmentError::Http(404))
        });
        assert!(r.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn stop_flag_prevents_further_attempts() {
        let stop = CancelToken::new();
        stop.cancel();
        let mut calls = 0;
        let r: Result<(), _> = run_with_retry(&quick_policy(5), &stop, |_| {
            calls += 1;
            Err(SegmentError::Http(503))
        });
        assert!(r.is_err());
        assert_eq!(calls, 1);
    }
}
