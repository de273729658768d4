//! Bounded in-run retry for segment transfers.
//!
//! Transient failures (timeouts, dropped connections, throttling, 5xx, short
//! bodies) are retried with exponential backoff up to a small attempt cap.
//! Anything else fails the segment at once; it stays InProgress for the rest
//! of the run and is reclaimed only by a resumed run.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::SegmentError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
