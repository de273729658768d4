//! Cooperative cancellation: a shared flag polled at loop boundaries.
//!
//! The controller owns one token as the workers' stop flag and accepts another
//! from its caller for external cancellation (e.g. Ctrl-C). Nothing is
//! preempted: a worker finishes its current transfer before it observes the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of cancellable sleeps.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Cloneable handle to one shared stop flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request stop. Every clone observes it on its next poll.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Overwrite the flag, returning the previous value.
    pub fn set(&self, cancelled: bool) -> bool {
        self.flag.swap(cancelled, Ordering::SeqCst)
    }

    /// Sleep for `dur`, waking early if the token is cancelled.
    /// Returns true if the full duration elapsed without cancellation.
    pub fn sleep(&self, dur: Duration) -> bool {
        let deadline = Instant::now() + dur;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(POLL_SLICE.min(deadline - now));
        }
    }
}
