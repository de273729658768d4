//! Claim queue over the run's segment list.
//!
//! All state transitions happen under one lock, so a claim's scan-and-flip is
//! a single critical section and two workers can never hold the same segment.
//! A linear scan is fine: plans hold file_size / segment_size entries and
//! the lock is held only for the scan.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::segmenter::{Segment, SegmentState};

/// Thread-safe claim queue. Completion order is irrelevant; no FIFO guarantee.
#[derive(Debug)]
pub struct SegmentQueue {
    segments: Mutex<Vec<Segment>>,
}

impl SegmentQueue {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments: Mutex::new(segments),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Segment>> {
        self.segments.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the first Pending segment, flipping it to InProgress.
    /// `None` means nothing is left to claim (a signal to exit, not a stall).
    pub fn claim(&self) -> Option<Segment> {
        let mut segments = self.lock();
        let seg = segments
            .iter_mut()
            .find(|s| s.state == SegmentState::Pending)?;
        seg.state = SegmentState::InProgress;
        Some(*seg)
    }

    /// Mark segment `index` as Done. Returns false for an unknown index.
    pub fn mark_done(&self, index: usize) -> bool {
        let mut segments = self.lock();
        let slot = match segments.get(index) {
            Some(s) if s.index == index => Some(index),
            _ => segments.iter().position(|s| s.index == index),
        };
        match slot {
            Some(i) => {
                segments[i].state = SegmentState::Done;
                true
            }
            None => false,
        }
    }

    /// Full copy of the segment list, taken under the lock.
    pub fn snapshot(&self) -> Vec<Segment> {
        self.lock().clone()
    }

    /// True when every segment is Done (vacuously true for an empty plan).
    pub fn all_done(&self) -> bool {
        self.lock().iter().all(Segment::is_done)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
