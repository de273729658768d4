//! Durable download metadata (the checkpoint) for crash-consistent resume.
//!
//! The checkpoint lives at `<output>.meta` as JSON. Saves go to a sibling
//! `.tmp` file that is synced and then renamed over the old checkpoint, so a
//! crash never leaves a half-written record behind.

mod store;
mod validate;

pub use store::{checkpoint_path, CheckpointStore};
pub use validate::{ValidationError, ValidationErrorKind};

use serde::{Deserialize, Serialize};

use crate::segmenter::{plan_segments, Segment, SegmentState};

/// Everything needed to resume a download: the remote identity and the
/// authoritative segment plan with per-segment state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadMetadata {
    pub url: String,
    /// Empty when the server sent no ETag.
    #[serde(default)]
    pub etag: String,
    pub file_size: u64,
    /// Aggregate of Done segment sizes; may lag the segment list briefly.
    pub completed_bytes: u64,
    pub segments: Vec<Segment>,
}

impl DownloadMetadata {
    /// Fresh metadata with a new Pending plan.
    pub fn fresh(url: &str, etag: &str, file_size: u64, segment_size: u64) -> Self {
        Self {
            url: url.to_string(),
            etag: etag.to_string(),
            file_size,
            completed_bytes: 0,
            segments: plan_segments(file_size, segment_size),
        }
    }

    /// Turn every InProgress segment back into Pending. Returns how many changed.
    pub fn reset_in_progress(&mut self) -> usize {
        let mut n = 0;
        for seg in &mut self.segments {
            if seg.state == SegmentState::InProgress {
                seg.state = SegmentState::Pending;
                n += 1;
            }
        }
        n
    }

    /// Sum of Done segment sizes, computed from the segment list.
    pub fn done_bytes(&self) -> u64 {
        self.segments
            .iter()
            .filter(|s| s.is_done())
            .map(|s| s.size)
            .sum()
    }

    pub fn done_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_done()).count()
    }

    pub fn all_done(&self) -> bool {
        self.segments.iter().all(Segment::is_done)
    }
}
