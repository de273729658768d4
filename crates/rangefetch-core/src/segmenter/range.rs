//! Segment type and range planning.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Claim state of a segment within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentState {
    /// Not yet claimed by any worker.
    Pending,
    /// Claimed by a worker; either in flight or failed during this run.
    InProgress,
    /// Fully written to the output file.
    Done,
}

/// A single segment: byte range `[offset, offset + size)` plus its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in the plan (0-based, equal to the segment's slot in the list).
    pub index: usize,
    /// Start offset (inclusive).
    pub offset: u64,
    /// Length in bytes.
    pub size: u64,
    pub state: SegmentState,
}

impl Segment {
    /// End offset (exclusive).
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }

    pub fn is_done(&self) -> bool {
        self.state == SegmentState::Done
    }
}

/// Builds a fresh plan of Pending segments of `segment_size` bytes covering `[0, file_size)`.
///
/// The last segment holds the remainder (`file_size % segment_size`), or a full
/// segment when the size divides evenly. Returns an empty vec if either input is 0.
pub fn plan_segments(file_size: u64, segment_size: u64) -> Vec<Segment> {
    if file_size == 0 || segment_size == 0 {
        return Vec::new();
    }

    let count = file_size.div_ceil(segment_size) as usize;
    let mut out = Vec::with_capacity(count);
    let mut offset = 0u64;

    while offset < file_size {
        let size = segment_size.min(file_size - offset);
        out.push(Segment {
            index: out.len(),
            offset,
            size,
            state: SegmentState::Pending,
        });
        offset += size;
    }

    out
}

/// Verifies that `segments` are ordered by index, contiguous, non-empty and
/// cover exactly `[0, file_size)`. Used to reject damaged checkpoints.
pub fn check_partition(segments: &[Segment], file_size: u64) -> Result<()> {
    let mut expected_offset = 0u64;
    for (i, seg) in segments.iter().enumerate() {
        if seg.index != i {
            anyhow::bail!("segment at position {} has index {}", i, seg.index);
        }
        if seg.offset != expected_offset {
            anyhow::bail!(
                "segment {} starts at {} but previous segment ends at {}",
                i,
                seg.offset,
                expected_offset
            );
        }
        if seg.size == 0 {
            anyhow::bail!("segment {} is empty", i);
        }
        expected_offset = seg
            .offset
            .checked_add(seg.size)
            .ok_or_else(|| anyhow::anyhow!("segment {} overflows", i))?;
    }
    if expected_offset != file_size {
        anyhow::bail!(
            "segments cover {} bytes but file size is {}",
            expected_offset,
            file_size
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_segments_even() {
        let segs = plan_segments(1000, 250);
        assert_eq!(segs.len(), 4);
        assert_eq!(segs[0].offset, 0);
        assert_eq!(segs[0].size, 250);
        assert_eq!(segs[3].offset, 750);
        assert_eq!(segs[3].size, 250);
        assert!(segs.iter().all(|s| s.state == SegmentState::Pending));
    }

    #[test]
    fn plan_segments_remainder() {
        let segs = plan_segments(10, 4);
        // 10 bytes in 4-byte segments -> 4, 4, 2
        assert_eq!(segs.len(), 3);
        assert_eq!((segs[0].offset, segs[0].size), (0, 4));
        assert_eq!((segs[1].offset, segs[1].size), (4, 4));
        assert_eq!((segs[2].offset, segs[2].size), (8, 2));
    }

    #[test]
    fn plan_segments_ten_mib() {
        let segs = plan_segments(10 * 1024 * 1024, 1024 * 1024);
        assert_eq!(segs.len(), 10);
        assert_eq!(segs[9].end(), 10 * 1024 * 1024);
    }

    #[test]
    fn plan_segments_smaller_than_one_segment() {
        let segs = plan_segments(100, 1 << 20);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].size, 100);
    }

    #[test]
    fn plan_segments_empty() {
        assert!(plan_segments(0, 4).is_empty());
        assert!(plan_segments(100, 0).is_empty());
    }

    #[test]
    fn check_partition_rejects_gap_and_short_cover() {
        let mut segs = plan_segments(100, 30);
        assert!(check_partition(&segs, 100).is_ok());
        assert!(check_partition(&segs, 101).is_err());
        segs[2].offset += 1;
        assert!(check_partition(&segs, 100).is_err());
    }

    #[test]
    fn check_partition_rejects_reordered_index() {
        let mut segs = plan_segments(100, 50);
        segs.swap(0, 1);
        assert!(check_partition(&segs, 100).is_err());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn plan_is_contiguous_and_covers_file(
                file_size in 1u64..10_000_000,
                segment_size in 1_000u64..2_000_000
            ) {
                let segs = plan_segments(file_size, segment_size);
                prop_assert!(check_partition(&segs, file_size).is_ok());

                let last = segs.last().unwrap();
                let rem = file_size % segment_size;
                let expected_last = if rem == 0 { segment_size } else { rem };
                prop_assert_eq!(last.size, expected_last);
                for s in &segs[..segs.len() - 1] {
                    prop_assert_eq!(s.size, segment_size);
                }
            }
        }
    }
}
