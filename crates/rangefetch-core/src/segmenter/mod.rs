//! Range math and segment planning.
//!
//! Splits a download into fixed-size segments, tracks each segment's claim
//! state, and computes HTTP Range bounds for the transfer layer.

mod range;

pub use range::{check_partition, plan_segments, Segment, SegmentState};
