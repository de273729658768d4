//! Segment transfer error type for retry classification.

use std::fmt;

/// Error returned by a single segment transfer (curl failure, HTTP status,
/// short body, or storage failure). Kept typed so it can be classified
/// before it is flattened into a worker report.
#[derive(Debug)]
pub enum SegmentError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// The response status cannot satisfy the requested range
    /// (non-2xx, or 200 for a range that does not start at 0).
    Http(u32),
    /// Transfer ended with a byte count different from the segment length.
    PartialTransfer { expected: u64, received: u64 },
    /// Writing to the output file failed (disk full, file closed). Not retried.
    Storage(std::io::Error),
    /// The chunk callback asked to stop the transfer.
    Aborted,
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentError::Curl(e) => write!(f, "{}", e),
            SegmentError::Http(code) => write!(f, "HTTP {}", code),
            SegmentError::PartialTransfer { expected, received } => {
                write!(f, "partial transfer: expected {} bytes, got {}", expected, received)
            }
            SegmentError::Storage(e) => write!(f, "storage: {}", e),
            SegmentError::Aborted => write!(f, "transfer aborted"),
        }
    }
}

impl std::error::Error for SegmentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentError::Curl(e) => Some(e),
            SegmentError::Storage(e) => Some(e),
            SegmentError::Http(_) | SegmentError::PartialTransfer { .. } | SegmentError::Aborted => {
                None
            }
        }
    }
}
