//! Single-segment ranged GET written to the output file at the segment offset.

use crate::http::HttpClient;
use crate::retry::SegmentError;
use crate::segmenter::Segment;
use crate::storage::FileWriter;

/// Downloads one segment over `client`, writing every chunk at
/// `segment.offset + bytes_written_so_far`. A failed write aborts the
/// transfer and surfaces as `SegmentError::Storage`.
/// Returns the number of bytes written (always `segment.size` on success).
pub(super) fn download_one_segment(
    client: &mut HttpClient,
    segment: &Segment,
    file: &FileWriter,
) -> Result<u64, SegmentError> {
    let mut written = 0u64;
    let mut storage_error: Option<std::io::Error> = None;

    let result = client.get_range(segment.offset, segment.size, |chunk| {
        match file.write_at(segment.offset + written, chunk) {
            Ok(()) => {
                written += chunk.len() as u64;
                true
            }
            Err(e) => {
                storage_error = Some(e);
                false
            }
        }
    });

    match result {
        Ok(_) => Ok(written),
        Err(SegmentError::Aborted) => Err(storage_error
            .map(SegmentError::Storage)
            .unwrap_or(SegmentError::Aborted)),
        Err(e) => Err(e),
    }
}
