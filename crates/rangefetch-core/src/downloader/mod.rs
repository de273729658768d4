//! Download worker: the per-thread claim → transfer → report loop.
//!
//! Workers never propagate failures across the thread boundary; every
//! outcome becomes a `WorkerReport` handed to the controller's callback.

mod segment;

use std::sync::Arc;

use crate::control::CancelToken;
use crate::http::HttpClient;
use crate::pool::ConnectionPool;
use crate::queue::SegmentQueue;
use crate::retry::{run_with_retry, RetryPolicy};
use crate::storage::FileWriter;

/// Outcome of one claimed segment, sent from a worker to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub segment_index: usize,
    pub bytes_downloaded: u64,
    pub success: bool,
    /// Empty on success.
    pub error: String,
}

/// Callback receiving worker reports; called from worker threads.
pub type ReportFn = Arc<dyn Fn(WorkerReport) + Send + Sync>;

/// Shared handles every worker loop runs against.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<SegmentQueue>,
    pub pool: Arc<ConnectionPool<HttpClient>>,
    pub file: Arc<FileWriter>,
    pub stop: CancelToken,
    pub retry: RetryPolicy,
    pub report: ReportFn,
}

/// Runs until the stop flag is observed or the queue has nothing left to claim.
///
/// The flag is polled once per claimed segment (and between retry attempts),
/// never in the middle of a transfer. A failed segment stays InProgress so
/// it is not claimed again in this run.
pub fn run_worker(ctx: &WorkerContext, worker_id: usize) {
    tracing::debug!(worker_id, "worker started");
    let mut handled = 0usize;

    while !ctx.stop.is_cancelled() {
        let Some(seg) = ctx.queue.claim() else {
            break;
        };
        handled += 1;

        let result = {
            let mut conn = ctx.pool.acquire();
            run_with_retry(&ctx.retry, &ctx.stop, |attempt| {
                if attempt > 1 {
                    tracing::debug!(worker_id, segment = seg.index, attempt, "retrying segment");
                }
                segment::download_one_segment(&mut conn, &seg, &ctx.file)
            })
            // conn released here, success or failure
        };

        let report = match result {
            Ok(bytes) => {
                ctx.queue.mark_done(seg.index);
                tracing::trace!(worker_id, segment = seg.index, bytes, "segment done");
                WorkerReport {
                    segment_index: seg.index,
                    bytes_downloaded: bytes,
                    success: true,
                    error: String::new(),
                }
            }
            Err(e) => {
                tracing::warn!(
                    worker_id,
                    segment = seg.index,
                    offset = seg.offset,
                    "segment failed: {}",
                    e
                );
                WorkerReport {
                    segment_index: seg.index,
                    bytes_downloaded: 0,
                    success: false,
                    error: format!("segment {}: {}", seg.index, e),
                }
            }
        };
        (ctx.report)(report);
    }

    tracing::debug!(worker_id, segments = handled, "worker exiting");
}
