//! Download controller: plans the run, sizes the worker pool, monitors
//! progress, checkpoints, and tears everything down.
//!
//! Lifecycle: `Init -> Planning -> Downloading -> {Completed, Stopped, Failed}`.
//! Fatal errors (config, HEAD, checkpoint load, resume validation, output
//! open) end the run before any worker starts. Segment failures only make
//! the run incomplete; the segment stays InProgress in this run and comes
//! back as Pending on the next resumed run.

mod plan;
mod progress;
mod stats;

pub use plan::choose_worker_count;
pub use progress::ProgressStats;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::checkpoint::{CheckpointStore, DownloadMetadata};
use crate::config::RunConfig;
use crate::control::CancelToken;
use crate::downloader::{run_worker, ReportFn, WorkerContext};
use crate::error::RunError;
use crate::pool::ConnectionPool;
use crate::queue::SegmentQueue;
use crate::storage::FileWriter;
use crate::workers::{WorkerPool, WorkerTask};

use plan::Plan;
use stats::RunStats;

/// Sleep between monitor checks.
const MONITOR_TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Init,
    Planning,
    Downloading,
    /// Every segment is Done.
    Completed,
    /// Cancelled from outside before completion.
    Stopped,
    /// Workers finished with segments left undone, or a fatal error.
    Failed,
}

/// Outcome of a run that got past planning.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub state: ControllerState,
    pub output: PathBuf,
    pub file_size: u64,
    /// Bytes completed by this run (excludes segments done by earlier runs).
    pub bytes_downloaded: u64,
    pub segments_done: usize,
    pub segment_count: usize,
    pub workers: usize,
    pub elapsed: Duration,
    /// Most recent segment or teardown error, if any.
    pub last_error: Option<String>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.state == ControllerState::Completed
    }

    /// Average throughput of this run.
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_downloaded as f64 / secs
    }
}

pub struct DownloadController {
    cfg: RunConfig,
    cancel: CancelToken,
    state: Mutex<ControllerState>,
}

impl DownloadController {
    /// `cancel` is the external cancellation request (e.g. Ctrl-C); it is
    /// folded into the workers' stop flag by the monitor loop.
    pub fn new(cfg: RunConfig, cancel: CancelToken) -> Self {
        Self {
            cfg,
            cancel,
            state: Mutex::new(ControllerState::Init),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    pub fn state(&self) -> ControllerState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: ControllerState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            tracing::debug!(from = ?*state, to = ?next, "controller state");
            *state = next;
        }
    }

    /// Run the download to completion, cancellation, or failure.
    ///
    /// `Err` is returned only for fatal errors before workers start. An
    /// incomplete download is `Ok` with a summary whose state is not
    /// `Completed`.
    pub fn run(&self) -> Result<RunSummary, RunError> {
        let result = self.run_inner();
        if result.is_err() {
            self.set_state(ControllerState::Failed);
        }
        result
    }

    fn run_inner(&self) -> Result<RunSummary, RunError> {
        self.cfg.validate()?;
        self.set_state(ControllerState::Planning);
        tracing::info!("downloading {} -> {}", self.cfg.url, self.cfg.output.display());

        let store = CheckpointStore::for_output(&self.cfg.output);
        let plan = plan::plan_download(&self.cfg, &store)?;
        self.download(plan, &store)
    }

    fn download(&self, plan: Plan, store: &CheckpointStore) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        let Plan {
            meta,
            accepts_ranges,
            resumed,
        } = plan;

        let file = FileWriter::open(&self.cfg.output, meta.file_size, resumed).map_err(|e| {
            RunError::FileOpen {
                path: self.cfg.output.clone(),
                source: e.into(),
            }
        })?;
        let file = Arc::new(file);

        let pending = meta.segments.iter().filter(|s| !s.is_done()).count();
        if pending == 0 {
            // Zero-length resource, or a checkpoint that was already complete.
            return Ok(self.finish(&meta, store, &file, 0, &RunStats::default(), started));
        }

        let parallelism = thread::available_parallelism().map_or(1, |n| n.get());
        let workers = choose_worker_count(self.cfg.max_workers, parallelism, accepts_ranges, pending);
        tracing::info!(
            workers,
            pending,
            segments = meta.segments.len(),
            accept_ranges = accepts_ranges,
            resumed,
            "starting workers"
        );

        let queue = Arc::new(SegmentQueue::new(meta.segments.clone()));
        let pool = Arc::new(ConnectionPool::for_url(&self.cfg.url, workers, self.cfg.transfer));
        let stop = CancelToken::new();
        let stats = Arc::new(RunStats::default());

        let report: ReportFn = {
            let stats = Arc::clone(&stats);
            Arc::new(move |r| stats.record(&r))
        };
        let ctx = WorkerContext {
            queue: Arc::clone(&queue),
            pool: Arc::clone(&pool),
            file: Arc::clone(&file),
            stop: stop.clone(),
            retry: self.cfg.retry,
            report,
        };
        let task: WorkerTask = Arc::new(move |id| run_worker(&ctx, id));

        let worker_pool = WorkerPool::new(stop.clone());
        self.set_state(ControllerState::Downloading);
        if let Err(e) = worker_pool.start(workers, task) {
            worker_pool.shutdown();
            if let Err(close_err) = file.close() {
                tracing::warn!("close after failed spawn: {:#}", close_err);
            }
            return Err(RunError::WorkerSpawn(e));
        }

        self.monitor(&meta, &queue, &worker_pool, &stop, &stats, store, &file, started);

        // Teardown: stop flag, join, then the final snapshot is stable.
        worker_pool.shutdown();
        let mut last = meta;
        last.segments = queue.snapshot();
        Ok(self.finish(&last, store, &file, workers, &stats, started))
    }

    #[allow(clippy::too_many_arguments)]
    fn monitor(
        &self,
        meta: &DownloadMetadata,
        queue: &SegmentQueue,
        workers: &WorkerPool,
        stop: &CancelToken,
        stats: &RunStats,
        store: &CheckpointStore,
        file: &FileWriter,
        started: Instant,
    ) {
        let base_done = meta.done_bytes();
        let base_count = meta.done_count();
        let mut last_progress = Instant::now();
        let mut last_checkpoint = Instant::now();

        loop {
            if self.cancel.is_cancelled() && !stop.is_cancelled() {
                tracing::info!("cancellation requested, stopping workers");
                stop.cancel();
            }
            if stop.is_cancelled() {
                break;
            }
            if queue.all_done() {
                tracing::debug!("all segments done");
                break;
            }
            if workers.live_count() == 0 {
                tracing::debug!("no live workers left");
                break;
            }

            if last_progress.elapsed() >= self.cfg.progress_interval {
                let c = stats.counters();
                let progress = ProgressStats {
                    bytes_done: base_done + c.bytes_downloaded,
                    bytes_this_run: c.bytes_downloaded,
                    total_bytes: meta.file_size,
                    elapsed_secs: started.elapsed().as_secs_f64(),
                    segments_done: base_count + c.segments_completed,
                    segment_count: queue.len(),
                };
                tracing::info!("progress: {}", progress);
                if c.segments_failed > 0 {
                    tracing::debug!(failed = c.segments_failed, "segments failed so far");
                }
                last_progress = Instant::now();
            }

            if last_checkpoint.elapsed() >= self.cfg.checkpoint_interval {
                // Snapshot first: everything it calls Done is covered by the flush.
                let snapshot = DownloadMetadata {
                    url: meta.url.clone(),
                    etag: meta.etag.clone(),
                    file_size: meta.file_size,
                    completed_bytes: 0,
                    segments: queue.snapshot(),
                };
                match file.flush() {
                    Ok(()) => save_checkpoint(store, snapshot),
                    Err(e) => tracing::warn!("skipping checkpoint, output flush failed: {:#}", e),
                }
                last_checkpoint = Instant::now();
            }

            thread::sleep(MONITOR_TICK);
        }
    }

    /// Close the file, write or remove the checkpoint, log the summary.
    fn finish(
        &self,
        meta: &DownloadMetadata,
        store: &CheckpointStore,
        file: &FileWriter,
        workers: usize,
        stats: &RunStats,
        started: Instant,
    ) -> RunSummary {
        let closed = match file.close() {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("closing {}: {:#}", self.cfg.output.display(), e);
                stats.set_error(format!("close output: {:#}", e));
                false
            }
        };

        let complete = closed && meta.all_done();
        if complete {
            if let Err(e) = store.remove() {
                tracing::warn!("could not remove checkpoint {}: {:#}", store.path().display(), e);
            }
        } else {
            save_checkpoint(store, meta.clone());
        }

        let state = if complete {
            ControllerState::Completed
        } else if self.cancel.is_cancelled() {
            ControllerState::Stopped
        } else {
            ControllerState::Failed
        };
        self.set_state(state);

        let counters = stats.counters();
        let summary = RunSummary {
            state,
            output: self.cfg.output.clone(),
            file_size: meta.file_size,
            bytes_downloaded: counters.bytes_downloaded,
            segments_done: meta.done_count(),
            segment_count: meta.segments.len(),
            workers,
            elapsed: started.elapsed(),
            last_error: stats.last_error(),
        };
        log_summary(&summary);
        summary
    }
}

/// Persist a snapshot with InProgress normalised to Pending. Failures are
/// logged only; the run goes on.
fn save_checkpoint(store: &CheckpointStore, mut meta: DownloadMetadata) {
    meta.reset_in_progress();
    meta.completed_bytes = meta.done_bytes();
    match store.save(&meta) {
        Ok(()) => tracing::debug!(
            done = meta.done_count(),
            completed_bytes = meta.completed_bytes,
            "checkpoint saved"
        ),
        Err(e) => tracing::warn!("checkpoint save failed: {:#}", e),
    }
}

fn log_summary(s: &RunSummary) {
    tracing::info!(
        state = ?s.state,
        "finished in {:.1}s: {} bytes at {:.1} KiB/s, {} workers, {}/{} segments done",
        s.elapsed.as_secs_f64(),
        s.bytes_downloaded,
        s.bytes_per_sec() / 1024.0,
        s.workers,
        s.segments_done,
        s.segment_count
    );
    if let Some(e) = &s.last_error {
        tracing::warn!("last error: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_fails_before_planning() {
        let mut cfg = RunConfig::new("http://127.0.0.1:9/x", "x.bin");
        cfg.segment_size = 0;
        let controller = DownloadController::new(cfg, CancelToken::new());
        assert_eq!(controller.state(), ControllerState::Init);
        let err = controller.run().unwrap_err();
        assert!(matches!(err, RunError::Config(_)));
        assert_eq!(controller.state(), ControllerState::Failed);
    }

    #[test]
    fn unreachable_host_is_planning_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = RunConfig::new("http://127.0.0.1:9/file.bin", dir.path().join("file.bin"));
        cfg.transfer.connect_timeout = Duration::from_secs(2);
        cfg.transfer.timeout = Duration::from_secs(5);
        let controller = DownloadController::new(cfg, CancelToken::new());
        let err = controller.run().unwrap_err();
        assert!(matches!(err, RunError::Planning { .. }));
        assert_eq!(controller.state(), ControllerState::Failed);
        assert!(!dir.path().join("file.bin").exists());
    }

    #[test]
    fn summary_rate() {
        let s = RunSummary {
            state: ControllerState::Completed,
            output: PathBuf::from("x"),
            file_size: 2048,
            bytes_downloaded: 2048,
            segments_done: 2,
            segment_count: 2,
            workers: 2,
            elapsed: Duration::from_secs(2),
            last_error: None,
        };
        assert!(s.is_complete());
        assert_eq!(s.bytes_per_sec(), 1024.0);
    }
}
