//! Planning phase: HEAD probe, fresh or resumed segment plan, worker count.
//!
//! A fresh plan for a server that does not advertise range support is a
//! single whole-file segment rather than a `segment_size` partition: a plain
//! 200 response only lines up with a segment that starts at offset 0. A
//! resumed plan keeps its stored partition either way.

use std::path::Path;

use crate::checkpoint::{CheckpointStore, DownloadMetadata};
use crate::config::RunConfig;
use crate::error::RunError;
use crate::http::{HeadResult, HttpClient};

/// Upper bound for the automatic worker count.
const MAX_AUTO_WORKERS: usize = 32;

/// Result of planning: the metadata the run starts from.
#[derive(Debug)]
pub(super) struct Plan {
    pub meta: DownloadMetadata,
    pub accepts_ranges: bool,
    /// True when `meta` came from a validated checkpoint.
    pub resumed: bool,
}

/// HEAD the URL, then build the plan from the answer.
pub(super) fn plan_download(cfg: &RunConfig, store: &CheckpointStore) -> Result<Plan, RunError> {
    let head = HttpClient::new(&cfg.url, cfg.transfer)
        .head()
        .map_err(|e| RunError::Planning {
            url: cfg.url.clone(),
            source: e.into(),
        })?;
    tracing::debug!(
        content_length = ?head.content_length,
        accept_ranges = head.accept_ranges,
        etag = %head.etag,
        "HEAD ok"
    );
    plan_from_head(cfg, store, &head)
}

pub(super) fn plan_from_head(
    cfg: &RunConfig,
    store: &CheckpointStore,
    head: &HeadResult,
) -> Result<Plan, RunError> {
    let Some(file_size) = head.content_length else {
        return Err(RunError::Planning {
            url: cfg.url.clone(),
            source: "server did not report a Content-Length".into(),
        });
    };

    if cfg.resume {
        if store.exists() {
            if let Some(plan) = resume_plan(cfg, store, head, file_size)? {
                return Ok(plan);
            }
        } else {
            tracing::info!("no checkpoint at {}, starting fresh", store.path().display());
        }
    } else if store.exists() {
        tracing::info!(
            "ignoring existing checkpoint {} (resume not requested)",
            store.path().display()
        );
    }

    // Without range support only a request from offset 0 can succeed.
    let segment_size = if head.accept_ranges {
        cfg.segment_size
    } else {
        file_size.max(1)
    };
    let meta = DownloadMetadata::fresh(&cfg.url, &head.etag, file_size, segment_size);
    store.save(&meta).map_err(|e| RunError::Checkpoint {
        path: store.path().to_path_buf(),
        source: e.into(),
    })?;
    tracing::info!(
        file_size,
        segments = meta.segments.len(),
        segment_size,
        "planned fresh download"
    );

    Ok(Plan {
        meta,
        accepts_ranges: head.accept_ranges,
        resumed: false,
    })
}

/// Load and validate the checkpoint. `Ok(None)` means fall back to a fresh plan.
fn resume_plan(
    cfg: &RunConfig,
    store: &CheckpointStore,
    head: &HeadResult,
    file_size: u64,
) -> Result<Option<Plan>, RunError> {
    let mut meta = store.load().map_err(|e| RunError::Checkpoint {
        path: store.path().to_path_buf(),
        source: e.into(),
    })?;

    store
        .validate(&meta, &head.etag, file_size)
        .map_err(|e| RunError::ResumeRejected {
            path: store.path().to_path_buf(),
            source: e,
        })?;

    if meta.url != cfg.url {
        tracing::warn!(
            checkpoint_url = %meta.url,
            url = %cfg.url,
            "checkpoint was written for a different URL; resuming anyway"
        );
    }

    if meta.done_count() > 0 && !output_holds(&cfg.output, file_size) {
        tracing::warn!(
            done = meta.done_count(),
            "output {} is missing or truncated; starting over",
            cfg.output.display()
        );
        return Ok(None);
    }
    if !head.accept_ranges {
        tracing::warn!("server does not advertise range support; resuming with one worker");
    }

    let reset = meta.reset_in_progress();
    meta.completed_bytes = meta.done_bytes();
    if meta.etag.is_empty() {
        meta.etag = head.etag.clone();
    }
    tracing::info!(
        done = meta.done_count(),
        total = meta.segments.len(),
        completed_bytes = meta.completed_bytes,
        reset,
        "resuming from {}",
        store.path().display()
    );

    Ok(Some(Plan {
        meta,
        accepts_ranges: head.accept_ranges,
        resumed: true,
    }))
}

/// True when the output file exists and is at least `file_size` bytes long.
fn output_holds(output: &Path, file_size: u64) -> bool {
    std::fs::metadata(output).is_ok_and(|m| m.len() >= file_size)
}

/// Number of worker threads for a run.
///
/// `configured` wins when non-zero; otherwise twice `parallelism`, clamped to
/// 2..=32. A server without range support gets exactly one worker. Never more
/// than `segment_count`, never fewer than one.
pub fn choose_worker_count(
    configured: usize,
    parallelism: usize,
    accepts_ranges: bool,
    segment_count: usize,
) -> usize {
    let n = if configured > 0 {
        configured
    } else {
        parallelism.saturating_mul(2).clamp(2, MAX_AUTO_WORKERS)
    };
    let n = if accepts_ranges { n } else { 1 };
    n.min(segment_count).max(1)
}
