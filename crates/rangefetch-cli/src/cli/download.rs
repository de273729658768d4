//! `rangefetch <url>`: build the run settings, wire Ctrl-C, run the controller.

use anyhow::{Context, Result};
use rangefetch_core::config::{self, RangefetchConfig};
use rangefetch_core::url_model;
use rangefetch_core::{CancelToken, DownloadController, RunConfig};
use std::path::PathBuf;

use super::Cli;

/// Config file settings overridden by whatever was given on the command line.
pub(super) fn build_run_config(cli: &Cli, file_cfg: &RangefetchConfig) -> RunConfig {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(url_model::derive_output_name(&cli.url)));
    let mut cfg = RunConfig::from_config(&cli.url, output, file_cfg);
    if let Some(threads) = cli.threads {
        cfg.max_workers = threads;
    }
    if let Some(segment_size) = cli.segment_size {
        cfg.segment_size = segment_size;
    }
    cfg.resume = cli.resume;
    cfg
}

fn load_config(cli: &Cli) -> Result<RangefetchConfig> {
    match &cli.config {
        Some(path) => config::load_from(path),
        None => Ok(config::load_or_init().unwrap_or_else(|e| {
            tracing::warn!("using built-in defaults, config unavailable: {:#}", e);
            RangefetchConfig::default()
        })),
    }
}

pub(super) fn run_download(cli: &Cli) -> Result<bool> {
    let file_cfg = load_config(cli)?;
    tracing::debug!("loaded config: {:?}", file_cfg);
    let run_cfg = build_run_config(cli, &file_cfg);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            eprintln!("\nForced exit; resume later with --resume");
            std::process::exit(130);
        }
        eprintln!("\nStopping after in-flight segments (Ctrl-C again to force)...");
        handler_token.cancel();
    })
    .context("failed to set Ctrl-C handler")?;

    let controller = DownloadController::new(run_cfg, cancel);
    let summary = controller.run()?;

    let done_mib = summary.bytes_downloaded as f64 / 1_048_576.0;
    let rate_mib = summary.bytes_per_sec() / 1_048_576.0;
    if summary.is_complete() {
        println!(
            "{}: {:.1} MiB in {:.1}s ({:.2} MiB/s, {} workers)",
            summary.output.display(),
            done_mib,
            summary.elapsed.as_secs_f64(),
            rate_mib,
            summary.workers
        );
    } else {
        println!(
            "{}: incomplete, {}/{} segments done ({:?}); rerun with --resume to continue",
            summary.output.display(),
            summary.segments_done,
            summary.segment_count,
            summary.state
        );
        if let Some(e) = &summary.last_error {
            println!("last error: {}", e);
        }
    }
    Ok(summary.is_complete())
}
