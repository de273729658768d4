//! Logging init: file under XDG state dir plus stderr, or stderr only as fallback.
//!
//! Both sinks go through `tracing_appender::non_blocking`, so download threads
//! never block on log I/O. Buffered lines are flushed when the returned
//! [`LogGuard`] is dropped; keep it alive for the whole run.

use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Keeps the background log writers alive. Dropping it flushes and stops them.
#[must_use = "dropping the guard stops the log writer"]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug,rangefetch=trace")
        } else {
            EnvFilter::new("info,rangefetch=debug")
        }
    })
}

/// Directory holding `rangefetch.log` (`~/.local/state/rangefetch`).
pub fn log_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rangefetch")?;
    Ok(xdg_dirs.get_state_home().join("rangefetch"))
}

/// Initialize structured logging to `~/.local/state/rangefetch/rangefetch.log` and stderr.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging(verbose: bool) -> Result<LogGuard> {
    let log_dir = log_dir()?;
    fs::create_dir_all(&log_dir)?;
    let log_file_path = log_dir.join("rangefetch.log");

    // Fail here rather than inside the background writer.
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&log_dir, "rangefetch.log"));
    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(fmt::layer().with_writer(stderr_writer).with_ansi(false).with_target(false))
        .try_init()?;

    tracing::info!("rangefetch logging initialized at {}", log_file_path.display());

    Ok(LogGuard {
        _guards: vec![file_guard, stderr_guard],
    })
}

/// Initialize logging to stderr only (no file). Use when init_logging() fails so the CLI doesn't crash.
pub fn init_logging_stderr(verbose: bool) -> LogGuard {
    let (stderr_writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(fmt::layer().with_writer(stderr_writer).with_ansi(false).with_target(false))
        .try_init();
    LogGuard {
        _guards: vec![guard],
    }
}
