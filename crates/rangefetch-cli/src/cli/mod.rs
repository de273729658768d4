//! Command line for the rangefetch downloader.

mod download;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Top-level CLI: one URL, one output file.
#[derive(Debug, Parser)]
#[command(name = "rangefetch", version)]
#[command(about = "Segmented, resumable, multi-threaded HTTP downloader", long_about = None)]
pub struct Cli {
    /// Direct HTTP/HTTPS URL to download.
    pub url: String,

    /// Output file (default: last path component of the URL, or download.bin).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Worker threads; 0 picks a count from the CPU count (default from config, else 0).
    #[arg(short = 't', long = "threads", value_name = "N")]
    pub threads: Option<usize>,

    /// Segment size in bytes (default from config, else 1 MiB).
    #[arg(
        short = 's',
        long = "segment-size",
        value_name = "BYTES",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub segment_size: Option<u64>,

    /// Continue from the checkpoint next to the output file, if any.
    #[arg(short, long)]
    pub resume: bool,

    /// Read settings from this file instead of ~/.config/rangefetch/config.toml.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// More detailed logs (debug level).
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Runs the download. `Ok(false)` means the run ended incomplete.
    pub fn run(&self) -> Result<bool> {
        download::run_download(self)
    }
}

#[cfg(test)]
mod tests;
