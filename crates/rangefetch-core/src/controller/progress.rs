//! Progress snapshot for the periodic progress log (bytes done, rate, ETA).

use std::fmt;

/// Snapshot of download progress for one run.
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Bytes in Done segments, including those finished by earlier runs.
    pub bytes_done: u64,
    /// Bytes completed by this run only; the rate is based on this.
    pub bytes_this_run: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Elapsed time since this run started downloading (seconds).
    pub elapsed_secs: f64,
    /// Number of segments completed.
    pub segments_done: usize,
    /// Total number of segments.
    pub segment_count: usize,
}

impl ProgressStats {
    /// Download rate of this run in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_this_run as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if rate is 0 or already done).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}

impl fmt::Display for ProgressStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} bytes ({:.1}%), {}/{} segments, {:.1} KiB/s",
            self.bytes_done,
            self.total_bytes,
            self.fraction() * 100.0,
            self.segments_done,
            self.segment_count,
            self.bytes_per_sec() / 1024.0
        )?;
        if let Some(eta) = self.eta_secs() {
            write!(f, ", ETA {:.0}s", eta)?;
        }
        Ok(())
    }
}
