//! Aggregates worker reports.
//!
//! Counters and the last error sit behind separate locks, and neither is the
//! queue lock, so reporting never contends with the claim path.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::downloader::WorkerReport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Bytes of segments completed in this run.
    pub bytes_downloaded: u64,
    pub segments_completed: usize,
    pub segments_failed: usize,
}

#[derive(Debug, Default)]
pub(super) struct RunStats {
    counters: Mutex<Counters>,
    last_error: Mutex<Option<String>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RunStats {
    pub fn record(&self, report: &WorkerReport) {
        if report.success {
            let mut c = lock(&self.counters);
            c.bytes_downloaded += report.bytes_downloaded;
            c.segments_completed += 1;
        } else {
            lock(&self.counters).segments_failed += 1;
            self.set_error(report.error.clone());
        }
    }

    /// Most recent error wins.
    pub fn set_error(&self, error: String) {
        *lock(&self.last_error) = Some(error);
    }

    pub fn counters(&self) -> Counters {
        *lock(&self.counters)
    }

    pub fn last_error(&self) -> Option<String> {
        lock(&self.last_error).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(index: usize, bytes: u64) -> WorkerReport {
        WorkerReport {
            segment_index: index,
            bytes_downloaded: bytes,
            success: true,
            error: String::new(),
        }
    }

    fn failed(index: usize, error: &str) -> WorkerReport {
        WorkerReport {
            segment_index: index,
            bytes_downloaded: 0,
            success: false,
            error: error.to_string(),
        }
    }

    #[test]
    fn counts_successes_and_failures() {
        let stats = RunStats::default();
        stats.record(&ok(0, 100));
        stats.record(&ok(1, 50));
        stats.record(&failed(2, "segment 2: HTTP 404"));
        assert_eq!(
            stats.counters(),
            Counters {
                bytes_downloaded: 150,
                segments_completed: 2,
                segments_failed: 1,
            }
        );
    }

    #[test]
    fn last_error_is_most_recent() {
        let stats = RunStats::default();
        assert!(stats.last_error().is_none());
        stats.record(&failed(1, "first"));
        stats.record(&ok(2, 10));
        stats.record(&failed(3, "second"));
        assert_eq!(stats.last_error().as_deref(), Some("second"));
    }

    #[test]
    fn concurrent_reports() {
        let stats = std::sync::Arc::new(RunStats::default());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let stats = std::sync::Arc::clone(&stats);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        stats.record(&ok(t * 250 + i, 4));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let c = stats.counters();
        assert_eq!(c.segments_completed, 1000);
        assert_eq!(c.bytes_downloaded, 4000);
    }
}
