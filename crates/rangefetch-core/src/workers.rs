//! Fixed-size group of OS threads sharing one cooperative stop flag.
//!
//! Every thread runs the same task closure, which is responsible for polling
//! the stop flag. Scaling down is coarse: the flag is raised for everyone,
//! the requested number of threads is joined, and the flag is put back.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use crate::control::CancelToken;

/// Task run by each worker thread; the argument is the worker id.
pub type WorkerTask = Arc<dyn Fn(usize) + Send + Sync + 'static>;

pub struct WorkerPool {
    threads: Mutex<Vec<JoinHandle<()>>>,
    stop: CancelToken,
    next_id: AtomicUsize,
}

impl WorkerPool {
    pub fn new(stop: CancelToken) -> Self {
        Self {
            threads: Mutex::new(Vec::new()),
            stop,
            next_id: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Spawn `n` threads running `task`. On a spawn failure the threads
    /// already started keep running and the error is returned.
    pub fn start(&self, n: usize, task: WorkerTask) -> io::Result<()> {
        let mut threads = self.lock();
        for _ in 0..n {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let task = Arc::clone(&task);
            let handle = std::thread::Builder::new()
                .name(format!("rangefetch-worker-{}", id))
                .spawn(move || task(id))?;
            threads.push(handle);
        }
        Ok(())
    }

    /// Add `n` more threads running `task`.
    pub fn scale_up(&self, n: usize, task: WorkerTask) -> io::Result<()> {
        self.start(n, task)
    }

    /// Best-effort removal of up to `n` threads (most recently started first).
    ///
    /// Raises the shared stop flag while joining them, then restores it. Other
    /// threads that poll the flag during that window exit too; this is an
    /// approximation, not per-thread removal.
    pub fn scale_down(&self, n: usize) {
        let mut threads = self.lock();
        let remove = n.min(threads.len());
        let was_stopped = self.stop.set(true);
        for _ in 0..remove {
            if let Some(h) = threads.pop() {
                join_logged(h);
            }
        }
        self.stop.set(was_stopped);
    }

    /// Raise the stop flag and join every thread. Idempotent.
    pub fn shutdown(&self) {
        let mut threads = self.lock();
        self.stop.cancel();
        for h in threads.drain(..) {
            join_logged(h);
        }
    }

    /// Threads started and not yet joined.
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Threads whose task has not returned yet.
    pub fn live_count(&self) -> usize {
        self.lock().iter().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join_logged(h: JoinHandle<()>) {
    let name = h.thread().name().unwrap_or("worker").to_string();
    if h.join().is_err() {
        tracing::error!(thread = %name, "worker thread panicked");
    }
}
