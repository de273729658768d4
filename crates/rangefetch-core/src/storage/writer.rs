//! Concurrent offset writer for the output file.

use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
#[cfg(unix)]
use std::os::unix::fs::FileExt;
#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Writer for the output file. Shared by reference (or `Arc`) between
/// workers; each `write_at` is independent (pwrite-style). `close` takes the
/// write side of the lock, so it waits for in-flight writes and runs once.
pub struct FileWriter {
    path: PathBuf,
    total_size: u64,
    file: RwLock<Option<File>>,
}

impl FileWriter {
    /// Open the output and pre-size it to `total_size` bytes.
    /// An existing file is truncated first unless `resume` is set.
    pub fn open(path: &Path, total_size: u64, resume: bool) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(!resume)
            .open(path)
            .with_context(|| format!("failed to open output file: {}", path.display()))?;
        preallocate(&file, total_size)
            .with_context(|| format!("failed to pre-size {} to {} bytes", path.display(), total_size))?;
        Ok(FileWriter {
            path: path.to_path_buf(),
            total_size,
            file: RwLock::new(Some(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn is_open(&self) -> bool {
        self.file
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Write `data` at `offset`. Does not move a shared cursor; safe for
    /// concurrent use at non-overlapping offsets. Fails once the file is closed.
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        #[cfg(unix)]
        let guard = self.file.read().unwrap_or_else(PoisonError::into_inner);
        // seek + write shares the cursor: serialize writers.
        #[cfg(not(unix))]
        let guard = self.file.write().unwrap_or_else(PoisonError::into_inner);
        let file = guard
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "output file is closed"))?;
        write_all_at(file, offset, data)
    }

    /// Flush file data to disk.
    pub fn flush(&self) -> Result<()> {
        let guard = self.file.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = guard.as_ref() {
            file.sync_data().context("output sync failed")?;
        }
        Ok(())
    }

    /// Flush and close. Later calls are no-ops; later writes fail.
    pub fn close(&self) -> Result<()> {
        let file = self
            .file
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(file) = file {
            file.sync_all()
                .with_context(|| format!("failed to flush {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("closing output on drop: {:#}", e);
        }
    }
}

#[cfg(unix)]
fn write_all_at(file: &File, offset: u64, data: &[u8]) -> io::Result<()> {
    file.write_all_at(data, offset)
}

/// Non-Unix fallback: seek + write. Callers hold the exclusive lock.
#[cfg(not(unix))]
fn write_all_at(file: &File, offset: u64, data: &[u8]) -> io::Result<()> {
    use std::io::{Seek, SeekFrom, Write};
    let mut f = file.try_clone()?;
    f.seek(SeekFrom::Start(offset))?;
    f.write_all(data)
}

/// Reserve `size` bytes. On Unix tries `posix_fallocate` for real block
/// allocation; falls back to `set_len` on failure or non-Unix. Always ends
/// with `set_len` so a resumed file larger than the target is cut to size.
fn preallocate(file: &File, size: u64) -> Result<()> {
    #[cfg(unix)]
    {
        if size > 0 {
            let fd = file.as_raw_fd();
            let r = unsafe { libc::posix_fallocate(fd, 0, size as libc::off_t) };
            if r != 0 {
                tracing::debug!(errno = r, "posix_fallocate failed, falling back to set_len");
            }
        }
    }
    file.set_len(size).context("failed to preallocate file")?;
    Ok(())
}
