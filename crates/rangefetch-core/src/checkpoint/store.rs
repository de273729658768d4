//! File-backed checkpoint store.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::validate::{ValidationError, ValidationErrorKind};
use super::DownloadMetadata;
use crate::segmenter::check_partition;

/// Checkpoint path for an output file: appends `.meta` (e.g. `file.iso` → `file.iso.meta`).
pub fn checkpoint_path(output: &Path) -> PathBuf {
    let mut o: OsString = output.as_os_str().to_owned();
    o.push(".meta");
    PathBuf::from(o)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut o: OsString = path.as_os_str().to_owned();
    o.push(".tmp");
    PathBuf::from(o)
}

/// Durable record of one download's metadata at a fixed path.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Store for the checkpoint that belongs to `output`.
    pub fn for_output(output: &Path) -> Self {
        Self {
            path: checkpoint_path(output),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and structurally check the checkpoint: segments must form a
    /// contiguous partition of `file_size`.
    pub fn load(&self) -> Result<DownloadMetadata> {
        let bytes = fs::read(&self.path)
            .with_context(|| format!("read checkpoint: {}", self.path.display()))?;
        let meta: DownloadMetadata = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse checkpoint: {}", self.path.display()))?;
        check_partition(&meta.segments, meta.file_size)
            .with_context(|| format!("damaged checkpoint: {}", self.path.display()))?;
        Ok(meta)
    }

    /// Write-then-rename save. The previous checkpoint stays intact if any step fails.
    pub fn save(&self, meta: &DownloadMetadata) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let tmp = tmp_path(&self.path);
        let json = serde_json::to_vec_pretty(meta).context("serialize checkpoint")?;

        let written = (|| -> std::io::Result<()> {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(&json)?;
            f.sync_all()
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| format!("write checkpoint: {}", tmp.display()));
        }

        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| {
                format!("rename {} to {}", tmp.display(), self.path.display())
            });
        }
        Ok(())
    }

    /// Delete the checkpoint (after a completed run). Missing file is not an error.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove checkpoint: {}", self.path.display())),
        }
    }

    /// Check that `local` still describes the remote resource.
    ///
    /// Rejects a size mismatch, and any ETag mismatch when the checkpoint
    /// recorded one (including a server that no longer sends it). A checkpoint
    /// without an ETag is checked by size only.
    pub fn validate(
        &self,
        local: &DownloadMetadata,
        remote_etag: &str,
        remote_size: u64,
    ) -> Result<(), ValidationError> {
        let size_changed = local.file_size != remote_size;
        let etag_changed = !local.etag.is_empty() && local.etag != remote_etag;

        if size_changed || etag_changed {
            return Err(ValidationError {
                kind: ValidationErrorKind::RemoteChanged {
                    etag_changed,
                    size_changed,
                },
                local_size: local.file_size,
                remote_size,
            });
        }
        Ok(())
    }
}
