//! Error types for resume validation.

use std::fmt;

/// The checkpoint no longer matches the remote resource.
#[derive(Debug)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub local_size: u64,
    pub remote_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Remote ETag or size changed; progress cannot be reused.
    RemoteChanged { etag_changed: bool, size_changed: bool },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidationErrorKind::RemoteChanged {
                etag_changed,
                size_changed,
            } => {
                write!(f, "remote resource changed")?;
                match (etag_changed, size_changed) {
                    (true, true) => write!(f, " (ETag, size)")?,
                    (true, false) => write!(f, " (ETag)")?,
                    (false, true) => write!(f, " (size)")?,
                    (false, false) => {}
                }
                if *size_changed {
                    write!(f, ": checkpoint has {} bytes, server reports {}", self.local_size, self.remote_size)?;
                }
                write!(f, "; delete the checkpoint or run without --resume to start over")
            }
        }
    }
}

impl std::error::Error for ValidationError {}
