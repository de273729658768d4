//! Run-level error taxonomy.
//!
//! These are the fatal errors: each stops a run before workers are spawned.
//! Segment failures are not here; they are reported by workers and recorded
//! by the controller without aborting the run (see `retry::SegmentError`).

use std::path::PathBuf;

use crate::checkpoint::ValidationError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// Bad run configuration; nothing touched the network yet.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// HEAD probe failed, or its answer cannot be planned against.
    #[error("could not plan download of {url}")]
    Planning {
        url: String,
        #[source]
        source: BoxError,
    },

    /// Checkpoint could not be loaded on resume, or the initial one could not be written.
    #[error("checkpoint {path} unusable")]
    Checkpoint {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Checkpoint does not match the remote resource any more.
    #[error("cannot resume from {path}")]
    ResumeRejected {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    /// Output file could not be created or pre-sized.
    #[error("could not open output file {path}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("could not start worker threads")]
    WorkerSpawn(#[source] std::io::Error),
}
