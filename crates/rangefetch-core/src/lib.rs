pub mod config;
pub mod error;
pub mod logging;

// Download engine
pub mod checkpoint;
pub mod control;
pub mod controller;
pub mod downloader;
pub mod http;
pub mod pool;
pub mod queue;
pub mod retry;
pub mod segmenter;
pub mod storage;
pub mod url_model;
pub mod workers;

pub use config::RunConfig;
pub use control::CancelToken;
pub use controller::{ControllerState, DownloadController, RunSummary};
pub use error::RunError;
