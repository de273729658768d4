//! Configuration: optional TOML file under the XDG config dir plus the
//! per-run settings assembled from it and the command line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::RunError;
use crate::http::TransferOptions;
use crate::retry::RetryPolicy;

/// Default segment size: 1 MiB.
pub const DEFAULT_SEGMENT_SIZE: u64 = 1024 * 1024;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per segment (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let p = RetryPolicy::default();
        Self {
            max_attempts: p.max_attempts,
            base_delay_secs: p.base_delay.as_secs_f64(),
            max_delay_secs: p.max_delay.as_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Settings loaded from `~/.config/rangefetch/config.toml`. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangefetchConfig {
    /// Segment size in bytes when `-s` is not given.
    pub segment_size: u64,
    /// Worker count when `-t` is not given (0 = auto).
    pub max_workers: usize,
    /// Progress log cadence.
    pub progress_interval_ms: u64,
    /// Checkpoint cadence while downloading.
    pub checkpoint_interval_ms: u64,
    pub connect_timeout_secs: u64,
    /// Abort a transfer slower than this many bytes/s for `low_speed_time_secs`.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
    /// Hard cap for one segment request.
    pub transfer_timeout_secs: u64,
    /// Optional retry policy; if missing, built-in defaults are used.
    pub retry: Option<RetryConfig>,
}

impl Default for RangefetchConfig {
    fn default() -> Self {
        let t = TransferOptions::default();
        Self {
            segment_size: DEFAULT_SEGMENT_SIZE,
            max_workers: 0,
            progress_interval_ms: 1000,
            checkpoint_interval_ms: 2000,
            connect_timeout_secs: t.connect_timeout.as_secs(),
            low_speed_limit: t.low_speed_limit,
            low_speed_time_secs: t.low_speed_time.as_secs(),
            transfer_timeout_secs: t.timeout.as_secs(),
            retry: None,
        }
    }
}

impl RangefetchConfig {
    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            low_speed_limit: self.low_speed_limit,
            low_speed_time: Duration::from_secs(self.low_speed_time_secs),
            timeout: Duration::from_secs(self.transfer_timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
            .as_ref()
            .map(RetryConfig::policy)
            .unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rangefetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from the default path, creating a default file if none exists.
pub fn load_or_init() -> Result<RangefetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RangefetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<RangefetchConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: RangefetchConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

/// Settings for one download run. Immutable once the controller starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: String,
    pub output: PathBuf,
    pub segment_size: u64,
    /// 0 = pick automatically from available parallelism.
    pub max_workers: usize,
    pub resume: bool,
    pub progress_interval: Duration,
    pub checkpoint_interval: Duration,
    pub transfer: TransferOptions,
    pub retry: RetryPolicy,
}

impl RunConfig {
    /// Run settings with built-in defaults.
    pub fn new(url: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self::from_config(url, output, &RangefetchConfig::default())
    }

    /// Run settings taking tuning and defaults from a loaded config file.
    pub fn from_config(
        url: impl Into<String>,
        output: impl Into<PathBuf>,
        cfg: &RangefetchConfig,
    ) -> Self {
        Self {
            url: url.into(),
            output: output.into(),
            segment_size: cfg.segment_size,
            max_workers: cfg.max_workers,
            resume: false,
            progress_interval: Duration::from_millis(cfg.progress_interval_ms),
            checkpoint_interval: Duration::from_millis(cfg.checkpoint_interval_ms),
            transfer: cfg.transfer_options(),
            retry: cfg.retry_policy(),
        }
    }

    pub fn validate(&self) -> Result<(), RunError> {
        if self.url.trim().is_empty() {
            return Err(RunError::Config("URL is empty".into()));
        }
        if self.output.as_os_str().is_empty() {
            return Err(RunError::Config("output path is empty".into()));
        }
        if self.segment_size == 0 {
            return Err(RunError::Config("segment size must be greater than 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = RangefetchConfig::default();
        assert_eq!(cfg.segment_size, 1_048_576);
        assert_eq!(cfg.max_workers, 0);
        assert_eq!(cfg.progress_interval_ms, 1000);
        assert_eq!(cfg.checkpoint_interval_ms, 2000);
        assert_eq!(cfg.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = RangefetchConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: RangefetchConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let cfg: RangefetchConfig = toml::from_str("max_workers = 8\n").unwrap();
        assert_eq!(cfg.max_workers, 8);
        assert_eq!(cfg.segment_size, DEFAULT_SEGMENT_SIZE);
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            segment_size = 4_194_304
            connect_timeout_secs = 5

            [retry]
            max_attempts = 1
            base_delay_secs = 0.5
            max_delay_secs = 15
        "#;
        let cfg: RangefetchConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.segment_size, 4 * 1024 * 1024);
        assert_eq!(cfg.transfer_options().connect_timeout, Duration::from_secs(5));
        let p = cfg.retry_policy();
        assert_eq!(p.max_attempts, 1);
        assert_eq!(p.base_delay, Duration::from_millis(500));
        assert_eq!(p.max_delay, Duration::from_secs(15));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "progress_interval_ms = 250\n").unwrap();
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg.progress_interval_ms, 250);
        assert!(load_from(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn run_config_validation() {
        let ok = RunConfig::new("https://example.com/a.iso", "a.iso");
        assert!(ok.validate().is_ok());
        assert!(!ok.resume);

        let mut zero = ok.clone();
        zero.segment_size = 0;
        assert!(matches!(zero.validate(), Err(RunError::Config(_))));

        let empty = RunConfig::new("  ", "a.iso");
        assert!(empty.validate().is_err());
    }
}
