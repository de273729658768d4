//! Blocking HTTP client over a reusable libcurl easy handle.
//!
//! One `HttpClient` is bound to one URL and provides the two primitives the
//! engine needs: a HEAD probe (size, ETag, range support) and a ranged GET
//! that streams chunks to a callback. Handles are reused through the
//! connection pool so libcurl can keep the underlying connection alive.

mod head;

pub use head::HeadResult;

use anyhow::{Context, Result};
use std::cell::Cell;
use std::str;
use std::time::Duration;

use crate::retry::SegmentError;

/// Transfer tuning applied to every request made by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub connect_timeout: Duration,
    /// Abort if throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    /// Hard wall-clock cap for a single request.
    pub timeout: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            timeout: Duration::from_secs(3600),
        }
    }
}

/// True if `code` delivers the bytes of a range starting at `offset`.
/// A plain 200 is only acceptable for a range starting at 0 (server sent the
/// whole body, which the caller caps at the requested length).
fn range_satisfied(code: u32, offset: u64) -> bool {
    code == 206 || (code == 200 && offset == 0)
}

/// HTTP client handle bound to one resource URL.
pub struct HttpClient {
    url: String,
    easy: curl::easy::Easy,
    opts: TransferOptions,
}

impl HttpClient {
    pub fn new(url: &str, opts: TransferOptions) -> Self {
        Self {
            url: url.to_string(),
            easy: curl::easy::Easy::new(),
            opts,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Reset per-request state and apply URL and transfer options.
    /// libcurl keeps its connection cache across resets.
    fn prepare(&mut self) -> Result<(), curl::Error> {
        self.easy.reset();
        self.easy.url(&self.url)?;
        self.easy.follow_location(true)?;
        self.easy.max_redirections(10)?;
        self.easy.connect_timeout(self.opts.connect_timeout)?;
        self.easy.low_speed_limit(self.opts.low_speed_limit)?;
        self.easy.low_speed_time(self.opts.low_speed_time)?;
        self.easy.timeout(self.opts.timeout)?;
        Ok(())
    }

    /// Performs a HEAD request and returns parsed metadata. Follows redirects.
    pub fn head(&mut self) -> Result<HeadResult> {
        let mut headers: Vec<String> = Vec::new();

        self.prepare().context("invalid URL")?;
        self.easy.nobody(true)?;

        {
            let mut transfer = self.easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    headers.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.perform().context("HEAD request failed")?;
        }

        let code = self.easy.response_code().context("no response code")?;
        if !(200..300).contains(&code) {
            anyhow::bail!("HEAD {} returned HTTP {}", self.url, code);
        }

        head::parse_headers(&headers)
    }

    /// Fetches `[offset, offset + length)` and hands every received chunk to
    /// `on_chunk`. Returning false from the callback aborts the transfer with
    /// `SegmentError::Aborted`.
    ///
    /// Succeeds only with a range-satisfying status (206, or 200 when `offset`
    /// is 0) and exactly `length` bytes delivered. Chunks are never passed on
    /// before the status is known or beyond `length` bytes.
    pub fn get_range<F>(&mut self, offset: u64, length: u64, mut on_chunk: F) -> Result<u64, SegmentError>
    where
        F: FnMut(&[u8]) -> bool,
    {
        if length == 0 {
            return Ok(0);
        }

        self.prepare().map_err(SegmentError::Curl)?;
        let range = format!("{}-{}", offset, offset + length - 1);
        self.easy.range(&range).map_err(SegmentError::Curl)?;

        let status: Cell<u32> = Cell::new(0);
        let mut received = 0u64;
        let mut refused: Option<SegmentError> = None;

        let performed = {
            let mut transfer = self.easy.transfer();
            transfer
                .header_function(|line| {
                    if let Some(code) = head::status_code(line) {
                        status.set(code);
                    }
                    true
                })
                .map_err(SegmentError::Curl)?;
            transfer
                .write_function(|data| {
                    let code = status.get();
                    if !range_satisfied(code, offset) {
                        refused = Some(SegmentError::Http(code));
                        return Ok(0);
                    }
                    let len = data.len() as u64;
                    if received + len > length {
                        refused = Some(SegmentError::PartialTransfer {
                            expected: length,
                            received: received + len,
                        });
                        return Ok(0);
                    }
                    if !on_chunk(data) {
                        refused = Some(SegmentError::Aborted);
                        return Ok(0);
                    }
                    received += len;
                    Ok(data.len())
                })
                .map_err(SegmentError::Curl)?;
            transfer.perform()
        };

        if let Err(e) = performed {
            if e.is_write_error() {
                return Err(refused.unwrap_or(SegmentError::Aborted));
            }
            return Err(SegmentError::Curl(e));
        }

        let code = self.easy.response_code().map_err(SegmentError::Curl)?;
        if !range_satisfied(code, offset) {
            return Err(SegmentError::Http(code));
        }
        if received != length {
            return Err(SegmentError::PartialTransfer {
                expected: length,
                received,
            });
        }
        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_status_rules() {
        assert!(range_satisfied(206, 0));
        assert!(range_satisfied(206, 4096));
        assert!(range_satisfied(200, 0));
        assert!(!range_satisfied(200, 4096));
        assert!(!range_satisfied(416, 0));
        assert!(!range_satisfied(0, 0));
    }

    #[test]
    fn zero_length_range_is_a_no_op() {
        let mut client = HttpClient::new("http://127.0.0.1:9/unused", TransferOptions::default());
        let n = client.get_range(10, 0, |_| panic!("no chunks expected")).unwrap();
        assert_eq!(n, 0);
        assert_eq!(client.url(), "http://127.0.0.1:9/unused");
    }
}
