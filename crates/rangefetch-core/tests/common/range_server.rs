//! Minimal HTTP/1.1 server that supports HEAD and Range GET for integration tests.
//!
//! Serves a single static body, one request per connection (`Connection: close`).
//! Every request is recorded so tests can check which ranges were fetched.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RangeServerOptions {
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    /// If false, omit `Accept-Ranges: bytes` header even if ranges work.
    pub advertise_ranges: bool,
    /// If false, HEAD carries no Content-Length.
    pub send_length: bool,
    /// Sent on HEAD and GET when set.
    pub etag: Option<String>,
    /// Sleep before answering each GET.
    pub get_delay: Duration,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            support_ranges: true,
            advertise_ranges: true,
            send_length: true,
            etag: None,
            get_delay: Duration::ZERO,
        }
    }
}

/// One request seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub method: String,
    /// Start offset of the requested range, if any.
    pub range_start: Option<u64>,
}

struct Shared {
    body: Vec<u8>,
    opts: RangeServerOptions,
    hits: Mutex<Vec<Hit>>,
    /// GETs whose range starts at one of these offsets get a 404.
    fail_offsets: Mutex<HashSet<u64>>,
}

/// Handle to a running server. The server runs until the process exits.
#[derive(Clone)]
pub struct RangeServer {
    url: String,
    shared: Arc<Shared>,
}

impl RangeServer {
    pub fn start(body: Vec<u8>) -> Self {
        Self::start_with_options(body, RangeServerOptions::default())
    }

    pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let shared = Arc::new(Shared {
            body,
            opts,
            hits: Mutex::new(Vec::new()),
            fail_offsets: Mutex::new(HashSet::new()),
        });
        let accept_shared = Arc::clone(&shared);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let shared = Arc::clone(&accept_shared);
                thread::spawn(move || handle(stream, &shared));
            }
        });
        Self {
            url: format!("http://127.0.0.1:{}/file.bin", port),
            shared,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn fail_offset(&self, offset: u64) {
        self.shared.fail_offsets.lock().unwrap().insert(offset);
    }

    pub fn clear_failures(&self) {
        self.shared.fail_offsets.lock().unwrap().clear();
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.shared.hits.lock().unwrap().clone()
    }

    pub fn clear_hits(&self) {
        self.shared.hits.lock().unwrap().clear();
    }

    /// Start offsets of all GETs so far, sorted.
    pub fn get_offsets(&self) -> Vec<u64> {
        let mut offsets: Vec<u64> = self
            .hits()
            .into_iter()
            .filter(|h| h.method == "GET")
            .map(|h| h.range_start.unwrap_or(0))
            .collect();
        offsets.sort_unstable();
        offsets
    }

    pub fn get_count(&self) -> usize {
        self.hits().iter().filter(|h| h.method == "GET").count()
    }
}

fn handle(mut stream: TcpStream, shared: &Shared) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, range) = parse_request(request);
    shared.hits.lock().unwrap().push(Hit {
        method: method.to_ascii_uppercase(),
        range_start: range.map(|(start, _)| start),
    });

    let opts = &shared.opts;
    let body = shared.body.as_slice();
    let total = body.len() as u64;
    let mut extra = String::new();
    if opts.advertise_ranges && opts.support_ranges {
        extra.push_str("Accept-Ranges: bytes\r\n");
    }
    if let Some(etag) = &opts.etag {
        extra.push_str(&format!("ETag: \"{}\"\r\n", etag));
    }

    if method.eq_ignore_ascii_case("HEAD") {
        let length = if opts.send_length {
            format!("Content-Length: {}\r\n", total)
        } else {
            String::new()
        };
        let response = format!("HTTP/1.1 200 OK\r\n{}{}Connection: close\r\n\r\n", length, extra);
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    if method.eq_ignore_ascii_case("GET") {
        if !opts.get_delay.is_zero() {
            thread::sleep(opts.get_delay);
        }
        let start = range.map(|(s, _)| s).unwrap_or(0);
        if shared.fail_offsets.lock().unwrap().contains(&start) {
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
            return;
        }
        let (status, content_range, slice) = match range.filter(|_| opts.support_ranges) {
            Some((start, end_incl)) => {
                let end_incl = end_incl.min(total.saturating_sub(1));
                if start >= total || start > end_incl {
                    (
                        "416 Range Not Satisfiable",
                        format!("Content-Range: bytes */{}\r\n", total),
                        &body[0..0],
                    )
                } else {
                    let slice = &body[start as usize..=end_incl as usize];
                    (
                        "206 Partial Content",
                        format!("Content-Range: bytes {}-{}/{}\r\n", start, end_incl, total),
                        slice,
                    )
                }
            }
            None => ("200 OK", String::new(), body),
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}{}Connection: close\r\n\r\n",
            status,
            slice.len(),
            content_range,
            extra
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(slice);
        return;
    }
    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
}

/// Returns (method, optional (start, end_inclusive) for Range: bytes=X-Y).
fn parse_request(request: &str) -> (&str, Option<(u64, u64)>) {
    let mut method = "";
    let mut range = None;
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if method.is_empty() {
            method = line.split_whitespace().next().unwrap_or("");
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                let value = value.trim();
                if value.to_lowercase().starts_with("bytes=") {
                    let part = value[6..].trim();
                    if let Some((a, b)) = part.split_once('-') {
                        let start = a.trim().parse::<u64>().unwrap_or(0);
                        let end = b.trim();
                        let end_incl = if end.is_empty() {
                            u64::MAX
                        } else {
                            end.parse::<u64>().unwrap_or(0)
                        };
                        range = Some((start, end_incl));
                    }
                }
            }
        }
    }
    (method, range)
}

/// Deterministic non-repeating-ish test body.
pub fn test_body(len: usize) -> Vec<u8> {
    let mut x: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            (x >> 24) as u8
        })
        .collect()
}
