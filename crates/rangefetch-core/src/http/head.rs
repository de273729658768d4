//! Parse HTTP response header lines into a HeadResult.

use anyhow::Result;

/// Result of a HEAD request: the headers needed to plan and validate a download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `ETag` value with surrounding quotes removed; empty when absent.
    pub etag: String,
}

/// Extracts the status code from a status line such as `HTTP/1.1 206 Partial Content`.
pub(crate) fn status_code(line: &[u8]) -> Option<u32> {
    let line = std::str::from_utf8(line).ok()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Parse collected header lines into a HeadResult.
///
/// Only the last response counts: when redirects were followed, every status
/// line resets what was collected from the previous hop.
pub(crate) fn parse_headers(lines: &[String]) -> Result<HeadResult> {
    let mut out = HeadResult::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if status_code(line.as_bytes()).is_some() {
            out = HeadResult::default();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    out.content_length = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("accept-ranges") {
                out.accept_ranges = value
                    .split(',')
                    .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"));
            }
            if name.eq_ignore_ascii_case("etag") {
                out.etag = value.trim_start_matches("W/").trim_matches('"').to_string();
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_headers_content_length_and_ranges() {
        let r = parse_headers(&lines(&[
            "HTTP/1.1 200 OK",
            "Content-Length: 12345",
            "Accept-Ranges: bytes",
        ]))
        .unwrap();
        assert_eq!(r.content_length, Some(12345));
        assert!(r.accept_ranges);
        assert!(r.etag.is_empty());
    }

    #[test]
    fn parse_headers_etag_quotes_stripped() {
        let r = parse_headers(&lines(&["ETag: \"abc-123\""])).unwrap();
        assert_eq!(r.etag, "abc-123");
        let weak = parse_headers(&lines(&["etag: W/\"v2\""])).unwrap();
        assert_eq!(weak.etag, "v2");
    }

    #[test]
    fn parse_headers_no_ranges() {
        let r = parse_headers(&lines(&["Content-Length: 999", "Accept-Ranges: none"])).unwrap();
        assert_eq!(r.content_length, Some(999));
        assert!(!r.accept_ranges);
    }

    #[test]
    fn parse_headers_keeps_only_final_response() {
        let r = parse_headers(&lines(&[
            "HTTP/1.1 302 Found",
            "Location: https://mirror.example.com/file.iso",
            "Content-Length: 0",
            "ETag: \"redirect\"",
            "",
            "HTTP/2 200",
            "content-length: 4096",
            "accept-ranges: bytes",
        ]))
        .unwrap();
        assert_eq!(r.content_length, Some(4096));
        assert!(r.accept_ranges);
        assert!(r.etag.is_empty());
    }

    #[test]
    fn status_code_parses_status_lines_only() {
        assert_eq!(status_code(b"HTTP/1.1 206 Partial Content\r\n"), Some(206));
        assert_eq!(status_code(b"HTTP/2 200\r\n"), Some(200));
        assert_eq!(status_code(b"Content-Length: 5\r\n"), None);
    }
}
