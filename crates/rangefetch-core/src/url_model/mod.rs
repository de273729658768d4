//! Output filename derivation.
//!
//! Derives a safe local filename from the last URL path segment,
//! sanitized for Linux filesystems.

mod path;
mod sanitize;

pub use path::filename_from_url_path;
pub use sanitize::sanitize_filename_for_linux;

/// Default filename when the URL path yields nothing usable.
pub const DEFAULT_FILENAME: &str = "download.bin";

/// Derives the output filename for a download when `-o` is not given.
///
/// Uses the last path segment of `url` with any query or fragment removed.
/// The result is sanitized for Linux (no `/`, NUL, or control chars; no
/// leading/trailing dots or spaces).
///
/// # Examples
///
/// - `derive_output_name("https://host/path/file.zip?x=1")` → `"file.zip"`
/// - `derive_output_name("https://host/")` → `"download.bin"`
pub fn derive_output_name(url: &str) -> String {
    let raw = match filename_from_url_path(url) {
        Some(c) => c,
        None => return DEFAULT_FILENAME.to_string(),
    };

    let sanitized = sanitize_filename_for_linux(&raw);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}
