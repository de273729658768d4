//! Filename extraction from URL path.

/// Extracts the last path segment from a URL for use as a filename hint.
///
/// Query and fragment are never part of the result. URLs that do not parse
/// (e.g. missing scheme) are split by hand. Returns `None` if the path is
/// empty/root.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => last_segment(parsed.path())?.to_string(),
        Err(_) => {
            let end = url.find(['?', '#']).unwrap_or(url.len());
            last_segment(&url[..end])?.to_string()
        }
    };
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment)
}

fn last_segment(path: &str) -> Option<&str> {
    path.split('/').filter(|s| !s.is_empty()).last()
}
