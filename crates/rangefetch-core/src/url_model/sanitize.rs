//! Linux-safe filename sanitization.

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;
/// Longest suffix added next to the output (`<name>.meta.tmp`).
const CHECKPOINT_SUFFIX_LEN: usize = ".meta.tmp".len();

/// Sanitizes a candidate filename for use as a download output on Linux.
///
/// Separators, NUL, whitespace and control characters become `_` (runs
/// collapse to one); leading and trailing dots/underscores are dropped. The
/// result is short enough that the checkpoint files beside it still fit in
/// NAME_MAX. May return an empty string.
pub fn sanitize_filename_for_linux(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let unsafe_char = matches!(c, '\0' | '/' | '\\') || c.is_control() || c.is_whitespace();
        if unsafe_char || c == '_' {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    truncate_on_char_boundary(trimmed, NAME_MAX - CHECKPOINT_SUFFIX_LEN).to_string()
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
