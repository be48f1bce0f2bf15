//! Shared text helpers.

/// Longest prefix of `s` that is at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Single-line preview of message content for logs and console output.
///
/// Whitespace runs (newlines included) collapse to one space; content longer
/// than `max_chars` is cut and ends with `…`.
pub fn preview(s: &str, max_chars: usize) -> String {
    let flat = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut = truncate_chars(&flat, max_chars.saturating_sub(1));
    format!("{}…", cut.trim_end())
}
