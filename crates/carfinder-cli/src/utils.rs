//! Shared utilities

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Text appended since the last `printed` bytes were shown.
///
/// Reply content only ever grows by appending, so the previous length is
/// always a char boundary. Anything else restarts from the beginning.
pub fn unseen_suffix(content: &str, printed: usize) -> &str {
    content.get(printed..).unwrap_or(content)
}
