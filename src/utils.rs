/// Shared utility functions

/// Safely truncate a string at a UTF-8 boundary
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if max_bytes >= s.len() { return s; }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Short form of a raw payload for log lines and error messages
pub fn preview(s: &str, max_bytes: usize) -> String {
    let cut = safe_truncate(s, max_bytes);
    if cut.len() < s.len() {
        format!("{}...", cut)
    } else {
        cut.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_truncate_ascii() {
        assert_eq!(safe_truncate("hello", 3), "hel");
        assert_eq!(safe_truncate("hello", 10), "hello");
    }

    #[test]
    fn test_safe_truncate_utf8() {
        // 'é' is two bytes; cutting inside it backs off to the boundary
        assert_eq!(safe_truncate("café", 4), "caf");
    }

    #[test]
    fn test_preview_marks_truncation() {
        assert_eq!(preview("{\"id\":1}::vertex", 6), "{\"id\":...");
        assert_eq!(preview("short", 10), "short");
    }
}
