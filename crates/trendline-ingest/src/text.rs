//! Plain-text normalization shared by every extractor.

/// Marker appended to truncated reference content.
pub const TRUNCATION_MARKER: char = '…';

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Truncate to at most `max_chars` characters, appending [`TRUNCATION_MARKER`]
/// when anything was cut. Counts Unicode scalar values, never splits one.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((byte_idx, _)) => {
            let mut out = text[..byte_idx].trim_end().to_string();
            out.push(TRUNCATION_MARKER);
            out
        }
    }
}

/// Strip a leading UTF-8 byte-order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_mixed_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\n\tb   c \r\n"), "a b c");
        assert_eq!(collapse_whitespace(" \n\t "), "");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello…");
        assert_eq!(truncate_chars("数据分析报告", 2), "数据…");
    }

    #[test]
    fn strips_bom_only_at_start() {
        assert_eq!(strip_bom("\u{feff}abc"), "abc");
        assert_eq!(strip_bom("a\u{feff}bc"), "a\u{feff}bc");
    }
}
