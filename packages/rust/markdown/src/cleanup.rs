//! Text normalization passes applied while assembling Markdown.

use std::sync::LazyLock;

use regex::Regex;

/// Collapse every run of 3+ newlines into a single blank line.
pub(crate) fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").into_owned()
}

/// Join whitespace-separated words with single spaces.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Make cell text safe inside a single Markdown table row.
pub(crate) fn table_cell(text: &str) -> String {
    collapse_whitespace(text).replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_blank_lines_collapses_excess() {
        assert_eq!(collapse_blank_lines("Line 1\n\n\n\n\nLine 2"), "Line 1\n\nLine 2");
        assert_eq!(collapse_blank_lines("Line 1\n\n\nLine 2"), "Line 1\n\nLine 2");
    }

    #[test]
    fn collapse_blank_lines_keeps_double() {
        let input = "Line 1\n\nLine 2\nLine 3";
        assert_eq!(collapse_blank_lines(input), input);
    }

    #[test]
    fn collapse_whitespace_joins_words() {
        assert_eq!(collapse_whitespace("  a\n\tb   c "), "a b c");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn table_cell_escapes_pipes() {
        assert_eq!(table_cell("a | b\nc"), "a \\| b c");
    }
}
