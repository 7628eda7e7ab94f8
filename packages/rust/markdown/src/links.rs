//! Small-state scanner for `[text](target)` link references.
//!
//! Used both when rewriting freshly converted pages and when validating
//! documents on disk, so the two passes always agree on what a link is.
//! Targets may contain balanced parentheses
//! (`https://en.wikipedia.org/wiki/Upstream_(software_development)`), but no
//! whitespace; link references never span lines; fenced code blocks are
//! skipped. Brackets preceded by an unescaped backslash are plain text.

/// One link reference found in Markdown text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSpan<'a> {
    /// Display text between the brackets.
    pub text: &'a str,
    /// Raw target between the parentheses.
    pub target: &'a str,
    /// Byte offset of the opening `[`.
    pub start: usize,
    /// Byte offset just past the closing `)`.
    pub end: usize,
}

/// Find every link reference in `input`, in order.
pub fn scan_links(input: &str) -> Vec<LinkSpan<'_>> {
    let mut links = Vec::new();
    let mut offset = 0;
    let mut in_fence = false;

    for line in input.split_inclusive('\n') {
        if is_fence_line(line) {
            in_fence = !in_fence;
        } else if !in_fence {
            scan_line(line, offset, &mut links);
        }
        offset += line.len();
    }

    links
}

/// Whether `line` opens or closes a fenced code block: three backticks at
/// the start of the line, optionally followed by a single language word.
pub fn is_fence_line(line: &str) -> bool {
    line.trim_end()
        .strip_prefix("```")
        .is_some_and(|lang| lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'))
}

/// Escape `text` for use between the brackets of a link reference.
pub fn escape_link_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// An odd run of backslashes right before `idx` escapes the byte there.
fn is_escaped(bytes: &[u8], idx: usize) -> bool {
    bytes[..idx].iter().rev().take_while(|&&b| b == b'\\').count() % 2 == 1
}

fn scan_line<'a>(line: &'a str, base: usize, links: &mut Vec<LinkSpan<'a>>) {
    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'[' || is_escaped(bytes, i) {
            i += 1;
            continue;
        }

        // Innermost `[` before the next `]` opens the text.
        let mut open = i;
        let mut close = i + 1;
        while close < bytes.len() && !(bytes[close] == b']' && !is_escaped(bytes, close)) {
            if bytes[close] == b'[' && !is_escaped(bytes, close) {
                open = close;
            }
            close += 1;
        }
        if close >= bytes.len() {
            return;
        }
        if close == open + 1 || bytes.get(close + 1) != Some(&b'(') {
            i = close + 1;
            continue;
        }

        let target_start = close + 2;
        match target_end(bytes, target_start) {
            Some(end) if end > target_start => {
                links.push(LinkSpan {
                    text: &line[open + 1..close],
                    target: &line[target_start..end],
                    start: base + open,
                    end: base + end + 1,
                });
                i = end + 1;
            }
            _ => i = close + 1,
        }
    }
}

/// Index of the `)` that balances the one opened just before `start`.
fn target_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (idx, &b) in bytes.iter().enumerate().skip(start) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            b' ' | b'\t' | b'\r' | b'\n' => return None,
            _ => {}
        }
    }
    None
}
