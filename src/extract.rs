//! URL extraction from raw text lines
//!
//! Every line is treated as plain text. Only the first bare `http(s)://`
//! token per line is taken, and a token directly preceded by `[` is never
//! taken: that is the label half of a `[label](url)` construct.

use regex::Regex;
use std::sync::LazyLock;

/// Maximal non-whitespace run starting at `http(s)://`, backed off to the
/// last word boundary plus an optional trailing slash.
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhttps?://\S+\b/?").expect("static URL regex"));

const LOOPBACK: &str = "localhost";

/// Extract the link on one line, if any
///
/// Loopback links are discarded. A final path segment with an unclosed
/// `(` gets its `)` back.
pub fn extract_link(line: &str) -> Option<String> {
    let raw = first_unbracketed_match(line)?;

    if raw.contains(LOOPBACK) {
        return None;
    }

    Some(repair_parentheses(raw))
}

/// Extract `(line_number, url)` pairs from file content, 1-indexed
pub fn extract_links(content: &str) -> Vec<(usize, String)> {
    content
        .lines()
        .enumerate()
        .filter_map(|(i, line)| extract_link(line).map(|url| (i + 1, url)))
        .collect()
}

/// Re-close an unbalanced `(` in the last path segment
///
/// `https://en.wikipedia.org/wiki/C_(programming_language` loses its `)`
/// to the word-boundary rule; this puts it back. Idempotent.
pub fn repair_parentheses(url: &str) -> String {
    if !url.contains('(') || url.contains(LOOPBACK) {
        return url.to_string();
    }

    let mut segments: Vec<&str> = url.split('/').collect();
    let Some(last) = segments.pop() else {
        return url.to_string();
    };

    if last.contains('(') && !last.contains(')') {
        let closed = format!("{last})");
        segments.push(&closed);
        segments.join("/")
    } else {
        url.to_string()
    }
}

/// First match not immediately preceded by `[`
///
/// A rejected match may span later candidates (`[a](b)` matches as one
/// token), so the search resumes one character past the rejected start
/// rather than past its end.
fn first_unbracketed_match(line: &str) -> Option<&str> {
    let mut from = 0;

    while let Some(m) = URL_RE.find_at(line, from) {
        let bracketed = line[..m.start()].ends_with('[');
        if !bracketed {
            return Some(m.as_str());
        }
        // `h` is ASCII, so start + 1 is a char boundary
        from = m.start() + 1;
    }

    None
}
