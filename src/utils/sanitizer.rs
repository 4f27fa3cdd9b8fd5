// Input sanitizing for user-supplied text and file names

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ \t]{2,}").expect("valid whitespace regex")
});

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9._-]").expect("valid filename regex")
});

/// Strips control characters (newlines and tabs survive), collapses runs of
/// blanks, trims, and HTML-escapes the result.
pub fn sanitize_input(raw: &str) -> String {
    let without_controls: String = raw
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    let collapsed = WHITESPACE_RUN.replace_all(without_controls.trim(), " ");
    escape_html(&collapsed)
}

pub fn escape_html(input: &str) -> String {
    let mut escaped: String = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Reduces a client-supplied file name to its last path component made of
/// `[A-Za-z0-9._-]`. Returns `None` when nothing usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let last: &str = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(last.trim(), "_");
    let cleaned: &str = cleaned.trim_start_matches('.');

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_' || c == '.') {
        return None;
    }

    Some(cleaned.chars().take(128).collect())
}
