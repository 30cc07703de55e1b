//! Filename sanitization for archive entries and result filenames.

use std::sync::LazyLock;

use regex::Regex;

/// Runs of two or more `/`, `\` or `.`, plus any lone `/` or `\`.
static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/\\.]{2,}|[/\\]").unwrap());

/// Anything that is not a Unicode word character, `.`, or `-`.
static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w.-]").unwrap());

/// Produce a string safe for use as a single path segment.
///
/// Strips path traversal sequences, replaces unsafe characters with `_`,
/// and forbids hidden files (leading `.`). An empty result becomes
/// `"unnamed"`. Sanitizing an already-sanitized name is a no-op, so the
/// function can be applied defensively at every layer that touches a
/// client-supplied name.
pub fn sanitize_filename(name: &str) -> String {
    let stripped = SEPARATOR_RUNS.replace_all(name, "");
    let mut sanitized = UNSAFE_CHARS.replace_all(&stripped, "_").into_owned();

    if sanitized.starts_with('.') {
        sanitized.replace_range(..1, "_");
    }

    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized
    }
}
