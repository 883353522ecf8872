//! Subject line → repository path.
//!
//! The subject is the only addressing information a mail carries, so it is treated as
//! untrusted: separators are normalized, traversal segments dropped, and a name and
//! extension are filled in when missing.

use chrono::{DateTime, Utc};

/// Case-insensitive subject prefix requesting append instead of overwrite.
pub const APPEND_MARKER: &str = "[append]";

/// Extension appended when the final segment has none.
pub const DEFAULT_EXTENSION: &str = ".md";

/// Where a message should be written, and whether the subject asked to append.
///
/// `append_mode` only records the request; the commit appends only when the file already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub path: String,
    pub append_mode: bool,
}

/// Resolve a subject against the current UTC time.
pub fn resolve_path(subject: &str) -> ResolvedTarget {
    resolve_path_at(subject, Utc::now())
}

/// Resolve a subject; `now` names the file when the subject yields no path.
pub fn resolve_path_at(subject: &str, now: DateTime<Utc>) -> ResolvedTarget {
    let (rest, append_mode) = strip_append_marker(subject.trim());

    let mut path = normalize(rest);
    if path.is_empty() {
        path = default_note_path(now);
    }
    if !has_extension(&path) {
        path.push_str(DEFAULT_EXTENSION);
    }

    ResolvedTarget { path, append_mode }
}

/// Strip a leading `[append]` (any case) and the whitespace after it.
pub fn strip_append_marker(subject: &str) -> (&str, bool) {
    let n = APPEND_MARKER.len();
    match subject.get(..n) {
        Some(head) if head.eq_ignore_ascii_case(APPEND_MARKER) => (subject[n..].trim_start(), true),
        _ => (subject, false),
    }
}

/// Backslashes become `/`, whitespace runs collapse to one space, and empty, `.` and `..`
/// segments are dropped.
fn normalize(subject: &str) -> String {
    let unified = subject
        .replace('\\', "/")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    unified
        .split('/')
        .map(str::trim)
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join("/")
}

/// `notes/YYYY-MM-DD-HHMMSS.md`. Two calls within the same second collide.
pub fn default_note_path(now: DateTime<Utc>) -> String {
    now.format("notes/%Y-%m-%d-%H%M%S.md").to_string()
}

/// True when the path ends in `.` followed by 1 to 6 ASCII alphanumerics.
pub fn has_extension(path: &str) -> bool {
    let Some(dot) = path.rfind('.') else {
        return false;
    };
    let ext = &path[dot + 1..];
    (1..=6).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}
