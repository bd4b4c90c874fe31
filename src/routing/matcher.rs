//! Path matching primitives.
//!
//! # Responsibilities
//! - Segment-wise prefix test between two absolute paths
//! - Relative remainder once a matched prefix is removed
//! - Request path normalization (`.`/`..` segments, repeated separators)
//! - Joining a destination base path with a remainder
//! - Percent-decoding request paths and re-encoding remainders
//!
//! # Design Decisions
//! - Matching and cleaning run on the decoded path, so `%2e%2e` is `..`
//!   and `%2F` is a separator
//! - Segment boundaries govern matching: `/foo` never matches `/foobar`
//! - A single trailing slash does not form a segment (`/foo/` == `/foo`)
//! - Interior empty segments (`//`) are significant; cleaning removes them
//! - No regex and no allocation on the match path

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Bytes escaped when a decoded segment goes back onto the wire.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Returns true if `path` is absolute (begins with `/`).
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Splits a path into its `/`-delimited segments, dropping the empty
/// segment a trailing slash would produce.
///
/// `"/"` yields a single empty segment, the root.
fn segments(path: &str) -> std::str::Split<'_, char> {
    path.strip_suffix('/').unwrap_or(path).split('/')
}

/// Case-folded string equality.
pub(crate) fn eq_fold(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

fn segment_eq(expected: &str, actual: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        expected == actual
    } else {
        eq_fold(expected, actual)
    }
}

/// Returns true if `path` begins with the same ordered segments as `prefix`.
///
/// Both arguments must be absolute; callers check this before asking.
pub fn path_contains(prefix: &str, path: &str, case_sensitive: bool) -> bool {
    let mut candidate = segments(path);
    segments(prefix).all(|expected| {
        candidate
            .next()
            .is_some_and(|actual| segment_eq(expected, actual, case_sensitive))
    })
}

/// Returns the segments of `path` left over once `prefix` is removed, joined
/// with `/` and without a leading separator.
///
/// Only meaningful when [`path_contains`] holds for the same arguments. A
/// non-matching pair yields an empty string.
pub fn relative_path(prefix: &str, path: &str, case_sensitive: bool) -> String {
    let mut remaining = segments(path);
    for expected in segments(prefix) {
        match remaining.next() {
            Some(actual) if segment_eq(expected, actual, case_sensitive) => {}
            _ => return String::new(),
        }
    }
    remaining.collect::<Vec<_>>().join("/")
}

/// Normalizes a request path: resolves `.` and `..`, collapses repeated
/// separators, drops a trailing slash and anchors the result at the root.
///
/// `..` never climbs above `/`.
pub fn clean_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            s => stack.push(s),
        }
    }

    if stack.is_empty() {
        return "/".to_string();
    }

    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in stack {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    cleaned
}

/// Joins a base path and a relative remainder, then cleans the result:
/// one separator between segments, `.` and `..` resolved, no trailing slash.
pub fn join_paths(base: &str, rest: &str) -> String {
    clean_path(&format!("{base}/{rest}"))
}

/// Percent-decodes a request path. Invalid UTF-8 is replaced, never
/// passed through as raw bytes.
pub fn decode_path(path: &str) -> Cow<'_, str> {
    percent_decode_str(path).decode_utf8_lossy()
}

/// Percent-encodes a decoded path segment by segment, leaving `/` as the
/// separator.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}
