//! Attribute path encoding.
//!
//! An attribute path is the dot-joined list of segments leading from the
//! record root to a value. Mapping keys are escaped so that `.` and `\`
//! inside a key never split it; sequence positions are plain decimal
//! segments.

use std::cmp::Ordering;

/// Separator between path segments.
pub const SEPARATOR: char = '.';

const ESCAPE: char = '\\';

/// Escapes a mapping key for use as a single path segment.
pub fn escape_segment(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Appends an already escaped segment to a path.
///
/// The separator is always written, so the child of the empty-key path `""`
/// is `".a"`, never `"a"`. Root-level paths are just the escaped key.
pub fn join(parent: &str, segment: &str) -> String {
    let mut path = String::with_capacity(parent.len() + segment.len() + 1);
    path.push_str(parent);
    path.push(SEPARATOR);
    path.push_str(segment);
    path
}

/// Builds a path from unescaped segments.
pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| escape_segment(s.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}

/// Splits a path into unescaped segments.
///
/// A path always has at least one segment; the empty path is the single
/// empty segment.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => match chars.next() {
                Some(next) => current.push(next),
                // A dangling escape keeps its backslash.
                None => current.push(ESCAPE),
            },
            SEPARATOR => segments.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    segments.push(current);
    segments
}

/// Parses a segment as a sequence index.
///
/// Only canonical decimal forms are accepted: `"0"`, `"7"`, `"12"`, never
/// `"07"` or `"+1"`.
pub fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if segment.len() > 1 && segment.starts_with('0') {
        return None;
    }
    segment.parse().ok()
}

/// Compares two unescaped segments, numerically when both are numeric.
pub fn compare_segments(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if numeric(a) && numeric(b) {
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}

/// Segment-aware path ordering.
///
/// Parents sort before their children and `items.2` sorts before
/// `items.10`.
pub fn compare_paths(a: &str, b: &str) -> Ordering {
    let a = split_path(a);
    let b = split_path(b);
    for (x, y) in a.iter().zip(b.iter()) {
        match compare_segments(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}
