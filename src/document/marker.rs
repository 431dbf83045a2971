//! Task-list checkbox markers: `[ ]`, `[x]` and `[X]`.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

static CHECKBOX_MARKER: OnceLock<Regex> = OnceLock::new();

fn marker_regex() -> &'static Regex {
    CHECKBOX_MARKER.get_or_init(|| Regex::new(r"\[[ xX]\]").expect("valid checkbox regex"))
}

/// Byte range of the first checkbox marker on a line.
pub fn find_marker(line: &str) -> Option<Range<usize>> {
    marker_regex().find(line).map(|m| m.range())
}

/// Rewrite the first checkbox marker on a line to the given state.
///
/// Only the marker's interior character changes; everything else on the
/// line is kept byte for byte. Returns `None` when the line has no marker.
pub fn set_marker_state(line: &str, checked: bool) -> Option<String> {
    let range = find_marker(line)?;
    let mut updated = String::with_capacity(line.len());
    updated.push_str(&line[..range.start]);
    updated.push('[');
    updated.push(if checked { 'x' } else { ' ' });
    updated.push(']');
    updated.push_str(&line[range.end..]);
    Some(updated)
}
