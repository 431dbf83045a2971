//! List-item line annotation on top of comrak's HTML output.
//!
//! comrak is asked for source positions, which it emits as
//! `data-sourcepos="l:c-l:c"` on block elements. List items get a
//! `data-line` attribute derived from their start line; every other
//! position attribute is stripped so the rest of the markup is exactly what
//! the default renderer produces. Task-list checkboxes are enabled so the
//! preview can click them.

use regex::{Captures, Regex};
use std::sync::OnceLock;

static LIST_ITEM_POSITION: OnceLock<Regex> = OnceLock::new();
static POSITION_ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
static DISABLED_CHECKBOX: OnceLock<Regex> = OnceLock::new();

fn list_item_position() -> &'static Regex {
    LIST_ITEM_POSITION.get_or_init(|| {
        Regex::new(r#"<li([^>]*?) data-sourcepos="(\d+):\d+-(\d+):\d+""#)
            .expect("valid list item regex")
    })
}

fn position_attribute() -> &'static Regex {
    POSITION_ATTRIBUTE
        .get_or_init(|| Regex::new(r#" data-sourcepos="[^"]*""#).expect("valid sourcepos regex"))
}

fn disabled_checkbox() -> &'static Regex {
    DISABLED_CHECKBOX.get_or_init(|| {
        Regex::new(r#"(<input type="checkbox"[^>]*?) disabled="""#).expect("valid checkbox regex")
    })
}

/// Source lines covered by a list item, 0-based like host line indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    /// Convert comrak's 1-based line positions.
    pub fn from_sourcepos(start_line: usize, end_line: usize) -> Self {
        Self {
            start: start_line.saturating_sub(1),
            end: end_line.saturating_sub(1),
        }
    }

    /// The 1-based line the editor displays for the span's first line.
    pub fn display_line(&self) -> usize {
        self.start + 1
    }
}

/// Rewrite comrak HTML rendered with source positions into preview markup.
pub fn annotate_list_items(html: &str) -> String {
    let annotated = list_item_position().replace_all(html, |caps: &Captures| {
        let start = caps[2].parse().unwrap_or(1);
        let end = caps[3].parse().unwrap_or(start);
        let span = SourceSpan::from_sourcepos(start, end);
        format!(r#"<li{} data-line="{}""#, &caps[1], span.display_line())
    });
    let stripped = position_attribute().replace_all(&annotated, "");
    disabled_checkbox().replace_all(&stripped, "$1").into_owned()
}
