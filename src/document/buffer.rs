//! Line-addressed text storage
//!
//! Lines are split on `\n`; a trailing `\r` belongs to the line ending, not
//! the line text. A document always has `count('\n') + 1` lines, so a file
//! ending in a newline has an empty last line.

use std::ops::Range;

/// The text of one document with line-level access.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.text.bytes().filter(|&b| b == b'\n').count() + 1
    }

    /// Text of a line, without its line ending.
    pub fn line(&self, index: usize) -> Option<&str> {
        self.line_range(index).map(|range| &self.text[range])
    }

    /// Replace the text of a line, keeping its line ending.
    ///
    /// Returns `false` when the index is out of range.
    pub fn replace_line(&mut self, index: usize, text: &str) -> bool {
        match self.line_range(index) {
            Some(range) => {
                self.text.replace_range(range, text);
                true
            }
            None => false,
        }
    }

    /// Byte range of a line's content.
    fn line_range(&self, index: usize) -> Option<Range<usize>> {
        let mut start = 0;
        for _ in 0..index {
            start += self.text[start..].find('\n')? + 1;
        }
        let end = self.text[start..]
            .find('\n')
            .map_or(self.text.len(), |offset| start + offset);
        let end = if self.text[start..end].ends_with('\r') {
            end - 1
        } else {
            end
        };
        Some(start..end)
    }
}
