//! Checkbox click handling inside the preview
//!
//! The DOM is reached through [`PreviewDocument`] / [`PreviewElement`] so the
//! same logic runs against the browser (see the `web` module) and against
//! test doubles.

use super::mirror::{KeyValueStorage, ToggleMirror};
use super::transport::{MarkRequest, MarkTransport};
use crate::carrier::Carrier;
use crate::error::BestEffortExt;
use log::debug;

/// An element of the rendered preview.
pub trait PreviewElement: Sized {
    /// Whether this is an `<input type="checkbox">`.
    fn is_checkbox_input(&self) -> bool;
    fn is_checked(&self) -> bool;
    fn set_checked(&self, checked: bool);
    /// The `data-line` attribute, if present.
    fn data_line(&self) -> Option<String>;
    fn parent_element(&self) -> Option<Self>;
    /// First checkbox input among this element's descendants.
    fn find_checkbox(&self) -> Option<Self>;
}

/// The rendered preview document.
pub trait PreviewDocument {
    type Element: PreviewElement;

    /// Attributes of the carrier element, if the preview has one.
    fn carrier(&self) -> Option<Carrier>;

    /// `content` of the legacy preview metadata tag, if present.
    fn legacy_preview_data(&self) -> Option<String>;

    /// Every element carrying a `data-line` attribute, in document order.
    fn line_annotated_elements(&self) -> Vec<Self::Element>;
}

/// Line and post-click state of a clicked checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckboxToggle {
    pub line: i64,
    pub checked: bool,
}

/// Find the line a clicked checkbox belongs to.
///
/// Returns `None` for anything that is not a checkbox, or a checkbox with no
/// line-annotated ancestor.
pub fn checkbox_toggle<E: PreviewElement>(target: &E) -> Option<CheckboxToggle> {
    if !target.is_checkbox_input() {
        return None;
    }
    let mut ancestor = target.parent_element();
    while let Some(element) = ancestor {
        if let Some(line) = element.data_line() {
            return Some(CheckboxToggle {
                line: parse_leading_integer(&line)?,
                checked: target.is_checked(),
            });
        }
        ancestor = element.parent_element();
    }
    None
}

/// Parse the integer at the start of a string, ignoring anything after it.
pub(crate) fn parse_leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Source-document identifier for a request.
///
/// The carrier's own source wins; then the legacy metadata tag's `source`
/// field; otherwise empty, which lets the endpoint infer the document.
pub fn resolve_source<D: PreviewDocument>(document: &D, carrier: &Carrier) -> String {
    if !carrier.source.is_empty() {
        return carrier.source.clone();
    }
    document
        .legacy_preview_data()
        .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
        .and_then(|data| data.get("source").and_then(|s| s.as_str()).map(str::to_string))
        .unwrap_or_default()
}

/// Reacts to clicks and restores mirrored states for one preview surface.
pub struct ClickHandler<T, S> {
    transport: T,
    mirror: ToggleMirror<S>,
}

impl<T: MarkTransport, S: KeyValueStorage> ClickHandler<T, S> {
    pub fn new(transport: T, mirror: ToggleMirror<S>) -> Self {
        Self { transport, mirror }
    }

    pub fn mirror(&self) -> &ToggleMirror<S> {
        &self.mirror
    }

    /// Handle a document-wide click on `target`.
    ///
    /// Sends the toggle, then mirrors it. Every "nothing to do" case is a
    /// silent no-op. Returns the request that was sent.
    pub fn handle_click<D: PreviewDocument>(
        &self,
        document: &D,
        target: &D::Element,
    ) -> Option<MarkRequest> {
        let toggle = checkbox_toggle(target)?;
        let carrier = document.carrier()?;
        let source = resolve_source(document, &carrier);

        let request = MarkRequest::new(&carrier, source, toggle.line, toggle.checked);
        debug!("Sending checkbox toggle for line {}", toggle.line);
        self.transport.send(&request);

        self.mirror
            .record(&toggle.line.to_string(), toggle.checked)
            .absorb("Checkbox mirror");

        Some(request)
    }

    /// Re-apply mirrored states to the rendered checkboxes.
    pub fn restore<D: PreviewDocument>(&self, document: &D) -> usize {
        restore_checkbox_states(document, &self.mirror)
    }
}

/// Re-apply mirrored states onto currently rendered checkboxes.
///
/// A checkbox is only written when its state differs from the mirror.
/// Returns how many checkboxes changed.
pub fn restore_checkbox_states<D: PreviewDocument, S: KeyValueStorage>(
    document: &D,
    mirror: &ToggleMirror<S>,
) -> usize {
    let Some(states) = mirror.load().absorb("Checkbox mirror") else {
        return 0;
    };
    if states.is_empty() {
        return 0;
    }

    let mut changed = 0;
    for element in document.line_annotated_elements() {
        let Some(&checked) = element.data_line().and_then(|line| states.get(&line)) else {
            continue;
        };
        if let Some(checkbox) = element.find_checkbox() {
            if checkbox.is_checked() != checked {
                checkbox.set_checked(checked);
                changed += 1;
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::mirror::MemoryStorage;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    // ─────────────────────────────────────────────────────────────────────────
    // Fake DOM
    // ─────────────────────────────────────────────────────────────────────────

    struct Node {
        parent: Option<usize>,
        checkbox: bool,
        checked: Cell<bool>,
        line: Option<String>,
        writes: Cell<usize>,
    }

    #[derive(Default)]
    struct Tree {
        nodes: Vec<Node>,
    }

    #[derive(Clone)]
    struct El {
        tree: Rc<RefCell<Tree>>,
        index: usize,
    }

    impl PreviewElement for El {
        fn is_checkbox_input(&self) -> bool {
            self.tree.borrow().nodes[self.index].checkbox
        }

        fn is_checked(&self) -> bool {
            self.tree.borrow().nodes[self.index].checked.get()
        }

        fn set_checked(&self, checked: bool) {
            let tree = self.tree.borrow();
            let node = &tree.nodes[self.index];
            node.checked.set(checked);
            node.writes.set(node.writes.get() + 1);
        }

        fn data_line(&self) -> Option<String> {
            self.tree.borrow().nodes[self.index].line.clone()
        }

        fn parent_element(&self) -> Option<Self> {
            let parent = self.tree.borrow().nodes[self.index].parent?;
            Some(El {
                tree: self.tree.clone(),
                index: parent,
            })
        }

        fn find_checkbox(&self) -> Option<Self> {
            let tree = self.tree.borrow();
            (0..tree.nodes.len())
                .filter(|&i| tree.nodes[i].checkbox)
                .find(|&i| {
                    let mut current = tree.nodes[i].parent;
                    while let Some(p) = current {
                        if p == self.index {
                            return true;
                        }
                        current = tree.nodes[p].parent;
                    }
                    false
                })
                .map(|index| El {
                    tree: self.tree.clone(),
                    index,
                })
        }
    }

    struct Doc {
        tree: Rc<RefCell<Tree>>,
        carrier: Option<Carrier>,
        meta: Option<String>,
    }

    impl Doc {
        fn new(carrier: Option<Carrier>) -> Self {
            Self {
                tree: Rc::new(RefCell::new(Tree::default())),
                carrier,
                meta: None,
            }
        }

        fn add(&self, parent: Option<&El>, checkbox: bool, line: Option<&str>) -> El {
            let mut tree = self.tree.borrow_mut();
            tree.nodes.push(Node {
                parent: parent.map(|p| p.index),
                checkbox,
                checked: Cell::new(false),
                line: line.map(str::to_string),
                writes: Cell::new(0),
            });
            El {
                tree: self.tree.clone(),
                index: tree.nodes.len() - 1,
            }
        }

        /// `<ul><li data-line=N><input type=checkbox></li></ul>`
        fn task_item(&self, line: &str) -> El {
            let list = self.add(None, false, None);
            let item = self.add(Some(&list), false, Some(line));
            self.add(Some(&item), true, None)
        }

        fn writes(&self, element: &El) -> usize {
            self.tree.borrow().nodes[element.index].writes.get()
        }
    }

    impl PreviewDocument for Doc {
        type Element = El;

        fn carrier(&self) -> Option<Carrier> {
            self.carrier.clone()
        }

        fn legacy_preview_data(&self) -> Option<String> {
            self.meta.clone()
        }

        fn line_annotated_elements(&self) -> Vec<El> {
            let tree = self.tree.borrow();
            (0..tree.nodes.len())
                .filter(|&i| tree.nodes[i].line.is_some())
                .map(|index| El {
                    tree: self.tree.clone(),
                    index,
                })
                .collect()
        }
    }

    #[derive(Default, Clone)]
    struct Recorder {
        sent: Rc<RefCell<Vec<MarkRequest>>>,
    }

    impl MarkTransport for Recorder {
        fn send(&self, request: &MarkRequest) {
            self.sent.borrow_mut().push(request.clone());
        }
    }

    fn handler() -> (ClickHandler<Recorder, MemoryStorage>, Recorder) {
        let recorder = Recorder::default();
        let handler = ClickHandler::new(recorder.clone(), ToggleMirror::new(MemoryStorage::new()));
        (handler, recorder)
    }

    fn carrier(source: &str) -> Option<Carrier> {
        Some(Carrier::new(4312, "tok", source))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Click handling
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_click_sends_post_click_state_and_mirrors_it() {
        let doc = Doc::new(carrier("file:///todo.md"));
        let checkbox = doc.task_item("3");
        checkbox.set_checked(true);
        let (handler, recorder) = handler();

        let request = handler.handle_click(&doc, &checkbox).unwrap();

        assert_eq!(request.line, 3);
        assert!(request.checked);
        assert_eq!(request.source, "file:///todo.md");
        assert_eq!(request.nonce, "tok");
        assert_eq!(recorder.sent.borrow().len(), 1);
        assert_eq!(handler.mirror().states().get("3"), Some(&true));
    }

    #[test]
    fn test_nearest_annotated_ancestor_wins() {
        let doc = Doc::new(carrier(""));
        let outer = doc.add(None, false, Some("1"));
        let inner = doc.add(Some(&outer), false, Some("4"));
        let label = doc.add(Some(&inner), false, None);
        let checkbox = doc.add(Some(&label), true, None);
        let (handler, _) = handler();

        assert_eq!(handler.handle_click(&doc, &checkbox).unwrap().line, 4);
    }

    #[test]
    fn test_non_checkbox_click_ignored() {
        let doc = Doc::new(carrier(""));
        let item = doc.add(None, false, Some("2"));
        let (handler, recorder) = handler();

        assert!(handler.handle_click(&doc, &item).is_none());
        assert!(recorder.sent.borrow().is_empty());
        assert!(handler.mirror().states().is_empty());
    }

    #[test]
    fn test_checkbox_without_line_ignored() {
        let doc = Doc::new(carrier(""));
        let wrapper = doc.add(None, false, None);
        let checkbox = doc.add(Some(&wrapper), true, None);
        let (handler, recorder) = handler();

        assert!(handler.handle_click(&doc, &checkbox).is_none());
        assert!(recorder.sent.borrow().is_empty());
    }

    #[test]
    fn test_missing_carrier_ignored() {
        let doc = Doc::new(None);
        let checkbox = doc.task_item("1");
        let (handler, recorder) = handler();

        assert!(handler.handle_click(&doc, &checkbox).is_none());
        assert!(recorder.sent.borrow().is_empty());
        assert!(handler.mirror().states().is_empty());
    }

    #[test]
    fn test_source_falls_back_to_legacy_metadata() {
        let mut doc = Doc::new(carrier(""));
        doc.meta = Some(r#"{"source": "file:///legacy.md", "line": 0}"#.to_string());
        let checkbox = doc.task_item("1");
        let (handler, _) = handler();

        let request = handler.handle_click(&doc, &checkbox).unwrap();
        assert_eq!(request.source, "file:///legacy.md");
    }

    #[test]
    fn test_source_empty_when_nothing_known() {
        let mut doc = Doc::new(carrier(""));
        doc.meta = Some("{broken".to_string());
        let checkbox = doc.task_item("1");
        let (handler, _) = handler();

        assert_eq!(handler.handle_click(&doc, &checkbox).unwrap().source, "");
    }

    #[test]
    fn test_parse_leading_integer() {
        assert_eq!(parse_leading_integer("12"), Some(12));
        assert_eq!(parse_leading_integer(" 7abc"), Some(7));
        assert_eq!(parse_leading_integer("-3"), Some(-3));
        assert_eq!(parse_leading_integer("+5"), Some(5));
        assert_eq!(parse_leading_integer("abc"), None);
        assert_eq!(parse_leading_integer(""), None);
        assert_eq!(parse_leading_integer("-"), None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Restoration
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_restore_applies_mirrored_states() {
        let doc = Doc::new(carrier(""));
        let first = doc.task_item("1");
        let second = doc.task_item("2");
        let (handler, _) = handler();
        handler.mirror().record("1", true).unwrap();
        handler.mirror().record("2", false).unwrap();

        assert_eq!(handler.restore(&doc), 1);
        assert!(first.is_checked());
        assert!(!second.is_checked());
        assert_eq!(doc.writes(&second), 0);
    }

    #[test]
    fn test_restore_only_writes_differing_states() {
        let doc = Doc::new(carrier(""));
        let checkbox = doc.task_item("5");
        checkbox.set_checked(true);
        let before = doc.writes(&checkbox);
        let (handler, _) = handler();
        handler.mirror().record("5", true).unwrap();

        assert_eq!(handler.restore(&doc), 0);
        assert_eq!(doc.writes(&checkbox), before);
    }

    #[test]
    fn test_restore_ignores_unmirrored_lines() {
        let doc = Doc::new(carrier(""));
        let checkbox = doc.task_item("9");
        let (handler, _) = handler();
        handler.mirror().record("1", true).unwrap();

        assert_eq!(handler.restore(&doc), 0);
        assert!(!checkbox.is_checked());
    }

    #[test]
    fn test_click_then_rebuild_restores_state() {
        let (handler, _) = handler();

        let doc = Doc::new(carrier(""));
        let checkbox = doc.task_item("2");
        checkbox.set_checked(true);
        handler.handle_click(&doc, &checkbox);

        // Preview rebuilt from a document that has not caught up yet
        let rebuilt = Doc::new(carrier(""));
        let stale = rebuilt.task_item("2");
        assert!(!stale.is_checked());

        assert_eq!(handler.restore(&rebuilt), 1);
        assert!(stale.is_checked());
    }
}
