//! In-memory document host for unit tests.

use super::{DocumentHost, DocumentId, DocumentRef, TextBuffer, MARKDOWN_LANGUAGE_ID};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    documents: BTreeMap<DocumentId, (String, TextBuffer)>,
    open_order: Vec<DocumentId>,
    visible: Vec<DocumentId>,
    active: Option<DocumentId>,
    saves: Vec<DocumentId>,
    reject_edits: bool,
}

#[derive(Default)]
pub(crate) struct MemoryHost {
    state: Mutex<State>,
}

impl MemoryHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add an open markdown document and return its id.
    pub(crate) fn add(&self, uri: &str, text: &str) -> DocumentId {
        self.add_with_language(uri, text, MARKDOWN_LANGUAGE_ID)
    }

    pub(crate) fn add_with_language(&self, uri: &str, text: &str, language: &str) -> DocumentId {
        let id = DocumentId::new(uri);
        let mut state = self.state.lock().unwrap();
        state
            .documents
            .insert(id.clone(), (language.to_string(), TextBuffer::new(text)));
        state.open_order.push(id.clone());
        id
    }

    pub(crate) fn set_active(&self, id: Option<&DocumentId>) {
        self.state.lock().unwrap().active = id.cloned();
    }

    pub(crate) fn set_visible(&self, ids: &[&DocumentId]) {
        self.state.lock().unwrap().visible = ids.iter().map(|id| (*id).clone()).collect();
    }

    pub(crate) fn reject_edits(&self) {
        self.state.lock().unwrap().reject_edits = true;
    }

    pub(crate) fn text(&self, id: &DocumentId) -> String {
        self.state.lock().unwrap().documents[id].1.text().to_string()
    }

    pub(crate) fn saves(&self) -> Vec<DocumentId> {
        self.state.lock().unwrap().saves.clone()
    }

    fn reference(state: &State, id: &DocumentId) -> Option<DocumentRef> {
        state
            .documents
            .get(id)
            .map(|(language, _)| DocumentRef::new(id.clone(), language.clone()))
    }
}

impl DocumentHost for MemoryHost {
    fn active_document(&self) -> Option<DocumentRef> {
        let state = self.state.lock().unwrap();
        state
            .active
            .as_ref()
            .and_then(|id| Self::reference(&state, id))
    }

    fn visible_documents(&self) -> Vec<DocumentRef> {
        let state = self.state.lock().unwrap();
        state
            .visible
            .iter()
            .filter_map(|id| Self::reference(&state, id))
            .collect()
    }

    fn open_documents(&self) -> Vec<DocumentRef> {
        let state = self.state.lock().unwrap();
        state
            .open_order
            .iter()
            .filter_map(|id| Self::reference(&state, id))
            .collect()
    }

    fn open_document(&self, id: &DocumentId) -> Result<()> {
        if self.state.lock().unwrap().documents.contains_key(id) {
            Ok(())
        } else {
            Err(Error::DocumentNotFound(id.to_string()))
        }
    }

    fn line_count(&self, id: &DocumentId) -> Result<usize> {
        let state = self.state.lock().unwrap();
        state
            .documents
            .get(id)
            .map(|(_, buffer)| buffer.line_count())
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    fn line_at(&self, id: &DocumentId, index: usize) -> Result<String> {
        let state = self.state.lock().unwrap();
        let (_, buffer) = state
            .documents
            .get(id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;
        buffer
            .line(index)
            .map(str::to_string)
            .ok_or(Error::LineOutOfRange {
                line: index,
                line_count: buffer.line_count(),
            })
    }

    fn replace_line(&self, id: &DocumentId, index: usize, text: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        if state.reject_edits {
            return Ok(false);
        }
        let (_, buffer) = state
            .documents
            .get_mut(id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;
        Ok(buffer.replace_line(index, text))
    }

    fn save(&self, id: &DocumentId) -> Result<()> {
        self.state.lock().unwrap().saves.push(id.clone());
        Ok(())
    }
}
