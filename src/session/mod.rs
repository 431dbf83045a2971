//! Editor-session state shared between the host's focus events and the
//! callback endpoint.

mod token;

pub use token::SessionToken;

use crate::document::{DocumentId, DocumentRef};
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Session context owned by whoever starts the endpoint.
///
/// The only mutable piece is the pointer to the most recently focused
/// markdown document. It is written by [`EditorSession::track_focus`] (the
/// focus-change subscription) and read by document resolution.
#[derive(Debug, Default)]
pub struct EditorSession {
    last_markdown_document: Mutex<Option<DocumentId>>,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus-change callback. Ignores documents that are not markdown.
    pub fn track_focus(&self, document: &DocumentRef) {
        if !document.is_markdown() {
            return;
        }
        debug!("Tracking last active markdown document {}", document.id);
        *self.pointer() = Some(document.id.clone());
    }

    /// The most recently focused markdown document, if any was seen.
    pub fn last_markdown_document(&self) -> Option<DocumentId> {
        self.pointer().clone()
    }

    fn pointer(&self) -> MutexGuard<'_, Option<DocumentId>> {
        self.last_markdown_document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
