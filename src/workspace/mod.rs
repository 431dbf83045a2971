//! Filesystem-backed document host
//!
//! A [`Workspace`] stands in for an editor when the crate runs on its own:
//! it keeps the set of open documents, which ones are visible and which one
//! has focus, and edits files on disk through [`DocumentHost`].
//!
//! Buffers are read lazily and dropped again when the file changes on disk
//! (see [`WorkspaceWatcher`]), so an edit always starts from current
//! contents.

mod scan;
mod watcher;

pub use scan::{is_markdown_path, scan_markdown_files, DEFAULT_HIDDEN_PATTERNS};
pub use watcher::{filter_events, WorkspaceEvent, WorkspaceWatcher};

use crate::config::Settings;
use crate::document::{DocumentHost, DocumentId, DocumentRef, TextBuffer, MARKDOWN_LANGUAGE_ID};
use crate::error::{Error, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// Language id for documents that are not markdown.
pub const PLAIN_TEXT_LANGUAGE_ID: &str = "plaintext";

/// Callback for focus changes.
pub type FocusListener = Arc<dyn Fn(&DocumentRef) + Send + Sync>;

/// Size and modification time of a file, taken when its buffer is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DiskStamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl DiskStamp {
    fn of(path: &Path) -> Option<Self> {
        fs::metadata(path).ok().map(|meta| Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

struct OpenDocument {
    path: PathBuf,
    language_id: String,
    /// `None` until first read, or after the file changed on disk.
    buffer: Option<TextBuffer>,
    /// Disk state the buffer was read from.
    stamp: Option<DiskStamp>,
    /// Edited since the last read or save.
    dirty: bool,
}

impl OpenDocument {
    fn new(path: PathBuf, language_id: String) -> Self {
        Self {
            path,
            language_id,
            buffer: None,
            stamp: None,
            dirty: false,
        }
    }

    fn reference(&self, id: &DocumentId) -> DocumentRef {
        DocumentRef::new(id.clone(), self.language_id.clone())
    }

    /// The buffer, re-read first if the file changed since it was loaded.
    /// Unsaved edits are kept.
    fn loaded(&mut self) -> Result<&mut TextBuffer> {
        if !self.dirty && self.buffer.is_some() && DiskStamp::of(&self.path) != self.stamp {
            debug!("{} changed on disk", self.path.display());
            self.buffer = None;
        }
        let buffer = match self.buffer.take() {
            Some(buffer) => buffer,
            None => self.read()?,
        };
        Ok(self.buffer.insert(buffer))
    }

    /// Drop the buffer and any unsaved edits, and read the file again.
    fn reload(&mut self) -> Result<&mut TextBuffer> {
        self.buffer = None;
        self.dirty = false;
        self.loaded()
    }

    fn read(&mut self) -> Result<TextBuffer> {
        let stamp = DiskStamp::of(&self.path);
        let text = fs::read_to_string(&self.path).map_err(|source| Error::FileRead {
            path: self.path.clone(),
            source,
        })?;
        self.stamp = stamp;
        debug!("Loaded {}", self.path.display());
        Ok(TextBuffer::new(text))
    }

    fn forget(&mut self) -> bool {
        self.stamp = None;
        self.dirty = false;
        self.buffer.take().is_some()
    }
}

#[derive(Default)]
struct WorkspaceState {
    /// Open documents in the order they were opened.
    order: Vec<DocumentId>,
    documents: HashMap<DocumentId, OpenDocument>,
    visible: Vec<DocumentId>,
    active: Option<DocumentId>,
    /// Identifiers that name an open document by another path (symlinks,
    /// relative segments), mapped to the canonical identifier.
    aliases: HashMap<DocumentId, DocumentId>,
}

impl WorkspaceState {
    fn canonical(&self, id: &DocumentId) -> DocumentId {
        self.aliases.get(id).unwrap_or(id).clone()
    }

    fn document(&mut self, id: &DocumentId) -> Result<&mut OpenDocument> {
        let key = self.aliases.get(id).unwrap_or(id);
        self.documents
            .get_mut(key)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))
    }

    fn knows(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id) || self.aliases.contains_key(id)
    }

    fn references(&self, ids: &[DocumentId]) -> Vec<DocumentRef> {
        ids.iter()
            .filter_map(|id| self.documents.get(id).map(|doc| doc.reference(id)))
            .collect()
    }
}

/// Open documents and editor focus, backed by files.
pub struct Workspace {
    settings: Settings,
    state: Mutex<WorkspaceState>,
    listeners: Mutex<Vec<FocusListener>>,
}

impl Workspace {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            state: Mutex::new(WorkspaceState::default()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn state(&self) -> MutexGuard<'_, WorkspaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn language_for(&self, path: &Path) -> &'static str {
        if is_markdown_path(path, &self.settings) {
            MARKDOWN_LANGUAGE_ID
        } else {
            PLAIN_TEXT_LANGUAGE_ID
        }
    }

    /// Open a file, returning its identifier. Opening twice is a no-op.
    pub fn open_path(&self, path: &Path) -> Result<DocumentId> {
        let path = fs::canonicalize(path).map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let id = DocumentId::from_path(&path)?;

        let mut state = self.state();
        if !state.documents.contains_key(&id) {
            let document = OpenDocument::new(path.clone(), self.language_for(&path).to_string());
            state.documents.insert(id.clone(), document);
            state.order.push(id.clone());
            debug!("Opened {}", id);
        }
        Ok(id)
    }

    /// Open every markdown file below a folder.
    pub fn open_folder(&self, root: &Path) -> Result<Vec<DocumentId>> {
        let files = scan_markdown_files(root, &self.settings);
        info!("Found {} markdown files in {}", files.len(), root.display());
        files.iter().map(|path| self.open_path(path)).collect()
    }

    /// Give a document focus, showing it if it was hidden.
    pub fn focus(&self, id: &DocumentId) -> Result<()> {
        let reference = {
            let mut state = self.state();
            let id = state.canonical(id);
            let reference = state.document(&id)?.reference(&id);
            if !state.visible.contains(&id) {
                state.visible.push(id.clone());
            }
            state.active = Some(id);
            reference
        };

        let listeners: Vec<FocusListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            listener(&reference);
        }
        Ok(())
    }

    /// Remove focus from every document.
    pub fn blur(&self) {
        self.state().active = None;
    }

    /// Replace the set of visible documents. Unknown ids are ignored.
    pub fn set_visible(&self, ids: &[DocumentId]) {
        let mut state = self.state();
        let visible: Vec<DocumentId> = ids
            .iter()
            .map(|id| state.canonical(id))
            .filter(|id| state.documents.contains_key(id))
            .collect();
        let hidden_active = state
            .active
            .as_ref()
            .map_or(false, |active| !visible.contains(active));
        if hidden_active {
            state.active = None;
        }
        state.visible = visible;
    }

    /// Close a document, dropping it from view and focus.
    pub fn close(&self, id: &DocumentId) {
        let mut state = self.state();
        let id = state.canonical(id);
        state.documents.remove(&id);
        state.aliases.retain(|_, canonical| *canonical != id);
        state.order.retain(|open| *open != id);
        state.visible.retain(|open| *open != id);
        if state.active.as_ref() == Some(&id) {
            state.active = None;
        }
    }

    /// Subscribe to focus changes.
    pub fn on_did_change_active(&self, listener: impl Fn(&DocumentRef) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Forget the cached contents of a file so the next access re-reads it.
    pub fn invalidate(&self, path: &Path) {
        let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let mut state = self.state();
        for document in state.documents.values_mut() {
            if document.path == path && document.forget() {
                debug!("Dropped cached contents of {}", path.display());
            }
        }
    }

    /// Apply watcher events to cached buffers.
    pub fn apply_events(&self, events: &[WorkspaceEvent]) {
        for event in events {
            match event {
                WorkspaceEvent::Error(message) => warn!("File watcher: {}", message),
                _ => {
                    if let Some(path) = event.path() {
                        self.invalidate(path);
                    }
                }
            }
        }
    }

    /// Current contents of an open document.
    pub fn text(&self, id: &DocumentId) -> Result<String> {
        let mut state = self.state();
        Ok(state.document(id)?.loaded()?.text().to_string())
    }
}

impl DocumentHost for Workspace {
    fn active_document(&self) -> Option<DocumentRef> {
        let state = self.state();
        let id = state.active.as_ref()?;
        state.documents.get(id).map(|doc| doc.reference(id))
    }

    fn visible_documents(&self) -> Vec<DocumentRef> {
        let state = self.state();
        state.references(&state.visible)
    }

    fn open_documents(&self) -> Vec<DocumentRef> {
        let state = self.state();
        state.references(&state.order)
    }

    /// Opens the document if needed and always re-reads it from disk, so an
    /// edit starts from what the file holds now.
    fn open_document(&self, id: &DocumentId) -> Result<()> {
        let known = self.state().knows(id);
        if !known {
            let path = id
                .to_path()
                .ok_or_else(|| Error::InvalidDocumentId(id.to_string()))?;
            let canonical = self.open_path(&path)?;
            if canonical != *id {
                debug!("{} refers to {}", id, canonical);
                self.state().aliases.insert(id.clone(), canonical);
            }
        }
        self.state().document(id)?.reload().map(|_| ())
    }

    fn line_count(&self, id: &DocumentId) -> Result<usize> {
        let mut state = self.state();
        Ok(state.document(id)?.loaded()?.line_count())
    }

    fn line_at(&self, id: &DocumentId, index: usize) -> Result<String> {
        let mut state = self.state();
        let buffer = state.document(id)?.loaded()?;
        buffer
            .line(index)
            .map(str::to_string)
            .ok_or(Error::LineOutOfRange {
                line: index,
                line_count: buffer.line_count(),
            })
    }

    fn replace_line(&self, id: &DocumentId, index: usize, text: &str) -> Result<bool> {
        let mut state = self.state();
        let document = state.document(id)?;
        let replaced = document.loaded()?.replace_line(index, text);
        if replaced {
            document.dirty = true;
        }
        Ok(replaced)
    }

    fn save(&self, id: &DocumentId) -> Result<()> {
        let mut state = self.state();
        let document = state.document(id)?;
        let text = document.loaded()?.text().to_string();
        write_atomically(&document.path, &text)?;
        document.dirty = false;
        document.stamp = DiskStamp::of(&document.path);
        Ok(())
    }
}

/// Write through a sibling temp file and rename it over the target.
fn write_atomically(path: &Path, text: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.md-checkboxes.tmp", file_name));

    fs::write(&temp_path, text).map_err(|source| Error::FileWrite {
        path: temp_path.clone(),
        source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        Error::FileWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    debug!("Saved {}", path.display());
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
