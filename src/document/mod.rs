//! Host document-editing contract
//!
//! The callback endpoint never touches files itself. It locates, opens,
//! reads, edits and saves documents through a [`DocumentHost`], which is
//! assumed to make a single `replace_line` atomic and to index lines from 0.

mod buffer;
pub mod marker;
#[cfg(test)]
pub(crate) mod testing;

pub use buffer::TextBuffer;

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Language id of the documents this crate edits.
pub const MARKDOWN_LANGUAGE_ID: &str = "markdown";

// ─────────────────────────────────────────────────────────────────────────────
// Document Identity
// ─────────────────────────────────────────────────────────────────────────────

/// URI identifying a document, e.g. `file:///home/me/todo.md`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap a URI string as-is.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Build a `file://` identifier for a path, resolving relative paths
    /// against the current directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        Url::from_file_path(&absolute)
            .map(|url| Self(url.to_string()))
            .map_err(|()| Error::InvalidDocumentId(absolute.display().to_string()))
    }

    /// Parse an identifier supplied by a request.
    ///
    /// Absolute URIs are kept; bare absolute paths are turned into `file://`
    /// URIs.
    pub fn parse(source: &str) -> Result<Self> {
        match Url::parse(source) {
            Ok(url) => Ok(Self(url.to_string())),
            Err(_) if Path::new(source).is_absolute() => Self::from_path(Path::new(source)),
            Err(_) => Err(Error::InvalidDocumentId(source.to_string())),
        }
    }

    /// Local filesystem path, for `file://` identifiers.
    pub fn to_path(&self) -> Option<PathBuf> {
        Url::parse(&self.0).ok()?.to_file_path().ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as seen by the host's editor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub language_id: String,
}

impl DocumentRef {
    pub fn new(id: DocumentId, language_id: impl Into<String>) -> Self {
        Self {
            id,
            language_id: language_id.into(),
        }
    }

    pub fn markdown(id: DocumentId) -> Self {
        Self::new(id, MARKDOWN_LANGUAGE_ID)
    }

    /// Whether this is the kind of document checkbox toggles apply to.
    pub fn is_markdown(&self) -> bool {
        self.language_id == MARKDOWN_LANGUAGE_ID
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host Contract
// ─────────────────────────────────────────────────────────────────────────────

/// Editor state and document operations provided by the host process.
pub trait DocumentHost: Send + Sync {
    /// The document in the focused editor, if any.
    fn active_document(&self) -> Option<DocumentRef>;

    /// Documents shown in visible editors, in display order.
    fn visible_documents(&self) -> Vec<DocumentRef>;

    /// All documents the host currently has open.
    fn open_documents(&self) -> Vec<DocumentRef>;

    /// Open (load) a document by identifier.
    fn open_document(&self, id: &DocumentId) -> Result<()>;

    /// Number of lines in an open document.
    fn line_count(&self, id: &DocumentId) -> Result<usize>;

    /// Text of the line at a 0-based index, without its line ending.
    fn line_at(&self, id: &DocumentId, index: usize) -> Result<String>;

    /// Replace the full text of one line as a single atomic edit.
    ///
    /// Returns `false` if the host declined the edit.
    fn replace_line(&self, id: &DocumentId, index: usize, text: &str) -> Result<bool>;

    /// Persist the document.
    fn save(&self, id: &DocumentId) -> Result<()>;
}
