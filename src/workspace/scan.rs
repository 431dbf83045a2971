//! Finding markdown documents under a folder.

use crate::config::Settings;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory and file names never scanned or watched.
pub const DEFAULT_HIDDEN_PATTERNS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    "target",
    ".idea",
    ".vscode",
    "__pycache__",
    ".DS_Store",
    "Thumbs.db",
];

fn is_hidden(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    DEFAULT_HIDDEN_PATTERNS.iter().any(|pattern| name == *pattern)
}

/// Whether the settings treat this path as a markdown document.
pub fn is_markdown_path(path: &Path, settings: &Settings) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| settings.is_markdown_extension(ext))
}

/// All markdown files below `root`, sorted by path. Hidden directories are
/// skipped and symlinks are not followed.
pub fn scan_markdown_files(root: &Path, settings: &Settings) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|path| is_markdown_path(path, settings))
        .collect();
    files.sort();
    files
}
