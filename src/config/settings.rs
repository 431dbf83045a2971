//! Settings for the checkbox endpoint and filesystem host
//!
//! This module defines the `Settings` struct that holds all user-configurable
//! options, with serde support for JSON persistence.

use crate::carrier::LOOPBACK_HOST;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
///
/// Unknown fields are ignored and missing fields fall back to defaults, so
/// config files written by older or newer versions still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Port for the callback endpoint; 0 lets the OS pick an ephemeral port.
    pub port: u16,

    /// File extensions (without the dot) treated as markdown documents.
    pub markdown_extensions: Vec<String>,

    /// Reload documents changed on disk by other programs.
    pub watch_files: bool,

    /// File name of the native toggle mirror inside the data directory.
    pub mirror_file: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 0,
            markdown_extensions: vec!["md".to_string(), "markdown".to_string()],
            watch_files: true,
            mirror_file: "preview-state.json".to_string(),
        }
    }
}

impl Settings {
    /// Address string for binding the callback endpoint.
    ///
    /// Always loopback: the preview addresses the endpoint as `127.0.0.1`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", LOOPBACK_HOST, self.port)
    }

    /// Whether a path's extension marks it as a markdown document.
    pub fn is_markdown_extension(&self, extension: &str) -> bool {
        self.markdown_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }

    /// Sanitize settings loaded from disk.
    pub fn sanitize(&mut self) {
        self.markdown_extensions = self
            .markdown_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        if self.markdown_extensions.is_empty() {
            self.markdown_extensions = Settings::default().markdown_extensions;
        }

        let is_path = self.mirror_file.contains(|c: char| c == '/' || c == '\\');
        if self.mirror_file.trim().is_empty() || is_path {
            self.mirror_file = Settings::default().mirror_file;
        }
    }

    /// Parse settings from JSON and sanitize them.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
