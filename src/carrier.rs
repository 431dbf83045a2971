//! The hidden carrier element
//!
//! Rendering injects one hidden `<div>` as the very first node of the
//! preview. It is the only way session configuration (endpoint port, session
//! token and a source-document hint) reaches the sandboxed preview.

/// `id` of the carrier element.
pub const CARRIER_ELEMENT_ID: &str = "mdCheckboxServerData";

/// Name of the preview metadata tag consulted when the carrier has no source.
pub const LEGACY_PREVIEW_META: &str = "vscode-markdown-preview-data";

/// Host the callback endpoint listens on and the preview sends to.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Session configuration carried into the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Carrier {
    pub port: u16,
    pub nonce: String,
    /// Source-document identifier; empty when rendering could not tell.
    pub source: String,
}

impl Carrier {
    pub fn new(port: u16, nonce: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            port,
            nonce: nonce.into(),
            source: source.into(),
        }
    }

    /// Rebuild carrier data from the element's `data-*` attributes.
    ///
    /// Returns `None` when the port or token is missing, empty or unusable,
    /// i.e. when no endpoint is available to this preview.
    pub fn from_attributes(
        port: Option<&str>,
        nonce: Option<&str>,
        source: Option<&str>,
    ) -> Option<Self> {
        let port = port.filter(|p| !p.is_empty())?.trim().parse::<u16>().ok()?;
        let nonce = nonce.filter(|n| !n.is_empty())?;
        Some(Self::new(port, nonce, source.unwrap_or_default()))
    }

    /// Markup for the carrier element.
    pub fn to_html(&self) -> String {
        format!(
            r#"<div id="{id}" style="display:none" data-port="{port}" data-nonce="{nonce}" data-source="{source}"></div>"#,
            id = CARRIER_ELEMENT_ID,
            port = self.port,
            nonce = html_escape(&self.nonce),
            source = html_escape(&self.source),
        )
    }
}

/// HTML-escape a string for text or attribute context.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
