//! Preview rendering glue
//!
//! Renders markdown with comrak, tags every list item with the 1-based
//! source line it starts on, and prepends the hidden carrier element that
//! tells the preview where the callback endpoint is.
//!
//! Rendering is stateless: the same markdown, env and endpoint always
//! produce byte-identical output.
//!
//! # Example
//! ```ignore
//! let env = RenderEnv::new().with("resourceUri", "file:///notes/todo.md");
//! let endpoint = PreviewEndpoint::new(4312, "2f1c…");
//! let html = render_preview_fragment("- [ ] buy milk", &env, &endpoint);
//! ```

mod annotate;
mod env;
mod page;

pub use annotate::{annotate_list_items, SourceSpan};
pub use env::RenderEnv;
pub use page::preview_page;

use crate::carrier::Carrier;
use comrak::{markdown_to_html, Options};

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Markdown features enabled for previews.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Enable GitHub Flavored Markdown tables
    pub tables: bool,
    /// Enable strikethrough syntax (~~text~~)
    pub strikethrough: bool,
    /// Enable autolink URLs and emails
    pub autolink: bool,
    /// Enable footnotes
    pub footnotes: bool,
    /// Pass raw HTML through instead of omitting it
    pub allow_raw_html: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            autolink: true,
            footnotes: true,
            allow_raw_html: true,
        }
    }
}

impl RenderOptions {
    /// Convert to comrak Options. Task lists and source positions are always on.
    fn to_comrak_options(&self) -> Options {
        let mut options = Options::default();

        options.extension.tasklist = true;
        options.extension.strikethrough = self.strikethrough;
        options.extension.table = self.tables;
        options.extension.autolink = self.autolink;
        options.extension.footnotes = self.footnotes;

        options.render.sourcepos = true;
        options.render.unsafe_ = self.allow_raw_html;

        options
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Where the preview should send checkbox toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewEndpoint {
    pub port: u16,
    pub nonce: String,
}

impl PreviewEndpoint {
    pub fn new(port: u16, nonce: impl Into<String>) -> Self {
        Self {
            port,
            nonce: nonce.into(),
        }
    }
}

/// Render markdown body HTML with `data-line` on every list item.
pub fn render_annotated(markdown: &str, options: &RenderOptions) -> String {
    annotate_list_items(&markdown_to_html(markdown, &options.to_comrak_options()))
}

/// Render a preview fragment: carrier element first, then the annotated body.
pub fn render_preview_fragment(
    markdown: &str,
    env: &RenderEnv,
    endpoint: &PreviewEndpoint,
) -> String {
    render_preview_fragment_with_options(markdown, env, endpoint, &RenderOptions::default())
}

/// Like [`render_preview_fragment`], with explicit markdown options.
pub fn render_preview_fragment_with_options(
    markdown: &str,
    env: &RenderEnv,
    endpoint: &PreviewEndpoint,
    options: &RenderOptions,
) -> String {
    let carrier = Carrier::new(endpoint.port, endpoint.nonce.clone(), env.source_identifier());
    let mut html = carrier.to_html();
    html.push('\n');
    html.push_str(&render_annotated(markdown, options));
    html
}

/// Render a complete standalone preview page.
pub fn render_preview_document(
    markdown: &str,
    title: Option<&str>,
    env: &RenderEnv,
    endpoint: &PreviewEndpoint,
    script_src: Option<&str>,
) -> String {
    preview_page(
        &render_preview_fragment(markdown, env, endpoint),
        title,
        script_src,
    )
}
