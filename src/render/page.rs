//! Standalone preview pages
//!
//! Wraps a rendered preview fragment in a complete HTML document with
//! inlined base CSS, for previews opened straight from disk.

use crate::carrier::html_escape;

/// Assemble a full preview page around an already rendered fragment.
///
/// `script_src`, when given, is loaded as a module after the body so the
/// click handler can attach to the rendered checkboxes.
pub fn preview_page(fragment: &str, title: Option<&str>, script_src: Option<&str>) -> String {
    let script = script_src
        .map(|src| {
            format!(
                "\n    <script type=\"module\" src=\"{}\"></script>",
                html_escape(src)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="md-checkboxes">
    <title>{title}</title>
    <style>
{base_css}
    </style>
</head>
<body>
    <article class="markdown-body">
{body}
    </article>{script}
</body>
</html>"#,
        title = html_escape(title.unwrap_or("Preview")),
        base_css = BASE_CSS,
        body = fragment,
        script = script,
    )
}

/// Base CSS for the preview (layout, typography, task lists).
const BASE_CSS: &str = r#"
*, *::before, *::after {
    box-sizing: border-box;
}

body {
    margin: 0;
    padding: 0;
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
    font-size: 16px;
    line-height: 1.6;
}

.markdown-body {
    max-width: 900px;
    margin: 0 auto;
    padding: 32px 24px;
}

.markdown-body ul,
.markdown-body ol {
    padding-left: 2em;
}

.markdown-body li > input[type="checkbox"] {
    margin: 0 0.35em 0.25em -1.4em;
    vertical-align: middle;
    cursor: pointer;
}
"#;
