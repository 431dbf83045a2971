//! CLI definitions for md-checkboxes.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "md-checkboxes",
    version,
    about = "Clickable markdown task-list checkboxes, saved back to the source file",
    after_help = "Examples:\n  md-checkboxes serve notes/            # render previews, listen for toggles\n  md-checkboxes render todo.md --port 4312 --nonce <token>\n  md-checkboxes mark --port 4312 --nonce <token> --line 3 --checked"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open markdown files or folders, write their previews and apply
    /// checkbox toggles until stdin closes.
    Serve {
        /// Files or folders to open (defaults to the current directory).
        paths: Vec<PathBuf>,
        /// Directory for the rendered preview pages.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Script URL included in every preview page.
        #[arg(long)]
        script: Option<String>,
        /// Port for the callback endpoint (overrides the config file).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Render one markdown file as a preview page for a known endpoint.
    Render {
        /// Markdown file to render.
        file: PathBuf,
        /// Port of the callback endpoint.
        #[arg(long)]
        port: u16,
        /// Session token of the callback endpoint.
        #[arg(long)]
        nonce: String,
        /// Document identifier embedded in the preview (defaults to the file's URI).
        #[arg(long)]
        source: Option<String>,
        /// Script URL included in the page.
        #[arg(long)]
        script: Option<String>,
        /// Write the page here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Send one checkbox toggle to a running endpoint.
    Mark {
        #[arg(long)]
        port: u16,
        #[arg(long)]
        nonce: String,
        /// 1-based source line of the list item.
        #[arg(long, allow_negative_numbers = true)]
        line: i64,
        /// Mark as checked (default: unchecked).
        #[arg(long, action = ArgAction::SetTrue)]
        checked: bool,
        /// Document identifier; omit to let the endpoint pick the focused document.
        #[arg(long, default_value = "")]
        source: String,
    },
}
