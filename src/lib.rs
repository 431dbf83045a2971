//! md-checkboxes
//!
//! Clickable task-list checkboxes in a rendered markdown preview, with each
//! click written back to the `[ ]` / `[x]` marker in the source document.
//!
//! The pieces:
//! - [`render`] tags list items with their source line and embeds the
//!   [`carrier`] element telling the preview where to send toggles.
//! - [`preview`] runs inside the preview: it reacts to checkbox clicks and
//!   keeps a local mirror of toggled states.
//! - [`server`] is the loopback callback endpoint that validates a toggle
//!   and edits the document through a [`document::DocumentHost`].
//! - [`workspace`] is a filesystem-backed host for running standalone.

pub mod carrier;
pub mod error;
pub mod preview;

#[cfg(not(target_arch = "wasm32"))]
pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod document;
#[cfg(not(target_arch = "wasm32"))]
pub mod render;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;
#[cfg(not(target_arch = "wasm32"))]
pub mod session;
#[cfg(not(target_arch = "wasm32"))]
pub mod workspace;

pub use error::{BestEffort, Error, Failure, Result};
