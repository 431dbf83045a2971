//! Preview-side checkbox handling
//!
//! Runs inside the rendered preview. Clicks on task-list checkboxes are sent
//! to the callback endpoint and mirrored locally; the mirror is re-applied
//! whenever the preview becomes visible again, regains focus, or first loads.

mod handler;
mod mirror;
mod transport;
#[cfg(target_arch = "wasm32")]
mod web;

pub use handler::{
    checkbox_toggle, resolve_source, restore_checkbox_states, CheckboxToggle, ClickHandler,
    PreviewDocument, PreviewElement,
};
pub use mirror::{KeyValueStorage, MemoryStorage, MirroredStates, ToggleMirror, MIRROR_STORAGE_KEY};
pub use transport::{MarkRequest, MarkTransport, MARK_ROUTE};

#[cfg(not(target_arch = "wasm32"))]
pub use mirror::FileStorage;
#[cfg(not(target_arch = "wasm32"))]
pub use transport::HttpTransport;

#[cfg(target_arch = "wasm32")]
pub use web::install_preview_handler;

pub(crate) use handler::parse_leading_integer;

/// Delay before restoring after the preview becomes visible or regains focus.
pub const RESTORE_DELAY_MS: i32 = 50;

/// Delay before the first restore after installation.
pub const INITIAL_RESTORE_DELAY_MS: i32 = 100;
