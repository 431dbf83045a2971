//! Browser bindings for the preview script
//!
//! Built for `wasm32` and loaded by the rendered preview page.

use super::handler::{ClickHandler, PreviewDocument, PreviewElement};
use super::mirror::{KeyValueStorage, ToggleMirror};
use super::transport::{MarkRequest, MarkTransport};
use super::{INITIAL_RESTORE_DELAY_MS, RESTORE_DELAY_MS};
use crate::carrier::{Carrier, CARRIER_ELEMENT_ID, LEGACY_PREVIEW_META};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlImageElement, HtmlInputElement, VisibilityState};

type WebHandler = ClickHandler<ImageTransport, LocalStorage>;

thread_local! {
    static INSTALLED: Cell<bool> = const { Cell::new(false) };
}

// ─────────────────────────────────────────────────────────────────────────────
// DOM adapters
// ─────────────────────────────────────────────────────────────────────────────

struct WebElement(Element);

impl WebElement {
    fn as_input(&self) -> Option<&HtmlInputElement> {
        self.0.dyn_ref::<HtmlInputElement>()
    }
}

impl PreviewElement for WebElement {
    fn is_checkbox_input(&self) -> bool {
        self.as_input()
            .map(|input| input.type_().eq_ignore_ascii_case("checkbox"))
            .unwrap_or(false)
    }

    fn is_checked(&self) -> bool {
        self.as_input().map(|input| input.checked()).unwrap_or(false)
    }

    fn set_checked(&self, checked: bool) {
        if let Some(input) = self.as_input() {
            input.set_checked(checked);
        }
    }

    fn data_line(&self) -> Option<String> {
        self.0.get_attribute("data-line")
    }

    fn parent_element(&self) -> Option<Self> {
        self.0.parent_element().map(WebElement)
    }

    fn find_checkbox(&self) -> Option<Self> {
        self.0
            .query_selector("input[type=\"checkbox\"]")
            .ok()
            .flatten()
            .map(WebElement)
    }
}

struct WebDocument(Document);

impl PreviewDocument for WebDocument {
    type Element = WebElement;

    fn carrier(&self) -> Option<Carrier> {
        let element = self.0.get_element_by_id(CARRIER_ELEMENT_ID)?;
        Carrier::from_attributes(
            element.get_attribute("data-port").as_deref(),
            element.get_attribute("data-nonce").as_deref(),
            element.get_attribute("data-source").as_deref(),
        )
    }

    fn legacy_preview_data(&self) -> Option<String> {
        self.0
            .query_selector(&format!("meta[name=\"{}\"]", LEGACY_PREVIEW_META))
            .ok()
            .flatten()?
            .get_attribute("content")
    }

    fn line_annotated_elements(&self) -> Vec<WebElement> {
        let Ok(nodes) = self.0.query_selector_all("[data-line]") else {
            return Vec::new();
        };
        (0..nodes.length())
            .filter_map(|i| nodes.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .map(WebElement)
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage and transport
// ─────────────────────────────────────────────────────────────────────────────

/// The page's `localStorage`.
struct LocalStorage;

impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, String> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or_else(|| "localStorage unavailable".to_string())
    }
}

impl KeyValueStorage for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, String> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| format!("{:?}", e))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), String> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| format!("{:?}", e))
    }
}

/// Sends a request by loading it as a hidden image, which sandboxed previews
/// allow where scripted requests are blocked.
struct ImageTransport;

impl MarkTransport for ImageTransport {
    fn send(&self, request: &MarkRequest) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(image) = document
            .create_element("img")
            .ok()
            .and_then(|e| e.dyn_into::<HtmlImageElement>().ok())
        else {
            return;
        };

        let _ = image.style().set_property("display", "none");
        // Exactly one of load/error fires; the closure frees itself on that call.
        let target = image.clone();
        let on_done = Closure::once_into_js(move || {
            target.set_onload(None);
            target.set_onerror(None);
            target.remove();
        });
        image.set_onload(Some(on_done.unchecked_ref()));
        image.set_onerror(Some(on_done.unchecked_ref()));
        image.set_src(&request.url());

        if let Some(body) = document.body() {
            let _ = body.append_child(&image);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Installation
// ─────────────────────────────────────────────────────────────────────────────

fn schedule_restore(handler: &Rc<WebHandler>, delay_ms: i32) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let handler = handler.clone();
    let callback = Closure::once_into_js(move || {
        if let Some(document) = web_sys::window().and_then(|w| w.document()) {
            handler.restore(&WebDocument(document));
        }
    });
    let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
        callback.unchecked_ref::<js_sys::Function>(),
        delay_ms,
    );
}

/// Attach the checkbox click handler and the restore triggers to the page.
///
/// Safe to call more than once; only the first call installs anything.
#[wasm_bindgen]
pub fn install_preview_handler() {
    if INSTALLED.with(|installed| installed.replace(true)) {
        return;
    }
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    let handler = Rc::new(ClickHandler::new(
        ImageTransport,
        ToggleMirror::new(LocalStorage),
    ));

    let click_handler = handler.clone();
    let on_click = Closure::<dyn FnMut(web_sys::Event)>::new(move |event: web_sys::Event| {
        let Some(target) = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
        else {
            return;
        };
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        click_handler.handle_click(&WebDocument(document), &WebElement(target));
    });
    let _ = document.add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());
    on_click.forget();

    let visibility_handler = handler.clone();
    let on_visibility = Closure::<dyn FnMut()>::new(move || {
        let visible = web_sys::window()
            .and_then(|w| w.document())
            .map(|d| d.visibility_state() == VisibilityState::Visible)
            .unwrap_or(false);
        if visible {
            schedule_restore(&visibility_handler, RESTORE_DELAY_MS);
        }
    });
    let _ = document.add_event_listener_with_callback(
        "visibilitychange",
        on_visibility.as_ref().unchecked_ref(),
    );
    on_visibility.forget();

    let focus_handler = handler.clone();
    let on_focus = Closure::<dyn FnMut()>::new(move || {
        schedule_restore(&focus_handler, RESTORE_DELAY_MS);
    });
    let _ = window.add_event_listener_with_callback("focus", on_focus.as_ref().unchecked_ref());
    on_focus.forget();

    schedule_restore(&handler, INITIAL_RESTORE_DELAY_MS);
}

#[wasm_bindgen(start)]
pub fn start() {
    install_preview_handler();
}
