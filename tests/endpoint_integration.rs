//! Drives a real callback endpoint over loopback HTTP.

use md_checkboxes::carrier::Carrier;
use md_checkboxes::config::Settings;
use md_checkboxes::document::DocumentHost;
use md_checkboxes::preview::{HttpTransport, MarkRequest};
use md_checkboxes::server::{pixel_png, CallbackEndpoint};
use md_checkboxes::session::EditorSession;
use md_checkboxes::workspace::Workspace;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    path: PathBuf,
    workspace: Arc<Workspace>,
    endpoint: CallbackEndpoint,
    port: u16,
}

fn harness(text: &str) -> Harness {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("todo.md");
    fs::write(&path, text).unwrap();

    let workspace = Arc::new(Workspace::new(Settings::default()));
    let session = Arc::new(EditorSession::new());
    let tracker = session.clone();
    workspace.on_did_change_active(move |doc| tracker.track_focus(doc));
    let id = workspace.open_path(&path).unwrap();
    workspace.focus(&id).unwrap();

    let mut endpoint = CallbackEndpoint::new(workspace.clone(), session);
    let port = endpoint.listen(&Settings::default()).unwrap();

    Harness {
        _dir: dir,
        path,
        workspace,
        endpoint,
        port,
    }
}

fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(5))
        .build()
}

fn get(port: u16, path_and_query: &str) -> (u16, Option<String>, Option<String>, Vec<u8>) {
    let url = format!("http://127.0.0.1:{}{}", port, path_and_query);
    let response = match agent().get(&url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => response,
        Err(err) => panic!("request failed: {err}"),
    };
    let status = response.status();
    let content_type = response.header("Content-Type").map(str::to_string);
    let cache_control = response.header("Cache-Control").map(str::to_string);
    let mut body = Vec::new();
    response.into_reader().read_to_end(&mut body).unwrap();
    (status, content_type, cache_control, body)
}

#[test]
fn test_valid_toggle_edits_file_and_returns_pixel() {
    let h = harness("# Todo\n\n- [ ] buy milk\n");
    let nonce = h.endpoint.token().as_str().to_string();

    let (status, content_type, cache_control, body) = get(
        h.port,
        &format!("/checkbox/mark?source=&line=3&checked=true&nonce={}&_=1", nonce),
    );

    assert_eq!(status, 200);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(cache_control.as_deref(), Some("no-store"));
    assert_eq!(body, pixel_png());
    assert_eq!(
        fs::read_to_string(&h.path).unwrap(),
        "# Todo\n\n- [x] buy milk\n"
    );
}

#[test]
fn test_transport_round_trip() {
    let h = harness("- [x] done\n");
    let carrier = Carrier::new(h.port, h.endpoint.token().as_str(), "");
    let request = MarkRequest::new(&carrier, "", 1, false);

    let status = HttpTransport::new().send_blocking(&request).unwrap();

    assert_eq!(status, 200);
    assert_eq!(fs::read_to_string(&h.path).unwrap(), "- [ ] done\n");
}

#[test]
fn test_explicit_source_targets_named_file() {
    let h = harness("- [ ] focused\n");
    let other = h.path.with_file_name("other.md");
    fs::write(&other, "- [ ] other\n").unwrap();
    let uri = url::Url::from_file_path(fs::canonicalize(&other).unwrap())
        .unwrap()
        .to_string();
    let carrier = Carrier::new(h.port, h.endpoint.token().as_str(), uri.clone());

    let status = HttpTransport::new()
        .send_blocking(&MarkRequest::new(&carrier, uri, 1, true))
        .unwrap();

    assert_eq!(status, 200);
    assert_eq!(fs::read_to_string(&other).unwrap(), "- [x] other\n");
    assert_eq!(fs::read_to_string(&h.path).unwrap(), "- [ ] focused\n");
}

#[test]
fn test_invalid_nonce_forbidden_and_file_unchanged() {
    let h = harness("# Todo\n\n- [ ] buy milk\n");
    let wrong = "0".repeat(h.endpoint.token().as_str().len());

    let (status, _, _, body) = get(
        h.port,
        &format!("/checkbox/mark?source=&line=3&checked=true&nonce={}", wrong),
    );

    assert_eq!(status, 403);
    assert_eq!(body, b"Forbidden");
    assert_eq!(
        fs::read_to_string(&h.path).unwrap(),
        "# Todo\n\n- [ ] buy milk\n"
    );
}

#[test]
fn test_missing_fields_bad_request() {
    let h = harness("- [ ] a\n");
    let nonce = h.endpoint.token().as_str().to_string();

    let (status, _, _, body) = get(h.port, &format!("/checkbox/mark?line=1&nonce={}", nonce));
    assert_eq!(status, 400);
    assert_eq!(body, b"Bad request");

    let (status, _, _, _) = get(h.port, &format!("/checkbox/mark?source=&nonce={}", nonce));
    assert_eq!(status, 400);
    assert_eq!(fs::read_to_string(&h.path).unwrap(), "- [ ] a\n");
}

#[test]
fn test_unknown_route_not_found() {
    let h = harness("- [ ] a\n");
    let (status, _, _, _) = get(h.port, "/");
    assert_eq!(status, 404);
}

#[test]
fn test_out_of_range_line_still_answers_pixel() {
    let h = harness("- [ ] a\n");
    let nonce = h.endpoint.token().as_str().to_string();

    let (status, content_type, _, _) = get(
        h.port,
        &format!("/checkbox/mark?source=&line=40&checked=true&nonce={}", nonce),
    );

    assert_eq!(status, 200);
    assert_eq!(content_type.as_deref(), Some("image/png"));
    assert_eq!(fs::read_to_string(&h.path).unwrap(), "- [ ] a\n");
}

#[test]
fn test_tracked_document_used_after_focus_leaves() {
    let h = harness("- [ ] a\n");
    let nonce = h.endpoint.token().as_str().to_string();
    h.workspace.blur();
    h.workspace.set_visible(&[]);
    assert!(h.workspace.active_document().is_none());

    let (status, _, _, _) = get(
        h.port,
        &format!("/checkbox/mark?source=&line=1&checked=true&nonce={}", nonce),
    );

    assert_eq!(status, 200);
    assert_eq!(fs::read_to_string(&h.path).unwrap(), "- [x] a\n");
}

#[test]
fn test_dispose_stops_listening() {
    let mut h = harness("- [ ] a\n");
    let port = h.port;
    h.endpoint.dispose();
    assert!(!h.endpoint.is_listening());

    let result = agent()
        .get(&format!("http://127.0.0.1:{}/checkbox/mark", port))
        .call();
    assert!(matches!(result, Err(ureq::Error::Transport(_))));
}
