//! Local callback endpoint
//!
//! A loopback-only HTTP listener with one route, `GET /checkbox/mark`.
//! Requests carrying the session token get their checkbox toggle applied to
//! the target document through the [`DocumentHost`]; the response is
//! always a tiny image so the preview can fire requests as image loads.
//!
//! Lifecycle: [`CallbackEndpoint::new`] → [`CallbackEndpoint::listen`] →
//! [`CallbackEndpoint::dispose`]. A disposed endpoint never listens again.

mod mark;
mod query;
mod response;

pub use mark::{apply_mark, resolve_target};
pub use query::{validate, Field, Query, ValidatedMark};
pub use response::{pixel_png, Reply};

use crate::config::Settings;
use crate::document::DocumentHost;
use crate::error::{BestEffortExt, Error, Result};
use crate::preview::MARK_ROUTE;
use crate::render::PreviewEndpoint;
use crate::session::{EditorSession, SessionToken};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tiny_http::{Method, Server};

/// Everything a request handler needs, shared with the accept thread.
#[derive(Clone)]
pub struct EndpointContext {
    pub token: SessionToken,
    pub host: Arc<dyn DocumentHost>,
    pub session: Arc<EditorSession>,
}

/// Decide the reply for one request, applying the toggle if it is valid.
pub fn handle_request(method: &Method, url: &str, context: &EndpointContext) -> Reply {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    if *method != Method::Get || path.trim_end_matches('/') != MARK_ROUTE {
        debug!("No route for {} {}", method, path);
        return Reply::NotFound;
    }

    let query = Query::parse(url);
    let mark = match validate(&query, &context.token) {
        Ok(mark) => mark,
        Err(failure) => {
            failure.log("Checkbox request");
            return Reply::for_failure(&failure);
        }
    };

    apply_mark(context.host.as_ref(), &context.session, &mark).absorb("Checkbox toggle");
    Reply::Pixel
}

// ─────────────────────────────────────────────────────────────────────────────
// Endpoint
// ─────────────────────────────────────────────────────────────────────────────

enum EndpointState {
    Uninitialized,
    Listening {
        server: Arc<Server>,
        handle: JoinHandle<()>,
        port: u16,
    },
    Disposed,
}

/// The callback endpoint and its session token.
pub struct CallbackEndpoint {
    context: EndpointContext,
    state: EndpointState,
}

impl CallbackEndpoint {
    /// Create an endpoint with a freshly generated token. Nothing is bound yet.
    pub fn new(host: Arc<dyn DocumentHost>, session: Arc<EditorSession>) -> Self {
        Self::with_token(host, session, SessionToken::generate())
    }

    pub fn with_token(
        host: Arc<dyn DocumentHost>,
        session: Arc<EditorSession>,
        token: SessionToken,
    ) -> Self {
        Self {
            context: EndpointContext {
                token,
                host,
                session,
            },
            state: EndpointState::Uninitialized,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.context.token
    }

    pub fn session(&self) -> &Arc<EditorSession> {
        &self.context.session
    }

    /// Port actually bound, while listening.
    pub fn port(&self) -> Option<u16> {
        match self.state {
            EndpointState::Listening { port, .. } => Some(port),
            EndpointState::Uninitialized | EndpointState::Disposed => None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.port().is_some()
    }

    /// What rendering needs to point previews at this endpoint.
    pub fn preview_endpoint(&self) -> Option<PreviewEndpoint> {
        self.port()
            .map(|port| PreviewEndpoint::new(port, self.context.token.as_str()))
    }

    /// Bind the loopback listener and start serving. Returns the bound port.
    pub fn listen(&mut self, settings: &Settings) -> Result<u16> {
        match self.state {
            EndpointState::Uninitialized => {}
            EndpointState::Listening { .. } => {
                return Err(Error::EndpointState("endpoint is already listening"))
            }
            EndpointState::Disposed => {
                return Err(Error::EndpointState("endpoint has been disposed"))
            }
        }

        let address = settings.bind_address();
        let server = Server::http(&address).map_err(|err| Error::ServerBind {
            address: address.clone(),
            message: err.to_string(),
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| Error::ServerBind {
                address: address.clone(),
                message: "listener has no IP address".to_string(),
            })?;

        let server = Arc::new(server);
        let accept = server.clone();
        let context = self.context.clone();
        let handle = thread::Builder::new()
            .name("checkbox-endpoint".to_string())
            .spawn(move || {
                for request in accept.incoming_requests() {
                    let reply = handle_request(request.method(), request.url(), &context);
                    if let Err(err) = request.respond(reply.into_response()) {
                        debug!("Failed to answer checkbox request: {}", err);
                    }
                }
            })?;

        info!("Checkbox endpoint listening on {}:{}", crate::carrier::LOOPBACK_HOST, port);
        self.state = EndpointState::Listening {
            server,
            handle,
            port,
        };
        Ok(port)
    }

    /// Stop listening and release the port. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        match std::mem::replace(&mut self.state, EndpointState::Disposed) {
            EndpointState::Listening {
                server,
                handle,
                port,
            } => {
                server.unblock();
                if handle.join().is_err() {
                    warn!("Checkbox endpoint thread panicked");
                }
                info!("Checkbox endpoint on port {} stopped", port);
            }
            EndpointState::Uninitialized | EndpointState::Disposed => {}
        }
    }
}

impl Drop for CallbackEndpoint {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::testing::MemoryHost;
    use crate::document::DocumentId;

    struct Fixture {
        host: Arc<MemoryHost>,
        context: EndpointContext,
        todo: DocumentId,
    }

    fn fixture() -> Fixture {
        let host = Arc::new(MemoryHost::new());
        let todo = host.add("file:///todo.md", "# Todo\n\n- [ ] buy milk\n");
        host.set_active(Some(&todo));
        let context = EndpointContext {
            token: SessionToken::from_value("tok-123"),
            host: host.clone(),
            session: Arc::new(EditorSession::new()),
        };
        Fixture {
            host,
            context,
            todo,
        }
    }

    #[test]
    fn test_valid_request_edits_and_returns_pixel() {
        let f = fixture();
        let reply = handle_request(
            &Method::Get,
            "/checkbox/mark?source=&line=3&checked=true&nonce=tok-123&_=1",
            &f.context,
        );
        assert_eq!(reply, Reply::Pixel);
        assert_eq!(f.host.text(&f.todo), "# Todo\n\n- [x] buy milk\n");
    }

    #[test]
    fn test_invalid_nonce_forbidden_and_unchanged() {
        let f = fixture();
        let reply = handle_request(
            &Method::Get,
            "/checkbox/mark?source=&line=3&checked=true&nonce=tok-124",
            &f.context,
        );
        assert_eq!(reply, Reply::Forbidden);
        assert_eq!(f.host.text(&f.todo), "# Todo\n\n- [ ] buy milk\n");
    }

    #[test]
    fn test_missing_line_bad_request() {
        let f = fixture();
        let reply = handle_request(&Method::Get, "/checkbox/mark?source=&nonce=tok-123", &f.context);
        assert_eq!(reply, Reply::BadRequest);
    }

    #[test]
    fn test_repeated_fields_rejected_by_kind() {
        let f = fixture();
        let reply = handle_request(
            &Method::Get,
            "/checkbox/mark?source=&line=3&checked=true&nonce=tok-123&nonce=tok-123",
            &f.context,
        );
        assert_eq!(reply, Reply::Forbidden);

        let reply = handle_request(
            &Method::Get,
            "/checkbox/mark?source=&line=3&line=3&checked=true&nonce=tok-123",
            &f.context,
        );
        assert_eq!(reply, Reply::BadRequest);
        assert_eq!(f.host.text(&f.todo), "# Todo\n\n- [ ] buy milk\n");
    }

    #[test]
    fn test_failed_edit_still_returns_pixel() {
        let f = fixture();
        let reply = handle_request(
            &Method::Get,
            "/checkbox/mark?source=&line=42&checked=true&nonce=tok-123",
            &f.context,
        );
        assert_eq!(reply, Reply::Pixel);
        assert!(f.host.saves().is_empty());
    }

    #[test]
    fn test_unknown_routes_not_found() {
        let f = fixture();
        for (method, url) in [
            (Method::Get, "/"),
            (Method::Get, "/checkbox"),
            (Method::Get, "/checkbox/marks?nonce=tok-123"),
            (Method::Post, "/checkbox/mark?source=&line=3&nonce=tok-123"),
        ] {
            assert_eq!(handle_request(&method, url, &f.context), Reply::NotFound, "{url}");
        }
        assert_eq!(f.host.text(&f.todo), "# Todo\n\n- [ ] buy milk\n");
    }

    #[test]
    fn test_trailing_slash_accepted() {
        let f = fixture();
        let reply = handle_request(
            &Method::Get,
            "/checkbox/mark/?source=&line=3&checked=true&nonce=tok-123",
            &f.context,
        );
        assert_eq!(reply, Reply::Pixel);
    }

    #[test]
    fn test_lifecycle() {
        let f = fixture();
        let mut endpoint = CallbackEndpoint::new(f.host.clone(), Arc::new(EditorSession::new()));
        assert!(!endpoint.is_listening());
        assert!(endpoint.preview_endpoint().is_none());

        let port = endpoint.listen(&Settings::default()).unwrap();
        assert_ne!(port, 0);
        assert_eq!(endpoint.port(), Some(port));
        let preview = endpoint.preview_endpoint().unwrap();
        assert_eq!(preview.nonce, endpoint.token().as_str());
        assert!(matches!(
            endpoint.listen(&Settings::default()),
            Err(Error::EndpointState(_))
        ));

        endpoint.dispose();
        endpoint.dispose();
        assert!(!endpoint.is_listening());
        assert!(matches!(
            endpoint.listen(&Settings::default()),
            Err(Error::EndpointState(_))
        ));
    }

    #[test]
    fn test_dispose_before_listen() {
        let f = fixture();
        let mut endpoint = CallbackEndpoint::new(f.host.clone(), Arc::new(EditorSession::new()));
        endpoint.dispose();
        assert!(matches!(
            endpoint.listen(&Settings::default()),
            Err(Error::EndpointState(_))
        ));
    }
}
