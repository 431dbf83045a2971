//! Delivering toggle requests to the callback endpoint.

use crate::carrier::{Carrier, LOOPBACK_HOST};
use uuid::Uuid;

/// Path of the endpoint's only route.
pub const MARK_ROUTE: &str = "/checkbox/mark";

/// One checkbox toggle, addressed to a specific endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkRequest {
    pub port: u16,
    pub nonce: String,
    /// Document identifier; empty lets the endpoint pick the document.
    pub source: String,
    /// 1-based source line.
    pub line: i64,
    /// State after the click.
    pub checked: bool,
    /// Unique per request so no HTTP cache ever answers it.
    pub cache_buster: String,
}

impl MarkRequest {
    pub fn new(carrier: &Carrier, source: impl Into<String>, line: i64, checked: bool) -> Self {
        Self {
            port: carrier.port,
            nonce: carrier.nonce.clone(),
            source: source.into(),
            line,
            checked,
            cache_buster: Uuid::new_v4().to_string(),
        }
    }

    /// Full loopback URL for this request.
    pub fn url(&self) -> String {
        format!(
            "http://{host}:{port}{route}?source={source}&line={line}&checked={checked}&nonce={nonce}&_={buster}",
            host = LOOPBACK_HOST,
            port = self.port,
            route = MARK_ROUTE,
            source = urlencoding::encode(&self.source),
            line = self.line,
            checked = self.checked,
            nonce = urlencoding::encode(&self.nonce),
            buster = urlencoding::encode(&self.cache_buster),
        )
    }
}

/// Fire-and-forget delivery. Implementations must not block the caller and
/// must ignore the outcome.
pub trait MarkTransport {
    fn send(&self, request: &MarkRequest);
}

#[cfg(not(target_arch = "wasm32"))]
pub use http::HttpTransport;

#[cfg(not(target_arch = "wasm32"))]
mod http {
    use super::{MarkRequest, MarkTransport};
    use crate::error::{Error, Result};
    use log::debug;
    use std::thread;
    use std::time::Duration;

    /// Native transport: a plain HTTP GET on a detached thread.
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        agent: ureq::Agent,
    }

    impl Default for HttpTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HttpTransport {
        pub fn new() -> Self {
            let agent = ureq::AgentBuilder::new()
                .timeout_connect(Duration::from_millis(500))
                .timeout_read(Duration::from_secs(5))
                .build();
            Self { agent }
        }

        /// Send and wait, returning the HTTP status.
        pub fn send_blocking(&self, request: &MarkRequest) -> Result<u16> {
            match self.agent.get(&request.url()).call() {
                Ok(response) => Ok(response.status()),
                Err(ureq::Error::Status(code, _)) => Ok(code),
                Err(err) => Err(Error::Application(format!(
                    "Checkbox endpoint unreachable: {}",
                    err
                ))),
            }
        }
    }

    impl MarkTransport for HttpTransport {
        fn send(&self, request: &MarkRequest) {
            let transport = self.clone();
            let request = request.clone();
            thread::spawn(move || {
                if let Err(err) = transport.send_blocking(&request) {
                    debug!("Ignoring failed checkbox request: {}", err);
                }
            });
        }
    }
}
