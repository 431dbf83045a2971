//! Responses the endpoint can send.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crate::error::Failure;
use std::io::Cursor;
use std::sync::OnceLock;
use tiny_http::{Header, Response};

/// Transparent 1×1 PNG answered to every accepted request.
const PIXEL_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

static PIXEL_PNG: OnceLock<Vec<u8>> = OnceLock::new();

pub fn pixel_png() -> &'static [u8] {
    PIXEL_PNG.get_or_init(|| STANDARD.decode(PIXEL_PNG_BASE64).unwrap_or_default())
}

/// What the endpoint answers, independent of the HTTP library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// 200 with the pixel.
    Pixel,
    Forbidden,
    BadRequest,
    NotFound,
}

impl Reply {
    /// Answer for a failed request. Reported failures are rejected; absorbed
    /// ones still get the pixel.
    pub fn for_failure(failure: &Failure) -> Self {
        match failure {
            Failure::Authorization => Reply::Forbidden,
            Failure::MalformedRequest(_) => Reply::BadRequest,
            Failure::Resolution(_) | Failure::Storage(_) => Reply::Pixel,
        }
    }

    pub fn status_code(self) -> u16 {
        match self {
            Reply::Pixel => 200,
            Reply::Forbidden => 403,
            Reply::BadRequest => 400,
            Reply::NotFound => 404,
        }
    }

    pub fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        match self {
            Reply::Pixel => {
                let response = Response::from_data(pixel_png().to_vec());
                let response = with_header(response, "Content-Type", "image/png");
                with_header(response, "Cache-Control", "no-store")
            }
            Reply::Forbidden => text(self.status_code(), "Forbidden"),
            Reply::BadRequest => text(self.status_code(), "Bad request"),
            Reply::NotFound => text(self.status_code(), "Not found"),
        }
    }
}

fn text(status: u16, body: &str) -> Response<Cursor<Vec<u8>>> {
    let response = Response::from_string(body).with_status_code(status);
    with_header(response, "Content-Type", "text/plain; charset=utf-8")
}

fn with_header(
    response: Response<Cursor<Vec<u8>>>,
    name: &str,
    value: &str,
) -> Response<Cursor<Vec<u8>>> {
    match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}
