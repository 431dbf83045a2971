//! Centralized error handling for md-checkboxes
//!
//! Two layers live here:
//! - [`Error`], the ordinary error type for I/O, configuration, endpoint
//!   binding and document access, with the [`Result`] alias.
//! - [`Failure`], the best-effort outcome of a checkbox toggle. Only
//!   authorization and malformed-request failures are ever reported back to
//!   the requester; resolution and storage failures are logged and absorbed.

use log::{debug, warn};
use std::fmt;
use std::io;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Custom Result Type Alias
// ─────────────────────────────────────────────────────────────────────────────

/// A specialized `Result` type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The centralized error type for the crate.
#[derive(Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // File I/O Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic I/O error wrapper
    Io(io::Error),

    /// Failed to read file contents
    FileRead { path: PathBuf, source: io::Error },

    /// Failed to write file contents
    FileWrite { path: PathBuf, source: io::Error },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to load configuration file
    ConfigLoad {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to save configuration file
    ConfigSave {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to parse configuration (invalid JSON/format)
    ConfigParse {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration directory not found or inaccessible
    ConfigDirNotFound,

    // ─────────────────────────────────────────────────────────────────────────
    // Endpoint Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The callback endpoint could not bind its listening socket
    ServerBind { address: String, message: String },

    /// An endpoint lifecycle call was made in the wrong state
    EndpointState(&'static str),

    // ─────────────────────────────────────────────────────────────────────────
    // Document Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// A document identifier could not be interpreted by the host
    InvalidDocumentId(String),

    /// The host has no document with this identifier
    DocumentNotFound(String),

    /// A line index outside the document
    LineOutOfRange { line: usize, line_count: usize },

    /// File watcher setup failed
    Watcher(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Application Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Generic application error with a message
    Application(String),
}

// Implement From traits for convenient error conversion
impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigParse {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Display trait implementation for user-friendly error messages
// ─────────────────────────────────────────────────────────────────────────────
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // File I/O Errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::FileRead { path, source } => {
                write!(f, "Failed to read '{}': {}", path.display(), source)
            }
            Error::FileWrite { path, source } => {
                write!(f, "Failed to write '{}': {}", path.display(), source)
            }

            // Configuration Errors
            Error::ConfigLoad { path, source } => {
                write!(
                    f,
                    "Failed to load configuration from '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::ConfigSave { path, source } => {
                write!(
                    f,
                    "Failed to save configuration to '{}': {}",
                    path.display(),
                    source
                )
            }
            Error::ConfigParse { message, .. } => {
                write!(f, "Invalid configuration format: {}", message)
            }
            Error::ConfigDirNotFound => {
                write!(f, "Configuration directory not found")
            }

            // Endpoint Errors
            Error::ServerBind { address, message } => {
                write!(f, "Failed to bind callback endpoint on {}: {}", address, message)
            }
            Error::EndpointState(msg) => write!(f, "Invalid endpoint state: {}", msg),

            // Document Errors
            Error::InvalidDocumentId(id) => write!(f, "Invalid document identifier '{}'", id),
            Error::DocumentNotFound(id) => write!(f, "Document not found: {}", id),
            Error::LineOutOfRange { line, line_count } => write!(
                f,
                "Line index {} out of bounds (document has {} lines)",
                line, line_count
            ),
            Error::Watcher(msg) => write!(f, "File watcher error: {}", msg),

            // Application Errors
            Error::Application(msg) => write!(f, "{}", msg),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// std::error::Error trait implementation for error chaining
// ─────────────────────────────────────────────────────────────────────────────
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::FileRead { source, .. } | Error::FileWrite { source, .. } => Some(source),
            Error::ConfigLoad { source, .. } => Some(source.as_ref()),
            Error::ConfigSave { source, .. } => Some(source.as_ref()),
            Error::ConfigParse { source, .. } => source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn std::error::Error + 'static)),
            Error::ConfigDirNotFound
            | Error::ServerBind { .. }
            | Error::EndpointState(_)
            | Error::InvalidDocumentId(_)
            | Error::DocumentNotFound(_)
            | Error::LineOutOfRange { .. }
            | Error::Watcher(_)
            | Error::Application(_) => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Graceful Degradation Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for Result to support graceful degradation.
pub trait ResultExt<T> {
    /// If the result is an error, log it at warning level and return the provided default.
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                warn!("{}: {}. Using default.", context, err);
                default
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Best-Effort Toggle Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Why a checkbox toggle did not take effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// Missing or mismatched session token. Reported as 403.
    Authorization,
    /// A required request field is missing or not a single value. Reported as 400.
    MalformedRequest(&'static str),
    /// No target document, line out of range, or no checkbox marker on the
    /// line. Logged only.
    Resolution(String),
    /// The preview's toggle mirror could not be read or written. Logged only.
    Storage(String),
}

/// Outcome of a best-effort operation.
pub type BestEffort<T> = std::result::Result<T, Failure>;

impl Failure {
    /// Log the failure at the level its kind calls for.
    pub fn log(&self, context: &str) {
        match self {
            Failure::Authorization => debug!("{}: rejected request with invalid token", context),
            Failure::MalformedRequest(field) => {
                debug!("{}: rejected malformed request ({})", context, field)
            }
            Failure::Resolution(msg) => warn!("{}: {}", context, msg),
            Failure::Storage(msg) => debug!("{}: ignoring storage failure: {}", context, msg),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Authorization => write!(f, "Forbidden"),
            Failure::MalformedRequest(_) => write!(f, "Bad request"),
            Failure::Resolution(msg) => write!(f, "Resolution failed: {}", msg),
            Failure::Storage(msg) => write!(f, "Storage failed: {}", msg),
        }
    }
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        Failure::Resolution(err.to_string())
    }
}

/// Extension trait that absorbs a best-effort failure after logging it.
pub trait BestEffortExt<T> {
    /// Log the failure (if any) and discard it.
    fn absorb(self, context: &str) -> Option<T>;
}

impl<T> BestEffortExt<T> for BestEffort<T> {
    fn absorb(self, context: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(failure) => {
                failure.log(context);
                None
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
