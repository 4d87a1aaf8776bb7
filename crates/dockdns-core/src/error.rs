//! Error types for dockdns
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dockdns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dockdns
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport gave up after the configured number of attempts
    #[error("transport failure: {0}")]
    Transport(String),

    /// The registrar answered with an ERROR status document
    #[error("registrar API error {code}: {message}")]
    RegistrarApi {
        /// Upstream numeric error code
        code: String,
        /// Upstream error message
        message: String,
    },

    /// A delete step would have removed a number of records other than one
    #[error(
        "unexpected delete delta for '{name}': {before} -> {after} records, aborting submission"
    )]
    UnexpectedDelta {
        /// The FQDN whose binding was being reconciled
        name: String,
        /// Record count before the delete
        before: usize,
        /// Record count after the delete
        after: usize,
    },

    /// Required credential or configuration field is absent
    #[error("missing configuration: {0}")]
    ConfigMissing(String),

    /// The registrar response could not be decoded
    #[error("malformed registrar response: {0}")]
    Decode(String),

    /// Event feed errors
    #[error("event source error: {0}")]
    EventSource(String),

    /// Invalid input (malformed FQDN, unparseable IP, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a transport failure error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a registrar API error carrying the upstream code and message
    pub fn registrar_api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RegistrarApi {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create a missing-configuration error
    pub fn config_missing(msg: impl Into<String>) -> Self {
        Self::ConfigMissing(msg.into())
    }

    /// Create a response decoding error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an event source error
    pub fn event_source(msg: impl Into<String>) -> Self {
        Self::EventSource(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
