//! Error types for simple-caldav.
//!
//! Every failure is classified so callers can tell "my input is bad"
//! (`Validation`) from "the server's response is bad" (`MalformedResponse`)
//! from "the server is unavailable" (`Server`, `Transport`).

use thiserror::Error;

/// Opaque failure raised by a [`Transport`](crate::transport::Transport).
///
/// Connection refusal, timeouts and cancellation all end up here unmodified.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct TransportError(Box<dyn std::error::Error + Send + Sync>);

impl TransportError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        TransportError(source.into())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::new(err)
    }
}

/// Errors that can occur in CalDAV operations.
#[derive(Error, Debug)]
pub enum CalDavError {
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Server error ({status}) during {operation}")]
    Server { status: u16, operation: &'static str },

    #[error("Unexpected status {status} during {operation}")]
    UnexpectedStatus { status: u16, operation: &'static str },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CalDavError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        CalDavError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// True when the caller supplied bad data (no request was sent).
    pub fn is_validation(&self) -> bool {
        matches!(self, CalDavError::Validation { .. })
    }

    /// True when the server replied with content that could not be interpreted.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self, CalDavError::MalformedResponse(_))
    }
}

/// Result type alias for CalDAV operations.
pub type CalDavResult<T> = Result<T, CalDavError>;
