//! Error types for harness operations.
//!
//! Every fallible operation in the crate returns [`HarnessError`]. The variants
//! follow the failure classes a client of the telemetry API has to tell apart:
//! an expected message that never arrived, a reply with the wrong shape, a
//! broken connection, a rejected session, and a misbehaving paged endpoint.

use std::time::Duration;

/// Main error type for harness operations.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// A strict wait expired before a satisfying message arrived
    #[error("Timed out after {waited:?} waiting for {operation}")]
    Timeout {
        operation: &'static str,
        waited: Duration,
    },

    /// A reply payload did not match the expected shape
    #[error("Failed to decode {target}: {source}")]
    Deserialization {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Socket-level failure: refused, reset, failed handshake or closed mid-session
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The server rejected the credentials or the session
    #[error("Authentication failed ({status}): {message}")]
    Authentication { status: u16, message: String },

    /// An issued token could not be decoded or names the wrong subject
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// Non-success HTTP status from a REST call
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// HTTP transport failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// WebSocket protocol failure while writing a frame
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Caller error such as a zero timeout or a zero page size
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The paged endpoint broke the drain contract
    #[error("Pagination contract violated at page {page}: {message}")]
    Pagination { page: usize, message: String },

    /// Encoding failure of an outgoing value
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while building a [`HarnessConfig`](crate::config::HarnessConfig).
///
/// These are programming errors and should surface during test setup.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl HarnessError {
    /// Create a timeout error
    pub fn timeout(operation: &'static str, waited: Duration) -> Self {
        Self::Timeout { operation, waited }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an invalid token error
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Create a pagination contract error
    pub fn pagination(page: usize, message: impl Into<String>) -> Self {
        Self::Pagination {
            page,
            message: message.into(),
        }
    }

    /// Map an HTTP status and body to the matching variant.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Authentication {
                status,
                message: body.into(),
            },
            _ => Self::Http {
                status,
                body: body.into(),
            },
        }
    }

    /// True for [`HarnessError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// True for [`HarnessError::Connection`].
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

impl BuildError {
    /// Create an invalid configuration error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

// Result type aliases for convenience
pub type HarnessResult<T> = Result<T, HarnessError>;
pub type BuildResult<T> = Result<T, BuildError>;
