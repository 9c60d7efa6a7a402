//! Error types for argus-client.

use thiserror::Error;

/// Error type for argus-client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport-level failure reported by a non-HTTP transport.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Failed to serialize a request body or decode a response body.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The service rejected the login credentials.
    #[error("Authentication failed: {message}")]
    Authentication {
        /// Message returned by the service.
        message: String,
    },

    /// An authenticated operation was attempted without a valid session.
    ///
    /// Raised locally before login or after logout, and after the service
    /// reports the token as expired.
    #[error("Session is not authenticated")]
    NotAuthenticated,

    /// The service has no resource at the requested path.
    #[error("Resource not found at '{path}': {message}")]
    NotFound {
        /// Request path that was not found.
        path: String,
        /// Message returned by the service.
        message: String,
    },

    /// The service (or a local pre-check) rejected a single-item write.
    #[error("Validation failed: {message}")]
    Validation {
        /// Description of the rejected content.
        message: String,
    },

    /// A query could not be built from the given parts.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The service answered with an unexpected error status.
    #[error("Service error (status {status}): {message}")]
    Service {
        /// HTTP status code.
        status: u16,
        /// Message returned by the service.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Protocol(String),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for failures that happened below the HTTP status layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Transport(_))
    }

    /// Returns true if the service reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }
}

/// Result type alias for argus-client operations.
pub type Result<T> = std::result::Result<T, Error>;
