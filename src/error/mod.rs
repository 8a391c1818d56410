//! Error Types
//!
//! Error hierarchy for the dashboard authentication core.

use std::time::Duration;
use thiserror::Error;

/// Root error type for authentication operations.
///
/// Every variant is cloneable so a single failed discovery fetch can be
/// delivered to all callers waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("HTTP {status} {status_text}")]
    Http { status: u16, status_text: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Get error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "AUTH_CONFIG",
            Self::Network(_) => "AUTH_NETWORK",
            Self::Http { .. } => "AUTH_HTTP",
            Self::Protocol(_) => "AUTH_PROTOCOL",
            Self::Token(_) => "AUTH_TOKEN",
            Self::Storage(_) => "AUTH_STORAGE",
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error is an authorization failure (HTTP 401).
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Check if error requires re-authentication.
    ///
    /// Authentication failures always resolve to the login screen; data
    /// failures (for example a 500 from the device API) do not.
    pub fn needs_reauth(&self) -> bool {
        match self {
            Self::Token(_) => true,
            Self::Http { status, .. } => *status == 401,
            _ => false,
        }
    }
}

/// Configuration error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid URL for {field}: {url}")]
    InvalidUrl { field: String, url: String },

    #[error("Discovery failed: {message}")]
    DiscoveryFailed { message: String },
}

/// Network/transport error. No response was received.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Protocol/response parsing error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Unexpected redirect to: {location}")]
    UnexpectedRedirect { location: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Token lifecycle error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("No refresh token available")]
    NoRefreshToken,
}

/// Durable storage error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

/// Selectable list misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    #[error("Index {index} is out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Build the error for a response outside the success range.
pub fn error_from_status(status: u16, status_text: &str) -> AuthError {
    AuthError::Http {
        status,
        status_text: status_text.to_string(),
    }
}

/// Map a serde_json failure onto a protocol error.
pub(crate) fn invalid_json(error: serde_json::Error) -> AuthError {
    AuthError::Protocol(ProtocolError::InvalidJson {
        message: error.to_string(),
    })
}
