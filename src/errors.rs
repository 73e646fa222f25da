//! Error types for the authentication filter.

use thiserror::Error;

/// Result type alias for the authentication filter.
pub type Result<T, E = AuthError> = std::result::Result<T, E>;

/// Main error type for the authentication filter.
///
/// Failed authentication attempts are not errors: they are reported as
/// [`AuthResult::Invalid`](crate::digest::AuthResult) values and turned into a
/// challenge. `AuthError` covers what the filter itself cannot recover from
/// for the current request.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Configuration source errors (files, environment)
    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Malformed `Authorization` or `WWW-Authenticate` headers
    #[error("Digest header error: {0}")]
    Digest(#[from] DigestError),

    /// Invalid request error
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Cryptography errors
    #[error("Cryptography error: {message}")]
    Crypto { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Operation failed: {message}")]
    OperationFailed { message: String },

    #[error("Storage backend not available")]
    BackendUnavailable,
}

/// Errors raised while parsing digest header parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestError {
    #[error("Header does not use the Digest scheme")]
    NotDigestScheme,

    #[error("Mandatory field '{0}' not specified")]
    MissingField(&'static str),

    #[error("Malformed parameter: {0}")]
    MalformedParameter(String),
}

impl AuthError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a new crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl StorageError {
    /// Create a new connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Create a new operation failed error
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
        }
    }
}
