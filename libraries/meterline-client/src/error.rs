//! Error types for the backend client.

use thiserror::Error;

/// Errors that can occur when talking to the billing backend.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend returned a non-success status
    #[error("Backend error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Authentication required but the token was rejected
    #[error("Authentication required")]
    AuthRequired,

    /// No credential could be obtained from the token source
    #[error("Access token unavailable: {0}")]
    TokenUnavailable(String),

    /// Invalid backend URL
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse backend response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Backend is offline or unreachable
    #[error("Backend unreachable: {0}")]
    Unreachable(String),
}

impl ClientError {
    /// True for connectivity-class failures that leave local data intact
    /// and are worth retrying; false for configuration or auth problems.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Request(e) => e.is_connect() || e.is_timeout(),
            Self::ServerError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for backend client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
