//! Error types for ChatRelay.

use thiserror::Error;

/// Result type alias using the ChatRelay error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for ChatRelay services.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound webhook token mismatch
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid input or request (empty body, malformed form, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Outbound message delivery failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// External service error (completion API and the like)
    #[error("External service error: {0}")]
    External(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Check if this is an authentication error.
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this is a delivery error.
    pub const fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }

    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Auth(_) => 401,
            Self::InvalidInput(_) => 400,
            Self::Delivery(_) | Self::External(_) => 502,
            _ => 500,
        }
    }
}
