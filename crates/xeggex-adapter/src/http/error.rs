/*
[INPUT]:  Error sources (HTTP, WebSocket, API, serialization, signing, config)
[OUTPUT]: Structured error type with kind classification and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Main error type for the XeggeX adapter
#[derive(Error, Debug)]
pub enum XeggexError {
    /// A private operation was attempted without credentials
    #[error(
        "Unauthenticated: specify \"access_key\" and \"secret_key\" in the settings file to use account endpoints"
    )]
    Unauthenticated,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport failed
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// WebSocket connection is gone
    #[error("WebSocket connection closed")]
    ConnectionClosed,

    /// API returned an error response
    #[error("API error (code {code}): {message}")]
    Api { code: i32, message: String },

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Secret key or access key unusable for signing
    #[error("Signing error: {0}")]
    Signing(String),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request arguments rejected before sending
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Topic already has a live subscription on this connection
    #[error("Already subscribed to {0}")]
    AlreadySubscribed(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after}s")]
    RateLimit { retry_after: u64 },
}

/// Coarse error categories exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Transport,
    Protocol,
    Signing,
    Usage,
}

impl XeggexError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            XeggexError::Unauthenticated => ErrorKind::Unauthenticated,
            XeggexError::Http(_)
            | XeggexError::WebSocket(_)
            | XeggexError::ConnectionClosed
            | XeggexError::RateLimit { .. } => ErrorKind::Transport,
            XeggexError::Api { .. }
            | XeggexError::InvalidResponse(_)
            | XeggexError::Serialization(_) => ErrorKind::Protocol,
            XeggexError::Signing(_) => ErrorKind::Signing,
            XeggexError::UrlParse(_)
            | XeggexError::Config(_)
            | XeggexError::InvalidRequest(_)
            | XeggexError::AlreadySubscribed(_) => ErrorKind::Usage,
        }
    }

    /// Check if the error is a transport failure
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Check if the error is retryable. The adapter never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            XeggexError::Http(_)
                | XeggexError::RateLimit { .. }
                | XeggexError::WebSocket(_)
                | XeggexError::ConnectionClosed
        )
    }

    /// Get retry delay in seconds (if known)
    pub fn retry_delay(&self) -> Option<u64> {
        match self {
            XeggexError::RateLimit { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// Check if error indicates missing, unusable or rejected credentials
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            XeggexError::Unauthenticated
                | XeggexError::Signing(_)
                | XeggexError::Api { code: 401 | 403, .. }
        )
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        XeggexError::Api {
            code: status.as_u16() as i32,
            message: message.into(),
        }
    }
}

/// Result type alias for XeggeX operations
pub type Result<T> = std::result::Result<T, XeggexError>;
