// Error types for load generation

use thiserror::Error;

/// Result type alias for load-test operations
pub type Result<T> = std::result::Result<T, LoadTestError>;

/// Errors that abort an operation before or outside a batch.
///
/// Individual request failures never surface here; they are folded into
/// the batch statistics as failed outcomes.
#[derive(Debug, Error)]
pub enum LoadTestError {
    /// Server name not present in the registry
    #[error("Unknown server: {name} (available: {available})")]
    UnknownServer { name: String, available: String },

    /// Query category string could not be parsed
    #[error("Unknown query category: {0}. Use simple, complex, paginated or mixed")]
    UnknownCategory(String),

    /// Batch settings out of range
    #[error("Invalid batch settings: {0}")]
    InvalidSettings(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LoadTestError {
    /// Create an invalid settings error
    pub fn settings(msg: impl Into<String>) -> Self {
        LoadTestError::InvalidSettings(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        LoadTestError::Configuration(msg.into())
    }
}

/// Failure of a single request below the HTTP status level.
///
/// The `Display` output is the description recorded in the error breakdown,
/// so it carries the underlying message unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Request exceeded its timeout
    #[error("{0}")]
    Timeout(String),

    /// Connection refused, reset, DNS failure and similar
    #[error("{0}")]
    Connection(String),

    /// Any other failure while sending or reading the response
    #[error("{0}")]
    Request(String),
}

impl TransportError {
    pub fn timeout(msg: impl Into<String>) -> Self {
        TransportError::Timeout(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        TransportError::Connection(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        TransportError::Request(msg.into())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}
