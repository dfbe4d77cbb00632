//! Error types for the cxsec crate

use thiserror::Error;

/// Result type for cxsec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cxsec operations
#[derive(Debug, Error)]
pub enum Error {
    /// Client configuration error; never retried
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a 5xx status; the client treats this as retryable
    #[error("server error: HTTP {status}")]
    Server {
        /// HTTP status code
        status: u16,
    },

    /// An extractor was handed blank or whitespace-only document text
    #[error("document text is empty")]
    EmptyInput,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File output error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
