//! Error types for the transcript client.

use thiserror::Error;

/// Crate error type.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed or the stream dropped.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server rejected the request with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// The turn response was not an event stream.
    #[error("Unexpected content type: {0}")]
    UnexpectedContentType(String),

    /// A single event frame could not be decoded.
    #[error("Malformed event frame: {0}")]
    MalformedFrame(String),

    /// A reference or citation marker named a type we don't know.
    #[error("Unknown marker type: {0}")]
    UnknownMarkerType(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Background task failure.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl Error {
    /// Whether the error came from the transport rather than from content.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Api { .. } | Self::UnexpectedContentType(_)
        )
    }
}

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;
