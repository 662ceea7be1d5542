//! Error types for cadence-ai

use thiserror::Error;

/// Result type alias using cadence-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when invoking the reasoning service
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// The model produced no usable text
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// Structured output could not be parsed
    #[error("Malformed structured output: {0}")]
    Malformed(String),
}

impl Error {
    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Api { status, message } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
                    || message.to_lowercase().contains("overloaded")
                    || message.to_lowercase().contains("rate limit")
            }
            _ => false,
        }
    }
}
