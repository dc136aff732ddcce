//! Error types for carfinder-api

use thiserror::Error;

/// Result type alias using carfinder-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the Car Finder API
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Stream was aborted
    #[error("Request aborted")]
    Aborted,

    /// Event stream broke mid-flight
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a status error from a code and response body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::Sse(_) => true,
            Error::Status { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_transport_variants() {
        assert!(Error::Sse("connection reset".into()).is_retryable());
    }

    #[test]
    fn test_retryable_status_codes() {
        assert!(Error::status(429, "slow down").is_retryable());
        assert!(Error::status(500, "").is_retryable());
        assert!(Error::status(503, "unavailable").is_retryable());
    }

    #[test]
    fn test_not_retryable_client_errors() {
        assert!(!Error::status(400, "bad request").is_retryable());
        assert!(!Error::status(404, "not found").is_retryable());
        assert!(!Error::status(422, "validation").is_retryable());
    }

    #[test]
    fn test_not_retryable_other_variants() {
        assert!(!Error::Aborted.is_retryable());
        assert!(!Error::InvalidConfig("bad url".into()).is_retryable());
        assert!(!Error::UnexpectedResponse("html".into()).is_retryable());
    }

    #[test]
    fn test_status_display_includes_body() {
        let e = Error::status(500, "Internal Server Error");
        assert_eq!(
            e.to_string(),
            "Request failed with status 500: Internal Server Error"
        );
    }
}
