//! Network-level error types.
//!
//! These errors describe failures below the HTTP status layer: the request
//! never produced a response, or the response body could not be read.

use thiserror::Error;

/// Transport failures reported by an [`HttpClient`](crate::traits::HttpClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// Connection could not be established (refused, DNS, TLS handshake)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Request or read timed out
    #[error("Request timeout: {0}")]
    Timeout(String),
    /// Reading the response body failed
    #[error("IO error: {0}")]
    Io(String),
    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Other error
    #[error("HTTP error: {0}")]
    Other(String),
}

impl HttpError {
    /// Check if retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HttpError::ConnectionFailed(_) | HttpError::Timeout(_) | HttpError::Io(_)
        )
    }
}

/// Classify a reqwest error into an [`HttpError`].
pub fn classify_reqwest_error(err: &reqwest::Error) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout(err.to_string())
    } else if err.is_connect() {
        HttpError::ConnectionFailed(err.to_string())
    } else if err.is_builder() {
        HttpError::InvalidUrl(err.to_string())
    } else if err.is_body() || err.is_decode() {
        HttpError::Io(err.to_string())
    } else {
        HttpError::Other(err.to_string())
    }
}
