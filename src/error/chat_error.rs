//! The chat client's error taxonomy.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use super::network::HttpError;

/// Error returned by every chat client operation.
///
/// Each variant carries the HTTP status that produced it (see
/// [`status_code`](ChatError::status_code)) and the response body, parsed as
/// JSON when possible or kept as a JSON string otherwise.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    /// Resource not found (404), or a room name absent from the listing.
    #[error("{message}")]
    NotFound { message: String, body: Value },

    /// Conflict, e.g. a duplicate room name (409).
    #[error("{message}")]
    Conflict { message: String, body: Value },

    /// Rate limited (429).
    #[error("Rate limited (retry after {retry_after_secs}s)")]
    RateLimit { retry_after_secs: f64, body: Value },

    /// Admin key required or invalid (401/403).
    #[error("{message}")]
    Auth {
        status: u16,
        message: String,
        body: Value,
    },

    /// Any other failure. Network-level failures use status 0 and keep the
    /// transport error as their source.
    #[error("{message}")]
    Generic {
        status: u16,
        message: String,
        body: Value,
        #[source]
        source: Option<HttpError>,
    },
}

impl ChatError {
    /// Map a non-2xx response onto the taxonomy.
    ///
    /// `retry_after_header` is the parsed `Retry-After` header, used for 429
    /// responses whose body has no `retry_after_secs` field.
    pub fn from_response(
        status: u16,
        body: Value,
        retry_after_header: Option<f64>,
        url: &str,
    ) -> Self {
        match status {
            404 => ChatError::NotFound {
                message: format!("Not found: {}", url),
                body,
            },
            409 => ChatError::Conflict {
                message: error_field(&body).unwrap_or_else(|| "Conflict".to_string()),
                body,
            },
            429 => {
                let retry_after_secs = body
                    .get("retry_after_secs")
                    .and_then(Value::as_f64)
                    .or(retry_after_header)
                    .unwrap_or(0.0);
                ChatError::RateLimit {
                    retry_after_secs,
                    body,
                }
            }
            401 | 403 => ChatError::Auth {
                status,
                message: error_field(&body).unwrap_or_else(|| "Auth required".to_string()),
                body,
            },
            _ => ChatError::Generic {
                status,
                message: format!("HTTP {}: {}", status, body_summary(&body)),
                body,
                source: None,
            },
        }
    }

    /// Wrap a network-level failure.
    pub fn network(err: HttpError) -> Self {
        ChatError::Generic {
            status: 0,
            message: format!("Connection error: {}", err),
            body: Value::Null,
            source: Some(err),
        }
    }

    /// A named resource could not be found without an HTTP round trip.
    pub fn not_found(message: impl Into<String>) -> Self {
        ChatError::NotFound {
            message: message.into(),
            body: Value::Null,
        }
    }

    /// A successful response whose body could not be decoded.
    pub fn decode(status: u16, message: impl Into<String>, body: Value) -> Self {
        ChatError::Generic {
            status,
            message: message.into(),
            body,
            source: None,
        }
    }

    /// The caller supplied an unusable argument; nothing was sent.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ChatError::Generic {
            status: 0,
            message: message.into(),
            body: Value::Null,
            source: None,
        }
    }

    /// HTTP status code, or 0 when no response was received.
    pub fn status_code(&self) -> u16 {
        match self {
            ChatError::NotFound { .. } => 404,
            ChatError::Conflict { .. } => 409,
            ChatError::RateLimit { .. } => 429,
            ChatError::Auth { status, .. } => *status,
            ChatError::Generic { status, .. } => *status,
        }
    }

    /// Response body (parsed JSON, or the raw text as a JSON string).
    pub fn body(&self) -> &Value {
        match self {
            ChatError::NotFound { body, .. }
            | ChatError::Conflict { body, .. }
            | ChatError::RateLimit { body, .. }
            | ChatError::Auth { body, .. }
            | ChatError::Generic { body, .. } => body,
        }
    }

    /// Human-readable message, same as `to_string()`.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// How long the server asked us to wait, for rate-limit errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ChatError::RateLimit {
                retry_after_secs, ..
            } => Duration::try_from_secs_f64(*retry_after_secs).ok(),
            _ => None,
        }
    }

    /// True when the request never produced an HTTP response.
    pub fn is_network(&self) -> bool {
        matches!(self, ChatError::Generic { source: Some(_), .. })
    }

    /// Check if the same request could succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::RateLimit { .. } => true,
            ChatError::Generic {
                source: Some(err), ..
            } => err.is_transient(),
            ChatError::Generic { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get a short error code for logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            ChatError::NotFound { .. } => "E_CHAT_NOT_FOUND",
            ChatError::Conflict { .. } => "E_CHAT_CONFLICT",
            ChatError::RateLimit { .. } => "E_CHAT_RATE",
            ChatError::Auth { .. } => "E_CHAT_AUTH",
            ChatError::Generic { source: Some(_), .. } => "E_CHAT_NET",
            ChatError::Generic { .. } => "E_CHAT_HTTP",
        }
    }
}

fn error_field(body: &Value) -> Option<String> {
    match body {
        Value::Object(map) => map.get("error").map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn body_summary(body: &Value) -> String {
    match body {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = "http://localhost:3006/api/v1/rooms/x";

    #[test]
    fn test_404_without_body() {
        let err = ChatError::from_response(404, Value::String(String::new()), None, URL);
        assert!(matches!(err, ChatError::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), format!("Not found: {}", URL));
    }

    #[test]
    fn test_409_uses_error_field() {
        let err = ChatError::from_response(409, json!({"error": "dup"}), None, URL);
        match &err {
            ChatError::Conflict { message, .. } => assert_eq!(message, "dup"),
            other => panic!("Expected Conflict, got {:?}", other),
        }
        assert_eq!(err.body(), &json!({"error": "dup"}));
    }

    #[test]
    fn test_409_without_error_field() {
        let err = ChatError::from_response(409, json!({}), None, URL);
        assert_eq!(err.to_string(), "Conflict");
    }

    #[test]
    fn test_429_retry_after_from_body() {
        let err = ChatError::from_response(429, json!({"retry_after_secs": 2.5}), None, URL);
        match err {
            ChatError::RateLimit {
                retry_after_secs, ..
            } => assert_eq!(retry_after_secs, 2.5),
            other => panic!("Expected RateLimit, got {:?}", other),
        }
    }

    #[test]
    fn test_429_defaults_to_zero() {
        let err = ChatError::from_response(429, Value::String("slow down".to_string()), None, URL);
        assert_eq!(err.retry_after(), Some(Duration::ZERO));
    }

    #[test]
    fn test_429_falls_back_to_header() {
        let err = ChatError::from_response(429, json!({}), Some(7.0), URL);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_auth_statuses() {
        let unauthorized = ChatError::from_response(401, json!({"error": "bad key"}), None, URL);
        assert!(matches!(unauthorized, ChatError::Auth { status: 401, .. }));
        assert_eq!(unauthorized.to_string(), "bad key");

        let forbidden = ChatError::from_response(403, Value::Null, None, URL);
        assert!(matches!(forbidden, ChatError::Auth { status: 403, .. }));
        assert_eq!(forbidden.to_string(), "Auth required");
    }

    #[test]
    fn test_other_status_is_generic() {
        let err = ChatError::from_response(500, Value::String("boom".to_string()), None, URL);
        match &err {
            ChatError::Generic { status, source, .. } => {
                assert_eq!(*status, 500);
                assert!(source.is_none());
            }
            other => panic!("Expected Generic, got {:?}", other),
        }
        assert_eq!(err.to_string(), "HTTP 500: boom");
        assert!(err.is_retryable());
        assert!(!err.is_network());
    }

    #[test]
    fn test_network_error_keeps_source() {
        let err = ChatError::network(HttpError::ConnectionFailed("refused".to_string()));
        assert_eq!(err.status_code(), 0);
        assert!(err.is_network());
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "E_CHAT_NET");
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Connection failed: refused"));
    }

    #[test]
    fn test_client_errors_not_retryable() {
        assert!(!ChatError::not_found("Room 'x' not found").is_retryable());
        assert!(!ChatError::from_response(400, Value::Null, None, URL).is_retryable());
        assert!(!ChatError::invalid_argument("sender is required").is_retryable());
    }
}
