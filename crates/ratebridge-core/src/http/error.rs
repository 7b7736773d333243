//! HTTP error classification and normalization
//!
//! Normalizes failed external-system calls (non-2xx replies, timeouts,
//! connection failures) into one error shape.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Longest raw body kept as an error message
const MAX_MESSAGE_LEN: usize = 512;

/// Classification of HTTP errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClassification {
    /// Client errors (4xx)
    ClientError,
    /// Server errors (5xx)
    ServerError,
    /// Connection failures
    NetworkError,
    /// The call did not complete in time
    TimeoutError,
    /// Rate limiting (429)
    RateLimitError,
    /// Authentication errors (401, 403)
    AuthenticationError,
    /// Unknown errors
    Unknown,
}

impl ErrorClassification {
    /// Whether a caller-side retry policy could reasonably retry this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorClassification::ServerError
                | ErrorClassification::NetworkError
                | ErrorClassification::TimeoutError
                | ErrorClassification::RateLimitError
        )
    }

    /// Classify HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorClassification::AuthenticationError,
            408 => ErrorClassification::TimeoutError,
            429 => ErrorClassification::RateLimitError,
            400..=499 => ErrorClassification::ClientError,
            500..=599 => ErrorClassification::ServerError,
            _ => ErrorClassification::Unknown,
        }
    }
}

/// Normalized HTTP error representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpError {
    /// HTTP status code if available
    pub status_code: Option<u16>,
    pub classification: ErrorClassification,
    /// Human-readable error message
    pub message: String,
    /// Parsed JSON error body, if the body was JSON
    pub details: Option<Value>,
    /// Retry-After header value if present
    pub retry_after: Option<u64>,
}

impl HttpError {
    /// Build from a non-2xx reply
    pub fn from_status(status: u16, body: &str, retry_after: Option<u64>) -> Self {
        let details = serde_json::from_str::<Value>(body).ok();
        let message = Self::extract_message(details.as_ref(), body);
        Self {
            status_code: Some(status),
            classification: ErrorClassification::from_status(status),
            message,
            details,
            retry_after,
        }
    }

    /// Create from a network/request error
    pub fn from_request_error(error: reqwest::Error) -> Self {
        let classification = if error.is_timeout() {
            ErrorClassification::TimeoutError
        } else if error.is_connect() || error.is_request() {
            ErrorClassification::NetworkError
        } else {
            ErrorClassification::Unknown
        };

        Self {
            status_code: error.status().map(|s| s.as_u16()),
            classification,
            message: error.to_string(),
            details: None,
            retry_after: None,
        }
    }

    /// The call exceeded its deadline
    pub fn timeout(after: Duration) -> Self {
        Self {
            status_code: None,
            classification: ErrorClassification::TimeoutError,
            message: format!("request timed out after {} ms", after.as_millis()),
            details: None,
            retry_after: None,
        }
    }

    /// Connection-level failure
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            classification: ErrorClassification::NetworkError,
            message: message.into(),
            details: None,
            retry_after: None,
        }
    }

    /// Pull a readable message out of an error body
    ///
    /// JSON bodies are searched for `error.message`, `message` and `error`;
    /// SOAP faults for `faultstring`. Anything else is returned as is,
    /// truncated.
    fn extract_message(details: Option<&Value>, body: &str) -> String {
        if let Some(json) = details {
            let candidate = json
                .pointer("/error/message")
                .or_else(|| json.get("message"))
                .or_else(|| json.get("error"))
                .and_then(Value::as_str);
            if let Some(message) = candidate {
                return message.to_string();
            }
        }

        if let Some(start) = body.find("<faultstring>") {
            let rest = &body[start + "<faultstring>".len()..];
            if let Some(end) = rest.find("</faultstring>") {
                return rest[..end].trim().to_string();
            }
        }

        let trimmed = body.trim();
        if trimmed.is_empty() {
            return "empty response body".to_string();
        }
        trimmed.chars().take(MAX_MESSAGE_LEN).collect()
    }

    pub fn classification(&self) -> ErrorClassification {
        self.classification
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HTTP Error [{}]: {} (classification: {:?})",
            self.status_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            self.message,
            self.classification
        )
    }
}

impl std::error::Error for HttpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(ErrorClassification::from_status(401), ErrorClassification::AuthenticationError);
        assert_eq!(ErrorClassification::from_status(429), ErrorClassification::RateLimitError);
        assert_eq!(ErrorClassification::from_status(422), ErrorClassification::ClientError);
        assert_eq!(ErrorClassification::from_status(503), ErrorClassification::ServerError);
        assert!(ErrorClassification::ServerError.is_retryable());
        assert!(!ErrorClassification::ClientError.is_retryable());
    }

    #[test]
    fn test_message_extraction() {
        let err = HttpError::from_status(400, r#"{"error": {"message": "bad state code"}}"#, None);
        assert_eq!(err.message, "bad state code");
        assert!(err.details.is_some());

        let err = HttpError::from_status(
            500,
            "<soap:Fault><faultcode>Server</faultcode><faultstring> Rating engine down </faultstring></soap:Fault>",
            None,
        );
        assert_eq!(err.message, "Rating engine down");

        let err = HttpError::from_status(502, "", Some(10));
        assert_eq!(err.message, "empty response body");
        assert_eq!(err.retry_after, Some(10));
    }

    #[test]
    fn test_display() {
        let err = HttpError::timeout(Duration::from_millis(1500));
        assert_eq!(
            err.to_string(),
            "HTTP Error [N/A]: request timed out after 1500 ms (classification: TimeoutError)"
        );
    }
}
