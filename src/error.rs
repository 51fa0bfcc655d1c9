//! Error types for the Zendesk bridge.
//!
//! This module defines `BridgeError`, the unified error type used throughout
//! the crate for consistent error handling and propagation.
//!
//! Failures from Zendesk (authentication, transport, malformed responses) are
//! surfaced unchanged in meaning. "Nothing found" is never an error here:
//! lookups return `None` or an empty collection instead.
//!
//! # Security
//!
//! Error messages may be built from response bodies. Use `sanitize_message()`
//! before logging anything that could echo the API token or the SSO key.

use std::time::Duration;
use thiserror::Error;

/// Unified error type for all bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A `ZENDESK_*` variable is missing or holds an unusable value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request never got a response from Zendesk.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// The reqwest client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Zendesk answered with an unexpected status.
    #[error("HTTP {status}: {body}")]
    HttpStatus {
        /// Response status.
        status: reqwest::StatusCode,
        /// Truncated, sanitized response body.
        body: String,
    },

    /// Request timed out.
    #[error("request timed out after {duration:?} - Zendesk may be slow or unreachable")]
    Timeout {
        /// Client timeout that elapsed.
        duration: Duration,
        /// Method and path of the request.
        operation: String,
    },

    /// Rate limited by Zendesk (HTTP 429). Not retried.
    #[error("rate limited by Zendesk - please wait before retrying")]
    RateLimited {
        /// Delay suggested by the `Retry-After` header, if any.
        retry_after: Option<Duration>,
    },

    /// Zendesk rejected the request with a structured error body.
    #[error("Zendesk API error {error}: {description}")]
    Api {
        /// Short error code, e.g. `RecordInvalid`.
        error: String,
        /// Human-readable description from Zendesk.
        description: String,
    },

    /// A payload did not match the expected JSON shape.
    #[error("malformed JSON payload: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Zendesk returned 404 for a ticket or other record.
    #[error("not found: {id}")]
    NotFound {
        /// Identifier of the missing resource.
        id: String,
    },

    /// Authentication failed - invalid username or API token.
    #[error("authentication failed - check ZENDESK_USERNAME and ZENDESK_API_TOKEN")]
    Authentication,

    /// Caller input was rejected before any request was sent.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Signing or verifying an SSO token failed.
    #[error("SSO token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// The startup credentials check against `/users/me.json` failed.
    #[error("connection test failed: {message}")]
    ConnectionTest {
        /// What went wrong.
        message: String,
    },
}

impl BridgeError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        BridgeError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        BridgeError::Config(message.into())
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        BridgeError::Validation(message.into())
    }

    /// Creates a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        BridgeError::NotFound { id: id.into() }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        BridgeError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Creates a Zendesk API error.
    pub fn api(error: impl Into<String>, description: impl Into<String>) -> Self {
        BridgeError::Api {
            error: error.into(),
            description: description.into(),
        }
    }

    /// Creates a connection test error.
    pub fn connection_test(message: impl Into<String>) -> Self {
        BridgeError::ConnectionTest {
            message: message.into(),
        }
    }

    /// Sanitizes an error message by removing every given secret.
    ///
    /// Each non-empty secret is replaced with `[REDACTED]`.
    #[must_use]
    pub fn sanitize_message(message: &str, secrets: &[&str]) -> String {
        secrets
            .iter()
            .filter(|secret| !secret.is_empty())
            .fold(message.to_string(), |acc, secret| {
                acc.replace(secret, "[REDACTED]")
            })
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, secrets: &[&str]) -> String {
        Self::sanitize_message(&self.to_string(), secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_error() {
        let err = BridgeError::missing_env("ZENDESK_API_TOKEN");
        assert!(err.to_string().contains("ZENDESK_API_TOKEN"));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_validation_error() {
        let err = BridgeError::validation("email is required");
        assert_eq!(err.to_string(), "invalid input: email is required");
    }

    #[test]
    fn test_not_found_error() {
        let err = BridgeError::not_found("ticket 12345");
        assert_eq!(err.to_string(), "not found: ticket 12345");
    }

    #[test]
    fn test_timeout_error() {
        let err = BridgeError::timeout(Duration::from_secs(30), "GET /search.json");
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("30s"));
    }

    #[test]
    fn test_api_error_display() {
        let err = BridgeError::api("RecordInvalid", "Record validation errors");
        assert_eq!(
            err.to_string(),
            "Zendesk API error RecordInvalid: Record validation errors"
        );
    }

    #[test]
    fn test_sanitize_message_removes_all_secrets() {
        let message = "token abc123 and key s3cr3t leaked";
        let sanitized = BridgeError::sanitize_message(message, &["abc123", "s3cr3t"]);
        assert!(!sanitized.contains("abc123"));
        assert!(!sanitized.contains("s3cr3t"));
        assert_eq!(sanitized, "token [REDACTED] and key [REDACTED] leaked");
    }

    #[test]
    fn test_sanitize_message_skips_empty_secret() {
        let message = "Some error message";
        let sanitized = BridgeError::sanitize_message(message, &[""]);
        assert_eq!(sanitized, message);
    }

    #[test]
    fn test_sanitized_display() {
        let err = BridgeError::validation("bad token tok_999");
        assert_eq!(
            err.sanitized_display(&["tok_999"]),
            "invalid input: bad token [REDACTED]"
        );
    }

    #[test]
    fn test_connection_test_error() {
        let err = BridgeError::connection_test("Could not reach Zendesk");
        let msg = err.to_string();
        assert!(msg.contains("connection test failed"));
        assert!(msg.contains("Could not reach Zendesk"));
    }
}
