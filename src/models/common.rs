//! Common types shared across Zendesk API models.
//!
//! This module defines response envelopes, the Zendesk error body and
//! small helpers used by multiple endpoints.

use serde::{Deserialize, Deserializer};

use crate::error::BridgeError;

/// Deserializes `null` as the type's default (Zendesk sends `null` for empty lists).
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response of the generic `/search.json` endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct SearchResults<T> {
    /// Matching records for the requested page.
    #[serde(default = "Vec::new", deserialize_with = "null_as_default")]
    pub results: Vec<T>,

    /// Total number of matches across all pages.
    #[serde(default)]
    pub count: u64,

    /// URL of the next page, if any.
    #[serde(default)]
    pub next_page: Option<String>,

    /// URL of the previous page, if any.
    #[serde(default)]
    pub previous_page: Option<String>,
}

impl<T> Default for SearchResults<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            count: 0,
            next_page: None,
            previous_page: None,
        }
    }
}

impl<T> SearchResults<T> {
    /// Appends another page or another scoped search onto this one.
    pub fn merge(&mut self, other: SearchResults<T>) {
        self.results.extend(other.results);
        self.count += other.count;
        if self.next_page.is_none() {
            self.next_page = other.next_page;
        }
        if self.previous_page.is_none() {
            self.previous_page = other.previous_page;
        }
    }
}

/// Error body returned by Zendesk on 4xx responses.
///
/// `error` is either a short code string or an object with `title`/`message`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Error code or structured error.
    #[serde(default)]
    pub error: serde_json::Value,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

impl ErrorBody {
    /// Converts the body into a `BridgeError::Api`.
    pub fn into_error(self) -> BridgeError {
        let (code, message) = match &self.error {
            serde_json::Value::String(code) => (code.clone(), None),
            serde_json::Value::Object(map) => (
                map.get("title")
                    .and_then(|t| t.as_str())
                    .unwrap_or("Unknown")
                    .to_string(),
                map.get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string),
            ),
            _ => ("Unknown".to_string(), None),
        };

        let description = self
            .description
            .or(message)
            .unwrap_or_else(|| "Unknown error".to_string());

        BridgeError::api(code, description)
    }
}

/// Formats an ISO 8601 timestamp for display by blanking the `T` and `Z` markers.
///
/// `2020-01-01T10:00:00Z` becomes `2020-01-01 10:00:00 `.
pub fn format_date(date: &str) -> String {
    date.replace(['T', 'Z'], " ")
}
