//! User models for the Zendesk API.
//!
//! End users and agents share one record type in Zendesk.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::null_as_default;

/// Zendesk locale ids for the locales the host application supports.
///
/// Passed through to Zendesk as-is; other ids are not rejected.
pub mod locale {
    /// Russian.
    pub const RU: u32 = 27;
    /// English.
    pub const EN: u32 = 1;
}

/// Prefix of the external id that links a Zendesk user to a local user.
pub const EXTERNAL_ID_PREFIX: &str = "user_";

/// Returns the external id for a local user id, e.g. `user_42`.
pub fn external_id(local_user_id: u64) -> String {
    format!("{}{}", EXTERNAL_ID_PREFIX, local_user_id)
}

/// Parses a `user_<id>` external id back into the local user id.
///
/// Returns `None` for anything else, including `user_` with a non-numeric tail.
pub fn parse_external_id(external_id: &str) -> Option<u64> {
    external_id
        .strip_prefix(EXTERNAL_ID_PREFIX)
        .filter(|tail| !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|tail| tail.parse().ok())
}

/// A Zendesk user (end user or agent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user id.
    pub id: u64,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Primary email.
    #[serde(default)]
    pub email: Option<String>,

    /// `user_<id>` link to the local account, if set.
    #[serde(default)]
    pub external_id: Option<String>,

    /// Locale id.
    #[serde(default)]
    pub locale_id: Option<u32>,

    /// `end-user`, `agent` or `admin`.
    #[serde(default)]
    pub role: Option<String>,

    /// Every other field returned by Zendesk.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Returns the name, falling back to email or id.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Body of `users/create_or_update`.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertUser {
    /// Email used to match an existing user.
    pub email: String,

    /// Display name.
    pub name: String,

    /// Locale id.
    pub locale_id: u32,

    /// External id; only sent when the link should be (re)established.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Response wrapper for single user operations.
#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    /// The user.
    pub user: User,
}

/// Response wrapper for user list and search operations.
#[derive(Debug, Clone, Deserialize)]
pub struct UsersResponse {
    /// Matching users.
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<User>,
}
