//! Comment and attachment models for the Zendesk API.

use serde::{Deserialize, Serialize};

use super::common::null_as_default;

/// A file attached to a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique attachment id.
    pub id: u64,

    /// Original file name.
    #[serde(default)]
    pub file_name: Option<String>,

    /// Download URL.
    #[serde(default)]
    pub content_url: Option<String>,

    /// MIME type.
    #[serde(default)]
    pub content_type: Option<String>,

    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
}

/// A comment on a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Unique comment id.
    pub id: u64,

    /// Author user id.
    #[serde(default)]
    pub author_id: Option<u64>,

    /// Plain text body.
    #[serde(default)]
    pub body: Option<String>,

    /// Whether the requester can see the comment.
    #[serde(default)]
    pub public: Option<bool>,

    /// Creation timestamp (ISO 8601).
    #[serde(default)]
    pub created_at: Option<String>,

    /// Attached files.
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,
}

impl Comment {
    /// Returns the body or a placeholder.
    pub fn display_body(&self) -> &str {
        self.body.as_deref().unwrap_or("(No content)")
    }
}

/// Response wrapper for listing comments.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentsResponse {
    /// Comments on the requested page.
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: Vec<Comment>,

    /// Total comment count, when reported.
    #[serde(default)]
    pub count: Option<u64>,
}

/// A pending upload; its token is attached to a comment to link the file.
#[derive(Debug, Clone, Deserialize)]
pub struct Upload {
    /// Token to pass in a comment's `uploads` list.
    pub token: String,

    /// The attachment created for the upload.
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

/// Response wrapper for `uploads.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    /// The upload.
    pub upload: Upload,
}
