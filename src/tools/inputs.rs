//! Parameters accepted by the bridge's MCP tools.
//!
//! Each struct derives `JsonSchema` so clients can discover the tool
//! arguments. Call `sanitize()` first: it trims strings and drops blank
//! optional values.

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;

use crate::desk::NewTicket;
use crate::models::locale;
use crate::query::TicketFilter;

/// Trims an optional string, mapping blank values to `None`.
fn trim_option(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Maps a locale code to a Zendesk locale id. Unknown codes fall back to English.
fn locale_id(code: Option<&str>) -> u32 {
    match code.map(|c| c.to_ascii_lowercase()).as_deref() {
        Some("ru") => locale::RU,
        _ => locale::EN,
    }
}

/// Input parameters for the support_link tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SupportLinkInput {
    /// Display name of the user to sign in.
    #[serde(default)]
    pub name: String,

    /// Email of the user to sign in.
    #[serde(default)]
    pub email: String,
}

impl SupportLinkInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}

/// Input parameters for the create_ticket tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateTicketInput {
    /// Local application user id, if the requester has an account.
    #[serde(default)]
    pub local_user_id: Option<u64>,

    /// Requester name.
    pub name: String,

    /// Requester email (required).
    pub email: String,

    /// Ticket subject (required, max 250 characters).
    pub subject: String,

    /// Message describing the problem (required).
    pub message: String,

    /// Requester locale: 'en' or 'ru' (default: 'en').
    #[serde(default)]
    pub locale: Option<String>,

    /// Name of the application the ticket is about.
    #[serde(default)]
    pub app_name: Option<String>,

    /// Zendesk brand id to file the ticket under.
    #[serde(default)]
    pub brand_id: Option<u64>,

    /// Upload tokens returned by earlier uploads.
    #[serde(default)]
    pub uploads: Vec<String>,
}

impl CreateTicketInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            local_user_id: self.local_user_id,
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
            locale: trim_option(&self.locale),
            app_name: trim_option(&self.app_name),
            brand_id: self.brand_id,
            uploads: self
                .uploads
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Converts the input into a ticket request.
    pub fn to_new_ticket(&self) -> NewTicket {
        NewTicket {
            local_user_id: self.local_user_id,
            name: self.name.clone(),
            email: self.email.clone(),
            message: self.message.clone(),
            subject: self.subject.clone(),
            locale_id: locale_id(self.locale.as_deref()),
            app_name: self.app_name.clone().unwrap_or_default(),
            brand_id: self.brand_id,
            uploads: self.uploads.clone(),
        }
    }
}

/// Input parameters for the list_user_tickets tool.
///
/// All fields are optional - use them to filter the results.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListUserTicketsInput {
    /// Only tickets of this local user (resolved through the Zendesk external id).
    #[serde(default)]
    pub local_user_id: Option<u64>,

    /// Filter by status: 'new', 'open', 'pending', 'hold', 'solved' or 'closed'.
    #[serde(default)]
    pub status: Option<String>,

    /// Filter by priority: 'low', 'normal', 'high' or 'urgent'.
    #[serde(default)]
    pub priority: Option<String>,

    /// Words that must appear in the subject.
    #[serde(default)]
    pub subject: Option<String>,

    /// Filter tickets created after this date (YYYY-MM-DD).
    #[serde(default)]
    pub created_after: Option<String>,

    /// Filter tickets created before this date (YYYY-MM-DD).
    #[serde(default)]
    pub created_before: Option<String>,

    /// Results page, starting at 1.
    #[serde(default)]
    pub page: Option<u32>,
}

impl ListUserTicketsInput {
    /// Sanitizes input by trimming whitespace from all string fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            local_user_id: self.local_user_id,
            status: trim_option(&self.status).map(|s| s.to_lowercase()),
            priority: trim_option(&self.priority).map(|s| s.to_lowercase()),
            subject: trim_option(&self.subject),
            created_after: trim_option(&self.created_after),
            created_before: trim_option(&self.created_before),
            page: self.page,
        }
    }

    /// Builds the ticket filter for this input.
    pub fn to_filter(&self) -> TicketFilter {
        TicketFilter {
            status: self.status.clone(),
            priority: self.priority.clone(),
            subject: self.subject.clone(),
            created_after: self.created_after.clone(),
            created_before: self.created_before.clone(),
            ..TicketFilter::default()
        }
    }
}

/// Input parameters for the get_ticket tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetTicketInput {
    /// The id of the ticket to retrieve.
    pub ticket_id: u64,
}

/// Input parameters for the list_comments tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListCommentsInput {
    /// The id of the ticket.
    pub ticket_id: u64,

    /// If true, only return the most recent comment.
    #[serde(default)]
    pub latest_only: Option<bool>,
}
