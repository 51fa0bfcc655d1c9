//! MCP server implementation for the Zendesk bridge.
//!
//! This module defines the `BridgeServer` struct that implements the MCP
//! `ServerHandler` trait, exposing support desk operations as tools.
//!
//! Every tool call works on its own `SupportSession`, so concurrent calls
//! never see each other's cached users or tickets.

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use serde_json::Value;

use crate::desk::{SupportDesk, SupportSession};
use crate::enrich::{FIELD_APP, FIELD_CLOSED_AT, FIELD_USER_ID};
use crate::error::BridgeError;
use crate::models::{format_date, Comment, CreatedTicket, Ticket};
use crate::tools::{
    CreateTicketInput, GetTicketInput, ListCommentsInput, ListUserTicketsInput, SupportLinkInput,
};

/// Maximum subject length accepted by create_ticket.
const MAX_SUBJECT_LENGTH: usize = 250;

/// The Zendesk bridge MCP server.
#[derive(Clone)]
pub struct BridgeServer {
    /// Support desk for API operations.
    desk: SupportDesk,
    /// Tool router for MCP tool dispatch.
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl BridgeServer {
    /// Creates a new server instance.
    pub fn new(desk: SupportDesk) -> Self {
        Self {
            desk,
            tool_router: Self::tool_router(),
        }
    }

    /// A simple ping tool to verify the server is running.
    #[tool(description = "Test connectivity to the Zendesk bridge. Returns 'pong' if the server is running correctly.")]
    fn ping(&self) -> String {
        tracing::debug!("ping tool called");
        "pong".to_string()
    }

    /// Build a single sign-on link into the help center.
    #[tool(description = "Build a single sign-on link that logs a user into the Zendesk help center. Name and email are required; returns a notice instead of a link when either is empty.")]
    async fn support_link(
        &self,
        Parameters(input): Parameters<SupportLinkInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!("support_link tool called");

        let link = self
            .desk
            .support_link(&input.name, &input.email)
            .map_err(|e| self.tool_error("Failed to build support link", &e))?;

        Ok(format_support_link(link.as_deref(), self.desk.redirect_page()))
    }

    /// File a ticket on behalf of an end user.
    #[tool(description = "Create a Zendesk ticket on behalf of an end user. Email, subject and message are required. The ticket is assigned to the bridge's agent account.")]
    async fn create_ticket(
        &self,
        Parameters(input): Parameters<CreateTicketInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(subject = %input.subject, "create_ticket tool called");

        if input.email.is_empty() {
            return Err("Email is required and cannot be empty.".to_string());
        }
        if input.subject.is_empty() {
            return Err("Subject is required and cannot be empty.".to_string());
        }
        if input.subject.chars().count() > MAX_SUBJECT_LENGTH {
            return Err(format!(
                "Subject exceeds maximum length of {} characters (got {} characters).",
                MAX_SUBJECT_LENGTH,
                input.subject.chars().count()
            ));
        }
        if input.message.is_empty() {
            return Err("Message is required and cannot be empty.".to_string());
        }

        let mut session = SupportSession::new();
        if let Some(local_user_id) = input.local_user_id {
            self.desk
                .set_user_search(&mut session, local_user_id)
                .await
                .map_err(|e| self.tool_error("Failed to look up requester", &e))?;
        }

        let created = self
            .desk
            .create_ticket(&session, &input.to_new_ticket())
            .await
            .map_err(|e| self.tool_error("Failed to create ticket", &e))?;

        Ok(format_create_result(&created))
    }

    /// List tickets, optionally only those of one local user.
    #[tool(description = "List Zendesk tickets, optionally only those filed by one local user. Can filter by status, priority, subject words and creation date. Returns ticket id, subject, status, app and close date.")]
    async fn list_user_tickets(
        &self,
        Parameters(input): Parameters<ListUserTicketsInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(?input, "list_user_tickets tool called");

        let mut session = SupportSession::new();
        if let Some(local_user_id) = input.local_user_id {
            self.desk
                .set_user_search(&mut session, local_user_id)
                .await
                .map_err(|e| self.tool_error("Failed to look up user", &e))?;
        }

        let query = input.to_filter().to_query();
        let tickets = self
            .desk
            .user_tickets(&mut session, &query, input.page)
            .await
            .map_err(|e| self.tool_error("Failed to list tickets", &e))?;

        Ok(format_ticket_list(&tickets, &session))
    }

    /// Get full details of a single ticket.
    #[tool(description = "Get full details of a single Zendesk ticket, including who wrote the latest comment.")]
    async fn get_ticket(
        &self,
        Parameters(input): Parameters<GetTicketInput>,
    ) -> Result<String, String> {
        tracing::debug!(ticket_id = input.ticket_id, "get_ticket tool called");

        let mut session = SupportSession::new();
        let ticket = self
            .desk
            .current_ticket(&mut session, Some(input.ticket_id))
            .await
            .map_err(|e| self.tool_error(&format!("Failed to get ticket {}", input.ticket_id), &e))?
            .cloned()
            .ok_or_else(|| format!("Ticket {} not found.", input.ticket_id))?;

        let last_author = match self.desk.last_comment_author_name(ticket.id).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(
                    ticket_id = ticket.id,
                    error = %e.sanitized_display(&self.desk.secrets()),
                    "Failed to resolve last comment author"
                );
                None
            }
        };

        Ok(format_ticket_details(&ticket, last_author.as_deref()))
    }

    /// List the comments of a ticket.
    #[tool(description = "List the comments of a Zendesk ticket. Set latest_only to get just the most recent comment.")]
    async fn list_comments(
        &self,
        Parameters(input): Parameters<ListCommentsInput>,
    ) -> Result<String, String> {
        tracing::debug!(ticket_id = input.ticket_id, "list_comments tool called");

        let comments = if input.latest_only.unwrap_or(false) {
            self.desk
                .last_comment(input.ticket_id)
                .await
                .map(|comment| comment.into_iter().collect::<Vec<_>>())
        } else {
            self.desk.ticket_comments(input.ticket_id).await
        }
        .map_err(|e| {
            self.tool_error(
                &format!("Failed to list comments of ticket {}", input.ticket_id),
                &e,
            )
        })?;

        Ok(format_comments(input.ticket_id, &comments))
    }

    /// Logs a failed tool call and returns the sanitized message for the client.
    fn tool_error(&self, context: &str, error: &BridgeError) -> String {
        let sanitized = error.sanitized_display(&self.desk.secrets());
        tracing::error!(error = %sanitized, "{}", context);
        format!("{}: {}", context, sanitized)
    }
}

#[tool_handler]
impl ServerHandler for BridgeServer {
    /// Returns server information for the MCP initialize handshake.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "The Zendesk bridge files and looks up customer support tickets. \
                 Use list_user_tickets to find tickets (optionally for one local user), \
                 get_ticket for details, list_comments for the conversation, \
                 create_ticket to file a ticket for an end user, and support_link to \
                 give a user a single sign-on link into the help center. \
                 Start with 'ping' to verify connectivity."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Response formatting helpers
// ============================================================================

/// Maximum length for comment bodies before truncation.
const MAX_BODY_LENGTH: usize = 2000;

/// Truncates a string if it exceeds the maximum length (in characters).
fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let cut: String = text.chars().take(max_length.saturating_sub(15)).collect();
    let end = cut.rfind(char::is_whitespace).unwrap_or(cut.len());
    format!("{}... [truncated]", &cut[..end])
}

/// Renders a derived field for display; `None` for null or missing values.
fn derived_text(ticket: &Ticket, field: &str) -> Option<String> {
    match ticket.derived(field)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Formats a ticket listing as human-readable text.
fn format_ticket_list(tickets: &[Ticket], session: &SupportSession) -> String {
    if tickets.is_empty() {
        return "No tickets found matching the criteria.".to_string();
    }

    let mut output = format!(
        "Found {} ticket(s) on this page, {} in total (open: {}, closed: {}):\n\n",
        tickets.len(),
        session.user_tickets_count(None),
        session.user_tickets_count(Some("open")),
        session.user_tickets_count(Some("closed")),
    );

    for ticket in tickets {
        output.push_str(&format!("#{} - {}\n", ticket.id, ticket.display_subject()));
        output.push_str(&format!("   Status: {}", ticket.display_status()));
        if let Some(app) = derived_text(ticket, FIELD_APP) {
            output.push_str(&format!(" | App: {}", app));
        }
        output.push('\n');

        if let Some(created) = &ticket.created_at {
            output.push_str(&format!("   Created: {}\n", format_date(created).trim_end()));
        }
        if let Some(closed) = derived_text(ticket, FIELD_CLOSED_AT) {
            output.push_str(&format!("   Closed: {}\n", format_date(&closed).trim_end()));
        }

        output.push('\n');
    }

    output
}

/// Formats full ticket details as human-readable text.
fn format_ticket_details(ticket: &Ticket, last_author: Option<&str>) -> String {
    let mut output = format!("Ticket #{}: {}\n", ticket.id, ticket.display_subject());
    output.push_str(&"=".repeat(60));
    output.push('\n');

    output.push_str(&format!("\nStatus: {}\n", ticket.display_status()));
    if let Some(priority) = &ticket.priority {
        output.push_str(&format!("Priority: {}\n", priority));
    }
    if let Some(app) = derived_text(ticket, FIELD_APP) {
        output.push_str(&format!("App: {}\n", app));
    }
    if let Some(user_id) = derived_text(ticket, FIELD_USER_ID) {
        output.push_str(&format!("Local user: {}\n", user_id));
    }
    if let Some(requester_id) = ticket.requester_id {
        output.push_str(&format!("Requester id: {}\n", requester_id));
    }
    if let Some(author) = last_author {
        output.push_str(&format!("Last reply by: {}\n", author));
    }

    output.push_str("\n--- Timestamps ---\n");
    if let Some(created) = &ticket.created_at {
        output.push_str(&format!("Created: {}\n", format_date(created).trim_end()));
    }
    if let Some(updated) = &ticket.updated_at {
        output.push_str(&format!("Last Updated: {}\n", format_date(updated).trim_end()));
    }
    if let Some(closed) = derived_text(ticket, FIELD_CLOSED_AT) {
        output.push_str(&format!("Closed: {}\n", format_date(&closed).trim_end()));
    }

    if let Some(description) = &ticket.description {
        output.push_str("\n--- Description ---\n");
        output.push_str(&truncate_text(description, MAX_BODY_LENGTH));
        output.push('\n');
    }

    output
}

/// Formats the comments of a ticket.
fn format_comments(ticket_id: u64, comments: &[Comment]) -> String {
    if comments.is_empty() {
        return format!("Ticket #{} has no comments.", ticket_id);
    }

    let mut output = format!("{} comment(s) on ticket #{}:\n\n", comments.len(), ticket_id);

    for comment in comments {
        let author = comment
            .author_id
            .map_or_else(|| "unknown".to_string(), |id| id.to_string());
        let visibility = if comment.public == Some(false) {
            "internal"
        } else {
            "public"
        };
        output.push_str(&format!(
            "--- #{} by user {} ({}) ",
            comment.id, author, visibility
        ));
        if let Some(created) = &comment.created_at {
            output.push_str(&format!("at {}", format_date(created).trim_end()));
        }
        output.push('\n');
        output.push_str(&truncate_text(comment.display_body(), MAX_BODY_LENGTH));
        output.push('\n');

        if !comment.attachments.is_empty() {
            let names: Vec<&str> = comment
                .attachments
                .iter()
                .map(|a| a.file_name.as_deref().unwrap_or("(unnamed)"))
                .collect();
            output.push_str(&format!("Attachments: {}\n", names.join(", ")));
        }
        output.push('\n');
    }

    output
}

/// Formats a support link, noting where expired sessions are sent.
fn format_support_link(link: Option<&str>, redirect_page: Option<&str>) -> String {
    let Some(link) = link else {
        return "No link generated: both name and email are required.".to_string();
    };

    match redirect_page {
        Some(page) => format!("{}\n\nExpired sessions return to: {}", link, page),
        None => link.to_string(),
    }
}

/// Formats the result of a ticket creation.
fn format_create_result(created: &CreatedTicket) -> String {
    let ticket = &created.ticket;
    let mut output = format!(
        "Successfully created ticket #{}: {}\n",
        ticket.id,
        ticket.display_subject()
    );
    output.push_str(&format!("Status: {}\n", ticket.display_status()));
    if let Some(requester_id) = ticket.requester_id {
        output.push_str(&format!("Requester id: {}\n", requester_id));
    }
    if let Some(assignee_id) = ticket.assignee_id {
        output.push_str(&format!("Assigned to agent id: {}\n", assignee_id));
    }
    output
}
