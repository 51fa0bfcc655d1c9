//! Support desk operations on behalf of end users.
//!
//! `SupportDesk` combines the Zendesk client, the SSO signer and the custom
//! field configuration. It holds no per-user state: everything cached between
//! calls lives in a [`SupportSession`] owned by the caller, one per end user
//! or request, so a single desk can serve many users concurrently.

use serde_json::{json, Map, Value};

use crate::client::{CommentQuery, ZendeskClient};
use crate::config::{Config, CustomFieldIds};
use crate::enrich::{join_params_to_tickets, tickets_as_array, EnrichmentSpec};
use crate::error::BridgeError;
use crate::models::{
    external_id, Comment, CreatedTicket, SearchResults, Ticket, UpsertUser, User,
};
use crate::query::{SearchQuery, SearchType};
use crate::sso::SsoSigner;

/// Priority given to every ticket filed through the bridge.
pub const TICKET_PRIORITY: &str = "normal";

/// Page requested when the caller does not pass one.
pub const DEFAULT_PAGE: u32 = 1;

/// State carried between calls for one end user.
#[derive(Debug, Clone, Default)]
pub struct SupportSession {
    /// Zendesk users matching the local user; `None` until a search ran.
    user_search: Option<Vec<User>>,

    /// Last ticket listing.
    user_tickets: Option<SearchResults<Ticket>>,

    /// Last ticket fetched by id.
    current_ticket: Option<Ticket>,
}

impl SupportSession {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached user search, or `None` if no search ran yet.
    pub fn user_search(&self) -> Option<&[User]> {
        self.user_search.as_deref()
    }

    /// Replaces the cached user search (e.g. when restoring a session).
    pub fn set_cached_user_search(&mut self, users: Vec<User>) {
        self.user_search = Some(users);
    }

    /// Returns the cached ticket listing.
    pub fn user_tickets(&self) -> Option<&SearchResults<Ticket>> {
        self.user_tickets.as_ref()
    }

    /// Replaces the cached ticket listing.
    pub fn set_cached_user_tickets(&mut self, tickets: SearchResults<Ticket>) {
        self.user_tickets = Some(tickets);
    }

    /// Returns the cached single ticket.
    pub fn current_ticket(&self) -> Option<&Ticket> {
        self.current_ticket.as_ref()
    }

    /// Counts cached tickets.
    ///
    /// With a status, counts the cached results having exactly that status.
    /// Without one, returns the total count Zendesk reported. `0` when no
    /// listing has been cached.
    pub fn user_tickets_count(&self, status: Option<&str>) -> u64 {
        let Some(tickets) = &self.user_tickets else {
            return 0;
        };

        match status.filter(|s| !s.is_empty()) {
            Some(status) => tickets
                .results
                .iter()
                .filter(|ticket| ticket.status.as_deref() == Some(status))
                .count() as u64,
            None => tickets.count,
        }
    }

    /// Drops all cached state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A ticket to file for an end user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    /// Local user id; links the Zendesk user through `user_<id>`.
    pub local_user_id: Option<u64>,
    /// Requester name.
    pub name: String,
    /// Requester email.
    pub email: String,
    /// First comment body.
    pub message: String,
    /// Subject line.
    pub subject: String,
    /// Requester locale id, see [`crate::models::locale`].
    pub locale_id: u32,
    /// Application the ticket is about; stored in the app name custom field.
    pub app_name: String,
    /// Brand to file the ticket under.
    pub brand_id: Option<u64>,
    /// Upload tokens to attach to the first comment.
    pub uploads: Vec<String>,
}

/// Zendesk support desk for the host application.
#[derive(Clone)]
pub struct SupportDesk {
    client: ZendeskClient,
    sso: SsoSigner,
    custom_fields: CustomFieldIds,
    redirect_page: Option<String>,
    /// SECURITY: only used to scrub messages, never logged.
    sso_key: String,
}

impl SupportDesk {
    /// Creates a desk from configuration. No connection is made yet.
    pub fn new(config: &Config) -> Self {
        Self {
            client: ZendeskClient::new(config),
            sso: SsoSigner::from_config(config),
            custom_fields: config.custom_fields.clone(),
            redirect_page: config.redirect_page.clone(),
            sso_key: config.sso_key().to_string(),
        }
    }

    /// Returns the underlying API client.
    pub fn client(&self) -> &ZendeskClient {
        &self.client
    }

    /// Builds the authenticated HTTP handle if it does not exist yet.
    pub fn connect(&self) -> Result<(), BridgeError> {
        self.client.connect().map(|_| ())
    }

    /// Returns the help center domain.
    pub fn domain(&self) -> &str {
        self.sso.domain()
    }

    /// Returns the page users land on when their SSO session expired.
    pub fn redirect_page(&self) -> Option<&str> {
        self.redirect_page.as_deref()
    }

    /// Returns the secrets to strip from messages shown to users.
    pub(crate) fn secrets(&self) -> [&str; 2] {
        [self.client.api_token_for_sanitization(), &self.sso_key]
    }

    /// Builds a single sign-on link; `None` when name or email is empty.
    pub fn support_link(&self, name: &str, email: &str) -> Result<Option<String>, BridgeError> {
        self.sso.support_link(name, email)
    }

    /// Returns the authenticated agent.
    pub async fn current_user(&self) -> Result<User, BridgeError> {
        self.client.me().await
    }

    /// Looks up the Zendesk users linked to a local user and caches them.
    pub async fn set_user_search(
        &self,
        session: &mut SupportSession,
        local_user_id: u64,
    ) -> Result<(), BridgeError> {
        let users = self
            .client
            .search_users_by_external_id(&external_id(local_user_id))
            .await?;

        tracing::debug!(
            local_user_id = local_user_id,
            matched = users.len(),
            "User search cached"
        );

        session.user_search = Some(users);
        Ok(())
    }

    /// Files a ticket for an end user.
    ///
    /// Upserts the requester by email, assigns the ticket to the authenticated
    /// agent and returns the creation result. The requester's external id is
    /// only written when the session has not already matched a Zendesk user,
    /// so an existing link is never overwritten.
    pub async fn create_ticket(
        &self,
        session: &SupportSession,
        ticket: &NewTicket,
    ) -> Result<CreatedTicket, BridgeError> {
        if ticket.email.trim().is_empty() {
            return Err(BridgeError::validation("requester email is required"));
        }

        let linked_id = ticket.local_user_id.map(external_id);
        let already_linked = session.user_search().is_some_and(|users| !users.is_empty());

        let requester = self
            .client
            .create_or_update_user(&UpsertUser {
                email: ticket.email.clone(),
                name: ticket.name.clone(),
                locale_id: ticket.locale_id,
                external_id: if already_linked {
                    None
                } else {
                    linked_id.clone()
                },
            })
            .await?;

        let agent = self.client.me().await?;

        let custom_fields = match self.custom_fields.app_name {
            Some(field_id) => json!([{ "id": field_id, "value": ticket.app_name }]),
            None => {
                tracing::debug!("No app name field configured, skipping custom field");
                json!([])
            }
        };

        let mut body = json!({
            "subject": ticket.subject,
            "external_id": linked_id,
            "requester_id": requester.id,
            "submitter_id": requester.id,
            "assignee_id": agent.id,
            "comment": {
                "body": ticket.message,
                "uploads": ticket.uploads,
            },
            "priority": TICKET_PRIORITY,
            "custom_fields": custom_fields,
        });
        if let Some(brand_id) = ticket.brand_id {
            body["brand_id"] = json!(brand_id);
        }

        let created = self.client.create_ticket(body).await?;

        tracing::info!(
            ticket_id = created.ticket.id,
            requester_id = requester.id,
            "Ticket created"
        );

        Ok(created)
    }

    /// Searches the session user's tickets and caches the enriched results.
    ///
    /// When the session has matched Zendesk users, one search runs per user
    /// (scoped with `requester_id`) and the results are concatenated. When no
    /// user search ran, the search is unscoped. When the user search matched
    /// nobody, nothing is searched and the listing is empty.
    pub async fn user_tickets(
        &self,
        session: &mut SupportSession,
        query: &SearchQuery,
        page: Option<u32>,
    ) -> Result<Vec<Ticket>, BridgeError> {
        if query.search_type() != SearchType::Ticket {
            return Err(BridgeError::validation(format!(
                "ticket listing needs a ticket query, got type {}",
                query.search_type()
            )));
        }

        let base = query.build();
        let page = page.unwrap_or(DEFAULT_PAGE);
        let scope: Option<Vec<u64>> = session
            .user_search()
            .map(|users| users.iter().map(|user| user.id).collect());

        let mut results = match scope {
            None => self.client.search::<Ticket>(&base, page).await?,
            Some(requester_ids) => {
                let mut merged = SearchResults::default();
                for requester_id in requester_ids {
                    let scoped = format!("{}requester_id:{}", base, requester_id);
                    merged.merge(self.client.search::<Ticket>(&scoped, page).await?);
                }
                merged
            }
        };

        join_params_to_tickets(
            &mut results.results,
            &EnrichmentSpec::standard(self.custom_fields.app_name),
        );

        tracing::debug!(
            returned = results.results.len(),
            total = results.count,
            "User tickets cached"
        );

        let tickets = results.results.clone();
        session.user_tickets = Some(results);
        Ok(tickets)
    }

    /// Like [`user_tickets`](Self::user_tickets), flattened to plain JSON objects.
    pub async fn user_tickets_as_array(
        &self,
        session: &mut SupportSession,
        query: &SearchQuery,
        page: Option<u32>,
    ) -> Result<Vec<Map<String, Value>>, BridgeError> {
        let tickets = self.user_tickets(session, query, page).await?;
        tickets_as_array(&tickets)
    }

    /// Fetches and caches a ticket when an id is given; otherwise returns the
    /// cached one, if any.
    pub async fn current_ticket<'s>(
        &self,
        session: &'s mut SupportSession,
        ticket_id: Option<u64>,
    ) -> Result<Option<&'s Ticket>, BridgeError> {
        if let Some(ticket_id) = ticket_id {
            let mut ticket = self.client.ticket(ticket_id).await?;
            join_params_to_tickets(
                std::slice::from_mut(&mut ticket),
                &EnrichmentSpec::standard(self.custom_fields.app_name),
            );
            session.current_ticket = Some(ticket);
        }

        Ok(session.current_ticket.as_ref())
    }

    /// Returns the most recent comment of a ticket.
    pub async fn last_comment(&self, ticket_id: u64) -> Result<Option<Comment>, BridgeError> {
        let response = self
            .client
            .ticket_comments(ticket_id, CommentQuery::latest())
            .await?;

        Ok(response.comments.into_iter().next())
    }

    /// Returns all comments of a ticket, oldest first.
    pub async fn ticket_comments(&self, ticket_id: u64) -> Result<Vec<Comment>, BridgeError> {
        let response = self
            .client
            .ticket_comments(ticket_id, CommentQuery::default())
            .await?;

        Ok(response.comments)
    }

    /// Looks up a user through the search endpoint.
    pub async fn user_data(&self, user_id: u64) -> Result<Option<User>, BridgeError> {
        let query = format!("type:{},user:{}", SearchType::User, user_id);
        let results = self.client.search::<User>(&query, DEFAULT_PAGE).await?;

        Ok(results.results.into_iter().next())
    }

    /// Returns the display name of whoever wrote the last comment.
    pub async fn last_comment_author_name(
        &self,
        ticket_id: u64,
    ) -> Result<Option<String>, BridgeError> {
        let Some(author_id) = self
            .last_comment(ticket_id)
            .await?
            .and_then(|comment| comment.author_id)
        else {
            return Ok(None);
        };

        Ok(self
            .user_data(author_id)
            .await?
            .and_then(|user| user.name))
    }

    /// Returns the email of the ticket's requester.
    pub async fn requester_email(&self, ticket: &Ticket) -> Result<Option<String>, BridgeError> {
        let Some(requester_id) = ticket.requester_id else {
            return Ok(None);
        };

        Ok(self
            .user_data(requester_id)
            .await?
            .and_then(|user| user.email))
    }

    /// Uploads a file and returns the token to attach to a comment.
    pub async fn upload_file(
        &self,
        data: Vec<u8>,
        content_type: &str,
        file_name: &str,
    ) -> Result<String, BridgeError> {
        self.connect()?;
        let upload = self.client.upload(data, content_type, file_name).await?;
        Ok(upload.token)
    }
}
