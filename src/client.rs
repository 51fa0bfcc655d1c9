//! HTTP client for the Zendesk REST API (v2).
//!
//! This module provides `ZendeskClient`, which holds the credentials, lazily
//! builds the authenticated HTTP handle and exposes the raw endpoints the
//! support desk needs. It does not retry: every failure is returned to the
//! caller as a `BridgeError`.
//!
//! # Authentication
//!
//! Requests use HTTP basic auth with `{username}/token` and the API token.
//!
//! # Security
//!
//! The API token is never logged. Error bodies are sanitized before they are
//! stored in an error.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::Config;
use crate::error::BridgeError;
use crate::models::{
    CommentsResponse, CreatedTicket, ErrorBody, SearchResults, Ticket, TicketResponse, Upload,
    UploadResponse, UpsertUser, User, UserResponse, UsersResponse,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum length for HTTP error response bodies kept in errors.
const MAX_ERROR_BODY_LEN: usize = 500;

/// Ordering and page size for comment listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommentQuery {
    /// Newest first when true. Comments are ordered by `created_at`.
    pub newest_first: bool,
    /// Page size; Zendesk's default when `None`.
    pub per_page: Option<u32>,
}

impl CommentQuery {
    /// Only the most recent comment.
    pub fn latest() -> Self {
        Self {
            newest_first: true,
            per_page: Some(1),
        }
    }
}

/// HTTP client for the Zendesk API.
///
/// Cloning is cheap and clones share one HTTP handle.
#[derive(Clone)]
pub struct ZendeskClient {
    /// Authenticated HTTP handle, built on first use.
    http: Arc<OnceLock<Client>>,

    /// API base, e.g. `https://acme.zendesk.com/api/v2`.
    api_base: String,

    /// Agent email.
    username: String,

    /// API token.
    /// SECURITY: Never log this value!
    api_token: String,
}

impl ZendeskClient {
    /// Creates a client from configuration. No connection is made yet.
    pub fn new(config: &Config) -> Self {
        Self {
            http: Arc::new(OnceLock::new()),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            api_token: config.api_token().to_string(),
        }
    }

    /// Returns the authenticated HTTP handle, building it on first call.
    ///
    /// Idempotent: later calls return the same handle and never rebuild it,
    /// so rotated credentials need a new client.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::HttpClient` if the HTTP client fails to initialize.
    pub fn connect(&self) -> Result<&Client, BridgeError> {
        if let Some(http) = self.http.get() {
            return Ok(http);
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .default_headers(headers)
            .build()
            .map_err(BridgeError::HttpClient)?;

        tracing::debug!(api_base = %self.api_base, "Zendesk HTTP client initialized");

        Ok(self.http.get_or_init(|| http))
    }

    /// Returns true once `connect` has built the handle.
    pub fn is_connected(&self) -> bool {
        self.http.get().is_some()
    }

    /// Returns the agent email requests are made as.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the API token for sanitization purposes only.
    pub(crate) fn api_token_for_sanitization(&self) -> &str {
        &self.api_token
    }

    /// Tests connectivity and credentials by fetching the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::ConnectionTest` describing the failure.
    pub async fn test_connection(&self) -> Result<(), BridgeError> {
        tracing::debug!("Testing connection to Zendesk");

        match self.me().await {
            Ok(user) => {
                tracing::info!(agent_id = user.id, "Connection test successful");
                Ok(())
            }
            Err(BridgeError::Authentication) => Err(BridgeError::connection_test(
                "Authentication failed - verify ZENDESK_USERNAME and ZENDESK_API_TOKEN",
            )),
            Err(BridgeError::Timeout { duration, .. }) => Err(BridgeError::connection_test(format!(
                "Connection timed out after {:?} - verify ZENDESK_SUBDOMAIN and network access",
                duration
            ))),
            Err(e) => {
                let message = e.sanitized_display(&[&self.api_token]);
                Err(BridgeError::connection_test(message))
            }
        }
    }

    /// Builds an authenticated request for an API path.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BridgeError> {
        let url = format!("{}{}", self.api_base, path);

        tracing::debug!(method = %method, path = %path, "Making Zendesk API request");

        Ok(self
            .connect()?
            .request(method, url)
            .basic_auth(format!("{}/token", self.username), Some(&self.api_token)))
    }

    /// Sends a request and parses the JSON response.
    async fn send<T>(&self, req: RequestBuilder, operation: &str) -> Result<T, BridgeError>
    where
        T: DeserializeOwned,
    {
        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                return BridgeError::timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS), operation);
            }
            BridgeError::Http(e)
        })?;
        let status = response.status();

        if !status.is_success() {
            return Err(self.handle_http_error(status, response).await);
        }

        let body = response.text().await.map_err(BridgeError::Http)?;

        tracing::trace!(body = %body, "Zendesk API response");

        serde_json::from_str(&body).map_err(BridgeError::Serialization)
    }

    /// Makes a GET request with query parameters.
    async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, BridgeError>
    where
        T: DeserializeOwned,
    {
        let req = self.request(Method::GET, path)?.query(query);
        self.send(req, &format!("GET {}", path)).await
    }

    /// Makes a POST request with a JSON body.
    async fn post<T>(&self, path: &str, body: serde_json::Value) -> Result<T, BridgeError>
    where
        T: DeserializeOwned,
    {
        let req = self.request(Method::POST, path)?.json(&body);
        self.send(req, &format!("POST {}", path)).await
    }

    /// Classifies HTTP-level errors.
    async fn handle_http_error(&self, status: StatusCode, response: reqwest::Response) -> BridgeError {
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs);

        let body = response.text().await.unwrap_or_default();
        let body = BridgeError::sanitize_message(&body, &[&self.api_token]);

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BridgeError::Authentication,
            StatusCode::NOT_FOUND => BridgeError::not_found("resource"),
            StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!(?retry_after, "Rate limited by Zendesk");
                BridgeError::RateLimited { retry_after }
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                match serde_json::from_str::<ErrorBody>(&body) {
                    Ok(error_body) => error_body.into_error(),
                    Err(_) => BridgeError::HttpStatus {
                        status,
                        body: truncate_body(body),
                    },
                }
            }
            _ => BridgeError::HttpStatus {
                status,
                body: truncate_body(body),
            },
        }
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Finds users by external id.
    pub async fn search_users_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Vec<User>, BridgeError> {
        let response: UsersResponse = self
            .get(
                "/users/search.json",
                &[("external_id", external_id.to_string())],
            )
            .await?;

        Ok(response.users)
    }

    /// Creates a user, or updates the one matching the email.
    pub async fn create_or_update_user(&self, user: &UpsertUser) -> Result<User, BridgeError> {
        let response: UserResponse = self
            .post("/users/create_or_update.json", json!({ "user": user }))
            .await?;

        Ok(response.user)
    }

    /// Returns the authenticated agent.
    pub async fn me(&self) -> Result<User, BridgeError> {
        let response: UserResponse = self.get("/users/me.json", &[]).await?;
        Ok(response.user)
    }

    // ========================================================================
    // Tickets and search
    // ========================================================================

    /// Creates a ticket from a prepared `ticket` object.
    pub async fn create_ticket(
        &self,
        ticket: serde_json::Value,
    ) -> Result<CreatedTicket, BridgeError> {
        self.post("/tickets.json", json!({ "ticket": ticket })).await
    }

    /// Fetches a ticket by id.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::NotFound` naming the ticket if it does not exist.
    pub async fn ticket(&self, ticket_id: u64) -> Result<Ticket, BridgeError> {
        let path = format!("/tickets/{}.json", ticket_id);

        let response: TicketResponse = self.get(&path, &[]).await.map_err(|e| {
            if matches!(e, BridgeError::NotFound { .. }) {
                BridgeError::not_found(format!("ticket {}", ticket_id))
            } else {
                e
            }
        })?;

        Ok(response.ticket)
    }

    /// Runs a search query and returns one page of results.
    pub async fn search<T>(&self, query: &str, page: u32) -> Result<SearchResults<T>, BridgeError>
    where
        T: DeserializeOwned,
    {
        self.get(
            "/search.json",
            &[("query", query.to_string()), ("page", page.max(1).to_string())],
        )
        .await
    }

    // ========================================================================
    // Comments and uploads
    // ========================================================================

    /// Lists comments of a ticket.
    pub async fn ticket_comments(
        &self,
        ticket_id: u64,
        options: CommentQuery,
    ) -> Result<CommentsResponse, BridgeError> {
        let path = format!("/tickets/{}/comments.json", ticket_id);

        let mut query = Vec::new();
        if options.newest_first {
            query.push(("order_by", "created_at".to_string()));
            query.push(("sort_order", "desc".to_string()));
        }
        if let Some(per_page) = options.per_page {
            query.push(("per_page", per_page.to_string()));
        }

        self.get(&path, &query).await.map_err(|e| {
            if matches!(e, BridgeError::NotFound { .. }) {
                BridgeError::not_found(format!("ticket {}", ticket_id))
            } else {
                e
            }
        })
    }

    /// Uploads a file and returns the pending upload.
    pub async fn upload(
        &self,
        data: Vec<u8>,
        content_type: &str,
        file_name: &str,
    ) -> Result<Upload, BridgeError> {
        if file_name.trim().is_empty() {
            return Err(BridgeError::validation("upload file name cannot be empty"));
        }

        let req = self
            .request(Method::POST, "/uploads.json")?
            .query(&[("filename", file_name)])
            .header(header::CONTENT_TYPE, content_type)
            .body(data);

        let response: UploadResponse = self.send(req, "POST /uploads.json").await?;
        Ok(response.upload)
    }
}

/// Truncates an error body to avoid carrying verbose responses around.
fn truncate_body(body: String) -> String {
    if body.len() > MAX_ERROR_BODY_LEN {
        let mut end = MAX_ERROR_BODY_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    } else {
        body
    }
}
