//! # Zendesk Bridge
//!
//! Zendesk Bridge connects a host application's users to a Zendesk help desk.
//!
//! It files tickets on behalf of end users, lists and enriches their tickets,
//! reads comments, and signs users into the help center with single sign-on
//! links. The same operations are exposed as MCP tools by the bundled binary.
//!
//! ## Features
//!
//! - **Tickets**: File tickets for end users, list them with typed filters,
//!   view a single ticket and its comments
//! - **Enrichment**: Tickets carry derived `closed_at`, `app` and `user_id`
//!   fields computed locally
//! - **Single sign-on**: HS256-signed JWT links into the help center
//! - **Security**: The API token is never logged or exposed in error messages
//!
//! ## Architecture
//!
//! - [`config`] - Configuration loading from environment variables
//! - [`error`] - Error types with secret sanitization
//! - [`client`] - HTTP client for the Zendesk REST API
//! - [`query`] - Search query builder
//! - [`enrich`] - Derived ticket fields
//! - [`sso`] - Single sign-on link signing
//! - [`desk`] - Support desk operations and per-user session state
//! - [`server`] - MCP server implementation with tool routing
//! - [`models`] - Data models for Zendesk API requests and responses
//! - [`tools`] - Tool input parameter structs
//!
//! ## Configuration
//!
//! Required environment variables:
//!
//! - `ZENDESK_SUBDOMAIN`: Account subdomain (`acme` for `acme.zendesk.com`)
//! - `ZENDESK_USERNAME`: Agent email used for API authentication
//! - `ZENDESK_API_TOKEN`: Agent API token
//! - `ZENDESK_SSO_KEY`: Shared secret for JWT single sign-on
//!
//! Optional:
//! - `ZENDESK_REDIRECT_PAGE`: Page users land on after their SSO session expires
//! - `ZENDESK_APP_NAME_FIELD_ID`: Id of the ticket custom field holding the app name
//! - `ZENDESK_API_URL`: Override for the API base URL
//! - `RUST_LOG`: Log level (e.g., `zendesk_bridge=debug`)
//!
//! ## Example
//!
//! ```ignore
//! use zendesk_bridge::config::Config;
//! use zendesk_bridge::desk::{SupportDesk, SupportSession};
//! use zendesk_bridge::query::TicketFilter;
//!
//! async fn example() -> Result<(), zendesk_bridge::error::BridgeError> {
//!     let config = Config::from_env()?;
//!     let desk = SupportDesk::new(&config);
//!
//!     let mut session = SupportSession::new();
//!     desk.set_user_search(&mut session, 42).await?;
//!
//!     let query = TicketFilter::new().with_status("open").to_query();
//!     for ticket in desk.user_tickets(&mut session, &query, None).await? {
//!         println!("#{}: {}", ticket.id, ticket.display_subject());
//!     }
//!     println!("closed: {}", session.user_tickets_count(Some("closed")));
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod desk;
pub mod enrich;
pub mod error;
pub mod models;
pub mod query;
pub mod server;
pub mod sso;
pub mod tools;
