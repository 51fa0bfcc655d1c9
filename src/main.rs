//! Zendesk Bridge - MCP server for a Zendesk help desk
//!
//! This binary runs as an MCP server using stdio transport, letting an
//! assistant file and look up support tickets on behalf of end users.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `ZENDESK_SUBDOMAIN`: Account subdomain
//! - `ZENDESK_USERNAME`: Agent email
//! - `ZENDESK_API_TOKEN`: Agent API token
//! - `ZENDESK_SSO_KEY`: JWT single sign-on secret
//!
//! # Usage
//!
//! ```bash
//! ZENDESK_SUBDOMAIN=acme ZENDESK_USERNAME=agent@acme.com \
//!     ZENDESK_API_TOKEN=6wiIBWbGkBMo1mRDMuVwkw1EPsNkeUj95PIz2akv \
//!     ZENDESK_SSO_KEY=q7fT2pLx9sVbN4mK8rWc3yHd ./zendesk-bridge
//! ```

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{fmt, EnvFilter};

use zendesk_bridge::{config, desk, server};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries MCP JSON-RPC, logs go to stderr
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("zendesk_bridge=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!(
        "Starting Zendesk bridge MCP server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = config::Config::from_env().context("Failed to load configuration")?;

    tracing::debug!(
        subdomain = %config.subdomain,
        api_base = %config.api_base,
        "Configuration loaded"
    );

    let desk = desk::SupportDesk::new(&config);
    desk.connect().context("Failed to create Zendesk client")?;

    tracing::info!(
        username = %desk.client().username(),
        "Testing connection to Zendesk..."
    );

    if let Err(e) = desk.client().test_connection().await {
        tracing::error!(error = %e, "Connection test failed");
        tracing::warn!(
            "Server will start but may not be able to reach Zendesk. \
             Check configuration and network connectivity."
        );
    }

    let server = server::BridgeServer::new(desk);

    tracing::info!("Server initialized, starting stdio transport");

    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| {
            tracing::error!("serving error: {:?}", e);
        })
        .context("Failed to start server")?;

    tracing::info!("Server running, waiting for requests");

    service
        .waiting()
        .await
        .context("Server error during operation")?;

    tracing::info!("Server shutting down");

    Ok(())
}
