//! Configuration management for the Zendesk bridge.
//!
//! This module handles loading credentials from environment variables,
//! with validation to ensure all required values are present.

use std::env;
use std::fmt;

use url::Url;

use crate::error::BridgeError;

/// Ids of the Zendesk custom ticket fields the bridge writes and reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomFieldIds {
    /// Field holding the name of the application a ticket was filed from.
    pub app_name: Option<u64>,
}

/// Credentials and settings for one Zendesk account.
///
/// Immutable once built. The API token and SSO key must never be logged;
/// the `Debug` impl redacts them.
#[derive(Clone)]
pub struct Config {
    /// Zendesk subdomain, e.g. `acme` for `acme.zendesk.com`.
    pub subdomain: String,

    /// Email of the agent or admin the bridge acts as.
    pub username: String,

    /// API token used for basic authentication.
    api_token: String,

    /// Shared secret for JWT single sign-on.
    sso_key: String,

    /// Page users are sent to when their SSO token is no longer valid.
    pub redirect_page: Option<String>,

    /// Custom ticket field ids.
    pub custom_fields: CustomFieldIds,

    /// REST API base, normally `https://{subdomain}.zendesk.com/api/v2`.
    pub api_base: String,
}

impl Config {
    /// Builds a configuration from explicit values.
    ///
    /// The API base defaults to the subdomain's `/api/v2` endpoint.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Config` if the subdomain is not a valid host label.
    pub fn new(
        subdomain: impl Into<String>,
        username: impl Into<String>,
        api_token: impl Into<String>,
        sso_key: impl Into<String>,
    ) -> Result<Self, BridgeError> {
        let subdomain = Self::validate_subdomain(subdomain.into())?;
        let api_base = format!("https://{}.zendesk.com/api/v2", subdomain);

        Ok(Config {
            subdomain,
            username: username.into(),
            api_token: api_token.into(),
            sso_key: sso_key.into(),
            redirect_page: None,
            custom_fields: CustomFieldIds::default(),
            api_base,
        })
    }

    /// Sets the custom field id used for the application name.
    pub fn with_app_name_field(mut self, field_id: u64) -> Self {
        self.custom_fields.app_name = Some(field_id);
        self
    }

    /// Sets the redirect page for expired SSO sessions.
    pub fn with_redirect_page(mut self, page: impl Into<String>) -> Self {
        self.redirect_page = Some(page.into());
        self
    }

    /// Points the client at a different API base (proxies, test servers).
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Config` if the URL is not http(s).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Result<Self, BridgeError> {
        self.api_base = Self::validate_api_base(api_base.into())?;
        Ok(self)
    }

    /// Loads configuration from environment variables.
    ///
    /// # Required Environment Variables
    ///
    /// - `ZENDESK_SUBDOMAIN`: the account subdomain
    /// - `ZENDESK_USERNAME`: agent email used for API calls
    /// - `ZENDESK_API_TOKEN`: API token for that agent
    /// - `ZENDESK_SSO_KEY`: shared secret for JWT single sign-on
    ///
    /// # Optional
    ///
    /// - `ZENDESK_REDIRECT_PAGE`
    /// - `ZENDESK_APP_NAME_FIELD_ID`: numeric custom field id
    /// - `ZENDESK_API_URL`: override of the REST API base
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::Config` if any required variable is missing
    /// or if values fail validation.
    pub fn from_env() -> Result<Self, BridgeError> {
        let subdomain = Self::get_required_env("ZENDESK_SUBDOMAIN")?;
        let username = Self::get_required_env("ZENDESK_USERNAME")?;
        let api_token = Self::get_required_env("ZENDESK_API_TOKEN")?;
        let sso_key = Self::get_required_env("ZENDESK_SSO_KEY")?;

        Self::validate_secret("ZENDESK_API_TOKEN", &api_token)?;
        Self::validate_secret("ZENDESK_SSO_KEY", &sso_key)?;

        let mut config = Config::new(subdomain, username.trim(), api_token, sso_key)?;

        if let Some(page) = Self::get_optional_env("ZENDESK_REDIRECT_PAGE") {
            config = config.with_redirect_page(page);
        }

        if let Some(raw) = Self::get_optional_env("ZENDESK_APP_NAME_FIELD_ID") {
            let field_id = raw.trim().parse::<u64>().map_err(|_| {
                BridgeError::invalid_config("ZENDESK_APP_NAME_FIELD_ID must be a numeric field id")
            })?;
            config = config.with_app_name_field(field_id);
        }

        if let Some(api_base) = Self::get_optional_env("ZENDESK_API_URL") {
            config = config.with_api_base(api_base)?;
        }

        Ok(config)
    }

    /// Returns the API token. Only for authentication and sanitization.
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    /// Returns the SSO signing key. Only for signing and sanitization.
    pub fn sso_key(&self) -> &str {
        &self.sso_key
    }

    /// Returns the public help center domain, e.g. `https://acme.zendesk.com`.
    pub fn domain(&self) -> String {
        format!("https://{}.zendesk.com", self.subdomain)
    }

    /// Gets a required environment variable, returning an error if missing or empty.
    fn get_required_env(name: &str) -> Result<String, BridgeError> {
        env::var(name)
            .map_err(|_| BridgeError::missing_env(name))
            .and_then(|value| {
                if value.trim().is_empty() {
                    Err(BridgeError::missing_env(name))
                } else {
                    Ok(value)
                }
            })
    }

    fn get_optional_env(name: &str) -> Option<String> {
        env::var(name).ok().filter(|value| !value.trim().is_empty())
    }

    /// Accepts a single DNS label: letters, digits and inner hyphens.
    fn validate_subdomain(subdomain: String) -> Result<String, BridgeError> {
        let subdomain = subdomain.trim().to_lowercase();

        let valid = !subdomain.is_empty()
            && subdomain.len() <= 63
            && !subdomain.starts_with('-')
            && !subdomain.ends_with('-')
            && subdomain
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-');

        if !valid {
            return Err(BridgeError::invalid_config(
                "ZENDESK_SUBDOMAIN must be a bare subdomain like 'acme'",
            ));
        }

        Ok(subdomain)
    }

    /// Validates and normalizes the API base URL.
    fn validate_api_base(api_base: String) -> Result<String, BridgeError> {
        let api_base = api_base.trim().trim_end_matches('/').to_string();

        let parsed = Url::parse(&api_base)
            .map_err(|e| BridgeError::invalid_config(format!("invalid ZENDESK_API_URL: {}", e)))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(BridgeError::invalid_config(
                "ZENDESK_API_URL must start with http:// or https://",
            ));
        }

        Ok(api_base)
    }

    /// Validates a secret is not a placeholder value.
    fn validate_secret(name: &str, value: &str) -> Result<(), BridgeError> {
        let lower = value.to_lowercase();
        let placeholder_patterns = ["your_token", "your_key", "placeholder", "xxx", "changeme"];

        for pattern in placeholder_patterns {
            if lower.contains(pattern) {
                return Err(BridgeError::invalid_config(format!(
                    "{} appears to be a placeholder value",
                    name
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("subdomain", &self.subdomain)
            .field("username", &self.username)
            .field("api_token", &"[REDACTED]")
            .field("sso_key", &"[REDACTED]")
            .field("redirect_page", &self.redirect_page)
            .field("custom_fields", &self.custom_fields)
            .field("api_base", &self.api_base)
            .finish()
    }
}
