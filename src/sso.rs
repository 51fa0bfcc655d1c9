//! JWT single sign-on links into the Zendesk help center.
//!
//! Zendesk's JWT SSO accepts an HS256 token carrying `jti`, `iat`, `name`
//! and `email` at `https://{subdomain}.zendesk.com/access/jwt?jwt=<token>`.
//! Zendesk rejects a `jti` it has already seen, so each link is single-use.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::BridgeError;

/// Claims of a Zendesk SSO token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoClaims {
    /// Nonce; a UUIDv7, so it combines the current time with randomness.
    pub jti: String,
    /// Issued at (unix timestamp, seconds).
    pub iat: i64,
    /// Display name of the user.
    pub name: String,
    /// Email of the user; Zendesk matches or creates the user by it.
    pub email: String,
}

impl SsoClaims {
    /// Creates fresh claims for a user, stamped with the current time.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            jti: Uuid::now_v7().to_string(),
            iat: chrono::Utc::now().timestamp(),
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Signs SSO tokens and builds help center login links.
#[derive(Clone)]
pub struct SsoSigner {
    domain: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SsoSigner {
    /// Creates a signer for a help center domain with the shared secret.
    pub fn new(domain: impl Into<String>, secret: &str) -> Self {
        Self {
            domain: domain.into().trim_end_matches('/').to_string(),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Creates a signer from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.domain(), config.sso_key())
    }

    /// Returns the help center domain, e.g. `https://acme.zendesk.com`.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Signs a claim set with HS256.
    pub fn sign(&self, claims: &SsoClaims) -> Result<String, BridgeError> {
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.encoding_key,
        )?)
    }

    /// Decodes a token signed with this signer's secret.
    ///
    /// SSO tokens carry no `exp`, so only the signature and the claim shape
    /// are checked.
    pub fn verify(&self, token: &str) -> Result<SsoClaims, BridgeError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<SsoClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Builds a single sign-on link for a user.
    ///
    /// Returns `Ok(None)` when `name` or `email` is empty: there is nobody to
    /// sign in, which is not an error.
    pub fn support_link(&self, name: &str, email: &str) -> Result<Option<String>, BridgeError> {
        if name.is_empty() || email.is_empty() {
            return Ok(None);
        }

        let token = self.sign(&SsoClaims::new(name, email))?;

        Ok(Some(format!(
            "{}/access/jwt?jwt={}",
            self.domain,
            urlencoding::encode(&token)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn signer() -> SsoSigner {
        SsoSigner::new("https://acme.zendesk.com", "shared-secret")
    }

    fn token_from(link: &str) -> &str {
        link.split_once("?jwt=").map(|(_, token)| token).unwrap()
    }

    #[test]
    fn test_support_link_claims_match_inputs() {
        let signer = signer();
        let link = signer
            .support_link("Jane Doe", "jane@example.com")
            .unwrap()
            .unwrap();

        assert!(link.starts_with("https://acme.zendesk.com/access/jwt?jwt="));

        let claims = signer.verify(token_from(&link)).unwrap();
        assert_eq!(claims.name, "Jane Doe");
        assert_eq!(claims.email, "jane@example.com");
        assert!(!claims.jti.is_empty());
        assert!(claims.iat > 0);
    }

    #[test]
    fn test_support_link_empty_inputs() {
        let signer = signer();
        assert_eq!(signer.support_link("", "jane@example.com").unwrap(), None);
        assert_eq!(signer.support_link("Jane", "").unwrap(), None);
        assert_eq!(signer.support_link("", "").unwrap(), None);
    }

    #[test]
    fn test_jti_differs_between_links() {
        let signer = signer();
        let a = signer.support_link("Jane", "jane@example.com").unwrap().unwrap();
        let b = signer.support_link("Jane", "jane@example.com").unwrap().unwrap();
        let jti_a = signer.verify(token_from(&a)).unwrap().jti;
        let jti_b = signer.verify(token_from(&b)).unwrap().jti;
        assert_ne!(jti_a, jti_b);
    }

    #[test]
    fn test_verify_rejects_other_secret() {
        let link = signer()
            .support_link("Jane", "jane@example.com")
            .unwrap()
            .unwrap();
        let other = SsoSigner::new("https://acme.zendesk.com", "different-secret");
        assert!(matches!(
            other.verify(token_from(&link)),
            Err(BridgeError::Token(_))
        ));
    }

    #[test]
    fn test_from_config_uses_subdomain() {
        let config = Config::new("acme", "agent@acme.test", "tok", "key").unwrap();
        let signer = SsoSigner::from_config(&config);
        assert_eq!(signer.domain(), "https://acme.zendesk.com");
    }
}
