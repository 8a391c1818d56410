//! Token Types
//!
//! Token endpoint responses and the persisted token pair.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Token response from the authorization server.
///
/// Only the fields the dashboard persists are decoded; `access_token`,
/// `expires_in` and friends are ignored.
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    /// Identity token (OIDC), attached to API calls.
    pub id_token: String,
    /// Refresh token used to renew the identity token.
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Identity and refresh token, always read and written together.
#[derive(Clone)]
pub struct TokenPair {
    identity_token: SecretString,
    refresh_token: SecretString,
}

impl TokenPair {
    /// Create a new token pair.
    pub fn new(identity_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            identity_token: SecretString::new(identity_token.into()),
            refresh_token: SecretString::new(refresh_token.into()),
        }
    }

    /// Identity token value.
    pub fn identity_token(&self) -> &str {
        self.identity_token.expose_secret()
    }

    /// Refresh token value.
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }

    /// Format as Authorization header value.
    pub fn authorization_header(&self) -> String {
        bearer(self.identity_token())
    }
}

impl From<TokenResponse> for TokenPair {
    fn from(response: TokenResponse) -> Self {
        Self::new(response.id_token, response.refresh_token)
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("identity_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Bearer header value for a token.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
