//! Configuration Types
//!
//! OIDC client configuration and provider metadata.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scope requested during login. The dashboard only needs an identity.
pub const DEFAULT_SCOPE: &str = "openid";

/// Token reported when authentication is disabled. The mock API server
/// requires an `Authorization` header but does not validate it.
pub const MOCKED_TOKEN: &str = "mocked_token";

/// Default HTTP timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// OIDC client configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthConfig {
    /// Base URL of the OIDC provider (the "authority").
    pub authority: String,
    /// Client identifier registered with the provider.
    pub client_id: String,
    /// Callback URL the provider redirects back to.
    pub redirect_uri: String,
    /// Requested scope.
    pub scope: String,
    /// When false, the whole flow is bypassed and a permanent session with
    /// [`MOCKED_TOKEN`] is reported.
    pub auth_enabled: bool,
    /// HTTP timeout.
    pub timeout: Duration,
}

impl AuthConfig {
    /// Configuration that bypasses authentication entirely.
    pub fn disabled() -> Self {
        Self {
            authority: String::new(),
            client_id: String::new(),
            redirect_uri: String::new(),
            scope: DEFAULT_SCOPE.to_string(),
            auth_enabled: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Discovery document URL for the configured authority.
    pub fn discovery_url(&self) -> String {
        format!(
            "{}/.well-known/openid-configuration",
            self.authority.trim_end_matches('/')
        )
    }
}

/// Subset of the OIDC discovery document this client relies on.
///
/// Additional standard discovery fields are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Authorization endpoint URL.
    pub authorization_endpoint: String,
    /// Token endpoint URL.
    pub token_endpoint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_url_trims_trailing_slash() {
        let config = AuthConfig {
            authority: "https://gitlab.example.com/".to_string(),
            ..AuthConfig::disabled()
        };
        assert_eq!(
            config.discovery_url(),
            "https://gitlab.example.com/.well-known/openid-configuration"
        );
    }

    #[test]
    fn test_provider_metadata_ignores_extra_fields() {
        let json = r#"{
            "issuer": "https://gitlab.example.com",
            "authorization_endpoint": "https://gitlab.example.com/oauth/authorize",
            "token_endpoint": "https://gitlab.example.com/oauth/token",
            "jwks_uri": "https://gitlab.example.com/oauth/discovery/keys",
            "scopes_supported": ["openid", "profile"]
        }"#;

        let metadata: ProviderMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(
            metadata.authorization_endpoint,
            "https://gitlab.example.com/oauth/authorize"
        );
        assert_eq!(metadata.token_endpoint, "https://gitlab.example.com/oauth/token");
        assert_eq!(metadata.issuer.as_deref(), Some("https://gitlab.example.com"));
    }
}
