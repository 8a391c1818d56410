//! Configuration Builder
//!
//! Fluent builder for the OIDC client configuration.

use std::time::Duration;
use url::Url;

use crate::error::{AuthError, ConfigurationError};
use crate::types::{AuthConfig, DEFAULT_SCOPE, DEFAULT_TIMEOUT};

/// Environment variable holding the provider base URL.
pub const ENV_AUTHORITY: &str = "MF_SSOT_SERVER_OIDC_AUTHORITY";
/// Environment variable holding the client id.
pub const ENV_CLIENT_ID: &str = "MF_SSOT_SERVER_OIDC_CLIENT_ID";
/// Environment variable holding the callback URL.
pub const ENV_REDIRECT_URI: &str = "MF_SSOT_SERVER_OIDC_REDIRECT_URI";
/// Environment variable toggling authentication; only `"true"` enables it.
pub const ENV_AUTH_ENABLED: &str = "MF_SSOT_SERVER_GITLAB_AUTH_ENABLED";

/// Authentication configuration builder.
#[derive(Default)]
pub struct AuthConfigBuilder {
    authority: Option<String>,
    client_id: Option<String>,
    redirect_uri: Option<String>,
    auth_enabled: bool,
    timeout: Option<Duration>,
}

impl AuthConfigBuilder {
    /// Create new configuration builder. Authentication starts enabled.
    pub fn new() -> Self {
        Self {
            auth_enabled: true,
            ..Default::default()
        }
    }

    /// Set the provider base URL.
    pub fn authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    /// Set client ID.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Set the callback URL.
    pub fn redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Enable or disable authentication.
    pub fn auth_enabled(mut self, enabled: bool) -> Self {
        self.auth_enabled = enabled;
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        if let Ok(authority) = std::env::var(ENV_AUTHORITY) {
            self.authority = Some(authority);
        }
        if let Ok(client_id) = std::env::var(ENV_CLIENT_ID) {
            self.client_id = Some(client_id);
        }
        if let Ok(redirect_uri) = std::env::var(ENV_REDIRECT_URI) {
            self.redirect_uri = Some(redirect_uri);
        }
        self.auth_enabled = std::env::var(ENV_AUTH_ENABLED)
            .map(|val| val == "true")
            .unwrap_or(false);
        self
    }

    /// Build the configuration.
    ///
    /// With authentication disabled no OIDC settings are required.
    pub fn build(self) -> Result<AuthConfig, AuthError> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        if !self.auth_enabled {
            return Ok(AuthConfig {
                authority: self.authority.unwrap_or_default(),
                client_id: self.client_id.unwrap_or_default(),
                redirect_uri: self.redirect_uri.unwrap_or_default(),
                timeout,
                ..AuthConfig::disabled()
            });
        }

        let authority = required("authority", self.authority)?;
        let client_id = required("client_id", self.client_id)?;
        let redirect_uri = required("redirect_uri", self.redirect_uri)?;

        validate_url("authority", &authority)?;
        validate_url("redirect_uri", &redirect_uri)?;

        Ok(AuthConfig {
            authority: authority.trim_end_matches('/').to_string(),
            client_id,
            redirect_uri,
            scope: DEFAULT_SCOPE.to_string(),
            auth_enabled: true,
            timeout,
        })
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, AuthError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AuthError::Configuration(ConfigurationError::MissingField {
            field: field.to_string(),
        })),
    }
}

fn validate_url(field: &str, value: &str) -> Result<(), AuthError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(AuthError::Configuration(ConfigurationError::InvalidUrl {
            field: field.to_string(),
            url: value.to_string(),
        })),
    }
}

/// Create a new configuration builder.
pub fn auth_config() -> AuthConfigBuilder {
    AuthConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_success() {
        let config = auth_config()
            .authority("https://gitlab.example.com/")
            .client_id("dashboard")
            .redirect_uri("https://dashboard.example.com/callback")
            .build()
            .unwrap();

        assert_eq!(config.authority, "https://gitlab.example.com");
        assert_eq!(config.client_id, "dashboard");
        assert_eq!(config.scope, "openid");
        assert!(config.auth_enabled);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_builder_missing_client_id() {
        let result = auth_config()
            .authority("https://gitlab.example.com")
            .redirect_uri("https://dashboard.example.com/callback")
            .build();

        assert_eq!(
            result.unwrap_err(),
            AuthError::Configuration(ConfigurationError::MissingField {
                field: "client_id".to_string()
            })
        );
    }

    #[test]
    fn test_builder_invalid_authority() {
        let result = auth_config()
            .authority("gitlab.example.com")
            .client_id("dashboard")
            .redirect_uri("https://dashboard.example.com/callback")
            .build();

        assert!(matches!(
            result,
            Err(AuthError::Configuration(ConfigurationError::InvalidUrl { .. }))
        ));
    }

    // Single test so nothing else observes the process environment mid-change.
    #[test]
    fn test_from_env() {
        let vars = [ENV_AUTHORITY, ENV_CLIENT_ID, ENV_REDIRECT_URI, ENV_AUTH_ENABLED];

        std::env::set_var(ENV_AUTHORITY, "https://gitlab.example.com/");
        std::env::set_var(ENV_CLIENT_ID, "dashboard");
        std::env::set_var(ENV_REDIRECT_URI, "https://dashboard.example.com/callback");
        std::env::set_var(ENV_AUTH_ENABLED, "true");

        let config = auth_config().from_env().build().unwrap();
        assert!(config.auth_enabled);
        assert_eq!(config.authority, "https://gitlab.example.com");
        assert_eq!(config.client_id, "dashboard");
        assert_eq!(config.redirect_uri, "https://dashboard.example.com/callback");

        for value in ["TRUE", "1", "yes", ""] {
            std::env::set_var(ENV_AUTH_ENABLED, value);
            let config = auth_config().from_env().build().unwrap();
            assert!(!config.auth_enabled, "{value:?} must not enable auth");
            assert_eq!(config.client_id, "dashboard");
        }

        std::env::remove_var(ENV_AUTH_ENABLED);
        let config = auth_config().auth_enabled(true).from_env().build().unwrap();
        assert!(!config.auth_enabled);

        for var in vars {
            std::env::remove_var(var);
        }
        let config = auth_config().from_env().build().unwrap();
        assert!(!config.auth_enabled);
        assert!(config.authority.is_empty());
        assert!(config.client_id.is_empty());
    }

    #[test]
    fn test_builder_disabled_needs_nothing() {
        let config = auth_config().auth_enabled(false).build().unwrap();
        assert!(!config.auth_enabled);
        assert_eq!(config.scope, "openid");
    }
}
