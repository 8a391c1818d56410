//! Callback Types
//!
//! Types for handling the authorization redirect back to the dashboard.

use url::Url;

/// Callback parameters from the authorization redirect.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code.
    pub code: Option<String>,
    /// State parameter echoed by the provider.
    pub state: Option<String>,
}

impl CallbackParams {
    /// Parse callback parameters from URL.
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                _ => {}
            }
        }

        params
    }

    /// Parse callback parameters from URL string.
    pub fn from_url_str(url_str: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(url_str)?;
        Ok(Self::from_url(&url))
    }

    /// Both `code` and `state` are present and non-empty.
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.code) && present(&self.state)
    }
}

/// Result of processing a callback whose parameters were present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// State validated and tokens stored.
    Authenticated,
    /// State did not match the stored value; no exchange was attempted.
    StateRejected,
}

/// Where the dashboard should navigate next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Application root (device overview).
    Root,
    /// Login screen.
    Login,
}

impl Route {
    /// Path of the route.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::Login => "/login",
        }
    }
}

/// Authorization URL the operator must be sent to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationUrl {
    /// Full redirect URL.
    pub url: String,
    /// CSRF state embedded in the URL.
    pub state: String,
}
