//! Device Specifications Dashboard Core
//!
//! Operator authentication and selection state for the device
//! specifications dashboard.
//!
//! # Features
//!
//! - OIDC Authorization Code login against a discovered provider
//! - Single-use CSRF state
//! - Persisted identity/refresh token pair with session notifications
//! - Bearer-authenticated requests with refresh-and-retry on 401
//! - Single and multi-select list state with accent-insensitive search
//!
//! # Example
//!
//! ```rust,ignore
//! use specs_dashboard_auth::{auth_config, AuthSession, CallbackParams, Route};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = auth_config().from_env().build()?;
//!     let session = AuthSession::with_file_storage(config, "session.json")?;
//!
//!     if !session.is_logged_in() {
//!         let login = session.login().await?;
//!         println!("Open {}", login.url);
//!
//!         // ...after the provider redirects back:
//!         let params = CallbackParams::from_url_str(
//!             "https://dashboard.example.com/callback?code=..&state=..",
//!         )?;
//!         if session.complete_callback(&params).await == Route::Login {
//!             return Ok(());
//!         }
//!     }
//!
//!     let devices: serde_json::Value = session
//!         .client()
//!         .get_json("https://api.example.com/devices")
//!         .await?;
//!     println!("{devices}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, token and callback data structures
//! - `error`: error hierarchy
//! - `core`: HTTP transport, key-value storage, CSRF state, OIDC discovery
//! - `token`: token store and session flag
//! - `flows`: authorization code flow
//! - `builders`: fluent configuration builder
//! - `client`: authenticated HTTP client and session facade
//! - `select`: selectable list component state

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod flows;
pub mod select;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{AuthSession, AuthenticatedClient, SessionFlow};

// Re-export builders
pub use builders::{auth_config, AuthConfigBuilder};

// Re-export errors
pub use error::{
    error_from_status, AuthError, AuthResult, ConfigurationError, NetworkError, ProtocolError,
    SelectError, StorageError, TokenError,
};

// Re-export types
pub use types::{
    bearer, AuthConfig, AuthorizationUrl, CallbackOutcome, CallbackParams, ProviderMetadata,
    Route, TokenPair, TokenResponse, DEFAULT_SCOPE, MOCKED_TOKEN,
};

// Re-export core components
pub use crate::core::{
    // Transport
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
    // Storage
    FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore,
    // State
    MockStateManager, StateManager, StorageStateManager,
    // Discovery
    DefaultDiscoveryClient, DiscoveryClient, MockDiscoveryClient,
};

// Re-export flows
pub use flows::{AuthorizationCodeFlow, AuthorizationCodeFlowImpl, MockAuthorizationCodeFlow};

// Re-export token management
pub use token::TokenStore;

// Re-export select
pub use select::{
    DisplayText, SelectEvent, SelectItem, SelectItemSection, SelectKey, SelectList,
    SelectOptions, SelectionChange,
};
