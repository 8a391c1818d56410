//! Dashboard Client
//!
//! Authenticated request layer and the session facade wiring storage,
//! discovery, CSRF state and the login flow together.

use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::core::{
    DefaultDiscoveryClient, FileKeyValueStore, HttpRequest, HttpResponse, HttpTransport,
    InMemoryKeyValueStore, KeyValueStore, ReqwestHttpTransport, StorageStateManager,
};
use crate::error::{error_from_status, AuthResult};
use crate::flows::{AuthorizationCodeFlow, AuthorizationCodeFlowImpl};
use crate::token::TokenStore;
use crate::types::{bearer, AuthConfig, AuthorizationUrl, CallbackParams, Route};

/// HTTP client attaching the operator's identity token to every request.
///
/// A 401 triggers one token refresh followed by one retry of the original
/// request. Any other non-2xx status is surfaced as is.
pub struct AuthenticatedClient<T: HttpTransport, F: AuthorizationCodeFlow> {
    transport: Arc<T>,
    flow: Arc<F>,
}

impl<T: HttpTransport, F: AuthorizationCodeFlow> AuthenticatedClient<T, F> {
    /// Create new authenticated client.
    pub fn new(transport: Arc<T>, flow: Arc<F>) -> Self {
        Self { transport, flow }
    }

    /// Send a request with the bearer token attached.
    #[instrument(skip_all, fields(method = request.method.as_str(), url = %request.url))]
    pub async fn send(&self, request: HttpRequest) -> AuthResult<HttpResponse> {
        let response = self.send_once(request.clone()).await?;

        if response.status != 401 {
            return ensure_success(response);
        }

        info!("Identity token rejected, refreshing");
        self.flow.refresh().await?;

        let retried = self.send_once(request).await?;
        ensure_success(retried)
    }

    /// GET a resource and decode its JSON body.
    pub async fn get_json<R: DeserializeOwned>(&self, url: &str) -> AuthResult<R> {
        let request = HttpRequest::get(url).with_header("accept", "application/json");
        self.send(request).await?.json()
    }

    async fn send_once(&self, request: HttpRequest) -> AuthResult<HttpResponse> {
        let request = match self.flow.identity_token() {
            Some(token) => request.with_header("authorization", bearer(&token)),
            None => request,
        };

        let response = self.transport.send(request).await?;
        debug!(status = response.status, "Resource response");
        Ok(response)
    }
}

impl<T: HttpTransport, F: AuthorizationCodeFlow> Clone for AuthenticatedClient<T, F> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            flow: self.flow.clone(),
        }
    }
}

fn ensure_success(response: HttpResponse) -> AuthResult<HttpResponse> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(error_from_status(response.status, &response.status_text))
    }
}

/// Login flow as wired by [`AuthSession`].
pub type SessionFlow<T, K> =
    AuthorizationCodeFlowImpl<T, DefaultDiscoveryClient<T>, StorageStateManager<K>, K>;

/// Authentication services for one dashboard process.
///
/// Constructed once and shared; every component holds the same storage,
/// discovery client and token store.
pub struct AuthSession<
    T: HttpTransport + 'static = ReqwestHttpTransport,
    K: KeyValueStore = InMemoryKeyValueStore,
> {
    config: AuthConfig,
    tokens: Arc<TokenStore<K>>,
    discovery: Arc<DefaultDiscoveryClient<T>>,
    flow: Arc<SessionFlow<T, K>>,
    client: AuthenticatedClient<T, SessionFlow<T, K>>,
}

impl AuthSession<ReqwestHttpTransport, InMemoryKeyValueStore> {
    /// Create a session with the default transport and in-memory storage.
    pub fn new(config: AuthConfig) -> AuthResult<Self> {
        let transport = ReqwestHttpTransport::with_options(config.timeout, 1048576)?;
        Ok(Self::with_components(
            config,
            transport,
            InMemoryKeyValueStore::new(),
        ))
    }
}

impl AuthSession<ReqwestHttpTransport, FileKeyValueStore> {
    /// Create a session persisting tokens and CSRF state in a JSON file.
    pub fn with_file_storage(config: AuthConfig, path: impl AsRef<Path>) -> AuthResult<Self> {
        let transport = ReqwestHttpTransport::with_options(config.timeout, 1048576)?;
        let storage = FileKeyValueStore::open(path)?;
        Ok(Self::with_components(config, transport, storage))
    }
}

impl<T: HttpTransport + 'static, K: KeyValueStore> AuthSession<T, K> {
    /// Create a session with custom implementations.
    pub fn with_components(config: AuthConfig, transport: T, storage: K) -> Self {
        let transport = Arc::new(transport);
        let storage = Arc::new(storage);

        let tokens = Arc::new(TokenStore::new(storage.clone(), config.auth_enabled));
        let discovery = Arc::new(DefaultDiscoveryClient::new(transport.clone(), &config));
        let state_manager = Arc::new(StorageStateManager::new(storage));

        let flow = Arc::new(AuthorizationCodeFlowImpl::new(
            config.clone(),
            transport.clone(),
            discovery.clone(),
            state_manager,
            tokens.clone(),
        ));
        let client = AuthenticatedClient::new(transport, flow.clone());

        debug!(auth_enabled = config.auth_enabled, "Auth session created");

        Self {
            config,
            tokens,
            discovery,
            flow,
            client,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Token store.
    pub fn tokens(&self) -> &Arc<TokenStore<K>> {
        &self.tokens
    }

    /// Discovery client.
    pub fn discovery(&self) -> &Arc<DefaultDiscoveryClient<T>> {
        &self.discovery
    }

    /// Login flow.
    pub fn flow(&self) -> &Arc<SessionFlow<T, K>> {
        &self.flow
    }

    /// Authenticated HTTP client.
    pub fn client(&self) -> &AuthenticatedClient<T, SessionFlow<T, K>> {
        &self.client
    }

    /// Start a login.
    pub async fn login(&self) -> AuthResult<AuthorizationUrl> {
        self.flow.initiate_login().await
    }

    /// Process the provider redirect.
    pub async fn complete_callback(&self, params: &CallbackParams) -> Route {
        self.flow.complete_callback(params).await
    }

    /// End the session.
    pub fn logout(&self) {
        self.flow.logout();
    }

    /// Whether an operator session exists.
    pub fn is_logged_in(&self) -> bool {
        self.tokens.is_logged_in()
    }

    /// Receive session changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tokens.subscribe()
    }
}
