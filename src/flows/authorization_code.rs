//! Authorization Code Flow
//!
//! OIDC authorization-code login, callback handling, refresh and logout.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use url::form_urlencoded;

use crate::core::{lock, DiscoveryClient, HttpRequest, HttpTransport, KeyValueStore, StateManager};
use crate::error::{error_from_status, AuthError, AuthResult, TokenError};
use crate::token::TokenStore;
use crate::types::{
    AuthConfig, AuthorizationUrl, CallbackOutcome, CallbackParams, Route, TokenPair,
    TokenResponse,
};

/// Authorization Code Flow interface.
#[async_trait]
pub trait AuthorizationCodeFlow: Send + Sync {
    /// Create a CSRF state and build the provider login URL.
    ///
    /// The caller performs the navigation.
    async fn initiate_login(&self) -> AuthResult<AuthorizationUrl>;

    /// Validate the echoed state and exchange the code for tokens.
    ///
    /// A state mismatch is reported as [`CallbackOutcome::StateRejected`]
    /// without contacting the provider.
    async fn handle_callback(&self, code: &str, state: Option<&str>)
        -> AuthResult<CallbackOutcome>;

    /// Renew the token pair using the stored refresh token.
    async fn refresh(&self) -> AuthResult<()>;

    /// Clear the session. Idempotent.
    fn logout(&self);

    /// Whether an operator session exists.
    fn is_logged_in(&self) -> bool;

    /// Identity token to attach to API calls.
    fn identity_token(&self) -> Option<String>;

    /// Process the provider redirect and decide where to navigate next.
    ///
    /// Without both `code` and `state` the stored CSRF state is left alone
    /// and the operator is sent to the root, which routes to login again if
    /// no session exists.
    async fn complete_callback(&self, params: &CallbackParams) -> Route {
        let (code, state) = match (&params.code, &params.state) {
            (Some(code), Some(state)) if params.is_complete() => (code, state),
            _ => {
                debug!("Callback without code or state");
                return Route::Root;
            }
        };

        match self.handle_callback(code, Some(state)).await {
            Ok(CallbackOutcome::Authenticated) => Route::Root,
            Ok(CallbackOutcome::StateRejected) => Route::Login,
            Err(error) => {
                warn!(error = %error, "Authorization code exchange failed");
                Route::Login
            }
        }
    }

    /// Where the login page should send an operator, if anywhere.
    fn login_redirect(&self) -> Option<Route> {
        self.is_logged_in().then_some(Route::Root)
    }
}

/// Authorization Code Flow implementation.
pub struct AuthorizationCodeFlowImpl<T, D, S, K>
where
    T: HttpTransport,
    D: DiscoveryClient,
    S: StateManager,
    K: KeyValueStore,
{
    config: AuthConfig,
    transport: Arc<T>,
    discovery: Arc<D>,
    state_manager: Arc<S>,
    tokens: Arc<TokenStore<K>>,
}

impl<T, D, S, K> AuthorizationCodeFlowImpl<T, D, S, K>
where
    T: HttpTransport,
    D: DiscoveryClient,
    S: StateManager,
    K: KeyValueStore,
{
    /// Create new Authorization Code Flow.
    pub fn new(
        config: AuthConfig,
        transport: Arc<T>,
        discovery: Arc<D>,
        state_manager: Arc<S>,
        tokens: Arc<TokenStore<K>>,
    ) -> Self {
        Self {
            config,
            transport,
            discovery,
            state_manager,
            tokens,
        }
    }

    /// Token store backing this flow.
    pub fn token_store(&self) -> &Arc<TokenStore<K>> {
        &self.tokens
    }

    fn build_authorization_url(&self, endpoint: &str, state: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("state", state)
            .append_pair("scope", &self.config.scope)
            .finish();

        format!("{}/?{}", endpoint, query)
    }

    fn build_exchange_query(&self, code: &str) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("code", code)
            .append_pair("grant_type", "authorization_code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .finish()
    }

    fn build_refresh_query(&self, refresh_token: &str) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", refresh_token)
            .finish()
    }

    /// POST the grant to the token endpoint and store the returned pair.
    async fn request_tokens(&self, query: String) -> AuthResult<()> {
        let endpoint = self.discovery.token_endpoint().await?;

        let request = HttpRequest::post(format!("{}/?{}", endpoint, query))
            .with_header("accept", "application/json")
            .with_timeout(self.config.timeout);

        let response = self.transport.send(request).await?;

        if !matches!(response.status, 200 | 201) {
            return Err(error_from_status(response.status, &response.status_text));
        }

        let tokens: TokenResponse = response.json()?;
        self.tokens.store_pair(&TokenPair::from(tokens));

        Ok(())
    }
}

#[async_trait]
impl<T, D, S, K> AuthorizationCodeFlow for AuthorizationCodeFlowImpl<T, D, S, K>
where
    T: HttpTransport,
    D: DiscoveryClient,
    S: StateManager,
    K: KeyValueStore,
{
    #[instrument(skip(self))]
    async fn initiate_login(&self) -> AuthResult<AuthorizationUrl> {
        let endpoint = self.discovery.authorization_endpoint().await?;
        let state = self.state_manager.create_and_store();
        let url = self.build_authorization_url(&endpoint, &state);

        info!("Redirecting to identity provider");

        Ok(AuthorizationUrl { url, state })
    }

    #[instrument(skip_all)]
    async fn handle_callback(
        &self,
        code: &str,
        state: Option<&str>,
    ) -> AuthResult<CallbackOutcome> {
        if !self.state_manager.validate_and_consume(state) {
            warn!("Callback state did not match the pending login");
            return Ok(CallbackOutcome::StateRejected);
        }

        self.request_tokens(self.build_exchange_query(code)).await?;

        info!("Operator authenticated");
        Ok(CallbackOutcome::Authenticated)
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> AuthResult<()> {
        let refresh_token = self
            .tokens
            .refresh_token()
            .ok_or(AuthError::Token(TokenError::NoRefreshToken))?;

        self.request_tokens(self.build_refresh_query(&refresh_token))
            .await?;

        debug!("Token pair refreshed");
        Ok(())
    }

    fn logout(&self) {
        self.tokens.clear();
        info!("Operator logged out");
    }

    fn is_logged_in(&self) -> bool {
        self.tokens.is_logged_in()
    }

    fn identity_token(&self) -> Option<String> {
        self.tokens.identity_token()
    }
}

/// Mock Authorization Code Flow for testing.
///
/// Refresh results are served in queue order; an empty queue makes refresh
/// fail with [`TokenError::NoRefreshToken`].
#[derive(Default)]
pub struct MockAuthorizationCodeFlow {
    identity_token: Mutex<Option<String>>,
    refresh_results: Mutex<VecDeque<AuthResult<String>>>,
    callback_outcome: Mutex<Option<AuthResult<CallbackOutcome>>>,
    callback_history: Mutex<Vec<(String, Option<String>)>>,
    refresh_count: Mutex<usize>,
    login_count: Mutex<usize>,
}

impl MockAuthorizationCodeFlow {
    /// Create new mock flow.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current identity token.
    pub fn set_identity_token(&self, token: impl Into<String>) -> &Self {
        *lock(&self.identity_token) = Some(token.into());
        self
    }

    /// Queue a successful refresh yielding the given identity token.
    pub fn queue_refresh_token(&self, identity_token: impl Into<String>) -> &Self {
        lock(&self.refresh_results).push_back(Ok(identity_token.into()));
        self
    }

    /// Queue a failing refresh.
    pub fn queue_refresh_error(&self, error: AuthError) -> &Self {
        lock(&self.refresh_results).push_back(Err(error));
        self
    }

    /// Set the result of the next callbacks.
    pub fn set_callback_outcome(&self, outcome: AuthResult<CallbackOutcome>) -> &Self {
        *lock(&self.callback_outcome) = Some(outcome);
        self
    }

    /// Number of refresh attempts.
    pub fn refresh_count(&self) -> usize {
        *lock(&self.refresh_count)
    }

    /// Number of login initiations.
    pub fn login_count(&self) -> usize {
        *lock(&self.login_count)
    }

    /// Received callbacks as `(code, state)`.
    pub fn get_callback_history(&self) -> Vec<(String, Option<String>)> {
        lock(&self.callback_history).clone()
    }
}

#[async_trait]
impl AuthorizationCodeFlow for MockAuthorizationCodeFlow {
    async fn initiate_login(&self) -> AuthResult<AuthorizationUrl> {
        *lock(&self.login_count) += 1;
        let state = "mock-state".to_string();
        Ok(AuthorizationUrl {
            url: format!("https://provider.example.com/oauth/authorize/?state={}", state),
            state,
        })
    }

    async fn handle_callback(
        &self,
        code: &str,
        state: Option<&str>,
    ) -> AuthResult<CallbackOutcome> {
        lock(&self.callback_history).push((code.to_string(), state.map(str::to_string)));
        lock(&self.callback_outcome)
            .clone()
            .unwrap_or(Ok(CallbackOutcome::Authenticated))
    }

    async fn refresh(&self) -> AuthResult<()> {
        *lock(&self.refresh_count) += 1;

        let result = lock(&self.refresh_results)
            .pop_front()
            .unwrap_or(Err(AuthError::Token(TokenError::NoRefreshToken)));

        let token = result?;
        *lock(&self.identity_token) = Some(token);
        Ok(())
    }

    fn logout(&self) {
        *lock(&self.identity_token) = None;
    }

    fn is_logged_in(&self) -> bool {
        lock(&self.identity_token).is_some()
    }

    fn identity_token(&self) -> Option<String> {
        lock(&self.identity_token).clone()
    }
}

/// Create mock Authorization Code Flow for testing.
pub fn create_mock_authorization_code_flow() -> MockAuthorizationCodeFlow {
    MockAuthorizationCodeFlow::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::auth_config;
    use crate::core::{
        create_mock_provider_metadata, HttpMethod, InMemoryKeyValueStore, MockDiscoveryClient,
        MockHttpTransport, StorageStateManager, STATE_KEY,
    };
    use crate::error::NetworkError;
    use tokio_test::assert_ok;

    const AUTHORITY: &str = "https://gitlab.example.com";

    type TestFlow = AuthorizationCodeFlowImpl<
        MockHttpTransport,
        MockDiscoveryClient,
        StorageStateManager<InMemoryKeyValueStore>,
        InMemoryKeyValueStore,
    >;

    struct Fixture {
        transport: Arc<MockHttpTransport>,
        discovery: Arc<MockDiscoveryClient>,
        storage: Arc<InMemoryKeyValueStore>,
        tokens: Arc<TokenStore<InMemoryKeyValueStore>>,
        flow: TestFlow,
    }

    fn fixture() -> Fixture {
        let config = auth_config()
            .authority(AUTHORITY)
            .client_id("dashboard")
            .redirect_uri("https://dashboard.example.com/callback")
            .build()
            .unwrap();

        let transport = Arc::new(MockHttpTransport::new());
        let discovery = Arc::new(MockDiscoveryClient::new());
        discovery.set_metadata(create_mock_provider_metadata(AUTHORITY));
        let storage = Arc::new(InMemoryKeyValueStore::new());
        let state_manager = Arc::new(StorageStateManager::new(storage.clone()));
        let tokens = Arc::new(TokenStore::new(storage.clone(), true));

        let flow = AuthorizationCodeFlowImpl::new(
            config,
            transport.clone(),
            discovery.clone(),
            state_manager,
            tokens.clone(),
        );

        Fixture {
            transport,
            discovery,
            storage,
            tokens,
            flow,
        }
    }

    fn token_body(id_token: &str, refresh_token: &str) -> serde_json::Value {
        serde_json::json!({
            "access_token": "ignored",
            "token_type": "Bearer",
            "id_token": id_token,
            "refresh_token": refresh_token,
        })
    }

    #[tokio::test]
    async fn test_initiate_login_builds_url() {
        let f = fixture();

        let auth = f.flow.initiate_login().await.unwrap();

        assert_eq!(auth.state.len(), 64);
        assert_eq!(f.storage.get(STATE_KEY), Some(auth.state.clone()));
        assert_eq!(
            auth.url,
            format!(
                "https://gitlab.example.com/oauth/authorize/?client_id=dashboard\
                 &redirect_uri=https%3A%2F%2Fdashboard.example.com%2Fcallback\
                 &response_type=code&state={}&scope=openid",
                auth.state
            )
        );
    }

    #[tokio::test]
    async fn test_initiate_login_discovery_failure_creates_no_state() {
        let f = fixture();
        f.discovery.set_error(AuthError::Network(NetworkError::ConnectionFailed {
            message: "down".to_string(),
        }));

        assert!(f.flow.initiate_login().await.is_err());
        assert!(f.storage.get(STATE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_handle_callback_exchanges_code() {
        let f = fixture();
        let auth = f.flow.initiate_login().await.unwrap();
        f.transport.queue_json_response(200, &token_body("id-1", "refresh-1"));

        let outcome = f
            .flow
            .handle_callback("code 1", Some(&auth.state))
            .await
            .unwrap();

        assert_eq!(outcome, CallbackOutcome::Authenticated);
        assert!(f.flow.is_logged_in());
        assert_eq!(f.flow.identity_token().as_deref(), Some("id-1"));
        assert_eq!(f.tokens.refresh_token().as_deref(), Some("refresh-1"));
        assert!(f.storage.get(STATE_KEY).is_none());

        let request = f.transport.get_last_request().unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert!(request.body.is_none());
        assert_eq!(
            request.url,
            "https://gitlab.example.com/oauth/token/?client_id=dashboard&code=code+1\
             &grant_type=authorization_code\
             &redirect_uri=https%3A%2F%2Fdashboard.example.com%2Fcallback"
        );
    }

    #[tokio::test]
    async fn test_handle_callback_rejects_forged_state() {
        let f = fixture();
        f.flow.initiate_login().await.unwrap();

        let outcome = f
            .flow
            .handle_callback("code", Some("forged"))
            .await
            .unwrap();

        assert_eq!(outcome, CallbackOutcome::StateRejected);
        assert_eq!(f.transport.request_count(), 0);
        assert!(!f.flow.is_logged_in());
        assert!(f.storage.get(STATE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_replayed_callback_is_rejected() {
        let f = fixture();
        let auth = f.flow.initiate_login().await.unwrap();
        f.transport.queue_json_response(200, &token_body("id-1", "refresh-1"));

        assert_ok!(f.flow.handle_callback("code", Some(&auth.state)).await);
        let replay = f.flow.handle_callback("code", Some(&auth.state)).await;

        assert_eq!(replay, Ok(CallbackOutcome::StateRejected));
        assert_eq!(f.transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_exchange_failure_writes_no_tokens() {
        let f = fixture();
        let auth = f.flow.initiate_login().await.unwrap();
        f.transport.queue_status(400);

        let result = f.flow.handle_callback("code", Some(&auth.state)).await;

        assert_eq!(result.unwrap_err().status(), Some(400));
        assert!(!f.flow.is_logged_in());
        assert!(f.tokens.tokens().is_none());
    }

    #[tokio::test]
    async fn test_refresh_overwrites_both_tokens() {
        let f = fixture();
        f.tokens.set_tokens("id-1", "refresh-1");
        f.transport.queue_json_response(201, &token_body("id-2", "refresh-2"));

        f.flow.refresh().await.unwrap();

        let pair = f.tokens.tokens().unwrap();
        assert_eq!(pair.identity_token(), "id-2");
        assert_eq!(pair.refresh_token(), "refresh-2");
        assert_eq!(
            f.transport.get_last_request().unwrap().url,
            "https://gitlab.example.com/oauth/token/?client_id=dashboard\
             &grant_type=refresh_token&refresh_token=refresh-1"
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_tokens() {
        let f = fixture();
        f.tokens.set_tokens("id-1", "refresh-1");
        f.transport.queue_status(401);

        let error = f.flow.refresh().await.unwrap_err();

        assert!(error.needs_reauth());
        assert_eq!(f.tokens.identity_token().as_deref(), Some("id-1"));
        assert_eq!(f.transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token() {
        let f = fixture();

        let error = f.flow.refresh().await.unwrap_err();

        assert_eq!(error, AuthError::Token(TokenError::NoRefreshToken));
        assert_eq!(f.transport.request_count(), 0);
        assert_eq!(f.discovery.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let f = fixture();
        f.tokens.set_tokens("id-1", "refresh-1");

        f.flow.logout();
        assert!(!f.flow.is_logged_in());
        assert!(f.flow.identity_token().is_none());
        assert!(f.tokens.refresh_token().is_none());

        f.flow.logout();
        assert!(!f.flow.is_logged_in());
    }

    #[tokio::test]
    async fn test_complete_callback_routes() {
        let f = fixture();

        // Incomplete parameters leave the pending state untouched.
        f.flow.initiate_login().await.unwrap();
        let params = CallbackParams {
            code: Some("code".to_string()),
            state: None,
        };
        assert_eq!(f.flow.complete_callback(&params).await, Route::Root);
        assert!(f.storage.get(STATE_KEY).is_some());

        let params = CallbackParams {
            code: Some("code".to_string()),
            state: Some("forged".to_string()),
        };
        assert_eq!(f.flow.complete_callback(&params).await, Route::Login);

        let auth = f.flow.initiate_login().await.unwrap();
        f.transport.queue_status(500);
        let params = CallbackParams {
            code: Some("code".to_string()),
            state: Some(auth.state),
        };
        assert_eq!(f.flow.complete_callback(&params).await, Route::Login);

        let auth = f.flow.initiate_login().await.unwrap();
        f.transport.queue_json_response(200, &token_body("id-1", "refresh-1"));
        let params = CallbackParams {
            code: Some("code".to_string()),
            state: Some(auth.state),
        };
        assert_eq!(f.flow.complete_callback(&params).await, Route::Root);
    }

    #[tokio::test]
    async fn test_login_redirect() {
        let f = fixture();
        assert_eq!(f.flow.login_redirect(), None);

        f.tokens.set_tokens("id-1", "refresh-1");
        assert_eq!(f.flow.login_redirect(), Some(Route::Root));
    }

    #[tokio::test]
    async fn test_mock_flow_refresh_queue() {
        let flow = MockAuthorizationCodeFlow::new();
        flow.set_identity_token("old").queue_refresh_token("new");

        assert!(flow.refresh().await.is_ok());
        assert_eq!(flow.identity_token().as_deref(), Some("new"));
        assert!(flow.refresh().await.is_err());
        assert_eq!(flow.refresh_count(), 2);
    }
}
