//! OIDC Discovery
//!
//! OpenID Connect discovery document retrieval with a memoised, shared fetch.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument, warn};

use crate::core::lock;
use crate::core::transport::{HttpRequest, HttpTransport};
use crate::error::{error_from_status, AuthError, AuthResult, ConfigurationError};
use crate::types::{AuthConfig, ProviderMetadata};

type MetadataFuture = Shared<BoxFuture<'static, AuthResult<ProviderMetadata>>>;

/// Memoisation slot for the provider metadata.
enum Slot {
    /// Nothing fetched yet, or the last fetch failed.
    Empty,
    /// A fetch is running; late callers await the same future.
    InFlight(MetadataFuture),
    /// Metadata resolved. Never invalidated.
    Ready(ProviderMetadata),
}

/// Discovery client interface (for dependency injection).
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Provider metadata, fetched at most once per successful resolution.
    async fn metadata(&self) -> AuthResult<ProviderMetadata>;

    /// Authorization endpoint URL.
    async fn authorization_endpoint(&self) -> AuthResult<String> {
        Ok(self.metadata().await?.authorization_endpoint)
    }

    /// Token endpoint URL.
    async fn token_endpoint(&self) -> AuthResult<String> {
        Ok(self.metadata().await?.token_endpoint)
    }
}

/// Default discovery client implementation.
///
/// Concurrent callers arriving while a fetch is in flight share it and all
/// observe the same result. A failed fetch is not cached.
pub struct DefaultDiscoveryClient<T: HttpTransport + 'static> {
    transport: Arc<T>,
    discovery_url: String,
    slot: Mutex<Slot>,
}

impl<T: HttpTransport + 'static> DefaultDiscoveryClient<T> {
    /// Create new discovery client for the configured authority.
    pub fn new(transport: Arc<T>, config: &AuthConfig) -> Self {
        Self {
            transport,
            discovery_url: config.discovery_url(),
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Discovery document URL.
    pub fn discovery_url(&self) -> &str {
        &self.discovery_url
    }

    /// Whether metadata has been resolved.
    pub fn is_resolved(&self) -> bool {
        matches!(*lock(&self.slot), Slot::Ready(_))
    }

    fn settle(&self, future: &MetadataFuture, result: &AuthResult<ProviderMetadata>) {
        let mut slot = lock(&self.slot);
        if let Slot::InFlight(current) = &*slot {
            if current.ptr_eq(future) {
                *slot = match result {
                    Ok(metadata) => Slot::Ready(metadata.clone()),
                    Err(_) => Slot::Empty,
                };
            }
        }
    }
}

async fn fetch_metadata<T: HttpTransport>(
    transport: Arc<T>,
    url: String,
) -> AuthResult<ProviderMetadata> {
    debug!(url = %url, "Fetching OIDC discovery document");

    let request = HttpRequest::get(url).with_header("accept", "application/json");
    let response = transport.send(request).await?;

    if !matches!(response.status, 200 | 201) {
        return Err(error_from_status(response.status, &response.status_text));
    }

    let metadata: ProviderMetadata = response.json()?;

    if metadata.authorization_endpoint.is_empty() || metadata.token_endpoint.is_empty() {
        return Err(AuthError::Configuration(ConfigurationError::DiscoveryFailed {
            message: "Discovery document missing required endpoints".to_string(),
        }));
    }

    Ok(metadata)
}

#[async_trait]
impl<T: HttpTransport + 'static> DiscoveryClient for DefaultDiscoveryClient<T> {
    #[instrument(skip(self))]
    async fn metadata(&self) -> AuthResult<ProviderMetadata> {
        let future = {
            let mut slot = lock(&self.slot);
            match &*slot {
                Slot::Ready(metadata) => return Ok(metadata.clone()),
                Slot::InFlight(future) => future.clone(),
                Slot::Empty => {
                    let future =
                        fetch_metadata(self.transport.clone(), self.discovery_url.clone())
                            .boxed()
                            .shared();
                    *slot = Slot::InFlight(future.clone());
                    future
                }
            }
        };

        let result = future.clone().await;
        self.settle(&future, &result);

        if let Err(error) = &result {
            warn!(error = %error, "OIDC discovery failed");
        }

        result
    }
}

/// Mock discovery client for testing.
#[derive(Default)]
pub struct MockDiscoveryClient {
    metadata: Mutex<Option<ProviderMetadata>>,
    error: Mutex<Option<AuthError>>,
    fetch_count: Mutex<usize>,
}

impl MockDiscoveryClient {
    /// Create new mock discovery client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the metadata to return.
    pub fn set_metadata(&self, metadata: ProviderMetadata) -> &Self {
        *lock(&self.metadata) = Some(metadata);
        self
    }

    /// Fail every call with the given error.
    pub fn set_error(&self, error: AuthError) -> &Self {
        *lock(&self.error) = Some(error);
        self
    }

    /// Number of metadata lookups.
    pub fn fetch_count(&self) -> usize {
        *lock(&self.fetch_count)
    }
}

#[async_trait]
impl DiscoveryClient for MockDiscoveryClient {
    async fn metadata(&self) -> AuthResult<ProviderMetadata> {
        *lock(&self.fetch_count) += 1;

        if let Some(error) = lock(&self.error).clone() {
            return Err(error);
        }

        lock(&self.metadata).clone().ok_or_else(|| {
            AuthError::Configuration(ConfigurationError::DiscoveryFailed {
                message: "No mock metadata configured".to_string(),
            })
        })
    }
}

/// Create mock provider metadata for testing.
pub fn create_mock_provider_metadata(authority: &str) -> ProviderMetadata {
    let authority = authority.trim_end_matches('/');
    ProviderMetadata {
        issuer: Some(authority.to_string()),
        authorization_endpoint: format!("{}/oauth/authorize", authority),
        token_endpoint: format!("{}/oauth/token", authority),
    }
}

/// Create mock discovery client for testing.
pub fn create_mock_discovery_client() -> MockDiscoveryClient {
    MockDiscoveryClient::new()
}
