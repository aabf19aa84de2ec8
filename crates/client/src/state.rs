//! Per-session state shared across views.

use std::sync::Arc;

use shopfront_core::UserId;

use crate::cart::{CartStore, HydrateOutcome};
use crate::catalog::CatalogClient;
use crate::config::ClientConfig;
use crate::credentials::SessionCredentials;
use crate::error::Result;
use crate::gate::AccessGate;
use crate::gateway::AuthorizedGateway;
use crate::session::SessionStore;
use crate::storage::{FileStorage, LocalStorage};

/// Everything one storefront session owns.
///
/// Cheaply cloneable via `Arc`; clones share the same session and cart. The
/// session store, the request gateway and the catalog all read tokens
/// through one [`SessionCredentials`] over the same durable storage.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: ClientConfig,
    credentials: SessionCredentials,
    catalog: CatalogClient,
    session: SessionStore,
    cart: CartStore,
    gate: AccessGate,
}

impl Storefront {
    /// Create a storefront backed by the configured storage file.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage file exists but cannot be read, or if
    /// the login URL cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let storage = FileStorage::open(&config.storage_path)?;
        Self::with_storage(config, Arc::new(storage))
    }

    /// Create a storefront over an arbitrary storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the login URL cannot be built.
    pub fn with_storage(config: ClientConfig, storage: Arc<dyn LocalStorage>) -> Result<Self> {
        let http = reqwest::Client::new();
        let credentials = SessionCredentials::new(storage);

        let gateway =
            AuthorizedGateway::with_client(http.clone(), config.api_url.clone(), credentials.clone());
        let catalog = CatalogClient::new(gateway, config.catalog_cache_ttl);
        let session = SessionStore::with_client(http, config.login_url()?, credentials.clone());
        let gate = AccessGate::new(config.login_route.clone());

        tracing::debug!(api_url = %config.api_url, "Storefront session created");

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                credentials,
                catalog,
                session,
                cart: CartStore::new(),
                gate,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Durable token access.
    #[must_use]
    pub fn credentials(&self) -> &SessionCredentials {
        &self.inner.credentials
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn gate(&self) -> &AccessGate {
        &self.inner.gate
    }

    /// Hydrate this session's cart from the catalog.
    pub async fn hydrate_cart(&self, user_id: UserId) -> HydrateOutcome {
        self.inner.cart.hydrate(&self.inner.catalog, user_id).await
    }
}
