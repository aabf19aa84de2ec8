//! Catalog API client.
//!
//! Thin typed wrappers over the catalog's read endpoints. All calls go through
//! the [`AuthorizedGateway`], so they carry the session's bearer token when
//! one is stored.
//!
//! # Endpoints
//!
//! - `GET /products/{id}` - single product (cached)
//! - `GET /products` - listing, optionally `page`/`size` or `limit`
//! - `GET /products/category/{category}` - category listing
//! - `GET /products/categories` - category names (cached)
//! - `GET /carts?userId={id}` - saved carts, most recent first (only the first is read)
//!
//! Products and categories are cached with `moka` for the configured TTL.
//! Saved carts are never cached.

mod cache;

use std::future::Future;
use std::time::Duration;

use moka::future::Cache;
use shopfront_core::{Product, ProductId, ProductListing, ProductQuery, SavedCart, UserId};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::gateway::{AuthorizedGateway, GatewayError};

use cache::{CacheKey, CacheValue};

/// Errors returned by catalog calls.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The product does not exist.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// The request failed at the gateway.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// The catalog reads cart hydration depends on.
///
/// [`CatalogClient`] is the production implementation; tests substitute
/// in-memory fakes.
pub trait CartSource: Sync {
    /// The user's most recent saved cart, if any.
    fn latest_saved_cart(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<SavedCart>, CatalogError>> + Send;

    /// A single product snapshot.
    fn product(&self, id: ProductId) -> impl Future<Output = Result<Product, CatalogError>> + Send;
}

// =============================================================================
// CatalogClient
// =============================================================================

/// Client for the catalog API.
#[derive(Clone)]
pub struct CatalogClient {
    gateway: AuthorizedGateway,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl CatalogClient {
    /// Create a catalog client. A zero `cache_ttl` disables caching.
    #[must_use]
    pub fn new(gateway: AuthorizedGateway, cache_ttl: Duration) -> Self {
        let cache = (!cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(1000)
                .time_to_live(cache_ttl)
                .build()
        });

        Self { gateway, cache }
    }

    async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        match &self.cache {
            Some(cache) => cache.get(key).await,
            None => None,
        }
    }

    async fn remember(&self, key: CacheKey, value: CacheValue) {
        if let Some(cache) = &self.cache {
            cache.insert(key, value).await;
        }
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` if the catalog has no such product, or a
    /// gateway error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, CatalogError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cached(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Option<Product> = self
            .gateway
            .get_json(&format!("/products/{id}"), &[])
            .await
            .map_err(|e| match e {
                GatewayError::NotFound(_) => CatalogError::ProductNotFound(id),
                other => CatalogError::Gateway(other),
            })?;
        let product = product.ok_or(CatalogError::ProductNotFound(id))?;

        self.remember(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    /// List products.
    ///
    /// The catalog cannot combine a category with a limit; when both are set
    /// the category wins and the limit is ignored.
    ///
    /// # Errors
    ///
    /// Returns a gateway error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<ProductListing, CatalogError> {
        if let Some(category) = &query.category {
            if query.limit.is_some() {
                tracing::warn!(
                    category = %category,
                    "category and limit cannot be combined; ignoring limit"
                );
            }
            let path = format!("/products/category/{}", urlencoding::encode(category));
            return Ok(self.gateway.get_json(&path, &[]).await?);
        }

        let mut params = Vec::new();
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }
        if let Some(size) = query.size {
            params.push(("size", size.to_string()));
        }
        if let Some(limit) = query.limit {
            params.push(("limit", limit.to_string()));
        }

        Ok(self.gateway.get_json("/products", &params).await?)
    }

    /// List category names.
    ///
    /// # Errors
    ///
    /// Returns a gateway error if the request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<String>, CatalogError> {
        if let Some(CacheValue::Categories(categories)) = self.cached(&CacheKey::Categories).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<String> = self.gateway.get_json("/products/categories", &[]).await?;
        self.remember(
            CacheKey::Categories,
            CacheValue::Categories(categories.clone()),
        )
        .await;
        Ok(categories)
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// The most recent saved cart for a user.
    ///
    /// The catalog returns carts most recent first; only the first record is
    /// decoded, so older records never affect the result.
    ///
    /// # Errors
    ///
    /// Returns a gateway error if the request fails or the first record is
    /// not a saved cart.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn latest_cart_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<SavedCart>, CatalogError> {
        let carts: Option<Vec<serde_json::Value>> = self
            .gateway
            .get_json("/carts", &[("userId", user_id.to_string())])
            .await?;

        let Some(latest) = carts.and_then(|carts| carts.into_iter().next()) else {
            return Ok(None);
        };

        let cart = serde_json::from_value(latest).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse saved cart");
            GatewayError::Parse(e)
        })?;
        Ok(Some(cart))
    }
}

impl CartSource for CatalogClient {
    async fn latest_saved_cart(&self, user_id: UserId) -> Result<Option<SavedCart>, CatalogError> {
        self.latest_cart_for_user(user_id).await
    }

    async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.get_product(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use shopfront_core::CartId;
    use url::Url;

    use super::*;
    use crate::credentials::SessionCredentials;
    use crate::storage::MemoryStorage;

    const BACKPACK: &str = r#"{
        "id": 1,
        "title": "Backpack",
        "price": 109.95,
        "description": "Fits a laptop",
        "category": "men's clothing",
        "image": "https://example.com/1.jpg",
        "rating": { "rate": 3.9, "count": 120 }
    }"#;

    fn client(server: &mockito::Server, ttl: Duration) -> CatalogClient {
        let credentials = SessionCredentials::new(Arc::new(MemoryStorage::new()));
        let gateway = AuthorizedGateway::new(Url::parse(&server.url()).unwrap(), credentials);
        CatalogClient::new(gateway, ttl)
    }

    #[tokio::test]
    async fn test_get_product_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/products/1")
            .with_status(200)
            .with_body(BACKPACK)
            .expect(1)
            .create_async()
            .await;

        let catalog = client(&server, Duration::from_secs(60));
        let first = catalog.get_product(ProductId::new(1)).await.unwrap();
        let second = catalog.get_product(ProductId::new(1)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.title, "Backpack");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/products/1")
            .with_status(200)
            .with_body(BACKPACK)
            .expect(2)
            .create_async()
            .await;

        let catalog = client(&server, Duration::ZERO);
        catalog.get_product(ProductId::new(1)).await.unwrap();
        catalog.get_product(ProductId::new(1)).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_product() {
        let mut server = mockito::Server::new_async().await;
        let _not_found = server
            .mock("GET", "/products/404")
            .with_status(404)
            .create_async()
            .await;
        let _empty = server
            .mock("GET", "/products/21")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let catalog = client(&server, Duration::ZERO);

        let err = catalog.get_product(ProductId::new(404)).await.unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(id) if id == ProductId::new(404)));

        let err = catalog.get_product(ProductId::new(21)).await.unwrap_err();
        assert!(matches!(err, CatalogError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_products_by_category_encodes_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/products/category/men%27s%20clothing")
            .with_status(200)
            .with_body(format!("[{BACKPACK}]"))
            .create_async()
            .await;

        let catalog = client(&server, Duration::ZERO);
        let listing = catalog
            .list_products(&ProductQuery::category("men's clothing"))
            .await
            .unwrap();

        assert_eq!(listing.into_items().len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_products_paged() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/products")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("page".into(), "2".into()),
                mockito::Matcher::UrlEncoded("size".into(), "8".into()),
            ]))
            .with_status(200)
            .with_body(format!(
                r#"{{ "dtoList": [{BACKPACK}], "total": 9, "page": 2, "size": 8 }}"#
            ))
            .create_async()
            .await;

        let catalog = client(&server, Duration::ZERO);
        let listing = catalog
            .list_products(&ProductQuery::page(2, 8))
            .await
            .unwrap();

        assert_eq!(listing.page().unwrap().total, 9);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_latest_cart_for_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/carts")
            .match_query(mockito::Matcher::UrlEncoded("userId".into(), "42".into()))
            .with_status(200)
            .with_body(
                r#"[{ "id": 9, "userId": 42, "date": "2020-03-02T00:00:00.000Z",
                      "products": [{ "productId": 1, "quantity": 2 }] },
                    { "id": 3, "userId": 42, "products": [] }]"#,
            )
            .create_async()
            .await;

        let catalog = client(&server, Duration::ZERO);
        let cart = catalog
            .latest_cart_for_user(UserId::new(42))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(cart.id, CartId::new(9));
        assert_eq!(cart.items[0].quantity().unwrap().get(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_latest_cart_ignores_older_records() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/carts")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"[{ "id": 9, "userId": 42, "date": "2024-05-01T10:00:00",
                      "products": [{ "productId": 1, "quantity": 1 }] },
                    { "id": "not-a-cart", "date": [2019, 1, 1] }]"#,
            )
            .create_async()
            .await;

        let catalog = client(&server, Duration::ZERO);
        let cart = catalog
            .latest_cart_for_user(UserId::new(42))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(cart.id, CartId::new(9));
        assert!(cart.date.is_some());
    }

    #[tokio::test]
    async fn test_latest_cart_none() {
        let mut server = mockito::Server::new_async().await;
        let _empty = server
            .mock("GET", "/carts")
            .match_query(mockito::Matcher::UrlEncoded("userId".into(), "1".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let _null = server
            .mock("GET", "/carts")
            .match_query(mockito::Matcher::UrlEncoded("userId".into(), "2".into()))
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let catalog = client(&server, Duration::ZERO);
        assert!(catalog.latest_cart_for_user(UserId::new(1)).await.unwrap().is_none());
        assert!(catalog.latest_cart_for_user(UserId::new(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_categories_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/products/categories")
            .with_status(200)
            .with_body(r#"["electronics","jewelery"]"#)
            .expect(1)
            .create_async()
            .await;

        let catalog = client(&server, Duration::from_secs(60));
        assert_eq!(catalog.categories().await.unwrap().len(), 2);
        assert_eq!(catalog.categories().await.unwrap()[1], "jewelery");
        mock.assert_async().await;
    }
}
