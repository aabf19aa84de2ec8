//! Integration test support for the Shopfront client engine.
//!
//! Every test gets its own [`TestContext`]: a `mockito` server standing in
//! for the session and catalog APIs, and a [`Storefront`] wired to it with
//! file-backed token storage in a temporary directory.
//!
//! ```rust,ignore
//! let mut ctx = TestContext::new().await;
//! ctx.mock_login_success("alice").await;
//! ctx.storefront.session().login(&ctx.credentials("alice")).await;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use mockito::{Mock, ServerGuard};
use serde_json::{Value, json};
use shopfront_client::{ClientConfig, FileStorage, LocalStorage, LoginCredentials, Storefront};
use tempfile::TempDir;

/// Password every mocked login accepts.
pub const VALID_PASSWORD: &str = "correct-horse";

/// A mock API server and a storefront session pointed at it.
pub struct TestContext {
    pub server: ServerGuard,
    pub storefront: Storefront,
    storage_dir: TempDir,
}

impl TestContext {
    /// Start a mock server and build a storefront against it.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory or the storefront cannot be created.
    pub async fn new() -> Self {
        let server = mockito::Server::new_async().await;
        let storage_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let storefront = Self::storefront_for(&server, &storage_dir);

        Self {
            server,
            storefront,
            storage_dir,
        }
    }

    fn storefront_for(server: &ServerGuard, dir: &TempDir) -> Storefront {
        let mut config = ClientConfig::new(server.url().parse().expect("Invalid mock server URL"));
        config.storage_path = dir.path().join("storage.json");
        // Mocks count requests; caching would hide them
        config.catalog_cache_ttl = Duration::ZERO;
        Storefront::from_config(config).expect("Failed to build storefront")
    }

    /// A second storefront over the same storage file, as after a restart.
    #[must_use]
    pub fn restart(&self) -> Storefront {
        Self::storefront_for(&self.server, &self.storage_dir)
    }

    /// Path of the token storage file.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.storage_dir.path().join("storage.json")
    }

    /// What is on disk right now.
    ///
    /// # Panics
    ///
    /// Panics if the storage file exists but cannot be read.
    #[must_use]
    pub fn stored_keys(&self) -> Vec<String> {
        let storage = FileStorage::open(self.storage_path()).expect("Failed to read storage");
        ["accessToken", "refreshToken"]
            .into_iter()
            .filter(|key| storage.get(key).is_some())
            .map(str::to_string)
            .collect()
    }

    /// Login credentials for `username` with the accepted password.
    #[must_use]
    pub fn credentials(&self, username: &str) -> LoginCredentials {
        LoginCredentials::new(username, VALID_PASSWORD)
    }

    /// Accept `username` with [`VALID_PASSWORD`], issuing `access-{username}`.
    pub async fn mock_login_success(&mut self, username: &str) -> Mock {
        self.server
            .mock("POST", "/members/login")
            .match_body(mockito::Matcher::Json(json!({
                "identifier": username,
                "secret": VALID_PASSWORD,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "accessToken": format!("access-{username}"),
                    "refreshToken": format!("refresh-{username}"),
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    /// Reject any login with `message`.
    pub async fn mock_login_rejected(&mut self, message: &str) -> Mock {
        self.server
            .mock("POST", "/members/login")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(json!({ "message": message }).to_string())
            .create_async()
            .await
    }

    /// Serve a product.
    pub async fn mock_product(&mut self, id: i64, title: &str, price: f64) -> Mock {
        self.server
            .mock("GET", format!("/products/{id}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(product_json(id, title, price).to_string())
            .create_async()
            .await
    }

    /// Serve the saved carts for `user_id`, in the order given.
    pub async fn mock_saved_carts(&mut self, user_id: i64, carts: &[&[(i64, u32)]]) -> Mock {
        let body: Vec<Value> = carts
            .iter()
            .enumerate()
            .map(|(index, lines)| {
                json!({
                    "id": index + 1,
                    "userId": user_id,
                    "date": "2020-03-02T00:00:00.000Z",
                    "products": lines
                        .iter()
                        .map(|(product_id, quantity)| json!({
                            "productId": product_id,
                            "quantity": quantity,
                        }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();

        self.server
            .mock("GET", "/carts")
            .match_query(mockito::Matcher::UrlEncoded(
                "userId".into(),
                user_id.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(Value::Array(body).to_string())
            .create_async()
            .await
    }
}

/// A catalog product as the API returns it.
#[must_use]
pub fn product_json(id: i64, title: &str, price: f64) -> Value {
    json!({
        "id": id,
        "title": title,
        "price": price,
        "description": format!("{title} description"),
        "category": "electronics",
        "image": format!("https://example.com/{id}.jpg"),
        "rating": { "rate": 4.1, "count": 259 },
    })
}
