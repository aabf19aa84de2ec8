//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//! - `SHOPFRONT_API_URL` - Catalog and session API base URL (default: `http://localhost:8080`)
//! - `SHOPFRONT_LOGIN_PATH` - Session issuance endpoint path (default: `/members/login`)
//! - `SHOPFRONT_LOGIN_ROUTE` - Login entry point the access gate redirects to (default: `/login`)
//! - `SHOPFRONT_STORAGE_PATH` - Durable token storage file (default: `.shopfront/storage.json`)
//! - `SHOPFRONT_CATALOG_CACHE_TTL_SECS` - Product lookup cache lifetime, 0 disables (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_LOGIN_PATH: &str = "/members/login";
const DEFAULT_LOGIN_ROUTE: &str = "/login";
const DEFAULT_STORAGE_PATH: &str = ".shopfront/storage.json";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Shopfront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL shared by the session and catalog APIs
    pub api_url: Url,
    /// Path of the session issuance endpoint, relative to `api_url`
    pub login_path: String,
    /// Route the access gate sends unauthenticated navigation to
    pub login_route: String,
    /// File backing durable token storage
    pub storage_path: PathBuf,
    /// Product lookup cache lifetime (`Duration::ZERO` disables caching)
    pub catalog_cache_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
    /// Configuration with defaults for everything except the API location.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            catalog_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_url = parse_api_url(&get_or("SHOPFRONT_API_URL", DEFAULT_API_URL))?;
        let login_path = normalize_path(&get_or("SHOPFRONT_LOGIN_PATH", DEFAULT_LOGIN_PATH));
        let login_route = normalize_path(&get_or("SHOPFRONT_LOGIN_ROUTE", DEFAULT_LOGIN_ROUTE));
        let storage_path = PathBuf::from(get_or("SHOPFRONT_STORAGE_PATH", DEFAULT_STORAGE_PATH));
        let ttl_secs = lookup("SHOPFRONT_CATALOG_CACHE_TTL_SECS")
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "SHOPFRONT_CATALOG_CACHE_TTL_SECS".to_string(),
                        e.to_string(),
                    )
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        Ok(Self {
            api_url,
            login_path,
            login_route,
            storage_path,
            catalog_cache_ttl: Duration::from_secs(ttl_secs),
            sentry_dsn: lookup("SENTRY_DSN").filter(|dsn| !dsn.is_empty()),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
        })
    }

    /// Full URL of the session issuance endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if `login_path` cannot be joined onto `api_url`.
    pub fn login_url(&self) -> Result<Url, url::ParseError> {
        api_endpoint(&self.api_url, &self.login_path)
    }
}

/// Append an endpoint path to the API base, keeping any path prefix the base
/// already carries (`https://host/v1` + `/products` is `https://host/v1/products`).
///
/// # Errors
///
/// Returns an error if the combined string is not a valid URL.
pub fn api_endpoint(base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let base = base.as_str().trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Url::parse(&format!("{base}/{path}"))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the API base URL. Only http(s) is accepted.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("SHOPFRONT_API_URL".to_string(), msg);

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("must be a base URL".to_string()));
    }
    Ok(url)
}

/// Ensure a route or endpoint path starts with a single `/`.
fn normalize_path(raw: &str) -> String {
    format!("/{}", raw.trim().trim_start_matches('/'))
}
