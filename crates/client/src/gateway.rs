//! Authorized request gateway.
//!
//! Every catalog and cart call goes out through [`AuthorizedGateway`]. Before
//! dispatch it reads the access token from [`SessionCredentials`] (durable
//! storage, not the session store's in-memory state) and, when one is
//! present, attaches it as a bearer credential. Without a token the request
//! is sent as-is and the remote endpoint decides.
//!
//! There is no retry and no refresh-token rotation: a rejected token surfaces
//! as [`GatewayError::Unauthorized`].

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::api_endpoint;
use crate::credentials::SessionCredentials;

/// Maximum number of body characters kept for diagnostics.
const BODY_EXCERPT_CHARS: usize = 200;

/// Errors returned by gateway requests.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The endpoint URL could not be built.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint rejected the (missing or expired) credential.
    #[error("unauthorized")]
    Unauthorized,

    /// The resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Request decorator and JSON fetcher for authenticated API calls.
#[derive(Debug, Clone)]
pub struct AuthorizedGateway {
    client: reqwest::Client,
    base_url: Url,
    credentials: SessionCredentials,
}

impl AuthorizedGateway {
    /// Create a gateway for the API rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: Url, credentials: SessionCredentials) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, credentials)
    }

    /// Create a gateway that shares an existing HTTP client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        base_url: Url,
        credentials: SessionCredentials,
    ) -> Self {
        Self {
            client,
            base_url,
            credentials,
        }
    }

    /// Build the URL for `path` with the given query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not form a valid URL.
    pub fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, GatewayError> {
        let mut url = api_endpoint(&self.base_url, path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Attach the stored bearer token to a request, if there is one.
    #[must_use]
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.access_token() {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Start an authorized request.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL is invalid.
    pub fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<RequestBuilder, GatewayError> {
        let url = self.endpoint(path, query)?;
        Ok(self.authorize(self.client.request(method, url)))
    }

    /// `GET` a JSON resource.
    ///
    /// An empty body is read as JSON `null`, so callers asking for an
    /// `Option<T>` see a missing resource as `None`.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` on 401/403, `NotFound` on 404, `Status` for other
    /// non-success codes, and `Parse` if the body is not the expected JSON.
    #[instrument(skip(self, query), fields(path = %path))]
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let response = self.request(Method::GET, path, query)?.send().await?;
        let status = response.status();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(GatewayError::Unauthorized);
            }
            StatusCode::NOT_FOUND => return Err(GatewayError::NotFound(path.to_string())),
            _ => {}
        }

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %excerpt(&body),
                "API returned non-success status"
            );
            return Err(GatewayError::Status {
                status,
                body: excerpt(&body),
            });
        }

        let json = if body.trim().is_empty() { "null" } else { &body };
        serde_json::from_str(json).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&body),
                "Failed to parse API response"
            );
            GatewayError::Parse(e)
        })
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}
