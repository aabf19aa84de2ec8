//! Session credentials shared by the session store and the request gateway.
//!
//! Durable storage is the single source of truth for the bearer token. The
//! [`SessionStore`](crate::session::SessionStore) writes and clears it, the
//! [`AuthorizedGateway`](crate::gateway::AuthorizedGateway) reads it, and
//! neither depends on the other.

use std::fmt;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::storage::{LocalStorage, StorageError};

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Token pair issued by the session endpoint.
#[derive(Clone)]
pub struct AuthTokens {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl AuthTokens {
    /// Create a token pair.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
        }
    }
}

impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Handle to the credentials held in durable storage.
///
/// Cheap to clone; all clones see the same storage.
#[derive(Clone)]
pub struct SessionCredentials {
    storage: Arc<dyn LocalStorage>,
}

impl SessionCredentials {
    /// Wrap a storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self { storage }
    }

    /// The stored access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.read(ACCESS_TOKEN_KEY)
    }

    /// The stored refresh token, if any.
    #[must_use]
    pub fn refresh_token(&self) -> Option<SecretString> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Whether an access token is currently stored.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.access_token().is_some()
    }

    /// Persist a freshly issued token pair.
    ///
    /// # Errors
    ///
    /// Returns an error if either token could not be written.
    pub fn store(&self, tokens: &AuthTokens) -> Result<(), StorageError> {
        self.storage
            .set(ACCESS_TOKEN_KEY, tokens.access_token.expose_secret())?;
        self.storage
            .set(REFRESH_TOKEN_KEY, tokens.refresh_token.expose_secret())
    }

    /// Remove both tokens.
    ///
    /// Both removals are attempted even if the first fails.
    ///
    /// # Errors
    ///
    /// Returns the first removal error.
    pub fn clear(&self) -> Result<(), StorageError> {
        let access = self.storage.remove(ACCESS_TOKEN_KEY);
        let refresh = self.storage.remove(REFRESH_TOKEN_KEY);
        access.and(refresh)
    }

    fn read(&self, key: &str) -> Option<SecretString> {
        self.storage
            .get(key)
            .filter(|value| !value.is_empty())
            .map(SecretString::from)
    }
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("has_access_token", &self.has_access_token())
            .finish()
    }
}
