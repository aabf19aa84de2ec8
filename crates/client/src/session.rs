//! Session store.
//!
//! Holds the authentication state for one client session and drives it
//! through a closed set of transitions:
//!
//! | Action           | Effect                                                      |
//! |------------------|-------------------------------------------------------------|
//! | `LoginStart`     | loading, error cleared                                      |
//! | `LoginSuccess`   | authenticated, tokens and user stored, error cleared        |
//! | `LoginFailure`   | unauthenticated, tokens and user cleared, error set         |
//! | `Logout`         | back to the initial empty state                             |
//!
//! The in-memory state is rebuilt empty on every start. Only the token pair
//! is persisted, through [`SessionCredentials`], so the request gateway can
//! authorize calls without depending on this store.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::credentials::{AuthTokens, SessionCredentials};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::storage::StorageError;

/// Message used when the server rejects a login without saying why.
pub const LOGIN_FAILED_FALLBACK: &str = "Login failed";

/// Why a login attempt failed.
///
/// Captured into [`Session::error`]; never returned to the caller of
/// [`SessionStore::login`].
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// The server answered with a non-success status.
    #[error("{0}")]
    Rejected(String),

    /// The server could not be reached.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The success response did not contain a token pair.
    #[error("invalid login response: {0}")]
    InvalidResponse(#[from] serde_json::Error),

    /// The issued tokens could not be persisted.
    #[error("failed to store credentials: {0}")]
    Storage(#[from] StorageError),
}

/// Login form input.
#[derive(Clone)]
pub struct LoginCredentials {
    pub identifier: String,
    pub secret: SecretString,
}

impl LoginCredentials {
    /// Create login credentials.
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: SecretString::from(secret.into()),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("identifier", &self.identifier)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Identity of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub identifier: String,
}

/// Authentication state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<SessionUser>,
    pub tokens: Option<AuthTokens>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Session state transitions.
#[derive(Debug, Clone)]
pub enum SessionAction {
    LoginStart,
    LoginSuccess { tokens: AuthTokens, user: SessionUser },
    LoginFailure(String),
    Logout,
}

impl Session {
    /// Apply one transition.
    #[must_use]
    pub fn reduce(self, action: SessionAction) -> Self {
        match action {
            SessionAction::LoginStart => Self {
                is_loading: true,
                error: None,
                ..self
            },
            SessionAction::LoginSuccess { tokens, user } => Self {
                user: Some(user),
                tokens: Some(tokens),
                is_authenticated: true,
                is_loading: false,
                error: None,
            },
            SessionAction::LoginFailure(message) => Self {
                user: None,
                tokens: None,
                is_authenticated: false,
                is_loading: false,
                error: Some(message),
            },
            SessionAction::Logout => Self::default(),
        }
    }
}

/// Anything that can answer "is there an authenticated session?".
pub trait SessionStatus {
    fn is_authenticated(&self) -> bool;
}

impl SessionStatus for Session {
    fn is_authenticated(&self) -> bool {
        self.is_authenticated && self.tokens.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct LoginRequest<'a> {
    identifier: &'a str,
    secret: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionStore
// ─────────────────────────────────────────────────────────────────────────────

/// Shared handle to the session state.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    state: RwLock<Session>,
    client: reqwest::Client,
    login_url: Url,
    credentials: SessionCredentials,
}

impl SessionStore {
    /// Create an empty, unauthenticated session.
    #[must_use]
    pub fn new(login_url: Url, credentials: SessionCredentials) -> Self {
        Self::with_client(reqwest::Client::new(), login_url, credentials)
    }

    /// Create a session store that shares an existing HTTP client.
    #[must_use]
    pub fn with_client(
        client: reqwest::Client,
        login_url: Url,
        credentials: SessionCredentials,
    ) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                state: RwLock::new(Session::default()),
                client,
                login_url,
                credentials,
            }),
        }
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether a login attempt is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.read(|s| s.is_loading)
    }

    /// The last login failure message.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.read(|s| s.error.clone())
    }

    /// The logged-in user.
    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        self.read(|s| s.user.clone())
    }

    /// Apply a transition atomically.
    pub fn dispatch(&self, action: SessionAction) {
        let mut state = self
            .inner
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *state = std::mem::take(&mut *state).reduce(action);
    }

    fn read<T>(&self, f: impl FnOnce(&Session) -> T) -> T {
        f(&self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner))
    }

    /// Log in with the given credentials.
    ///
    /// Failures are recorded in [`Session::error`] rather than returned;
    /// check [`is_authenticated`](SessionStatus::is_authenticated) or
    /// [`error`](Self::error) afterwards. On success the token pair is also
    /// written to durable storage.
    #[instrument(skip(self, credentials), fields(identifier = %credentials.identifier))]
    pub async fn login(&self, credentials: &LoginCredentials) {
        self.dispatch(SessionAction::LoginStart);

        match self.issue_tokens(credentials).await {
            Ok(tokens) => {
                tracing::info!("Login succeeded");
                set_sentry_user(&credentials.identifier);
                self.dispatch(SessionAction::LoginSuccess {
                    tokens,
                    user: SessionUser {
                        identifier: credentials.identifier.clone(),
                    },
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login failed");
                self.dispatch(SessionAction::LoginFailure(e.to_string()));
            }
        }
    }

    /// Request a token pair and persist it.
    async fn issue_tokens(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<AuthTokens, AuthenticationError> {
        let request = LoginRequest {
            identifier: &credentials.identifier,
            secret: credentials.secret.expose_secret(),
        };

        let response = self
            .inner
            .client
            .post(self.inner.login_url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.message)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| LOGIN_FAILED_FALLBACK.to_string());
            return Err(AuthenticationError::Rejected(message));
        }

        let issued: TokenResponse = serde_json::from_str(&body)?;
        let tokens = AuthTokens::new(issued.access_token, issued.refresh_token);

        if let Err(e) = self.inner.credentials.store(&tokens) {
            // Don't leave half a token pair behind
            if let Err(cleanup) = self.inner.credentials.clear() {
                tracing::error!(error = %cleanup, "Failed to clear partially stored credentials");
            }
            return Err(e.into());
        }

        Ok(tokens)
    }

    /// Log out: clear stored tokens and reset the session.
    ///
    /// Never fails; a storage error is logged and the in-memory session is
    /// reset regardless.
    pub fn logout(&self) {
        if let Err(e) = self.inner.credentials.clear() {
            tracing::error!(error = %e, "Failed to clear stored credentials");
        }
        self.dispatch(SessionAction::Logout);
        clear_sentry_user();
        tracing::info!("Logged out");
    }
}

impl SessionStatus for SessionStore {
    fn is_authenticated(&self) -> bool {
        self.read(|s| s.is_authenticated())
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &self.snapshot())
            .field("login_url", &self.inner.login_url.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::credentials::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
    use crate::storage::{LocalStorage, MemoryStorage};

    fn user() -> SessionUser {
        SessionUser {
            identifier: "alice".to_string(),
        }
    }

    fn store(server: &mockito::Server) -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let credentials = SessionCredentials::new(storage.clone());
        let login_url = Url::parse(&format!("{}/members/login", server.url())).unwrap();
        (storage, SessionStore::new(login_url, credentials))
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    #[test]
    fn test_login_start_is_idempotent() {
        let failed = Session::default().reduce(SessionAction::LoginFailure("nope".to_string()));
        let once = failed.reduce(SessionAction::LoginStart);
        let twice = once.clone().reduce(SessionAction::LoginStart);

        assert!(twice.is_loading);
        assert!(twice.error.is_none());
        assert_eq!(once.is_loading, twice.is_loading);
        assert_eq!(once.error, twice.error);
    }

    #[test]
    fn test_login_success_authenticates() {
        let session = Session::default()
            .reduce(SessionAction::LoginStart)
            .reduce(SessionAction::LoginSuccess {
                tokens: AuthTokens::new("a", "r"),
                user: user(),
            });

        assert!(session.is_authenticated());
        assert!(!session.is_loading);
        assert!(session.error.is_none());
        assert_eq!(session.user, Some(user()));
    }

    #[test]
    fn test_login_failure_clears_identity() {
        let session = Session::default()
            .reduce(SessionAction::LoginSuccess {
                tokens: AuthTokens::new("a", "r"),
                user: user(),
            })
            .reduce(SessionAction::LoginStart)
            .reduce(SessionAction::LoginFailure("bad password".to_string()));

        assert!(!session.is_authenticated());
        assert!(session.tokens.is_none());
        assert!(session.user.is_none());
        assert_eq!(session.error.as_deref(), Some("bad password"));
    }

    #[test]
    fn test_logout_resets_everything() {
        let session = Session::default()
            .reduce(SessionAction::LoginFailure("x".to_string()))
            .reduce(SessionAction::Logout);

        assert!(!session.is_authenticated());
        assert!(!session.is_loading);
        assert!(session.error.is_none());
    }

    // =========================================================================
    // Login / Logout
    // =========================================================================

    #[tokio::test]
    async fn test_login_stores_tokens() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/members/login")
            .match_body(mockito::Matcher::Json(serde_json::json!({
                "identifier": "alice",
                "secret": "hunter2"
            })))
            .with_status(200)
            .with_body(r#"{"accessToken":"access-1","refreshToken":"refresh-1"}"#)
            .create_async()
            .await;

        let (storage, session) = store(&server);
        session
            .login(&LoginCredentials::new("alice", "hunter2"))
            .await;

        assert!(session.is_authenticated());
        assert!(!session.is_loading());
        assert!(session.error().is_none());
        assert_eq!(session.user(), Some(user()));
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("access-1"));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).as_deref(), Some("refresh-1"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_rejected_uses_server_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/members/login")
            .with_status(401)
            .with_body(r#"{"message":"Invalid password"}"#)
            .create_async()
            .await;

        let (storage, session) = store(&server);
        session.login(&LoginCredentials::new("alice", "wrong")).await;

        assert!(!session.is_authenticated());
        assert_eq!(session.error().as_deref(), Some("Invalid password"));
        assert!(storage.get(ACCESS_TOKEN_KEY).is_none());
        assert!(storage.get(REFRESH_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_login_rejected_without_message_uses_fallback() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/members/login")
            .with_status(500)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let (_, session) = store(&server);
        session.login(&LoginCredentials::new("alice", "pw")).await;

        assert_eq!(session.error().as_deref(), Some(LOGIN_FAILED_FALLBACK));
    }

    #[tokio::test]
    async fn test_login_unreachable_is_captured() {
        let storage = Arc::new(MemoryStorage::new());
        let credentials = SessionCredentials::new(storage);
        // Port 9 (discard) is not expected to accept HTTP
        let session = SessionStore::new(
            Url::parse("http://127.0.0.1:9/members/login").unwrap(),
            credentials,
        );

        session.login(&LoginCredentials::new("alice", "pw")).await;

        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
        assert!(session.error().unwrap().starts_with("network error"));
    }

    #[tokio::test]
    async fn test_new_attempt_clears_previous_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/members/login")
            .with_status(200)
            .with_body(r#"{"accessToken":"a","refreshToken":"r"}"#)
            .create_async()
            .await;

        let (_, session) = store(&server);
        session.dispatch(SessionAction::LoginFailure("stale".to_string()));
        session.login(&LoginCredentials::new("alice", "pw")).await;

        assert!(session.error().is_none());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_then_logout_clears_storage() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/members/login")
            .with_status(200)
            .with_body(r#"{"accessToken":"a","refreshToken":"r"}"#)
            .create_async()
            .await;

        let (storage, session) = store(&server);
        session.login(&LoginCredentials::new("alice", "pw")).await;
        session.logout();

        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(storage.get(ACCESS_TOKEN_KEY).is_none());
        assert!(storage.get(REFRESH_TOKEN_KEY).is_none());
    }

    /// Storage that refuses to write the refresh token, and optionally
    /// refuses every removal.
    struct BrokenStorage {
        entries: MemoryStorage,
        removals_fail: bool,
    }

    fn broken() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only")
    }

    impl LocalStorage for BrokenStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.entries.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == REFRESH_TOKEN_KEY {
                return Err(broken().into());
            }
            self.entries.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            if self.removals_fail {
                return Err(broken().into());
            }
            self.entries.remove(key)
        }
    }

    async fn login_with_broken_storage(removals_fail: bool) -> (Arc<BrokenStorage>, SessionStore) {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/members/login")
            .with_status(200)
            .with_body(r#"{"accessToken":"a","refreshToken":"r"}"#)
            .create_async()
            .await;

        let storage = Arc::new(BrokenStorage {
            entries: MemoryStorage::new(),
            removals_fail,
        });
        let session = SessionStore::new(
            Url::parse(&format!("{}/members/login", server.url())).unwrap(),
            SessionCredentials::new(storage.clone()),
        );
        session.login(&LoginCredentials::new("alice", "pw")).await;
        (storage, session)
    }

    #[tokio::test]
    async fn test_storage_failure_clears_partial_tokens() {
        let (storage, session) = login_with_broken_storage(false).await;

        assert!(!session.is_authenticated());
        assert!(!session.is_loading());
        assert!(
            session
                .error()
                .unwrap()
                .starts_with("failed to store credentials")
        );
        assert!(storage.get(ACCESS_TOKEN_KEY).is_none());
    }

    #[tokio::test]
    async fn test_failed_cleanup_still_records_failure() {
        let (storage, session) = login_with_broken_storage(true).await;

        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(
            session
                .error()
                .unwrap()
                .starts_with("failed to store credentials")
        );
        // Cleanup could not run, so the half-written pair is still there
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_is_loading_while_login_in_flight() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;
        use tokio::sync::oneshot;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, received_rx) = oneshot::channel::<()>();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        // Hold the login response until the test has looked at the session
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !request.ends_with(b"}") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            received_tx.send(()).unwrap();
            release_rx.await.unwrap();

            let body = r#"{"accessToken":"a","refreshToken":"r"}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let storage = Arc::new(MemoryStorage::new());
        let session = SessionStore::new(
            Url::parse(&format!("http://{addr}/members/login")).unwrap(),
            SessionCredentials::new(storage.clone()),
        );
        session.dispatch(SessionAction::LoginFailure("stale".to_string()));

        let credentials = LoginCredentials::new("alice", "pw");
        tokio::join!(session.login(&credentials), async {
            received_rx.await.unwrap();
            assert!(session.is_loading());
            assert!(session.error().is_none());
            assert!(!session.is_authenticated());
            assert!(storage.get(ACCESS_TOKEN_KEY).is_none());
            release_tx.send(()).unwrap();
        });

        assert!(!session.is_loading());
        assert!(session.is_authenticated());
        server.await.unwrap();
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = LoginCredentials::new("alice", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
