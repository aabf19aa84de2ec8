//! Access gate.
//!
//! Guards the storefront's views. Every navigation is checked against the
//! current session; nothing about the decision is remembered between calls.
//!
//! # Example
//!
//! ```rust,ignore
//! let gate = AccessGate::new("/login");
//! match gate.guard(&session, "/cart", |route| render(route)) {
//!     Ok(view) => show(view),
//!     Err(redirect) => navigate(&redirect.location()),
//! }
//! ```

use std::fmt;

use shopfront_core::ProductId;

use crate::session::SessionStatus;

/// Path the bare root redirects to.
pub const HOME_PATH: &str = "/products";

/// A navigable storefront view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`; never rendered, always redirected to [`HOME_PATH`].
    Home,
    /// `/products`
    Products,
    /// `/products/{id}`
    ProductDetail(ProductId),
    /// `/cart`
    Cart,
    /// `/admin`
    Admin,
    /// The login entry point, at its configured path.
    Login(String),
    /// Anything else.
    NotFound(String),
}

impl Route {
    /// Parse a path, ignoring any query string, fragment or trailing slash.
    #[must_use]
    pub fn parse(path: &str, login_route: &str) -> Self {
        let path = normalize(path);
        if path == normalize(login_route) {
            return Self::Login(path.to_string());
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Self::Home,
            ["products"] => Self::Products,
            ["products", id] => id
                .parse()
                .map_or_else(|_| Self::NotFound(path.to_string()), Self::ProductDetail),
            ["cart"] => Self::Cart,
            ["admin"] => Self::Admin,
            _ => Self::NotFound(path.to_string()),
        }
    }

    /// Whether this route requires an authenticated session.
    #[must_use]
    pub const fn is_protected(&self) -> bool {
        !matches!(self, Self::Login(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => write!(f, "/"),
            Self::Products => write!(f, "/products"),
            Self::ProductDetail(id) => write!(f, "/products/{id}"),
            Self::Cart => write!(f, "/cart"),
            Self::Admin => write!(f, "/admin"),
            Self::Login(path) | Self::NotFound(path) => write!(f, "{path}"),
        }
    }
}

fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let trimmed = path.get(..end).unwrap_or(path).trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Where to send the caller instead of rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    /// The originally requested path, for returning after login.
    pub return_to: Option<String>,
}

impl Redirect {
    /// The redirect target with `returnTo` appended when present.
    #[must_use]
    pub fn location(&self) -> String {
        match &self.return_to {
            Some(path) => format!("{}?returnTo={}", self.to, urlencoding::encode(path)),
            None => self.to.clone(),
        }
    }
}

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Render(Route),
    Redirect(Redirect),
}

/// Stateless guard for protected views.
#[derive(Debug, Clone)]
pub struct AccessGate {
    login_route: String,
}

impl AccessGate {
    /// Create a gate that sends unauthenticated traffic to `login_route`.
    #[must_use]
    pub fn new(login_route: impl Into<String>) -> Self {
        Self {
            login_route: login_route.into(),
        }
    }

    /// The login entry point.
    #[must_use]
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Decide whether `path` may be rendered for `session`.
    pub fn check(&self, session: &impl SessionStatus, path: &str) -> GateDecision {
        let route = Route::parse(path, &self.login_route);

        if route == Route::Home {
            return GateDecision::Redirect(Redirect {
                to: HOME_PATH.to_string(),
                return_to: None,
            });
        }

        if route.is_protected() && !session.is_authenticated() {
            tracing::debug!(path = %route, "Unauthenticated, redirecting to login");
            return GateDecision::Redirect(Redirect {
                to: self.login_route.clone(),
                return_to: Some(route.to_string()),
            });
        }

        GateDecision::Render(route)
    }

    /// Render `path` with `render`, or return the redirect to follow instead.
    ///
    /// `render` is only called when the gate allows the route.
    ///
    /// # Errors
    ///
    /// Returns the [`Redirect`] when the route may not be rendered.
    pub fn guard<V>(
        &self,
        session: &impl SessionStatus,
        path: &str,
        render: impl FnOnce(Route) -> V,
    ) -> Result<V, Redirect> {
        match self.check(session, path) {
            GateDecision::Render(route) => Ok(render(route)),
            GateDecision::Redirect(redirect) => Err(redirect),
        }
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new("/login")
    }
}
