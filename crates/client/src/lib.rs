//! Shopfront client engine.
//!
//! Session, cart and access-gate state for a storefront client, independent
//! of any UI framework. One [`Storefront`] holds everything a single browsing
//! session owns:
//!
//! - [`SessionStore`] - login/logout state machine; tokens persisted through
//!   [`SessionCredentials`]
//! - [`CartStore`] - ordered line items with server hydration
//! - [`AccessGate`] - redirects unauthenticated navigation to the login route
//! - [`AuthorizedGateway`] - attaches the stored bearer token to API calls
//! - [`CatalogClient`] - product, category and saved-cart reads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod session;
pub mod state;
pub mod storage;

pub use cart::{Cart, CartStore, HydrateOutcome, HydrationError, LineItem};
pub use catalog::{CartSource, CatalogClient, CatalogError};
pub use config::{ClientConfig, ConfigError};
pub use credentials::{AuthTokens, SessionCredentials};
pub use error::{ClientError, Result};
pub use gate::{AccessGate, GateDecision, Redirect, Route};
pub use gateway::{AuthorizedGateway, GatewayError};
pub use session::{
    AuthenticationError, LoginCredentials, Session, SessionAction, SessionStatus, SessionStore,
    SessionUser,
};
pub use state::Storefront;
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
