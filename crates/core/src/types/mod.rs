//! Core types for Shopfront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod listing;
pub mod price;
pub mod product;
pub mod quantity;

pub use cart::{SavedCart, SavedCartItem};
pub use id::*;
pub use listing::{ProductListing, ProductPage, ProductQuery};
pub use price::Price;
pub use product::{Product, Rating};
pub use quantity::{Quantity, QuantityError};
