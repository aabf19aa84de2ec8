//! Catalog product snapshot.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// Aggregate customer rating.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rating {
    /// Average score.
    pub rate: f64,
    /// Number of ratings.
    pub count: u32,
}

/// A product as returned by the catalog.
///
/// Cart lines hold a copy of this taken when the product entered the cart;
/// later catalog changes do not affect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Price,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub rating: Rating,
}
