//! Catalog listing query and response shapes.

use serde::{Deserialize, Serialize};

use super::product::Product;

/// Filters for a product listing request.
///
/// `category` selects a category listing. `page`/`size` request a paginated
/// envelope, `limit` truncates a flat listing. The catalog does not combine
/// `category` with `limit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    /// Listing of a single category.
    #[must_use]
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// One page of the full listing.
    #[must_use]
    pub fn page(page: u32, size: u32) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            ..Self::default()
        }
    }

    /// The first `limit` products.
    #[must_use]
    pub fn limit(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

/// A page of products with bookkeeping owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    #[serde(alias = "dtoList")]
    pub items: Vec<Product>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub size: u32,
}

/// Listing response: older catalog versions return a bare array, newer ones
/// wrap it in a [`ProductPage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductListing {
    Flat(Vec<Product>),
    Paged(ProductPage),
}

impl ProductListing {
    /// The products, regardless of envelope.
    #[must_use]
    pub fn into_items(self) -> Vec<Product> {
        match self {
            Self::Flat(items) => items,
            Self::Paged(page) => page.items,
        }
    }

    /// The page metadata, when the catalog sent an envelope.
    #[must_use]
    pub const fn page(&self) -> Option<&ProductPage> {
        match self {
            Self::Flat(_) => None,
            Self::Paged(page) => Some(page),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PRODUCT: &str = r#"{ "id": 1, "title": "Backpack", "price": 109.95 }"#;

    #[test]
    fn test_flat_listing() {
        let json = format!("[{PRODUCT}]");
        let listing: ProductListing = serde_json::from_str(&json).unwrap();
        assert!(listing.page().is_none());
        assert_eq!(listing.into_items().len(), 1);
    }

    #[test]
    fn test_paged_listing_with_dto_list() {
        let json = format!(
            r#"{{ "dtoList": [{PRODUCT}], "total": 20, "page": 2, "size": 8,
                 "start": 1, "end": 3, "prev": true, "next": false }}"#
        );
        let listing: ProductListing = serde_json::from_str(&json).unwrap();
        let page = listing.page().unwrap();
        assert_eq!(page.total, 20);
        assert_eq!(page.page, 2);
        assert_eq!(listing.into_items().len(), 1);
    }

    #[test]
    fn test_paged_listing_with_items() {
        let json = format!(r#"{{ "items": [{PRODUCT}], "total": 1, "page": 1, "size": 10 }}"#);
        let listing: ProductListing = serde_json::from_str(&json).unwrap();
        assert_eq!(listing.into_items()[0].title, "Backpack");
    }
}
