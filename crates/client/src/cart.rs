//! Cart store.
//!
//! An ordered list of line items, at most one per product id, each with a
//! quantity of at least one. Local edits are synchronous. [`CartStore::hydrate`]
//! imports the user's most recent saved cart from the catalog and replaces
//! the local cart with it, or leaves the local cart untouched if anything
//! fails.

use std::sync::{Arc, PoisonError, RwLock};

use futures::future::try_join_all;
use shopfront_core::{Price, Product, ProductId, Quantity, UserId};
use thiserror::Error;
use tracing::instrument;

use crate::catalog::{CartSource, CatalogError};
use crate::error::add_breadcrumb;

/// A product snapshot and how many of it are in the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub product: Product,
    pub quantity: Quantity,
}

impl LineItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Line items in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Line items in order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The line item for `id`, if present.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.product.id == id)
    }

    fn position(&self, id: ProductId) -> Option<usize> {
        self.items.iter().position(|item| item.product.id == id)
    }

    /// Add one unit of `product`.
    ///
    /// An existing line keeps its position and its original snapshot.
    pub fn add(&mut self, product: Product) {
        match self.items.iter_mut().find(|item| item.product.id == product.id) {
            Some(item) => item.quantity = item.quantity.increment(),
            None => self.items.push(LineItem {
                product,
                quantity: Quantity::ONE,
            }),
        }
    }

    /// Add one unit of an item already in the cart. Returns `false` if absent.
    pub fn increase(&mut self, id: ProductId) -> bool {
        match self.items.iter_mut().find(|item| item.product.id == id) {
            Some(item) => {
                item.quantity = item.quantity.increment();
                true
            }
            None => false,
        }
    }

    /// Take one unit off an item, dropping the line when it reaches zero.
    /// Returns `false` if absent.
    pub fn decrease(&mut self, id: ProductId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let decremented = self
            .items
            .get(index)
            .and_then(|item| item.quantity.decrement());
        match decremented {
            Some(quantity) => {
                if let Some(item) = self.items.get_mut(index) {
                    item.quantity = quantity;
                }
            }
            None => {
                self.items.remove(index);
            }
        }
        true
    }

    /// Drop the line for `id` whatever its quantity. Returns `false` if absent.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != id);
        self.items.len() != before
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(LineItem::line_total).sum()
    }
}

impl FromIterator<LineItem> for Cart {
    fn from_iter<I: IntoIterator<Item = LineItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Hydration
// =============================================================================

/// Why a hydration attempt was abandoned.
#[derive(Debug, Error)]
pub enum HydrationError {
    /// The saved-cart query failed.
    #[error("failed to load saved carts for user {user_id}: {source}")]
    SavedCarts {
        user_id: UserId,
        #[source]
        source: CatalogError,
    },

    /// A saved line could not be resolved to a product.
    #[error("failed to resolve product {product_id}: {source}")]
    Product {
        product_id: ProductId,
        #[source]
        source: CatalogError,
    },
}

/// What [`CartStore::hydrate`] did.
#[derive(Debug)]
pub enum HydrateOutcome {
    /// The local cart was replaced with the saved cart's lines.
    Replaced { items: usize },
    /// The user has no saved cart; the local cart is unchanged.
    NoSavedCart,
    /// Hydration failed; the local cart is unchanged.
    Failed(HydrationError),
}

impl HydrateOutcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

// =============================================================================
// CartStore
// =============================================================================

/// Shared handle to one session's cart.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    cart: Arc<RwLock<Cart>>,
}

impl CartStore {
    /// An empty cart store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.cart
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<T>(&self, f: impl FnOnce(&mut Cart) -> T) -> T {
        f(&mut self.cart.write().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn add(&self, product: Product) {
        let id = product.id.to_string();
        add_breadcrumb("cart", "Added product", Some(&[("product_id", &id)]));
        self.update(|cart| cart.add(product));
    }

    pub fn increase(&self, id: ProductId) -> bool {
        self.update(|cart| cart.increase(id))
    }

    pub fn decrease(&self, id: ProductId) -> bool {
        self.update(|cart| cart.decrease(id))
    }

    pub fn remove(&self, id: ProductId) -> bool {
        let removed = self.update(|cart| cart.remove(id));
        if removed {
            let id = id.to_string();
            add_breadcrumb("cart", "Removed product", Some(&[("product_id", &id)]));
        }
        removed
    }

    /// Replace the local cart with the user's most recent saved cart.
    ///
    /// The first saved cart the catalog returns is taken as the most recent.
    /// Lines saved with a zero or negative quantity are skipped. The rest are
    /// resolved to products concurrently and the cart is
    /// replaced only once every line has resolved, keeping the saved order.
    /// Local edits made while lookups are in flight are overwritten by the
    /// replacement.
    ///
    /// Failures are logged and reported to Sentry, and come back as
    /// [`HydrateOutcome::Failed`]; the local cart is never partially
    /// replaced.
    #[instrument(skip(self, source), fields(user_id = %user_id))]
    pub async fn hydrate<C: CartSource>(&self, source: &C, user_id: UserId) -> HydrateOutcome {
        match Self::resolve(source, user_id).await {
            Ok(Some(cart)) => {
                let items = cart.len();
                self.update(|current| *current = cart);
                tracing::info!(items, "Cart hydrated");
                HydrateOutcome::Replaced { items }
            }
            Ok(None) => {
                tracing::debug!("No saved cart");
                HydrateOutcome::NoSavedCart
            }
            Err(e) => {
                tracing::error!(error = %e, "Cart hydration failed");
                sentry::capture_error(&e);
                HydrateOutcome::Failed(e)
            }
        }
    }

    async fn resolve<C: CartSource>(
        source: &C,
        user_id: UserId,
    ) -> Result<Option<Cart>, HydrationError> {
        let latest = source
            .latest_saved_cart(user_id)
            .await
            .map_err(|source| HydrationError::SavedCarts { user_id, source })?;

        let Some(latest) = latest else {
            return Ok(None);
        };

        let lines: Vec<_> = latest
            .items
            .into_iter()
            .filter_map(|line| match line.quantity() {
                Some(quantity) => Some((line.product_id, quantity)),
                None => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        quantity = line.raw_quantity,
                        "Skipping saved cart line without a positive quantity"
                    );
                    None
                }
            })
            .collect();

        let lookups = lines.into_iter().map(|(product_id, quantity)| async move {
            let product = source
                .product(product_id)
                .await
                .map_err(|source| HydrationError::Product { product_id, source })?;
            Ok::<_, HydrationError>(LineItem { product, quantity })
        });

        // try_join_all yields results in input order
        let items = try_join_all(lookups).await?;
        Ok(Some(merge_duplicate_lines(items)))
    }
}

/// Collapse repeated product ids into the first occurrence, summing quantities.
fn merge_duplicate_lines(items: Vec<LineItem>) -> Cart {
    let mut cart = Cart::new();
    for item in items {
        match cart
            .items
            .iter_mut()
            .find(|existing| existing.product.id == item.product.id)
        {
            Some(existing) => {
                existing.quantity = Quantity::new(
                    existing.quantity.get().saturating_add(item.quantity.get()),
                )
                .unwrap_or(existing.quantity);
            }
            None => cart.items.push(item),
        }
    }
    cart
}
