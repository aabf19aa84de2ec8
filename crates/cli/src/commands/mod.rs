//! CLI command implementations.

pub mod cart;
pub mod catalog;
pub mod session;
pub mod shell;

use shopfront_client::{Cart, CatalogError, ClientError};
use shopfront_core::Product;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The storefront session could not be set up.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A catalog call failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Login was attempted and rejected.
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// Cart hydration did not complete.
    #[error("Cart hydration failed")]
    HydrationFailed,

    /// Reading interactive input failed.
    #[error("Input error: {0}")]
    Io(#[from] std::io::Error),
}

/// One-line product summary.
pub fn product_line(product: &Product) -> String {
    format!(
        "{:>4}  {:<48}  {:>9}  {}",
        product.id, product.title, product.price.to_string(), product.category
    )
}

/// Render a cart with line totals, item count and subtotal.
pub fn cart_table(cart: &Cart) -> String {
    if cart.is_empty() {
        return "Cart is empty".to_string();
    }

    let mut out = String::new();
    for item in cart.items() {
        out.push_str(&format!(
            "{:>4}  {:<40}  {:>3} x {:>9} = {:>10}\n",
            item.product.id,
            item.product.title,
            item.quantity,
            item.product.price.to_string(),
            item.line_total().to_string(),
        ));
    }
    out.push_str(&format!(
        "{} items, subtotal {}",
        cart.item_count(),
        cart.subtotal()
    ));
    out
}
