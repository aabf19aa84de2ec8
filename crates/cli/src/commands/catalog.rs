//! Catalog read commands.

use shopfront_client::Storefront;
use shopfront_core::{ProductId, ProductQuery};

use super::{CliError, product_line};

/// List products, optionally filtered by category or paged.
///
/// # Errors
///
/// Returns an error if the catalog request fails.
#[allow(clippy::print_stdout)]
pub async fn products(
    storefront: &Storefront,
    category: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
    limit: Option<u32>,
) -> Result<(), CliError> {
    let query = ProductQuery {
        category,
        page,
        size,
        limit,
    };

    let listing = storefront.catalog().list_products(&query).await?;
    if let Some(page) = listing.page() {
        println!("Page {} ({} per page, {} total)", page.page, page.size, page.total);
    }

    let items = listing.into_items();
    if items.is_empty() {
        println!("No products");
    }
    for product in &items {
        println!("{}", product_line(product));
    }
    Ok(())
}

/// List category names.
///
/// # Errors
///
/// Returns an error if the catalog request fails.
#[allow(clippy::print_stdout)]
pub async fn categories(storefront: &Storefront) -> Result<(), CliError> {
    for category in storefront.catalog().categories().await? {
        println!("{category}");
    }
    Ok(())
}

/// Show one product in full.
///
/// # Errors
///
/// Returns an error if the product does not exist or the request fails.
#[allow(clippy::print_stdout)]
pub async fn product(storefront: &Storefront, id: i64) -> Result<(), CliError> {
    let product = storefront.catalog().get_product(ProductId::new(id)).await?;

    println!("{}", product.title);
    println!("  id:       {}", product.id);
    println!("  price:    {}", product.price);
    println!("  category: {}", product.category);
    println!(
        "  rating:   {:.1} ({} reviews)",
        product.rating.rate, product.rating.count
    );
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
    Ok(())
}
