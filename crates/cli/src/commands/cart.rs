//! Cart commands.

use shopfront_client::{HydrateOutcome, Storefront};
use shopfront_core::UserId;

use super::{CliError, cart_table};

/// Hydrate a user's saved cart and print it.
///
/// # Errors
///
/// Returns `HydrationFailed` if the saved cart could not be imported. The
/// underlying cause has already been logged.
#[allow(clippy::print_stdout)]
pub async fn hydrate(storefront: &Storefront, user_id: i64) -> Result<(), CliError> {
    match storefront.hydrate_cart(UserId::new(user_id)).await {
        HydrateOutcome::Replaced { .. } => {}
        HydrateOutcome::NoSavedCart => println!("No saved cart for user {user_id}"),
        HydrateOutcome::Failed(_) => return Err(CliError::HydrationFailed),
    }

    println!("{}", cart_table(&storefront.cart().snapshot()));
    Ok(())
}
