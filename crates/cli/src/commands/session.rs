//! Credential and access-gate commands.

use shopfront_client::{GateDecision, LoginCredentials, SessionStatus, Storefront};

use super::CliError;

/// Log in and store the issued tokens.
///
/// # Errors
///
/// Returns `LoginFailed` with the session's error message if the login is
/// rejected.
#[allow(clippy::print_stdout)]
pub async fn login(
    storefront: &Storefront,
    username: String,
    password: String,
) -> Result<(), CliError> {
    let session = storefront.session();
    session
        .login(&LoginCredentials::new(username, password))
        .await;

    if !session.is_authenticated() {
        return Err(CliError::LoginFailed(session.error().unwrap_or_default()));
    }

    let user = session.user().map(|u| u.identifier).unwrap_or_default();
    println!(
        "Logged in as {user}; tokens stored in {}",
        storefront.config().storage_path.display()
    );
    Ok(())
}

/// Remove stored tokens.
#[allow(clippy::print_stdout)]
pub fn logout(storefront: &Storefront) {
    storefront.session().logout();
    println!("Logged out");
}

/// Report whether tokens are stored, without printing them.
#[allow(clippy::print_stdout)]
pub fn token(storefront: &Storefront) {
    let credentials = storefront.credentials();
    let state = |present: bool| if present { "stored" } else { "absent" };

    println!("accessToken:  {}", state(credentials.access_token().is_some()));
    println!("refreshToken: {}", state(credentials.refresh_token().is_some()));
}

/// Run a path through the access gate and print the decision.
#[allow(clippy::print_stdout)]
pub fn visit(storefront: &Storefront, path: &str) {
    println!("{}", describe(storefront, path));
}

/// The gate's decision for `path`, as a line of text.
pub fn describe(storefront: &Storefront, path: &str) -> String {
    match storefront.gate().check(storefront.session(), path) {
        GateDecision::Render(route) => format!("render {route:?}"),
        GateDecision::Redirect(redirect) => format!("redirect {}", redirect.location()),
    }
}
