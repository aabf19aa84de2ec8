//! Interactive session.
//!
//! Unlike the one-shot commands, the shell keeps one session store and one
//! cart store alive for the whole run, so a login here authenticates the
//! access gate and cart edits accumulate.

use std::str::FromStr;

use shopfront_client::{HydrateOutcome, LoginCredentials, SessionStatus, Storefront};
use shopfront_core::{ProductId, UserId};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::{CliError, cart_table, session::describe};

const HELP: &str = "\
commands:
  login <username> <password>   log in
  logout                        log out
  add <product-id>              add one unit of a product
  inc <product-id>              increase quantity
  dec <product-id>              decrease quantity (removes at zero)
  rm <product-id>               remove a line
  hydrate <user-id>             replace the cart with the user's saved cart
  cart                          show the cart
  visit <path>                  check a path against the access gate
  help                          show this help
  quit                          leave the shell";

/// One parsed shell line.
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Login { username: String, password: String },
    Logout,
    Add(ProductId),
    Increase(ProductId),
    Decrease(ProductId),
    Remove(ProductId),
    Hydrate(UserId),
    Cart,
    Visit(String),
    Help,
    Quit,
}

impl FromStr for ShellCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let product_id = || match args.as_slice() {
            [id] => id
                .parse::<ProductId>()
                .map_err(|_| format!("invalid product id: {id}")),
            _ => Err(format!("usage: {command} <product-id>")),
        };

        match command {
            "login" => match args.as_slice() {
                [username, password] => Ok(Self::Login {
                    username: (*username).to_string(),
                    password: (*password).to_string(),
                }),
                _ => Err("usage: login <username> <password>".to_string()),
            },
            "logout" => Ok(Self::Logout),
            "add" => product_id().map(Self::Add),
            "inc" => product_id().map(Self::Increase),
            "dec" => product_id().map(Self::Decrease),
            "rm" => product_id().map(Self::Remove),
            "hydrate" => match args.as_slice() {
                [id] => id
                    .parse::<UserId>()
                    .map(Self::Hydrate)
                    .map_err(|_| format!("invalid user id: {id}")),
                _ => Err("usage: hydrate <user-id>".to_string()),
            },
            "cart" => Ok(Self::Cart),
            "visit" => match args.as_slice() {
                [path] => Ok(Self::Visit((*path).to_string())),
                _ => Err("usage: visit <path>".to_string()),
            },
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command: {other} (try `help`)")),
        }
    }
}

/// Run the interactive session until `quit` or end of input.
///
/// # Errors
///
/// Returns an error only if reading stdin or writing stdout fails; command
/// failures are reported inline.
pub async fn run(storefront: &Storefront) -> Result<(), CliError> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(b"shopfront shell, `help` for commands\n").await?;

    loop {
        stdout.write_all(prompt(storefront).as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let output = match line.parse::<ShellCommand>() {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => execute(storefront, command).await,
            Err(message) => message,
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }

    Ok(())
}

fn prompt(storefront: &Storefront) -> String {
    let user = storefront
        .session()
        .user()
        .map_or_else(|| "guest".to_string(), |u| u.identifier);
    format!("{user} [{}]> ", storefront.cart().snapshot().item_count())
}

async fn execute(storefront: &Storefront, command: ShellCommand) -> String {
    let cart = storefront.cart();
    let missing = |id: ProductId| format!("product {id} is not in the cart");

    match command {
        ShellCommand::Login { username, password } => {
            let session = storefront.session();
            session
                .login(&LoginCredentials::new(username, password))
                .await;
            if session.is_authenticated() {
                "logged in".to_string()
            } else {
                format!("login failed: {}", session.error().unwrap_or_default())
            }
        }
        ShellCommand::Logout => {
            storefront.session().logout();
            "logged out".to_string()
        }
        ShellCommand::Add(id) => match storefront.catalog().get_product(id).await {
            Ok(product) => {
                let title = product.title.clone();
                cart.add(product);
                format!("added {title}")
            }
            Err(e) => format!("cannot add product {id}: {e}"),
        },
        ShellCommand::Increase(id) => {
            if cart.increase(id) {
                cart_table(&cart.snapshot())
            } else {
                missing(id)
            }
        }
        ShellCommand::Decrease(id) => {
            if cart.decrease(id) {
                cart_table(&cart.snapshot())
            } else {
                missing(id)
            }
        }
        ShellCommand::Remove(id) => {
            if cart.remove(id) {
                cart_table(&cart.snapshot())
            } else {
                missing(id)
            }
        }
        ShellCommand::Hydrate(user_id) => match storefront.hydrate_cart(user_id).await {
            HydrateOutcome::Replaced { items } => {
                format!("{items} lines imported\n{}", cart_table(&cart.snapshot()))
            }
            HydrateOutcome::NoSavedCart => format!("no saved cart for user {user_id}"),
            HydrateOutcome::Failed(e) => format!("hydration failed, cart unchanged: {e}"),
        },
        ShellCommand::Cart => cart_table(&cart.snapshot()),
        ShellCommand::Visit(path) => describe(storefront, &path),
        ShellCommand::Help => HELP.to_string(),
        ShellCommand::Quit => String::new(),
    }
}
