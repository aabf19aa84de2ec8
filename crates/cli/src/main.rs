//! Shopfront CLI - a storefront session from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (tokens are written to SHOPFRONT_STORAGE_PATH)
//! shopfront login -u alice -p hunter2
//!
//! # Browse the catalog
//! shopfront products --page 1 --size 8
//! shopfront products --category electronics
//! shopfront product 3
//!
//! # Import a user's saved cart and print it
//! shopfront cart 42
//!
//! # Interactive session (one session and one cart for the whole run)
//! shopfront shell
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `token` - Manage stored credentials
//! - `products` / `categories` / `product` - Catalog reads
//! - `cart` - Hydrate and print a saved cart
//! - `visit` - Run a path through the access gate
//! - `shell` - Interactive session

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopfront_client::{ClientConfig, Storefront};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront storefront session CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the issued tokens
    Login {
        /// Account identifier
        #[arg(short, long)]
        username: String,

        /// Account password
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Remove stored tokens
    Logout,
    /// Show whether tokens are stored
    Token,
    /// List products
    Products {
        /// Only products in this category
        #[arg(short, long, conflicts_with = "limit")]
        category: Option<String>,

        /// Page number (1-based)
        #[arg(long, requires = "size")]
        page: Option<u32>,

        /// Page size
        #[arg(long, requires = "page")]
        size: Option<u32>,

        /// Maximum number of products
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// List category names
    Categories,
    /// Show one product
    Product {
        /// Product id
        id: i64,
    },
    /// Hydrate a user's saved cart and print it
    Cart {
        /// User id
        user_id: i64,
    },
    /// Check a path against the access gate
    Visit {
        /// Path to visit, e.g. `/cart`
        path: String,
    },
    /// Start an interactive session
    Shell,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_client=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let storefront = Storefront::from_config(config)?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::session::login(&storefront, username, password).await?;
        }
        Commands::Logout => commands::session::logout(&storefront),
        Commands::Token => commands::session::token(&storefront),
        Commands::Products {
            category,
            page,
            size,
            limit,
        } => commands::catalog::products(&storefront, category, page, size, limit).await?,
        Commands::Categories => commands::catalog::categories(&storefront).await?,
        Commands::Product { id } => commands::catalog::product(&storefront, id).await?,
        Commands::Cart { user_id } => commands::cart::hydrate(&storefront, user_id).await?,
        Commands::Visit { path } => commands::session::visit(&storefront, &path),
        Commands::Shell => commands::shell::run(&storefront).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_category_conflicts_with_limit() {
        let parsed = Cli::try_parse_from([
            "shopfront",
            "products",
            "--category",
            "electronics",
            "--limit",
            "5",
        ]);
        assert!(parsed.is_err());
    }
}
