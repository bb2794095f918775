//! KeyLab CLI - Command-line front end for the KeyLab storefront.
//!
//! # Usage
//!
//! ```bash
//! # Pull the catalog into the local cache
//! keylab sync
//!
//! # Browse
//! keylab products list
//! keylab products search "teclado"
//!
//! # Sign in, fill the cart, and pay
//! keylab auth login -e ana@example.com -p secreto1
//! keylab cart add 12
//! keylab checkout --card "4111 1111 1111 1112"
//! ```
//!
//! # Commands
//!
//! - `db reset` - Drop and recreate the local cache
//! - `sync` - Replace the cached catalog with the backend's
//! - `products` - Browse the cached catalog
//! - `cart` - Manage the local cart
//! - `checkout` - Pay and place an order for the cart
//! - `orders` - Order history and receipts
//! - `auth` - Registration, login, logout
//! - `address` - Shipping address book
//! - `admin` - Product CRUD and image uploads (admin accounts only)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use keylab_core::{AddressId, OrderId, ProductId};
use keylab_storefront::config::StorefrontConfig;
use keylab_storefront::error::AppError;
use keylab_storefront::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "keylab")]
#[command(author, version, about = "KeyLab storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the local cache
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    /// Replace the cached catalog with the backend's
    Sync,
    /// Browse the cached catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Pay for the cart and place an order
    Checkout {
        /// Card number (spaces and dashes are ignored)
        #[arg(long)]
        card: String,
    },
    /// Order history
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Accounts and sessions
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Shipping addresses
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Catalog administration
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Drop and recreate every table
    Reset,
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List every cached product, newest first
    List,
    /// Search product names
    Search {
        query: String,
        /// Search the backend and cache the matches
        #[arg(long)]
        remote: bool,
    },
    /// List products in a category
    Category {
        name: String,
        /// Refresh the category from the backend first
        #[arg(long)]
        refresh: bool,
    },
    /// List products with stock, most stocked first
    InStock,
    /// Show one product
    Show {
        id: ProductId,
        /// Refresh the product from the backend first
        #[arg(long)]
        refresh: bool,
    },
    /// List categories
    Categories,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart and its totals
    Show,
    /// Add a product
    Add { product_id: ProductId },
    /// Increase a line's quantity by one
    Inc { product_id: ProductId },
    /// Decrease a line's quantity by one
    Dec { product_id: ProductId },
    /// Set a line's quantity (0 removes it)
    Set { product_id: ProductId, quantity: i64 },
    /// Remove a line
    Remove { product_id: ProductId },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders, newest first
    List,
    /// Show an order receipt
    Show { id: OrderId },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        /// Password confirmation
        #[arg(short, long)]
        confirm: String,
    },
    /// Sign in against the backend
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Sign in using the local cache only
    LoginOffline {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Sign in with a Google id token
    Google {
        #[arg(long)]
        id_token: String,
    },
    /// Send a password reset email
    Recover {
        #[arg(short, long)]
        email: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
}

#[derive(Subcommand)]
enum AddressAction {
    /// List saved addresses
    List,
    /// Save a new address
    Add {
        #[arg(long)]
        alias: String,
        #[arg(long)]
        street: String,
        #[arg(long)]
        number: String,
        #[arg(long)]
        apartment: Option<String>,
        #[arg(long)]
        commune: String,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        phone: String,
    },
    /// Delete an address
    Remove { id: AddressId },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a product
    Create {
        #[command(flatten)]
        fields: commands::admin::ProductFields,
    },
    /// Update a product; omitted fields keep their cached values
    Update {
        id: ProductId,
        #[command(flatten)]
        fields: commands::admin::ProductFields,
    },
    /// Delete a product
    Delete { id: ProductId },
    /// Upload a product image and print its public URL
    UploadImage { path: std::path::PathBuf },
    /// List users known to this device
    Users,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
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

    Some(guard)
}

/// Errors and warnings become Sentry events, info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = StorefrontConfig::from_env();

    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "keylab_storefront=info,keylab_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, config).await {
        let app_error = e.downcast_ref::<AppError>().or_else(|| {
            match e.downcast_ref::<commands::admin::AdminCommandError>() {
                Some(commands::admin::AdminCommandError::App(inner)) => Some(inner),
                _ => None,
            }
        });
        match app_error {
            Some(app_error) => {
                app_error.report();
                tracing::error!("{}", app_error.user_message());
            }
            None => tracing::error!("Command failed: {e}"),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::connect(config).await?;

    match cli.command {
        Commands::Db { action } => match action {
            DbAction::Reset => commands::catalog::reset(&state).await?,
        },
        Commands::Sync => commands::catalog::sync(&state).await?,
        Commands::Products { action } => match action {
            ProductsAction::List => commands::catalog::list(&state).await?,
            ProductsAction::Search { query, remote } => {
                commands::catalog::search(&state, &query, remote).await?;
            }
            ProductsAction::Category { name, refresh } => {
                commands::catalog::by_category(&state, &name, refresh).await?;
            }
            ProductsAction::InStock => commands::catalog::in_stock(&state).await?,
            ProductsAction::Show { id, refresh } => {
                commands::catalog::show(&state, id, refresh).await?;
            }
            ProductsAction::Categories => commands::catalog::categories(&state).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&state).await?,
            CartAction::Add { product_id } => commands::cart::add(&state, product_id).await?,
            CartAction::Inc { product_id } => commands::cart::increment(&state, product_id).await?,
            CartAction::Dec { product_id } => commands::cart::decrement(&state, product_id).await?,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set_quantity(&state, product_id, quantity).await?,
            CartAction::Remove { product_id } => commands::cart::remove(&state, product_id).await?,
            CartAction::Clear => commands::cart::clear(&state).await?,
        },
        Commands::Checkout { card } => commands::cart::checkout(&state, &card).await?,
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::cart::orders(&state).await?,
            OrdersAction::Show { id } => commands::cart::receipt(&state, id).await?,
        },
        Commands::Auth { action } => match action {
            AuthAction::Register {
                name,
                email,
                password,
                confirm,
            } => commands::account::register(&state, &name, &email, &password, &confirm).await?,
            AuthAction::Login { email, password } => {
                commands::account::login(&state, &email, &password).await?;
            }
            AuthAction::LoginOffline { email, password } => {
                commands::account::login_offline(&state, &email, &password).await?;
            }
            AuthAction::Google { id_token } => commands::account::google(&state, &id_token).await?,
            AuthAction::Recover { email } => commands::account::recover(&state, &email).await?,
            AuthAction::Logout => commands::account::logout(&state).await?,
            AuthAction::Whoami => commands::account::whoami(&state).await?,
        },
        Commands::Address { action } => match action {
            AddressAction::List => commands::account::addresses(&state).await?,
            AddressAction::Add {
                alias,
                street,
                number,
                apartment,
                commune,
                region,
                phone,
            } => {
                let address = keylab_storefront::models::NewAddress {
                    alias,
                    street,
                    number,
                    apartment,
                    commune,
                    region,
                    phone,
                };
                commands::account::add_address(&state, address).await?;
            }
            AddressAction::Remove { id } => commands::account::remove_address(&state, id).await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Create { fields } => commands::admin::create(&state, fields).await?,
            AdminAction::Update { id, fields } => commands::admin::update(&state, id, fields).await?,
            AdminAction::Delete { id } => commands::admin::delete(&state, id).await?,
            AdminAction::UploadImage { path } => commands::admin::upload_image(&state, &path).await?,
            AdminAction::Users => commands::admin::users(&state).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn products_action(args: &[&str]) -> ProductsAction {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Products { action } => action,
            _ => panic!("expected a products command"),
        }
    }

    #[test]
    fn test_search_remote_flag() {
        assert!(matches!(
            products_action(&["keylab", "products", "search", "pbt"]),
            ProductsAction::Search { remote: false, .. }
        ));
        assert!(matches!(
            products_action(&["keylab", "products", "search", "pbt", "--remote"]),
            ProductsAction::Search { remote: true, .. }
        ));
    }

    #[test]
    fn test_category_refresh_flag() {
        match products_action(&["keylab", "products", "category", "Teclados", "--refresh"]) {
            ProductsAction::Category { name, refresh } => {
                assert_eq!(name, "Teclados");
                assert!(refresh);
            }
            _ => panic!("expected a category command"),
        }
    }
}
