//! partstore - command-line storefront for the partstore auto-parts backend.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the token is kept in ~/.partstore/credential.json)
//! partstore login --email buyer@example.com
//!
//! # Browse
//! partstore products search -f make=Toyota,Honda -f condition=New
//! partstore products show 665f1c2e9b1d4a0012ab34cd
//!
//! # Cart
//! partstore cart add 665f1c2e9b1d4a0012ab34cd -q 2
//! partstore cart view
//!
//! # Checkout the cart, or buy one product directly
//! partstore checkout --street "12 Galle Road" --city Colombo --postal-code 00300 --country "Sri Lanka"
//! partstore checkout --product 665f1c2e9b1d4a0012ab34cd --quantity 1 ...
//!
//! # Orders
//! partstore orders history --all
//! partstore orders track <order-id> <product-id>
//! ```
//!
//! # Environment Variables
//!
//! - `PARTSTORE_API_BASE_URL` - backend base URL
//! - `PARTSTORE_PAYMENT_SCRIPT_URL` - payment gateway script checked before paying
//! - `PARTSTORE_PAYMENT_SANDBOX` - stamp payments as sandbox (default `true`)
//! - `PARTSTORE_CREDENTIAL_FILE` - where the token is kept
//! - `PARTSTORE_LOG_FORMAT` - `json` for JSON logs
//! - `SENTRY_DSN` - enable error reporting

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use partstore_client::{ClientConfig, CredentialProvider, Storefront};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;
mod payment;
mod store;

use error::CliError;
use payment::TerminalPaymentProvider;
use store::FileCredentialStore;

#[derive(Parser)]
#[command(name = "partstore")]
#[command(author, version, about = "Browse, buy and track auto parts")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (read from `PARTSTORE_PASSWORD` when omitted)
        #[arg(short, long, env = "PARTSTORE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register(RegisterArgs),
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart or a single product
    Checkout(CheckoutArgs),
    /// Order history and tracking
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// File a complaint about a delivered order
    Complain(ComplainArgs),
    /// Show your profile
    Profile,
    /// Download an uploaded image
    Image {
        id: String,

        /// Where to write the image
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Args)]
struct RegisterArgs {
    #[arg(short, long)]
    email: String,

    #[arg(short, long, env = "PARTSTORE_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(short, long)]
    name: String,

    #[arg(long)]
    phone: String,

    /// `buyer` or `seller`
    #[arg(long, default_value = "buyer")]
    role: String,
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products page by page
    List {
        #[arg(long, default_value_t = partstore_client::catalog::DEFAULT_PAGE)]
        page: u32,

        #[arg(long, default_value_t = partstore_client::catalog::DEFAULT_PAGE_SIZE)]
        limit: u32,
    },
    /// Search with filters
    Search {
        /// `key=value` filter; comma-separated values match any (repeatable)
        #[arg(short, long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },
    /// Show one product
    Show { id: String },
    /// Show the available search filters
    Filters,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    View,
    /// Add a product
    Add {
        product: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Change a line's quantity
    Update {
        product: String,

        #[arg(short, long)]
        quantity: u32,
    },
    /// Remove a line
    Remove { product: String },
    /// Empty the cart
    Clear,
}

#[derive(Args)]
struct CheckoutArgs {
    /// Buy this product directly instead of the cart
    #[arg(long, requires = "quantity")]
    product: Option<String>,

    #[arg(long)]
    quantity: Option<u32>,

    #[arg(long, default_value = "")]
    street: String,

    #[arg(long, default_value = "")]
    city: String,

    #[arg(long)]
    district: Option<String>,

    #[arg(long, default_value = "")]
    postal_code: String,

    #[arg(long, default_value = "")]
    country: String,

    /// Offer payment up to this many times if it is dismissed or fails
    #[arg(long, default_value_t = 1)]
    attempts: u32,
}

#[derive(Subcommand)]
enum OrderAction {
    /// List past orders
    History {
        #[arg(long, default_value_t = partstore_client::orders::DEFAULT_HISTORY_PAGE)]
        page: u32,

        #[arg(long, default_value_t = partstore_client::orders::DEFAULT_HISTORY_LIMIT)]
        limit: u32,

        /// Load every page
        #[arg(long)]
        all: bool,
    },
    /// Show the status timeline of one product in an order
    Track { order: String, product: String },
    /// Cancel an order
    Cancel { order: String },
}

#[derive(Args)]
struct ComplainArgs {
    order: String,

    #[arg(long)]
    product: String,

    #[arg(short, long)]
    description: String,

    /// Ask for a refund of this amount
    #[arg(long)]
    refund_amount: Option<String>,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

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
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "partstore_client=warn,partstore=warn".into());
    let json = std::env::var("PARTSTORE_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::error(&CliError::Config(e));
            return ExitCode::from(3);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let CliError::Api(api) = &err {
                api.report();
            }
            output::error(&err);
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let store = FileCredentialStore::from_env()?;
    let credentials = CredentialProvider::with_store(Arc::new(store));
    let provider = Arc::new(TerminalPaymentProvider::new(config.payment.script_url.clone()));
    let storefront = Storefront::new(config, credentials, provider)?;
    let ctx = commands::Context::new(storefront, cli.json);

    match cli.command {
        Commands::Login { email, password } => commands::account::login(&ctx, &email, &password).await,
        Commands::Register(args) => {
            commands::account::register(
                &ctx,
                commands::account::Registration {
                    email: &args.email,
                    password: args.password,
                    name: args.name,
                    phone: args.phone,
                    role: &args.role,
                },
            )
            .await
        }
        Commands::Logout => {
            commands::account::logout(&ctx);
            Ok(())
        }
        Commands::Whoami => commands::account::whoami(&ctx),
        Commands::Products { action } => match action {
            ProductAction::List { page, limit } => commands::catalog::list(&ctx, page, limit).await,
            ProductAction::Search { filters } => commands::catalog::search(&ctx, &filters).await,
            ProductAction::Show { id } => commands::catalog::show(&ctx, &id).await,
            ProductAction::Filters => commands::catalog::filters(&ctx).await,
        },
        Commands::Cart { action } => match action {
            CartAction::View => commands::cart::view(&ctx).await,
            CartAction::Add { product, quantity } => {
                commands::cart::add(&ctx, &product, quantity).await
            }
            CartAction::Update { product, quantity } => {
                commands::cart::update(&ctx, &product, quantity).await
            }
            CartAction::Remove { product } => commands::cart::remove(&ctx, &product).await,
            CartAction::Clear => commands::cart::clear(&ctx).await,
        },
        Commands::Checkout(args) => {
            let source = match (args.product, args.quantity) {
                (Some(product), quantity) => partstore_client::CheckoutSource::Direct {
                    product: product.into(),
                    quantity: quantity.unwrap_or(1),
                },
                (None, _) => partstore_client::CheckoutSource::Cart,
            };
            let address = partstore_core::ShippingAddress {
                street: args.street,
                city: args.city,
                district: args.district,
                postal_code: args.postal_code,
                country: args.country,
            };
            commands::checkout::run(&ctx, source, &address, args.attempts).await
        }
        Commands::Orders { action } => match action {
            OrderAction::History { page, limit, all } => {
                commands::orders::history(&ctx, page, limit, all).await
            }
            OrderAction::Track { order, product } => {
                commands::orders::track(&ctx, &order, &product).await
            }
            OrderAction::Cancel { order } => commands::orders::cancel(&ctx, &order).await,
        },
        Commands::Complain(args) => {
            commands::account::complain(
                &ctx,
                &args.order,
                &args.product,
                args.description,
                args.refund_amount.as_deref(),
            )
            .await
        }
        Commands::Profile => commands::account::profile(&ctx).await,
        Commands::Image { id, output } => commands::account::image(&ctx, &id, &output).await,
    }
}
