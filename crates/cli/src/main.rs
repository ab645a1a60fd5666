//! Quitanda CLI - command-line storefront.
//!
//! # Usage
//!
//! ```bash
//! # Register and sign in
//! quitanda auth sign-up -e ana@example.com -p "senha secreta" -u ana
//! quitanda auth sign-in -e ana@example.com -p "senha secreta"
//!
//! # Browse and shop
//! quitanda products list
//! quitanda cart add 7
//! quitanda cart show
//!
//! # Place the order
//! quitanda checkout -n "Ana" -m credit --installments 3
//! quitanda order
//!
//! # Manage the catalog (admin accounts only)
//! quitanda products add -t "Bananas" -p 5.50
//! ```
//!
//! # Commands
//!
//! - `auth` - Register, sign in, sign out, show the current identity
//! - `products` - List the catalog; add/update/remove products (admin)
//! - `cart` - Show and mutate the shopping cart
//! - `checkout` - Freeze the cart into an order
//! - `order` - Show the last placed order

#![cfg_attr(not(test), forbid(unsafe_code))]
// A CLI's deliverable is its stdout.
#![allow(clippy::print_stdout)]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "quitanda")]
#[command(author, version, about = "Quitanda storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the account session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Browse the catalog; manage it as admin
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Show and mutate the shopping cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order from the current cart
    Checkout {
        /// Name to put on the order
        #[arg(short, long)]
        name: String,

        /// Payment method (`pix`, `debit`, `credit`)
        #[arg(short, long, default_value = "pix")]
        method: String,

        /// Number of installments (credit only)
        #[arg(short, long, default_value_t = 1)]
        installments: u32,
    },
    /// Show the last placed order
    Order,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Register a new account (requires email confirmation)
    SignUp {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long)]
        username: String,
    },
    /// Sign in with email and password
    SignIn {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Sign out and drop the stored session
    SignOut,
    /// Show the current identity
    Whoami,
}

#[derive(Subcommand)]
enum ProductAction {
    /// List the catalog
    List,
    /// Add a product (admin only)
    Add {
        /// Display title
        #[arg(short, long)]
        title: String,

        /// Unit price, e.g. 5.50
        #[arg(short, long)]
        price: Decimal,

        /// Free-form description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Image URL
        #[arg(long, default_value = "")]
        thumbnail: String,
    },
    /// Edit a product; absent flags leave fields untouched (admin only)
    Update {
        /// Product id
        id: i64,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        price: Option<Decimal>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        thumbnail: Option<String>,
    },
    /// Remove a product (admin only)
    Remove {
        /// Product id
        id: i64,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the aggregated cart and its total
    Show,
    /// Add one unit of a product
    Add {
        /// Product id
        product_id: i64,
    },
    /// Remove one unit of a product
    Remove {
        /// Product id
        product_id: i64,
    },
    /// Set the absolute quantity of a product (0 removes the line)
    Set {
        /// Product id
        product_id: i64,
        /// New quantity
        qty: i64,
    },
    /// Remove a product's line entirely
    Clear {
        /// Product id
        product_id: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Auth { action } => match action {
            AuthAction::SignUp {
                email,
                password,
                username,
            } => commands::auth::sign_up(&email, &password, &username).await?,
            AuthAction::SignIn { email, password } => {
                commands::auth::sign_in(&email, &password).await?;
            }
            AuthAction::SignOut => commands::auth::sign_out().await?,
            AuthAction::Whoami => commands::auth::whoami().await?,
        },
        Commands::Products { action } => match action {
            ProductAction::List => commands::catalog::list().await?,
            ProductAction::Add {
                title,
                price,
                description,
                thumbnail,
            } => commands::catalog::add(title, price, description, thumbnail).await?,
            ProductAction::Update {
                id,
                title,
                price,
                description,
                thumbnail,
            } => commands::catalog::update(id, title, price, description, thumbnail).await?,
            ProductAction::Remove { id } => commands::catalog::remove(id).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show().await?,
            CartAction::Add { product_id } => commands::cart::add(product_id).await?,
            CartAction::Remove { product_id } => commands::cart::remove(product_id).await?,
            CartAction::Set { product_id, qty } => commands::cart::set(product_id, qty).await?,
            CartAction::Clear { product_id } => commands::cart::clear(product_id).await?,
        },
        Commands::Checkout {
            name,
            method,
            installments,
        } => commands::checkout::place(name, &method, installments).await?,
        Commands::Order => commands::checkout::last().await?,
    }
    Ok(())
}
