//! VELTR CLI - Catalog checks and operator tools for the storefront API.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog the server would load
//! veltr catalog list
//! veltr catalog list --path data/catalog.json
//!
//! # Validate a catalog file before deploying it
//! veltr catalog check --path data/catalog.json
//!
//! # Mint a bearer token for a user (reads JWT_SECRET)
//! veltr token issue --user-id 7f0c1a5e-2b6d-4d8e-9a43-0c6f5e2b1d77 --days 1
//!
//! # Sign a webhook payload for local testing (reads STRIPE_WEBHOOK_SECRET)
//! veltr webhook sign --file event.json
//! ```
//!
//! # Commands
//!
//! - `catalog list` - Print products with price and stock
//! - `catalog check` - Report catalog consistency problems
//! - `token issue` - Issue a bearer token
//! - `webhook sign` - Produce a `Stripe-Signature` header value

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

mod commands;

#[derive(Parser)]
#[command(name = "veltr")]
#[command(author, version, about = "VELTR storefront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and validate the product catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Manage bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Webhook helpers for local testing
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// List products in catalog order
    List {
        /// Catalog JSON file (defaults to the embedded seed)
        #[arg(short, long, env = "VELTR_CATALOG_PATH")]
        path: Option<PathBuf>,
    },
    /// Check a catalog for consistency problems
    Check {
        /// Catalog JSON file (defaults to the embedded seed)
        #[arg(short, long, env = "VELTR_CATALOG_PATH")]
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a bearer token for a user id
    Issue {
        /// User id (UUID)
        #[arg(short, long)]
        user_id: Uuid,

        /// Token lifetime in days, 1 to 365 (defaults to `JWT_EXPIRY_DAYS`)
        #[arg(short, long)]
        days: Option<i64>,
    },
}

#[derive(Subcommand)]
enum WebhookAction {
    /// Sign a payload file with the webhook secret
    Sign {
        /// Raw event payload
        #[arg(short, long)]
        file: PathBuf,

        /// Signing secret (defaults to `STRIPE_WEBHOOK_SECRET`)
        #[arg(short, long)]
        secret: Option<String>,
    },
}

fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli);

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::List { path } => commands::catalog::list(path.as_deref())?,
            CatalogAction::Check { path } => commands::catalog::check(path.as_deref())?,
        },
        Commands::Token { action } => match action {
            TokenAction::Issue { user_id, days } => commands::token::issue(user_id, days)?,
        },
        Commands::Webhook { action } => match action {
            WebhookAction::Sign { file, secret } => {
                commands::webhook::sign(&file, secret.as_deref())?;
            }
        },
    }
    Ok(())
}
