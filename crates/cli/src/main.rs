//! Kartvizit CLI - Database migrations and integration management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! kartvizit-cli migrate
//!
//! # Show the stored Shopify integration settings
//! kartvizit-cli shopify check-settings
//!
//! # Replace the keyword allow-list
//! kartvizit-cli shopify set-keywords "premium card" vcard
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "kartvizit-cli")]
#[command(author, version, about = "Kartvizit CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the Shopify integration
    Shopify {
        #[command(subcommand)]
        action: ShopifyAction,
    },
}

#[derive(Subcommand)]
enum ShopifyAction {
    /// Show the stored integration settings
    CheckSettings,
    /// Replace the keyword allow-list
    SetKeywords {
        /// Keywords matched against order line items (empty clears the list)
        keywords: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Shopify { action } => match action {
            ShopifyAction::CheckSettings => commands::shopify::check_settings().await?,
            ShopifyAction::SetKeywords { keywords } => {
                commands::shopify::set_keywords(keywords).await?;
            }
        },
    }
    Ok(())
}
