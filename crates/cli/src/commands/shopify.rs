//! Shopify integration management commands.

use kartvizit_server::db::ShopifySettingsRepository;

use super::{CommandError, connect};

/// Print the stored integration settings without exposing the secret.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the record is corrupt.
#[allow(clippy::print_stdout)]
pub async fn check_settings() -> Result<(), CommandError> {
    let pool = connect().await?;
    let settings = ShopifySettingsRepository::new(&pool).load().await?;

    println!("enabled:       {}", settings.enabled);
    println!(
        "store_url:     {}",
        settings.store_url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "shared_secret: {}",
        if settings.shared_secret.is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    );
    if settings.keywords.is_empty() {
        println!("keywords:      (none, all orders match)");
    } else {
        println!("keywords:      {}", settings.keywords.join(", "));
    }

    Ok(())
}

/// Replace the keyword allow-list, leaving every other field untouched.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the write fails.
#[allow(clippy::print_stdout)]
pub async fn set_keywords(keywords: Vec<String>) -> Result<(), CommandError> {
    let pool = connect().await?;
    let repo = ShopifySettingsRepository::new(&pool);

    let mut settings = repo.load().await?;
    settings.keywords = keywords
        .into_iter()
        .map(|k| k.trim().to_owned())
        .filter(|k| !k.is_empty())
        .collect();
    repo.save(&settings).await?;

    if settings.keywords.is_empty() {
        println!("Keyword list cleared; all orders will match.");
    } else {
        println!("Keywords set: {}", settings.keywords.join(", "));
    }

    Ok(())
}
