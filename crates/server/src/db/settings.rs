//! Shopify integration settings storage.
//!
//! Settings live as one JSONB record in the keyed `settings` table and are
//! mutated only through administrative tooling. The pipelines load a
//! read-only snapshot once per invocation and thread it through as a
//! parameter - there is no process-wide mutable settings singleton.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::RepositoryError;

/// Settings key for the Shopify integration record.
const SHOPIFY_SETTINGS_KEY: &str = "shopify";

/// Read-only snapshot of the Shopify integration configuration.
#[derive(Clone, Default)]
pub struct ShopifySettings {
    /// Master switch for webhook-driven provisioning.
    pub enabled: bool,
    /// Webhook shared secret for HMAC verification.
    pub shared_secret: Option<SecretString>,
    /// Store domain (e.g., example.myshopify.com), informational.
    pub store_url: Option<String>,
    /// Product keyword allow-list; empty accepts every order.
    pub keywords: Vec<String>,
}

impl std::fmt::Debug for ShopifySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifySettings")
            .field("enabled", &self.enabled)
            .field(
                "shared_secret",
                &self.shared_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("store_url", &self.store_url)
            .field("keywords", &self.keywords)
            .finish()
    }
}

/// Wire form of the settings record (JSONB).
#[derive(Debug, Serialize, Deserialize, Default)]
struct ShopifySettingsRecord {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    shared_secret: Option<String>,
    #[serde(default)]
    store_url: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

impl From<ShopifySettingsRecord> for ShopifySettings {
    fn from(record: ShopifySettingsRecord) -> Self {
        Self {
            enabled: record.enabled,
            shared_secret: record
                .shared_secret
                .filter(|s| !s.is_empty())
                .map(SecretString::from),
            store_url: record.store_url,
            keywords: record.keywords,
        }
    }
}

/// Repository for the Shopify settings record.
pub struct ShopifySettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopifySettingsRepository<'a> {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the current settings snapshot.
    ///
    /// An absent record means the integration was never configured and
    /// yields the disabled defaults.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored JSON does not
    /// decode.
    pub async fn load(&self) -> Result<ShopifySettings, RepositoryError> {
        let value: Option<JsonValue> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = $1")
                .bind(SHOPIFY_SETTINGS_KEY)
                .fetch_optional(self.pool)
                .await?;

        let Some(value) = value else {
            return Ok(ShopifySettings::default());
        };

        let record: ShopifySettingsRecord = serde_json::from_value(value).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shopify settings: {e}"))
        })?;

        Ok(record.into())
    }

    /// Persist a settings snapshot (used by the CLI).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(&self, settings: &ShopifySettings) -> Result<(), RepositoryError> {
        let record = ShopifySettingsRecord {
            enabled: settings.enabled,
            shared_secret: settings
                .shared_secret
                .as_ref()
                .map(|s| s.expose_secret().to_owned()),
            store_url: settings.store_url.clone(),
            keywords: settings.keywords.clone(),
        };

        let value = serde_json::to_value(&record).map_err(|e| {
            RepositoryError::DataCorruption(format!("unencodable shopify settings: {e}"))
        })?;

        sqlx::query(
            r"
            INSERT INTO settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
            ",
        )
        .bind(SHOPIFY_SETTINGS_KEY)
        .bind(value)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
