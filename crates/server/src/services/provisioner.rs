//! User provisioning for Shopify order webhooks.
//!
//! The provisioner owns the "create an account exactly once per email"
//! guarantee. Repeated deliveries of the same order, and concurrent
//! deliveries racing on the email unique constraint, both resolve to the
//! already-existing account instead of a duplicate or an error.

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use rand::{Rng, distr::Alphanumeric};
use thiserror::Error;
use tracing::warn;

use kartvizit_core::{Email, EmailError, Role, SuffixStyle, Username};

use super::shopify::{OrderPayload, order_matches_keywords};
use super::{AccountStore, ResetNotifier};
use crate::db::RepositoryError;
use crate::db::settings::ShopifySettings;
use crate::models::{NewUser, User};

/// Length of the random temporary password given to webhook-provisioned
/// accounts. The account owner never sees it; they set their own through the
/// reset mail.
const TEMP_PASSWORD_LENGTH: usize = 16;

/// Minimum length for a name-derived username base before falling back to
/// the email local part.
const MIN_USERNAME_BASE: usize = 3;

/// Why an otherwise well-formed order did not produce an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The integration master switch is off.
    IntegrationDisabled,
    /// No line item matched the keyword allow-list.
    NoMatchingProducts,
}

impl SkipReason {
    /// Human-readable reason for the webhook response body and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IntegrationDisabled => "integration disabled",
            Self::NoMatchingProducts => "no matching products",
        }
    }
}

/// Result of one provisioning attempt.
#[derive(Debug)]
pub enum ProvisionOutcome {
    /// A new account was created.
    Created(User),
    /// An account with this email already existed; nothing was changed.
    Existing(User),
    /// The order did not qualify; nothing was changed.
    Skipped(SkipReason),
}

/// Failures that prevent a provisioning decision.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The order payload carries no email address.
    #[error("order payload has no email address")]
    MissingEmail,

    /// The order email does not parse as an address.
    #[error("order email is invalid: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The account store failed.
    #[error(transparent)]
    Store(#[from] RepositoryError),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Provisions accounts from qualifying Shopify orders.
pub struct Provisioner<'a, S, N> {
    store: &'a S,
    notifier: Option<&'a N>,
}

impl<'a, S, N> Provisioner<'a, S, N>
where
    S: AccountStore,
    N: ResetNotifier,
{
    /// Create a provisioner over a store and an optional reset notifier.
    pub const fn new(store: &'a S, notifier: Option<&'a N>) -> Self {
        Self { store, notifier }
    }

    /// Provision an account from an order-complete payload.
    ///
    /// Idempotent per email: an existing account short-circuits to
    /// [`ProvisionOutcome::Existing`] before any eligibility checks, so a
    /// redelivered webhook never fails and never duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingEmail`] / `InvalidEmail` for
    /// payloads without a usable address, and propagates store failures.
    pub async fn provision_from_order(
        &self,
        settings: &ShopifySettings,
        order: &OrderPayload,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let email = order
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(ProvisionError::MissingEmail)?;
        let email = Email::parse(email)?;

        if let Some(existing) = self.store.find_by_email(&email).await? {
            return Ok(ProvisionOutcome::Existing(existing));
        }

        if !settings.enabled {
            return Ok(ProvisionOutcome::Skipped(SkipReason::IntegrationDisabled));
        }

        if !order_matches_keywords(order, &settings.keywords) {
            return Ok(ProvisionOutcome::Skipped(SkipReason::NoMatchingProducts));
        }

        let name = order.customer_display_name();
        let base = username_base(&name, &email);
        let username = self.resolve_username(&base).await?;

        let temp_password = generate_temp_password();
        let password_hash = hash_password(&temp_password)?;

        let new = NewUser {
            name,
            username,
            email: Some(email.clone()),
            phone: None,
            registration_number: None,
            password_hash,
            // Webhook-originated accounts are considered pre-verified: the
            // address came from a completed checkout.
            email_verified_at: Some(Utc::now()),
            role: Role::User,
        };

        let user = match self.store.create(&new).await {
            Ok(user) => user,
            Err(err) if err.is_conflict() => {
                // Lost an insert race with a concurrent delivery. The
                // account exists now; resolve to it.
                match self.store.find_by_email(&email).await? {
                    Some(existing) => return Ok(ProvisionOutcome::Existing(existing)),
                    None => return Err(err.into()),
                }
            }
            Err(err) => return Err(err.into()),
        };

        if let Err(err) = self.store.assign_role(user.id, Role::User).await {
            warn!(user_id = %user.id, error = %err, "role assignment failed, continuing");
        }

        if let Some(notifier) = self.notifier {
            if let Err(err) = notifier.send_password_reset(&email, &user.name).await {
                warn!(user_id = %user.id, error = %err, "password reset mail failed, continuing");
            }
        } else {
            warn!(user_id = %user.id, "no mailer configured, skipping password reset mail");
        }

        Ok(ProvisionOutcome::Created(user))
    }

    /// Find the first free username for `base`, appending a plain numeric
    /// suffix (`base`, `base1`, `base2`, ...).
    ///
    /// Terminates because each taken username rules out one candidate and
    /// the store is finite.
    async fn resolve_username(&self, base: &Username) -> Result<Username, ProvisionError> {
        let mut candidate = base.clone();
        let mut counter: u32 = 1;

        while self.store.username_exists(&candidate).await? {
            candidate = base.with_suffix(counter, SuffixStyle::Plain);
            counter += 1;
        }

        Ok(candidate)
    }
}

/// Derive the username base from the display name, falling back to the email
/// local part when the name slug is empty or shorter than 3 characters.
fn username_base(name: &str, email: &Email) -> Username {
    if let Some(slug) = Username::slugify(name)
        && slug.len() >= MIN_USERNAME_BASE
    {
        return slug;
    }

    Username::slugify(email.local_part())
        .unwrap_or_else(|| Username::slugify("user").expect("static slug is valid"))
}

/// Random high-entropy temporary password.
fn generate_temp_password() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(TEMP_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash a password with Argon2id and a random salt.
pub(crate) fn hash_password(password: &str) -> Result<String, ProvisionError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ProvisionError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}
