//! User (account) model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use kartvizit_core::{Email, Role, UserId, Username};

/// A platform account as seen by the provisioning pipelines.
///
/// `username` is always unique; `email`, `phone` and `registration_number`
/// are each unique when present. The database constraints are the final
/// arbiter of those invariants.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub username: Username,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub registration_number: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to insert a new account.
///
/// The provisioning pipelines build this; the repository assigns the id and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: Username,
    pub email: Option<Email>,
    pub phone: Option<String>,
    pub registration_number: Option<String>,
    pub password_hash: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub role: Role,
}
