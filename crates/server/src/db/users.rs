//! User repository for database operations.
//!
//! Queries use the sqlx runtime API; unique-constraint violations are mapped
//! to [`RepositoryError::Conflict`] so the provisioning pipelines can treat
//! lost insert races as "already exists".

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kartvizit_core::{Email, Role, UserId, Username};

use super::RepositoryError;
use crate::models::{NewUser, User};
use crate::services::AccountStore;

/// Internal row type for user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    name: String,
    username: String,
    email: Option<String>,
    phone: Option<String>,
    registration_number: Option<String>,
    password_hash: String,
    email_verified_at: Option<DateTime<Utc>>,
    role: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;

        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;

        // Accounts without a role row fall back to the default role.
        let role = row
            .role
            .as_deref()
            .and_then(Role::from_str_opt)
            .unwrap_or_default();

        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            username,
            email,
            phone: row.phone,
            registration_number: row.registration_number,
            password_hash: row.password_hash,
            email_verified_at: row.email_verified_at,
            role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_USER: &str = r"
    SELECT u.id, u.name, u.username, u.email, u.phone, u.registration_number,
           u.password_hash, u.email_verified_at, r.role,
           u.created_at, u.updated_at
    FROM users u
    LEFT JOIN user_roles r ON r.user_id = u.id
";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if stored data is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("{SELECT_USER} WHERE u.email = $1"))
                .bind(email.as_str())
                .fetch_optional(self.pool)
                .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Check whether a username is already taken.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn username_taken(&self, username: &Username) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username.as_str())
                .fetch_one(self.pool)
                .await?;

        Ok(exists)
    }

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming the violated constraint
    /// when a unique constraint (email, phone, username, registration
    /// number) fires. Returns `RepositoryError::Database` for other errors.
    pub async fn insert(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO users
                (name, username, email, phone, registration_number,
                 password_hash, email_verified_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, username, email, phone, registration_number,
                      password_hash, email_verified_at, NULL::text AS role,
                      created_at, updated_at
            ",
        )
        .bind(&new.name)
        .bind(new.username.as_str())
        .bind(new.email.as_ref().map(Email::as_str))
        .bind(new.phone.as_deref())
        .bind(new.registration_number.as_deref())
        .bind(&new.password_hash)
        .bind(new.email_verified_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                let constraint = db_err.constraint().unwrap_or("unique").to_owned();
                return RepositoryError::Conflict(constraint);
            }
            RepositoryError::Database(e)
        })?;

        let mut user = User::try_from(row)?;
        user.role = new.role;
        Ok(user)
    }

    /// Record the primary role of an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_role(&self, user_id: UserId, role: Role) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET role = $2
            ",
        )
        .bind(user_id)
        .bind(role)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// All non-null email addresses, for seeding import de-duplication.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_emails(&self) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT email FROM users WHERE email IS NOT NULL")
                .fetch_all(self.pool)
                .await?;
        Ok(rows)
    }

    /// All non-null phone numbers, for seeding import de-duplication.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_phones(&self) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT phone FROM users WHERE phone IS NOT NULL")
                .fetch_all(self.pool)
                .await?;
        Ok(rows)
    }

    /// All usernames, for seeding import de-duplication.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_usernames(&self) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<String> = sqlx::query_scalar("SELECT username FROM users")
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }
}

impl AccountStore for UserRepository<'_> {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.get_by_email(email).await
    }

    async fn username_exists(&self, username: &Username) -> Result<bool, RepositoryError> {
        self.username_taken(username).await
    }

    async fn create(&self, new: &NewUser) -> Result<User, RepositoryError> {
        self.insert(new).await
    }

    async fn assign_role(&self, user_id: UserId, role: Role) -> Result<(), RepositoryError> {
        self.set_role(user_id, role).await
    }

    async fn all_emails(&self) -> Result<Vec<String>, RepositoryError> {
        Self::all_emails(self).await
    }

    async fn all_phones(&self) -> Result<Vec<String>, RepositoryError> {
        Self::all_phones(self).await
    }

    async fn all_usernames(&self) -> Result<Vec<String>, RepositoryError> {
        Self::all_usernames(self).await
    }
}
