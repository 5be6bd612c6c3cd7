//! Business services: provisioning, bulk import, outbound email, and the
//! Shopify webhook helpers.

pub mod email;
pub mod import;
pub mod provisioner;
pub mod shopify;

pub use email::EmailService;
pub use import::{ImportSummary, UserImporter};
pub use provisioner::{ProvisionOutcome, Provisioner};

use kartvizit_core::{Email, Role, UserId, Username};

use crate::db::RepositoryError;
use crate::models::{NewUser, User};

/// Data-access collaborator for the provisioning pipelines.
///
/// The production implementation is `db::UserRepository`; tests use an
/// in-memory store. Uniqueness of email, phone, username and registration
/// number is ultimately enforced by `create` returning
/// [`RepositoryError::Conflict`].
#[allow(async_fn_in_trait)]
pub trait AccountStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;
    async fn username_exists(&self, username: &Username) -> Result<bool, RepositoryError>;
    async fn create(&self, new: &NewUser) -> Result<User, RepositoryError>;
    async fn assign_role(&self, user_id: UserId, role: Role) -> Result<(), RepositoryError>;
    async fn all_emails(&self) -> Result<Vec<String>, RepositoryError>;
    async fn all_phones(&self) -> Result<Vec<String>, RepositoryError>;
    async fn all_usernames(&self) -> Result<Vec<String>, RepositoryError>;
}

/// Side-channel collaborator that tells a freshly provisioned account to set
/// a password. Delivery is best-effort; callers log and continue on failure.
#[allow(async_fn_in_trait)]
pub trait ResetNotifier {
    type Error: std::error::Error + Send + Sync;

    async fn send_password_reset(&self, email: &Email, name: &str) -> Result<(), Self::Error>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fakes shared by the provisioner and import tests.

    use std::collections::HashSet;
    use std::convert::Infallible;
    use std::sync::Mutex;

    use chrono::Utc;

    use kartvizit_core::{Email, Role, UserId, Username};

    use super::{AccountStore, ResetNotifier};
    use crate::db::RepositoryError;
    use crate::models::{NewUser, User};

    /// In-memory account store enforcing the same uniqueness rules as the
    /// database schema.
    #[derive(Default)]
    pub struct MemoryStore {
        users: Mutex<Vec<User>>,
        next_id: Mutex<i32>,
        /// Emails whose insert should fail with a simulated storage error.
        pub fail_emails: HashSet<String>,
        /// When set, `assign_role` fails (the pipelines must swallow it).
        pub fail_role_assignment: bool,
    }

    impl MemoryStore {
        pub fn with_users(usernames: &[&str]) -> Self {
            let store = Self::default();
            {
                let mut users = store.users.lock().expect("lock poisoned");
                let mut next_id = store.next_id.lock().expect("lock poisoned");
                for name in usernames {
                    *next_id += 1;
                    users.push(User {
                        id: UserId::new(*next_id),
                        name: (*name).to_owned(),
                        username: Username::parse(name).expect("test username is a slug"),
                        email: None,
                        phone: None,
                        registration_number: None,
                        password_hash: "x".to_owned(),
                        email_verified_at: None,
                        role: Role::User,
                        created_at: Utc::now(),
                        updated_at: Utc::now(),
                    });
                }
            }
            store
        }

        /// A store whose `create` fails for the given email addresses.
        pub fn failing_emails(emails: &[&str]) -> Self {
            Self {
                fail_emails: emails.iter().map(|e| (*e).to_owned()).collect(),
                ..Self::default()
            }
        }

        /// A store whose `assign_role` always fails.
        pub fn failing_role_assignment() -> Self {
            Self {
                fail_role_assignment: true,
                ..Self::default()
            }
        }

        pub fn user_count(&self) -> usize {
            self.users.lock().expect("lock poisoned").len()
        }

        pub fn usernames(&self) -> Vec<String> {
            self.users
                .lock()
                .expect("lock poisoned")
                .iter()
                .map(|u| u.username.as_str().to_owned())
                .collect()
        }
    }

    impl AccountStore for MemoryStore {
        async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
            Ok(self
                .users
                .lock()
                .expect("lock poisoned")
                .iter()
                .find(|u| u.email.as_ref() == Some(email))
                .cloned())
        }

        async fn username_exists(&self, username: &Username) -> Result<bool, RepositoryError> {
            Ok(self
                .users
                .lock()
                .expect("lock poisoned")
                .iter()
                .any(|u| u.username == *username))
        }

        async fn create(&self, new: &NewUser) -> Result<User, RepositoryError> {
            if let Some(email) = &new.email
                && self.fail_emails.contains(email.as_str())
            {
                return Err(RepositoryError::DataCorruption(
                    "simulated storage failure".to_owned(),
                ));
            }

            let mut users = self.users.lock().expect("lock poisoned");

            if new.email.is_some() && users.iter().any(|u| u.email == new.email) {
                return Err(RepositoryError::Conflict("users_email_key".to_owned()));
            }
            if users.iter().any(|u| u.username == new.username) {
                return Err(RepositoryError::Conflict("users_username_key".to_owned()));
            }
            if new.phone.is_some() && users.iter().any(|u| u.phone == new.phone) {
                return Err(RepositoryError::Conflict("users_phone_key".to_owned()));
            }

            let mut next_id = self.next_id.lock().expect("lock poisoned");
            *next_id += 1;

            let user = User {
                id: UserId::new(*next_id),
                name: new.name.clone(),
                username: new.username.clone(),
                email: new.email.clone(),
                phone: new.phone.clone(),
                registration_number: new.registration_number.clone(),
                password_hash: new.password_hash.clone(),
                email_verified_at: new.email_verified_at,
                role: new.role,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            users.push(user.clone());
            Ok(user)
        }

        async fn assign_role(&self, _user_id: UserId, _role: Role) -> Result<(), RepositoryError> {
            if self.fail_role_assignment {
                return Err(RepositoryError::DataCorruption(
                    "simulated role failure".to_owned(),
                ));
            }
            Ok(())
        }

        async fn all_emails(&self) -> Result<Vec<String>, RepositoryError> {
            Ok(self
                .users
                .lock()
                .expect("lock poisoned")
                .iter()
                .filter_map(|u| u.email.as_ref().map(|e| e.as_str().to_owned()))
                .collect())
        }

        async fn all_phones(&self) -> Result<Vec<String>, RepositoryError> {
            Ok(self
                .users
                .lock()
                .expect("lock poisoned")
                .iter()
                .filter_map(|u| u.phone.clone())
                .collect())
        }

        async fn all_usernames(&self) -> Result<Vec<String>, RepositoryError> {
            Ok(self.usernames())
        }
    }

    /// Notifier that records every reset request instead of sending mail.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<String>>,
    }

    impl ResetNotifier for RecordingNotifier {
        type Error = Infallible;

        async fn send_password_reset(
            &self,
            email: &Email,
            _name: &str,
        ) -> Result<(), Self::Error> {
            self.sent
                .lock()
                .expect("lock poisoned")
                .push(email.as_str().to_owned());
            Ok(())
        }
    }
}
