//! Bulk user import from a spreadsheet (CSV with a header row).
//!
//! The pipeline streams rows in fixed-size chunks, de-duplicates in memory
//! against both earlier rows and already-persisted accounts, resolves
//! username collisions, and keeps going when individual rows fail. One bad
//! row never aborts a run; only failures that prevent the run from starting
//! (unreadable input, seed queries) are fatal.

use std::collections::HashSet;
use std::io::Read;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use kartvizit_core::{Email, Role, SuffixStyle, Username};

use super::AccountStore;
use super::provisioner::hash_password;
use crate::db::RepositoryError;
use crate::models::NewUser;

/// Rows read from the source per processing chunk.
const CHUNK_SIZE: usize = 500;

/// Cap on error entries kept for display; the rest collapse into a summary
/// suffix line.
const MAX_DISPLAYED_ERRORS: usize = 50;

/// Default credential for rows without a registration number.
const FALLBACK_PASSWORD: &str = "12345678";

/// One normalized spreadsheet row.
#[derive(Debug, Clone, Default)]
pub struct ImportRow {
    pub registration_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ImportRow {
    /// A row with no registration number, first name or last name is
    /// formatting noise, not data.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.registration_number.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }
}

/// Result of one import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    /// Accounts created.
    pub imported: u64,
    /// Rows skipped (duplicates and failed rows; blank rows count nowhere).
    pub skipped: u64,
    /// Display-capped error messages, one per failed row.
    pub errors: Vec<String>,
    /// Total number of errors before capping.
    pub error_count: usize,
}

/// Failures that prevent an import run from starting.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The input could not be read as CSV at all.
    #[error("unreadable import file: {0}")]
    Unreadable(#[from] csv::Error),

    /// Seeding the de-duplication sets failed.
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Why a single row did not produce an account. Collected, never fatal.
#[derive(Debug, Error)]
enum RowError {
    #[error("{field}: {message} (value: {value})")]
    Validation {
        field: &'static str,
        message: String,
        value: String,
    },

    #[error("{0}")]
    Store(#[from] RepositoryError),

    #[error("{0}")]
    Hash(String),
}

/// Per-run state: counters, errors, and the in-memory de-duplication sets
/// seeded from persisted accounts. Local to one run; concurrent runs do not
/// share it (the route layer holds an advisory single-run lock).
struct RunState {
    imported: u64,
    skipped: u64,
    errors: Vec<String>,
    seen_emails: HashSet<String>,
    seen_phones: HashSet<String>,
    seen_usernames: HashSet<String>,
}

impl RunState {
    async fn seed<S: AccountStore>(store: &S) -> Result<Self, RepositoryError> {
        Ok(Self {
            imported: 0,
            skipped: 0,
            errors: Vec::new(),
            seen_emails: store.all_emails().await?.into_iter().collect(),
            seen_phones: store.all_phones().await?.into_iter().collect(),
            seen_usernames: store.all_usernames().await?.into_iter().collect(),
        })
    }

    fn into_summary(self) -> ImportSummary {
        let error_count = self.errors.len();
        let mut errors = self.errors;
        if error_count > MAX_DISPLAYED_ERRORS {
            errors.truncate(MAX_DISPLAYED_ERRORS);
            errors.push(format!(
                "... and {} more errors",
                error_count - MAX_DISPLAYED_ERRORS
            ));
        }
        ImportSummary {
            imported: self.imported,
            skipped: self.skipped,
            errors,
            error_count,
        }
    }
}

/// Maps recognized column headers (with synonyms) to record indices.
#[derive(Debug, Default)]
struct ColumnMap {
    registration_number: Option<usize>,
    first_name: Option<usize>,
    last_name: Option<usize>,
    phone: Option<usize>,
    email: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let mut map = Self::default();
        for (index, header) in headers.iter().enumerate() {
            let slot = match normalize_header(header).as_str() {
                "sicil_no" | "sicil_numarasi" | "registration_number" => {
                    &mut map.registration_number
                }
                "adi" | "ad" | "first_name" => &mut map.first_name,
                "soyadi" | "soyad" | "last_name" => &mut map.last_name,
                "cep_telefonu" | "telefon" | "phone" => &mut map.phone,
                "e_posta" | "eposta" | "email" => &mut map.email,
                _ => continue,
            };
            // First matching column wins.
            if slot.is_none() {
                *slot = Some(index);
            }
        }
        map
    }

    fn row(&self, record: &csv::StringRecord) -> ImportRow {
        let cell = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        ImportRow {
            registration_number: cell(self.registration_number),
            first_name: cell(self.first_name),
            last_name: cell(self.last_name),
            phone: cell(self.phone),
            email: cell(self.email),
        }
    }
}

/// Lowercase a header, fold Turkish characters, collapse punctuation runs to
/// underscores (`"Cep Telefonu"` becomes `cep_telefonu`).
fn normalize_header(header: &str) -> String {
    Username::slugify(header)
        .map(|slug| slug.as_str().replace('-', "_"))
        .unwrap_or_default()
}

/// Spreadsheet-based account creation.
pub struct UserImporter<'a, S> {
    store: &'a S,
}

impl<'a, S: AccountStore> UserImporter<'a, S> {
    /// Create an importer over an account store.
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Run one import over CSV input with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] only when the run cannot start: the header
    /// row is unreadable or the seed queries fail. Every row-level problem
    /// is collected into the summary instead.
    pub async fn run<R: Read>(&self, reader: R) -> Result<ImportSummary, ImportError> {
        let mut state = RunState::seed(self.store).await?;

        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);
        let columns = ColumnMap::from_headers(csv_reader.headers()?);

        // Row numbers are 1-based file positions; the header is row 1.
        let mut row_number: u64 = 1;
        let mut chunk: Vec<(u64, ImportRow)> = Vec::with_capacity(CHUNK_SIZE);

        for result in csv_reader.records() {
            row_number += 1;
            match result {
                Ok(record) => chunk.push((row_number, columns.row(&record))),
                Err(err) => {
                    state.skipped += 1;
                    state.errors.push(format!("row {row_number}: {err}"));
                }
            }

            if chunk.len() >= CHUNK_SIZE {
                self.process_chunk(&mut state, &mut chunk).await;
            }
        }
        self.process_chunk(&mut state, &mut chunk).await;

        let summary = state.into_summary();
        info!(
            imported = summary.imported,
            skipped = summary.skipped,
            errors = summary.error_count,
            "import run finished"
        );
        Ok(summary)
    }

    async fn process_chunk(&self, state: &mut RunState, chunk: &mut Vec<(u64, ImportRow)>) {
        for (row_number, row) in chunk.drain(..) {
            if row.is_blank() {
                continue;
            }
            match self.process_row(state, &row).await {
                Ok(RowOutcome::Imported) => state.imported += 1,
                Ok(RowOutcome::Duplicate) => state.skipped += 1,
                Err(err) => {
                    state.skipped += 1;
                    state.errors.push(format!("row {row_number}: {err}"));
                }
            }
        }
    }

    async fn process_row(&self, state: &mut RunState, row: &ImportRow) -> Result<RowOutcome, RowError> {
        // Duplicate suppression covers both earlier rows of this run and
        // pre-existing accounts - the seed filled the sets with the latter.
        if let Some(email) = &row.email
            && state.seen_emails.contains(email)
        {
            return Ok(RowOutcome::Duplicate);
        }
        if let Some(phone) = &row.phone
            && state.seen_phones.contains(phone)
        {
            return Ok(RowOutcome::Duplicate);
        }

        let email = row
            .email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| RowError::Validation {
                field: "email",
                message: e.to_string(),
                value: row.email.clone().unwrap_or_default(),
            })?;

        let name = format!(
            "{} {}",
            row.first_name.as_deref().unwrap_or(""),
            row.last_name.as_deref().unwrap_or("")
        )
        .trim()
        .to_owned();

        let username = self.resolve_username(state, &name, row);

        let password = row
            .registration_number
            .as_deref()
            .unwrap_or(FALLBACK_PASSWORD);
        let password_hash = hash_password(password).map_err(|e| RowError::Hash(e.to_string()))?;

        let new = NewUser {
            name,
            username: username.clone(),
            email: email.clone(),
            phone: row.phone.clone(),
            registration_number: row.registration_number.clone(),
            password_hash,
            email_verified_at: None,
            role: Role::User,
        };

        let user = self.store.create(&new).await?;

        if let Err(err) = self.store.assign_role(user.id, Role::User).await {
            warn!(user_id = %user.id, error = %err, "role assignment failed, continuing");
        }

        if let Some(email) = email {
            state.seen_emails.insert(email.into_inner());
        }
        if let Some(phone) = &row.phone {
            state.seen_phones.insert(phone.clone());
        }
        state.seen_usernames.insert(username.into_inner());

        Ok(RowOutcome::Imported)
    }

    /// Import-variant username resolution: hyphen-separated numeric suffix,
    /// checked purely against the in-memory set (which was seeded with every
    /// persisted username).
    fn resolve_username(&self, state: &RunState, name: &str, row: &ImportRow) -> Username {
        let base = Username::slugify(name)
            .or_else(|| {
                row.registration_number
                    .as_deref()
                    .and_then(Username::slugify)
            })
            .unwrap_or_else(|| Username::slugify("user").expect("static slug is valid"));

        let mut candidate = base.clone();
        let mut counter: u32 = 1;
        while state.seen_usernames.contains(candidate.as_str()) {
            candidate = base.with_suffix(counter, SuffixStyle::Hyphenated);
            counter += 1;
        }
        candidate
    }
}

enum RowOutcome {
    Imported,
    Duplicate,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::testing::MemoryStore;

    const HEADER: &str = "sicil_no,adi,soyadi,cep_telefonu,e_posta\n";

    async fn run(store: &MemoryStore, csv_body: &str) -> ImportSummary {
        let importer = UserImporter::new(store);
        importer
            .run(format!("{HEADER}{csv_body}").as_bytes())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_imports_rows() {
        let store = MemoryStore::default();
        let summary = run(
            &store,
            "100,Ahmet,Yılmaz,05551112233,ahmet@x.com\n101,Ayşe,Kaya,,ayse@x.com\n",
        )
        .await;

        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 0);
        assert!(summary.errors.is_empty());
        assert_eq!(
            store.usernames(),
            vec!["ahmet-yilmaz".to_owned(), "ayse-kaya".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_within_run_is_skipped() {
        let store = MemoryStore::default();
        let summary = run(
            &store,
            "100,Ahmet,Yılmaz,,a@x.com\n101,Mehmet,Demir,,a@x.com\n",
        )
        .await;

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.errors.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_phone_against_existing_account_is_skipped() {
        let store = MemoryStore::default();
        // First run persists the phone; the second sees it in the seed.
        run(&store, "100,Ahmet,Yılmaz,05551112233,\n").await;
        let summary = run(&store, "200,Mehmet,Demir,05551112233,\n").await;

        assert_eq!(summary.imported, 0);
        assert_eq!(summary.skipped, 1);
    }

    #[tokio::test]
    async fn test_blank_rows_count_nowhere() {
        let store = MemoryStore::default();
        let summary = run(&store, ",,,05551112233,stray@x.com\n100,Ahmet,Yılmaz,,\n").await;

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn test_username_collisions_get_hyphenated_suffixes() {
        let store = MemoryStore::with_users(&["ahmet-yilmaz", "ahmet-yilmaz-1"]);
        let summary = run(&store, "100,Ahmet,Yılmaz,,a@x.com\n101,Ahmet,Yılmaz,,b@x.com\n").await;

        assert_eq!(summary.imported, 2);
        let usernames = store.usernames();
        assert!(usernames.contains(&"ahmet-yilmaz-2".to_owned()));
        assert!(usernames.contains(&"ahmet-yilmaz-3".to_owned()));
    }

    #[tokio::test]
    async fn test_failing_row_is_recorded_and_run_continues() {
        let store = MemoryStore::failing_emails(&["bad@x.com"]);
        let mut body = String::new();
        for i in 0..10 {
            let email = if i == 4 {
                "bad@x.com".to_owned()
            } else {
                format!("user{i}@x.com")
            };
            body.push_str(&format!("{i},User,Number{i},,{email}\n"));
        }

        let summary = run(&store, &body).await;

        assert_eq!(summary.imported, 9);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors.len(), 1);
        // Row 6 of the file: header plus five data rows.
        assert!(summary.errors[0].starts_with("row 6:"), "{:?}", summary.errors);
    }

    #[tokio::test]
    async fn test_malformed_email_is_a_row_error() {
        let store = MemoryStore::default();
        let summary = run(&store, "100,Ahmet,Yılmaz,,not-an-email\n").await;

        assert_eq!(summary.imported, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.error_count, 1);
        assert!(summary.errors[0].contains("email"));
        assert!(summary.errors[0].contains("not-an-email"));
    }

    #[tokio::test]
    async fn test_error_list_is_capped_for_display() {
        let store = MemoryStore::default();
        // 60 rows with malformed emails.
        let mut body = String::new();
        for i in 0..60 {
            body.push_str(&format!("{i},User,Number{i},,broken-address\n"));
        }
        // Phone-less duplicate emails are impossible here; each row fails
        // validation on its own.
        let summary = run(&store, &body).await;

        assert_eq!(summary.error_count, 60);
        assert_eq!(summary.errors.len(), MAX_DISPLAYED_ERRORS + 1);
        assert!(
            summary.errors[MAX_DISPLAYED_ERRORS].contains("10 more errors"),
            "{:?}",
            summary.errors.last()
        );
    }

    #[tokio::test]
    async fn test_header_synonyms_recognized() {
        let store = MemoryStore::default();
        let importer = UserImporter::new(&store);
        let summary = importer
            .run("registration_number,ad,soyad,telefon,eposta\n100,Jon,Snow,,jon@x.com\n".as_bytes())
            .await
            .unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(store.usernames(), vec!["jon-snow".to_owned()]);
    }

    #[tokio::test]
    async fn test_registration_number_only_rows_import() {
        let store = MemoryStore::default();
        let summary = run(&store, "100,,,,\n").await;

        assert_eq!(summary.imported, 1);
        // Name is empty, so the username falls back to the registration number.
        assert_eq!(store.usernames(), vec!["100".to_owned()]);
    }
}
