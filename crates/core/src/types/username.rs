//! Username slug type.
//!
//! Usernames are the stable public identifier of a profile page
//! (`/v/{username}`), so they must be URL-safe and unique. This module owns
//! the slug normalization; uniqueness is resolved by the provisioning code
//! against the account store.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum UsernameError {
    /// The input string is empty.
    #[error("username cannot be empty")]
    Empty,
    /// The input contains characters outside `[a-z0-9-]` or has a hyphen at
    /// either end.
    #[error("username must be a lowercase hyphenated slug")]
    NotASlug,
}

/// How a numeric disambiguation suffix is attached to a base slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuffixStyle {
    /// `ahmet-yilmaz` + 2 = `ahmet-yilmaz2` (webhook provisioning).
    Plain,
    /// `ahmet-yilmaz` + 2 = `ahmet-yilmaz-2` (spreadsheet import).
    Hyphenated,
}

/// A URL-safe username slug: lowercase ASCII alphanumerics and single
/// hyphens, never at the ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Parse a `Username` from an already-slugged string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or is not a well-formed slug.
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        if s.is_empty() {
            return Err(UsernameError::Empty);
        }

        let valid = s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !s.starts_with('-')
            && !s.ends_with('-')
            && !s.contains("--");

        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(UsernameError::NotASlug)
        }
    }

    /// Build a username slug from free-form text.
    ///
    /// Lowercases, folds Turkish letters and common Latin diacritics to
    /// ASCII, collapses every other non-alphanumeric run into a single
    /// hyphen, and trims hyphens from both ends. Returns `None` when nothing
    /// usable survives (for example an all-punctuation input).
    #[must_use]
    pub fn slugify(input: &str) -> Option<Self> {
        let mut slug = String::with_capacity(input.len());
        let mut pending_separator = false;

        for c in input.chars() {
            let folded = fold_char(c);
            match folded {
                Some(ch) => {
                    if pending_separator && !slug.is_empty() {
                        slug.push('-');
                    }
                    pending_separator = false;
                    slug.push(ch);
                }
                None => pending_separator = true,
            }
        }

        if slug.is_empty() { None } else { Some(Self(slug)) }
    }

    /// Append a numeric disambiguation suffix.
    #[must_use]
    pub fn with_suffix(&self, n: u32, style: SuffixStyle) -> Self {
        match style {
            SuffixStyle::Plain => Self(format!("{}{n}", self.0)),
            SuffixStyle::Hyphenated => Self(format!("{}-{n}", self.0)),
        }
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Username` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Length in bytes (the slug is always ASCII).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: an empty slug cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Map one character to its slug form, or `None` for separators.
fn fold_char(c: char) -> Option<char> {
    match c {
        'a'..='z' | '0'..='9' => Some(c),
        'A'..='Z' => Some(c.to_ascii_lowercase()),
        // Turkish alphabet
        'ç' | 'Ç' => Some('c'),
        'ğ' | 'Ğ' => Some('g'),
        'ı' | 'İ' => Some('i'),
        'ö' | 'Ö' => Some('o'),
        'ş' | 'Ş' => Some('s'),
        'ü' | 'Ü' => Some('u'),
        // Common Latin diacritics
        'à'..='å' | 'À'..='Å' => Some('a'),
        'è'..='ë' | 'È'..='Ë' => Some('e'),
        'ì'..='ï' | 'Ì'..='Ï' => Some('i'),
        'ò'..='õ' | 'Ò'..='Õ' => Some('o'),
        'ù' | 'ú' | 'û' | 'Ù' | 'Ú' | 'Û' => Some('u'),
        'ñ' | 'Ñ' => Some('n'),
        'ß' => Some('s'),
        _ => None,
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Username {
    type Err = UsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Username {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Username {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Database values are assumed valid
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Username {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
