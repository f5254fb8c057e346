//! Table and column name validation and quoting.
//!
//! Reserved words are accepted as identifiers. Keyword collisions are
//! neutralized by quoting every identifier at the point SQL text is
//! generated, never by rejecting names at validation time.

use crate::error::{ValidationError, ValidationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::warn;

/// Maximum identifier length in characters.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex: identifier pattern")
});

/// Character sequences that never belong in an identifier.
const DANGEROUS_SEQUENCES: [&str; 8] = ["--", "/*", "*/", ";", "'", "\"", "`", "\\"];

/// What an identifier names. Only used to word error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Table,
    Column,
}

impl IdentifierKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Table => "table name",
            Self::Column => "column name",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Validate a single identifier.
pub fn validate_identifier(candidate: &str, kind: IdentifierKind) -> ValidationResult<()> {
    let kind = kind.label();

    if candidate.is_empty() {
        return Err(ValidationError::Empty { kind });
    }

    if candidate.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong {
            kind,
            max: MAX_IDENTIFIER_LENGTH,
        });
    }

    if !IDENTIFIER_PATTERN.is_match(candidate) {
        return Err(ValidationError::BadPattern { kind });
    }

    if DANGEROUS_SEQUENCES.iter().any(|seq| candidate.contains(seq)) {
        warn!("Dangerous characters in {}", kind);
        return Err(ValidationError::DangerousCharacters { kind });
    }

    Ok(())
}

/// Validate a non-empty list of identifiers. The first failure wins.
pub fn validate_identifiers<S: AsRef<str>>(
    candidates: &[S],
    kind: IdentifierKind,
) -> ValidationResult<()> {
    if candidates.is_empty() {
        return Err(ValidationError::EmptyList { kind: kind.label() });
    }

    candidates
        .iter()
        .try_for_each(|candidate| validate_identifier(candidate.as_ref(), kind))
}

/// Wrap an identifier in double quotes, doubling any embedded quote.
///
/// Quoting is not a substitute for validation: call this only on names
/// that already passed [`validate_identifier`].
pub fn quote_identifier(candidate: &str) -> String {
    format!("\"{}\"", candidate.replace('"', "\"\""))
}

/// A table or column name that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(candidate: impl Into<String>, kind: IdentifierKind) -> ValidationResult<Self> {
        let candidate = candidate.into();
        validate_identifier(&candidate, kind)?;
        Ok(Self(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name in its quoted form, ready to splice into SQL text.
    pub fn quoted(&self) -> String {
        quote_identifier(&self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
