//! Filter for the dedicated table-creation flow.
//!
//! Narrower than the general statement policy: only `CREATE TABLE` is
//! accepted, and data-modifying keywords may not appear outside quotes.

use crate::error::{ValidationError, ValidationResult};
use crate::security::statement::{keyword_patterns, statement_count, strip_quoted_content};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

static CREATE_TABLE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^CREATE\s+TABLE\b").expect("Invalid regex: CREATE TABLE prefix"));

static FORBIDDEN_KEYWORDS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    keyword_patterns(&[
        "DROP", "DELETE", "INSERT", "UPDATE", "EXEC", "EXECUTE", "ALTER", "ATTACH", "DETACH",
    ])
});

/// Validator for `POST /api/tables` bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateTableValidator;

impl CreateTableValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, sql: &str) -> ValidationResult<()> {
        let result = check(sql);
        if let Err(e) = &result {
            warn!("CREATE TABLE rejected ({}): {}", e.code(), e);
        } else {
            debug!("CREATE TABLE accepted");
        }
        result
    }
}

fn check(sql: &str) -> ValidationResult<()> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyStatement);
    }

    if !CREATE_TABLE_PREFIX.is_match(trimmed) {
        return Err(ValidationError::NotCreateTable);
    }

    if statement_count(sql) > 1 {
        return Err(ValidationError::MultipleStatements);
    }

    let stripped = strip_quoted_content(sql).to_uppercase();
    for (keyword, pattern) in FORBIDDEN_KEYWORDS.iter() {
        if pattern.is_match(&stripped) {
            return Err(ValidationError::DangerousKeyword(*keyword));
        }
    }

    if sql.contains("--") || sql.contains("/*") {
        return Err(ValidationError::CommentPresent);
    }

    Ok(())
}

/// Validate a table-creation statement.
pub fn validate_create_table(sql: &str) -> ValidationResult<()> {
    CreateTableValidator::new().validate(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_create_table() {
        assert!(
            validate_create_table(
                "CREATE TABLE users (\n  id INTEGER PRIMARY KEY AUTOINCREMENT,\n  name TEXT NOT NULL,\n  email TEXT\n);"
            )
            .is_ok()
        );
        assert!(validate_create_table("create table t(a int)").is_ok());
    }

    #[test]
    fn test_quoted_reserved_words_accepted() {
        assert!(
            validate_create_table(r#"CREATE TABLE "order" ("delete" TEXT, "update" INTEGER)"#)
                .is_ok()
        );
        assert!(
            validate_create_table("CREATE TABLE notes (body TEXT DEFAULT 'insert here')").is_ok()
        );
    }

    #[test]
    fn test_must_start_with_create_table() {
        assert_eq!(
            validate_create_table("CREATE INDEX i ON t(a)"),
            Err(ValidationError::NotCreateTable)
        );
        assert_eq!(
            validate_create_table("SELECT 1"),
            Err(ValidationError::NotCreateTable)
        );
        assert_eq!(
            validate_create_table("CREATE TABLES x"),
            Err(ValidationError::NotCreateTable)
        );
        assert_eq!(
            validate_create_table(""),
            Err(ValidationError::EmptyStatement)
        );
    }

    #[test]
    fn test_single_statement_only() {
        assert_eq!(
            validate_create_table("CREATE TABLE a (x int); CREATE TABLE b (y int)"),
            Err(ValidationError::MultipleStatements)
        );
    }

    #[test]
    fn test_forbidden_keywords() {
        assert_eq!(
            validate_create_table("CREATE TABLE t (a int) AS SELECT * FROM x WHERE EXEC"),
            Err(ValidationError::DangerousKeyword("EXEC"))
        );
        assert_eq!(
            validate_create_table(
                "CREATE TABLE c (p INTEGER REFERENCES parent(id) ON DELETE CASCADE)"
            ),
            Err(ValidationError::DangerousKeyword("DELETE"))
        );
    }

    #[test]
    fn test_comments_rejected() {
        assert_eq!(
            validate_create_table("CREATE TABLE t (a int) -- hi"),
            Err(ValidationError::CommentPresent)
        );
        assert_eq!(
            validate_create_table("CREATE TABLE t (a /* int */ int)"),
            Err(ValidationError::CommentPresent)
        );
    }
}
