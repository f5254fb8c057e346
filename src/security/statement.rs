//! Raw SQL statement policy.
//!
//! Classifies a caller-supplied statement by its leading verb, enforces the
//! verb allow-list, and scans for injection-indicative syntax. Quoted spans
//! are blanked out before keyword scanning so that string literals and
//! quoted identifiers cannot trigger false positives.
//!
//! This is a lexical filter, not a parser. Values must still travel as
//! bound parameters.

use crate::error::{ValidationError, ValidationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

static DOUBLE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""[^"]*""#).expect("Invalid regex: double-quoted span"));

static SINGLE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"'[^']*'").expect("Invalid regex: single-quoted span"));

static BACKTICK_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`]*`").expect("Invalid regex: backtick span"));

/// Keywords rejected anywhere outside quotes, under every policy.
static DANGEROUS_KEYWORDS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    keyword_patterns(&["ALTER", "TRUNCATE", "EXEC", "EXECUTE", "ATTACH", "DETACH"])
});

/// Extra keywords rejected when CREATE/DROP are not allowed at all.
static DATA_ONLY_KEYWORDS: Lazy<Vec<(&'static str, Regex)>> =
    Lazy::new(|| keyword_patterns(&["DROP", "CREATE"]));

/// Schema objects that may never be created or dropped through raw SQL.
static BLOCKED_SCHEMA_OBJECTS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    ["TABLE", "VIEW", "TRIGGER", "DATABASE"]
        .into_iter()
        .map(|object| {
            let pattern = format!(r"(?i)\b(CREATE|DROP)\s+{object}\b");
            let regex = Regex::new(&pattern).expect("Invalid regex: blocked schema object");
            (object, regex)
        })
        .collect()
});

/// Whole-word patterns for already-uppercased text.
pub(crate) fn keyword_patterns(keywords: &[&'static str]) -> Vec<(&'static str, Regex)> {
    keywords
        .iter()
        .map(|keyword| {
            let regex = Regex::new(&format!(r"\b{keyword}\b"))
                .expect("Invalid regex: keyword pattern");
            (*keyword, regex)
        })
        .collect()
}

/// Replace the interior of every quoted span with nothing, keeping the
/// quote markers.
pub fn strip_quoted_content(sql: &str) -> String {
    let stripped = DOUBLE_QUOTED.replace_all(sql, "\"\"");
    let stripped = SINGLE_QUOTED.replace_all(&stripped, "''");
    BACKTICK_QUOTED.replace_all(&stripped, "``").into_owned()
}

/// Number of non-blank fragments between semicolons.
pub(crate) fn statement_count(sql: &str) -> usize {
    sql.split(';').filter(|s| !s.trim().is_empty()).count()
}

/// Leading verb of an accepted statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Select,
    Pragma,
    Insert,
    Update,
    Delete,
    CreateIndex,
    CreateUniqueIndex,
    DropIndex,
}

impl Verb {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Pragma => "PRAGMA",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::CreateIndex => "CREATE INDEX",
            Self::CreateUniqueIndex => "CREATE UNIQUE INDEX",
            Self::DropIndex => "DROP INDEX",
        }
    }

    pub fn is_read_only(self) -> bool {
        matches!(self, Self::Select | Self::Pragma)
    }

    pub fn is_schema_change(self) -> bool {
        matches!(
            self,
            Self::CreateIndex | Self::CreateUniqueIndex | Self::DropIndex
        )
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Which leading verbs raw SQL may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatementPolicy {
    /// Data statements plus `CREATE [UNIQUE] INDEX` and `DROP INDEX`.
    #[default]
    IndexMaintenance,
    /// Data statements only. `CREATE` and `DROP` are rejected wherever
    /// they appear outside quotes.
    DataOnly,
}

impl StatementPolicy {
    /// Parse a policy name. Accepts a few aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "index" | "index-maintenance" | "index_maintenance" | "broad" => {
                Some(Self::IndexMaintenance)
            }
            "data-only" | "data_only" | "data" | "strict" => Some(Self::DataOnly),
            _ => None,
        }
    }

    fn allowed_description(self) -> &'static str {
        match self {
            Self::IndexMaintenance => {
                "SELECT, PRAGMA, INSERT, UPDATE, DELETE, CREATE INDEX, DROP INDEX"
            }
            Self::DataOnly => "SELECT, PRAGMA, INSERT, UPDATE, DELETE",
        }
    }
}

/// Statement policy filter.
#[derive(Debug, Clone, Default)]
pub struct SqlValidator {
    policy: StatementPolicy,
}

impl SqlValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(mut self, policy: StatementPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn current_policy(&self) -> StatementPolicy {
        self.policy
    }

    /// Validate a single raw statement, returning its verb on success.
    pub fn validate(&self, sql: &str) -> ValidationResult<Verb> {
        let result = self.check(sql);
        match &result {
            Ok(verb) => debug!("Statement accepted: {}", verb),
            Err(e) => warn!("Statement rejected ({}): {}", e.code(), e),
        }
        result
    }

    fn check(&self, sql: &str) -> ValidationResult<Verb> {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyStatement);
        }

        debug!(
            "Validating statement: {}",
            trimmed.chars().take(100).collect::<String>()
        );

        let verb = self.classify(trimmed)?;

        let stripped = strip_quoted_content(sql).to_uppercase();
        self.check_dangerous_keywords(&stripped)?;
        check_blocked_schema_objects(&stripped)?;

        if statement_count(sql) > 1 {
            return Err(ValidationError::MultipleStatements);
        }

        if sql.contains("--") || sql.contains("/*") || sql.contains("*/") {
            return Err(ValidationError::CommentPresent);
        }

        Ok(verb)
    }

    /// Verb allow-list plus the CREATE/DROP index carve-out.
    fn classify(&self, trimmed: &str) -> ValidationResult<Verb> {
        let mut tokens = trimmed.split_whitespace().map(str::to_uppercase);
        let first = tokens.next().unwrap_or_default();

        let disallowed = || ValidationError::DisallowedVerb {
            verb: first.clone(),
            allowed: self.policy.allowed_description(),
        };

        let verb = match first.as_str() {
            "SELECT" => Verb::Select,
            "PRAGMA" => Verb::Pragma,
            "INSERT" => Verb::Insert,
            "UPDATE" => Verb::Update,
            "DELETE" => Verb::Delete,
            "CREATE" if self.policy == StatementPolicy::IndexMaintenance => {
                match tokens.next().as_deref() {
                    Some("INDEX") => Verb::CreateIndex,
                    Some("UNIQUE") => match tokens.next().as_deref() {
                        Some("INDEX") => Verb::CreateUniqueIndex,
                        _ => {
                            return Err(ValidationError::DisallowedSubVerb(
                                "only CREATE UNIQUE INDEX is permitted after CREATE UNIQUE.",
                            ));
                        }
                    },
                    _ => {
                        return Err(ValidationError::DisallowedSubVerb(
                            "only CREATE INDEX and CREATE UNIQUE INDEX are permitted. Use the UI or API for other schema changes.",
                        ));
                    }
                }
            }
            "DROP" if self.policy == StatementPolicy::IndexMaintenance => {
                match tokens.next().as_deref() {
                    Some("INDEX") => Verb::DropIndex,
                    _ => {
                        return Err(ValidationError::DisallowedSubVerb(
                            "only DROP INDEX is permitted. Use the UI or API for other schema changes.",
                        ));
                    }
                }
            }
            _ => return Err(disallowed()),
        };

        Ok(verb)
    }

    fn check_dangerous_keywords(&self, stripped_upper: &str) -> ValidationResult<()> {
        let extra: &[(&'static str, Regex)] = match self.policy {
            StatementPolicy::IndexMaintenance => &[],
            StatementPolicy::DataOnly => DATA_ONLY_KEYWORDS.as_slice(),
        };

        for (keyword, pattern) in DANGEROUS_KEYWORDS.iter().chain(extra) {
            if pattern.is_match(stripped_upper) {
                return Err(ValidationError::DangerousKeyword(*keyword));
            }
        }
        Ok(())
    }
}

fn check_blocked_schema_objects(stripped: &str) -> ValidationResult<()> {
    for (object, pattern) in BLOCKED_SCHEMA_OBJECTS.iter() {
        if pattern.is_match(stripped) {
            return Err(ValidationError::BlockedSchemaObject(*object));
        }
    }
    Ok(())
}

/// Validate a statement under the default (index maintenance) policy.
pub fn validate_sql_statement(sql: &str) -> ValidationResult<Verb> {
    SqlValidator::new().validate(sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_verbs() {
        let cases = [
            ("SELECT * FROM t", Verb::Select),
            ("PRAGMA table_info(t)", Verb::Pragma),
            ("INSERT INTO t (a) VALUES (1)", Verb::Insert),
            ("UPDATE t SET a=1", Verb::Update),
            ("DELETE FROM t", Verb::Delete),
            ("  select id from users where id = ?  ", Verb::Select),
        ];
        for (sql, verb) in cases {
            assert_eq!(validate_sql_statement(sql), Ok(verb), "{sql}");
        }
    }

    #[test]
    fn test_rejected_verbs() {
        assert!(matches!(
            validate_sql_statement("ALTER TABLE t ADD COLUMN x"),
            Err(ValidationError::DisallowedVerb { verb, .. }) if verb == "ALTER"
        ));
        assert!(matches!(
            validate_sql_statement("vacuum"),
            Err(ValidationError::DisallowedVerb { verb, .. }) if verb == "VACUUM"
        ));
        assert!(matches!(
            validate_sql_statement("WITH x AS (SELECT 1) SELECT * FROM x"),
            Err(ValidationError::DisallowedVerb { .. })
        ));
    }

    #[test]
    fn test_empty_statement() {
        assert_eq!(
            validate_sql_statement(""),
            Err(ValidationError::EmptyStatement)
        );
        assert_eq!(
            validate_sql_statement("  \n\t "),
            Err(ValidationError::EmptyStatement)
        );
    }

    #[test]
    fn test_index_carve_out() {
        assert_eq!(
            validate_sql_statement("CREATE INDEX idx1 ON t(a)"),
            Ok(Verb::CreateIndex)
        );
        assert_eq!(
            validate_sql_statement("create unique index idx2 on t(b)"),
            Ok(Verb::CreateUniqueIndex)
        );
        assert_eq!(validate_sql_statement("DROP INDEX idx1"), Ok(Verb::DropIndex));
    }

    #[test]
    fn test_schema_changes_rejected() {
        for sql in [
            "DROP TABLE t",
            "CREATE TABLE t (a int)",
            "CREATE TABLE t(a int)",
            "CREATE VIEW v AS SELECT 1",
            "CREATE TRIGGER tr AFTER INSERT ON t BEGIN SELECT 1; END",
            "CREATE UNIQUE TABLE t (a int)",
            "DROP VIEW v",
        ] {
            assert!(
                matches!(
                    validate_sql_statement(sql),
                    Err(ValidationError::DisallowedSubVerb(_))
                ),
                "{sql}"
            );
        }
    }

    #[test]
    fn test_dangerous_keywords_outside_quotes() {
        assert_eq!(
            validate_sql_statement("SELECT * FROM t WHERE x = 1 AND EXEC"),
            Err(ValidationError::DangerousKeyword("EXEC"))
        );
        assert_eq!(
            validate_sql_statement("select attach from t"),
            Err(ValidationError::DangerousKeyword("ATTACH"))
        );
    }

    #[test]
    fn test_keywords_inside_quotes_are_ignored() {
        assert_eq!(
            validate_sql_statement("SELECT * FROM t WHERE note = 'please ALTER this'"),
            Ok(Verb::Select)
        );
        assert_eq!(
            validate_sql_statement(r#"SELECT "truncate", `detach` FROM t"#),
            Ok(Verb::Select)
        );
        assert_eq!(
            validate_sql_statement("INSERT INTO logs (msg) VALUES ('drop table users')"),
            Ok(Verb::Insert)
        );
    }

    #[test]
    fn test_keyword_match_is_whole_word() {
        assert_eq!(
            validate_sql_statement("SELECT altered_at, executor FROM jobs"),
            Ok(Verb::Select)
        );
    }

    #[test]
    fn test_blocked_schema_object_in_body() {
        assert_eq!(
            validate_sql_statement("CREATE INDEX i ON t(a) WHERE x IN (SELECT 1) AND CREATE VIEW"),
            Err(ValidationError::BlockedSchemaObject("VIEW"))
        );
    }

    #[test]
    fn test_multiple_statements() {
        assert_eq!(
            validate_sql_statement("SELECT 1; SELECT 2"),
            Err(ValidationError::MultipleStatements)
        );
        assert_eq!(
            validate_sql_statement("SELECT 1; DELETE FROM t"),
            Err(ValidationError::MultipleStatements)
        );
        // The schema-object scan runs first and already stops this payload.
        assert!(validate_sql_statement("SELECT 1; DROP TABLE t").is_err());
        assert_eq!(validate_sql_statement("SELECT 1;"), Ok(Verb::Select));
        assert_eq!(validate_sql_statement("SELECT 1 ;  ; "), Ok(Verb::Select));
    }

    #[test]
    fn test_comments_rejected() {
        assert_eq!(
            validate_sql_statement("SELECT 1 -- comment"),
            Err(ValidationError::CommentPresent)
        );
        assert_eq!(
            validate_sql_statement("SELECT /* x */ 1"),
            Err(ValidationError::CommentPresent)
        );
        assert_eq!(
            validate_sql_statement("SELECT 1 */"),
            Err(ValidationError::CommentPresent)
        );
    }

    #[test]
    fn test_strip_quoted_content() {
        assert_eq!(
            strip_quoted_content(r#"SELECT "a b", 'c d', `e f` FROM t"#),
            r#"SELECT "", '', `` FROM t"#
        );
        assert_eq!(strip_quoted_content("no quotes"), "no quotes");
    }

    #[test]
    fn test_data_only_policy() {
        let validator = SqlValidator::new().policy(StatementPolicy::DataOnly);

        assert_eq!(validator.validate("SELECT * FROM t"), Ok(Verb::Select));
        assert!(matches!(
            validator.validate("CREATE INDEX idx ON t(a)"),
            Err(ValidationError::DisallowedVerb { verb, .. }) if verb == "CREATE"
        ));
        assert!(matches!(
            validator.validate("DROP INDEX idx"),
            Err(ValidationError::DisallowedVerb { .. })
        ));
        assert_eq!(
            validator.validate("UPDATE t SET a = 1 WHERE b IN (SELECT drop FROM x)"),
            Err(ValidationError::DangerousKeyword("DROP"))
        );
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            StatementPolicy::parse("index"),
            Some(StatementPolicy::IndexMaintenance)
        );
        assert_eq!(
            StatementPolicy::parse("DATA-ONLY"),
            Some(StatementPolicy::DataOnly)
        );
        assert_eq!(StatementPolicy::parse("yolo"), None);
    }

    #[test]
    fn test_verb_flags() {
        assert!(Verb::Select.is_read_only());
        assert!(!Verb::Insert.is_read_only());
        assert!(Verb::DropIndex.is_schema_change());
        assert_eq!(Verb::CreateUniqueIndex.to_string(), "CREATE UNIQUE INDEX");
    }
}
