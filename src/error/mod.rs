//! Error types for the gateway.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: Cow<'static, str> },
}

impl GatewayError {
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP-style status code for the response envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Json(_) => 400,
            Self::Protocol(e) => e.status_code(),
            Self::Auth(e) => e.status_code(),
            Self::Database(DatabaseError::RowNotFound(_)) => 404,
            Self::Database(DatabaseError::NoPrimaryKey(_)) => 400,
            _ => 500,
        }
    }

    /// Stable reason code for policy rejections.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Validation(e) => Some(e.code()),
            _ => None,
        }
    }
}

/// Rejections raised by the SQL safety policy.
///
/// Every message is written to be surfaced verbatim to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid {kind}: must be a non-empty string")]
    Empty { kind: &'static str },

    #[error("Invalid {kind}: exceeds maximum length of {max} characters")]
    TooLong { kind: &'static str, max: usize },

    #[error(
        "Invalid {kind}: must contain only letters, numbers, and underscores, and start with a letter or underscore"
    )]
    BadPattern { kind: &'static str },

    #[error("Invalid {kind}: contains potentially dangerous characters")]
    DangerousCharacters { kind: &'static str },

    #[error("Invalid {kind}s: must be a non-empty array")]
    EmptyList { kind: &'static str },

    #[error("Invalid SQL: must be a non-empty string")]
    EmptyStatement,

    #[error("SQL statement not allowed: only {allowed} queries are permitted. Received: {verb}")]
    DisallowedVerb { verb: String, allowed: &'static str },

    #[error("SQL statement not allowed: {0}")]
    DisallowedSubVerb(&'static str),

    #[error("SQL statement not allowed: contains dangerous keyword '{0}'")]
    DangerousKeyword(&'static str),

    #[error(
        "SQL statement not allowed: CREATE/DROP {0} is not permitted. Use the UI or API for table/view management."
    )]
    BlockedSchemaObject(&'static str),

    #[error(
        "SQL statement not allowed: multiple statements detected. Only single queries are permitted."
    )]
    MultipleStatements,

    #[error("SQL statement not allowed: comments are not permitted")]
    CommentPresent,

    #[error("Invalid CREATE TABLE statement: must start with CREATE TABLE")]
    NotCreateTable,

    #[error("Invalid data: must be an object")]
    NotAnObject,

    #[error("Invalid data: must contain at least one field")]
    EmptyPayload,

    #[error("Invalid data: too many columns (max {max})")]
    TooManyColumns { max: usize },

    #[error("Invalid column type: {received}. Allowed types: {allowed}")]
    InvalidColumnType {
        received: String,
        allowed: &'static str,
    },
}

impl ValidationError {
    /// Stable reason code, for logs and machine consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty { .. } | Self::EmptyStatement | Self::NotAnObject => "invalid_type",
            Self::TooLong { .. } => "exceeds_length",
            Self::BadPattern { .. } => "bad_pattern",
            Self::DangerousCharacters { .. } => "dangerous_characters",
            Self::EmptyList { .. } | Self::EmptyPayload => "empty_payload",
            Self::DisallowedVerb { .. } | Self::NotCreateTable => "disallowed_verb",
            Self::DisallowedSubVerb(_) => "disallowed_sub_verb",
            Self::DangerousKeyword(_) => "dangerous_keyword",
            Self::BlockedSchemaObject(_) => "blocked_schema_object",
            Self::MultipleStatements => "multi_statement",
            Self::CommentPresent => "comment_present",
            Self::TooManyColumns { .. } => "too_many_columns",
            Self::InvalidColumnType { .. } => "invalid_column_type",
        }
    }
}

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("{0}")]
    QueryFailed(String),

    #[error("No primary key found for table {0}")]
    NoPrimaryKey(String),

    #[error("Row not found: {0}")]
    RowNotFound(String),

    #[error("Database task failed: {0}")]
    TaskFailed(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(e: rusqlite::Error) -> Self {
        Self::QueryFailed(e.to_string())
    }
}

/// Authentication and API key errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("An API key with this name already exists")]
    DuplicateName,

    #[error("API key not found")]
    KeyNotFound,

    #[error("Invalid key name: {0}")]
    InvalidName(Cow<'static, str>),

    #[error("API key store not configured")]
    StoreNotConfigured,

    #[error("Key store error: {0}")]
    Store(String),
}

impl AuthError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized => 401,
            Self::DuplicateName => 409,
            Self::KeyNotFound => 404,
            Self::InvalidName(_) => 400,
            Self::StoreNotConfigured | Self::Store(_) => 500,
        }
    }
}

/// Request framing and routing errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Parse error: invalid JSON")]
    ParseError,

    #[error("Invalid request: {0}")]
    InvalidRequest(Cow<'static, str>),

    #[error("Not found")]
    RouteNotFound,

    #[error("Invalid path segment: {0}")]
    InvalidPath(String),
}

impl ProtocolError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::RouteNotFound => 404,
            _ => 400,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },
}

/// Result type alias for GatewayError.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Result type alias for ValidationError.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Result type alias for DatabaseError.
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Result type alias for AuthError.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Result type alias for ProtocolError.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
