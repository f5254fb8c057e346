//! SQL safety policy: identifier validation and quoting, raw statement
//! filtering, and row payload checks.
//!
//! Everything here is synchronous and stateless, and safe to call from any
//! number of tasks at once.

pub mod create_table;
pub mod identifier;
pub mod pagination;
pub mod row_data;
pub mod statement;

pub use create_table::{CreateTableValidator, validate_create_table};
pub use identifier::{
    Identifier, IdentifierKind, MAX_IDENTIFIER_LENGTH, quote_identifier, validate_identifier,
    validate_identifiers,
};
pub use pagination::{Pagination, validate_pagination};
pub use row_data::{MAX_ROW_COLUMNS, RowData, validate_row_data};
pub use statement::{
    SqlValidator, StatementPolicy, Verb, strip_quoted_content, validate_sql_statement,
};
