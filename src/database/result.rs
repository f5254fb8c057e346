//! Query result types and schema structures.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Row data as a map of column name to JSON value.
pub type Row = Map<String, Value>;

/// Result of running one statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    /// Rows modified by a data statement. Zero for queries.
    pub changes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_insert_rowid: Option<i64>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>, execution_time_ms: u64) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            changes: 0,
            last_insert_rowid: None,
            execution_time_ms,
        }
    }

    pub fn from_changes(changes: u64, last_insert_rowid: i64, execution_time_ms: u64) -> Self {
        Self {
            changes,
            last_insert_rowid: Some(last_insert_rowid),
            execution_time_ms,
            ..Self::default()
        }
    }

    /// First row, consuming the result.
    pub fn into_first(self) -> Option<Row> {
        self.rows.into_iter().next()
    }
}

/// Table or view listed in `sqlite_master`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub table_type: String,
}

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub notnull: i64,
    pub dflt_value: Value,
    pub pk: i64,
}

impl ColumnInfo {
    pub fn is_primary_key(&self) -> bool {
        self.pk == 1
    }
}

/// The first primary key column, if the table has one.
pub fn primary_key(columns: &[ColumnInfo]) -> Option<&ColumnInfo> {
    columns.iter().find(|c| c.is_primary_key())
}
