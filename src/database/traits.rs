//! Database driver trait.

use crate::database::result::{ColumnInfo, QueryResult, TableInfo};
use crate::database::sql_builder::{self, BoundStatement};
use crate::error::{DatabaseError, DbResult};
use crate::security::Identifier;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Async database driver trait.
///
/// Implementations only need [`execute`](Self::execute); catalog lookups are
/// expressed as ordinary statements on top of it.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Returns the driver name (e.g., "sqlite").
    fn name(&self) -> &'static str;

    /// Runs one statement with its bound parameters.
    ///
    /// The statement has already passed the safety policy, or was generated
    /// from validated identifiers. Engine errors are returned as
    /// [`DatabaseError::QueryFailed`] with the engine's message.
    async fn execute(&self, statement: BoundStatement) -> DbResult<QueryResult>;

    /// Lists user tables and views, skipping internal tables.
    async fn list_tables(&self) -> DbResult<Vec<TableInfo>> {
        let result = self.execute(sql_builder::list_tables()).await?;
        decode_rows(result)
    }

    /// Column metadata for a table. Empty when the table does not exist.
    async fn table_schema(&self, table: &Identifier) -> DbResult<Vec<ColumnInfo>> {
        let result = self.execute(sql_builder::table_info(table)).await?;
        decode_rows(result)
    }
}

fn decode_rows<T: DeserializeOwned>(result: QueryResult) -> DbResult<Vec<T>> {
    result
        .rows
        .into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row))
                .map_err(|e| DatabaseError::QueryFailed(format!("Unexpected catalog row: {}", e)))
        })
        .collect()
}
