//! SQLite driver built on rusqlite.

use crate::config::DatabaseConfig;
use crate::database::result::{QueryResult, Row};
use crate::database::sql_builder::BoundStatement;
use crate::database::traits::DatabaseDriver;
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Connection, params_from_iter};
use serde_json::{Map, Number, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// In-memory database path.
pub const MEMORY_PATH: &str = ":memory:";

/// SQLite driver.
///
/// A single connection is shared behind a mutex; every statement runs on the
/// blocking pool so the async runtime never waits on disk.
pub struct SqliteDriver {
    conn: Arc<Mutex<Connection>>,
    path: String,
}

impl SqliteDriver {
    /// Open the database named by `config.path`.
    pub fn open(config: &DatabaseConfig) -> DbResult<Self> {
        let conn = if config.path == MEMORY_PATH {
            Connection::open_in_memory()
        } else {
            Connection::open(&config.path)
        }
        .map_err(|e| DatabaseError::OpenFailed(format!("{}: {}", config.path, e)))?;

        conn.busy_timeout(config.busy_timeout)
            .map_err(|e| DatabaseError::OpenFailed(e.to_string()))?;

        info!("Opened SQLite database at {}", config.path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: config.path.clone(),
        })
    }

    /// Open a fresh in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Self::open(&DatabaseConfig {
            path: MEMORY_PATH.into(),
            ..DatabaseConfig::default()
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn execute(&self, statement: BoundStatement) -> DbResult<QueryResult> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            run_statement(&conn, &statement)
        })
        .await
        .map_err(|e| DatabaseError::TaskFailed(e.to_string()))?
    }
}

fn run_statement(conn: &Connection, statement: &BoundStatement) -> DbResult<QueryResult> {
    let start = Instant::now();
    let mut stmt = conn.prepare(&statement.sql)?;
    let params: Vec<SqlValue> = statement.params.iter().map(json_to_sql).collect();
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    // Statements without a result set report changes instead of rows.
    if columns.is_empty() {
        let changes = stmt.execute(params_from_iter(params.iter()))?;
        let elapsed = start.elapsed().as_millis() as u64;
        debug!("Statement changed {} rows in {}ms", changes, elapsed);
        return Ok(QueryResult::from_changes(
            changes as u64,
            conn.last_insert_rowid(),
            elapsed,
        ));
    }

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out: Vec<Row> = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = Map::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            map.insert(name.clone(), sql_to_json(row.get_ref(idx)?));
        }
        out.push(map);
    }

    let elapsed = start.elapsed().as_millis() as u64;
    debug!("Query returned {} rows in {}ms", out.len(), elapsed);
    Ok(QueryResult::from_rows(columns, out, elapsed))
}

/// Convert a JSON parameter into a SQLite value.
fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Convert a result cell into JSON. Blobs are rendered as lowercase hex.
fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sql_builder;
    use crate::security::{Identifier, IdentifierKind, RowData};
    use serde_json::json;

    async fn driver_with_users() -> SqliteDriver {
        let driver = SqliteDriver::open_in_memory().unwrap();
        driver
            .execute(BoundStatement::new(
                r#"CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, "order" INTEGER, avatar BLOB)"#,
            ))
            .await
            .unwrap();
        driver
    }

    #[test]
    fn test_json_to_sql() {
        assert_eq!(json_to_sql(&json!(null)), SqlValue::Null);
        assert_eq!(json_to_sql(&json!(true)), SqlValue::Integer(1));
        assert_eq!(json_to_sql(&json!(42)), SqlValue::Integer(42));
        assert_eq!(json_to_sql(&json!(1.5)), SqlValue::Real(1.5));
        assert_eq!(json_to_sql(&json!("x")), SqlValue::Text("x".into()));
        assert_eq!(json_to_sql(&json!([1, 2])), SqlValue::Text("[1,2]".into()));
    }

    #[test]
    fn test_sql_to_json() {
        assert_eq!(sql_to_json(ValueRef::Integer(3)), json!(3));
        assert_eq!(sql_to_json(ValueRef::Text(b"hi")), json!("hi"));
        assert_eq!(sql_to_json(ValueRef::Blob(&[0xde, 0xad])), json!("dead"));
        assert_eq!(sql_to_json(ValueRef::Real(f64::NAN)), Value::Null);
    }

    #[tokio::test]
    async fn test_insert_reserved_column_end_to_end() {
        let driver = driver_with_users().await;
        let table = Identifier::parse("users", IdentifierKind::Table).unwrap();
        let data = RowData::try_from(json!({"order": 5})).unwrap();

        let result = driver
            .execute(sql_builder::insert_row(&table, &data))
            .await
            .unwrap();
        assert_eq!(result.changes, 1);
        assert_eq!(result.last_insert_rowid, Some(1));

        let rows = driver
            .execute(BoundStatement::new(r#"SELECT "order" FROM users"#))
            .await
            .unwrap();
        assert_eq!(rows.row_count, 1);
        assert_eq!(rows.rows[0]["order"], json!(5));
    }

    #[tokio::test]
    async fn test_bound_parameters_and_blobs() {
        let driver = driver_with_users().await;
        driver
            .execute(BoundStatement::with_params(
                "INSERT INTO users (name, avatar) VALUES (?, X'CAFE')",
                vec![json!("Robert'); DROP TABLE users;--")],
            ))
            .await
            .unwrap();

        let result = driver
            .execute(BoundStatement::new("SELECT name, avatar FROM users"))
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["name", "avatar"]);
        assert_eq!(result.rows[0]["name"], json!("Robert'); DROP TABLE users;--"));
        assert_eq!(result.rows[0]["avatar"], json!("cafe"));
    }

    #[tokio::test]
    async fn test_catalog_lookups() {
        let driver = driver_with_users().await;

        let tables = driver.list_tables().await.unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "users");
        assert_eq!(tables[0].table_type, "table");

        let table = Identifier::parse("users", IdentifierKind::Table).unwrap();
        let columns = driver.table_schema(&table).await.unwrap();
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0].name, "id");
        assert!(columns[0].is_primary_key());

        let missing = Identifier::parse("nothing", IdentifierKind::Table).unwrap();
        assert!(driver.table_schema(&missing).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engine_errors_propagate() {
        let driver = driver_with_users().await;
        let err = driver
            .execute(BoundStatement::new("SELECT * FROM missing_table"))
            .await
            .unwrap_err();
        match err {
            DatabaseError::QueryFailed(message) => assert!(message.contains("missing_table")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
