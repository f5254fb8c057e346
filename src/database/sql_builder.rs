//! SQL text generation for the CRUD and schema routes.
//!
//! This is the only place the gateway writes SQL. Names arrive as
//! [`Identifier`]s and [`RowData`], so nothing unvalidated can be spliced
//! in, and every identifier is quoted. Values always travel as parameters.

use crate::error::{ValidationError, ValidationResult};
use crate::security::{Identifier, IdentifierKind, Pagination, RowData};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// SQL text plus positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundStatement {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl BoundStatement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

const LIST_TABLES_SQL: &str = "SELECT name, type FROM sqlite_master \
    WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_cf_%' \
    ORDER BY name";

pub fn list_tables() -> BoundStatement {
    BoundStatement::new(LIST_TABLES_SQL)
}

pub fn table_info(table: &Identifier) -> BoundStatement {
    BoundStatement::new(format!("PRAGMA table_info({})", table.quoted()))
}

pub fn count_rows(table: &Identifier) -> BoundStatement {
    BoundStatement::new(format!("SELECT COUNT(*) AS count FROM {}", table.quoted()))
}

pub fn select_page(table: &Identifier, page: &Pagination) -> BoundStatement {
    BoundStatement::with_params(
        format!("SELECT * FROM {} LIMIT ? OFFSET ?", table.quoted()),
        vec![Value::from(page.limit), Value::from(page.offset())],
    )
}

pub fn select_row(table: &Identifier, key: &Identifier, id: Value) -> BoundStatement {
    BoundStatement::with_params(
        format!("SELECT * FROM {} WHERE {} = ?", table.quoted(), key.quoted()),
        vec![id],
    )
}

pub fn insert_row(table: &Identifier, data: &RowData) -> BoundStatement {
    let columns = data
        .columns()
        .map(Identifier::quoted)
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; data.len()].join(", ");

    BoundStatement::with_params(
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.quoted(),
            columns,
            placeholders
        ),
        data.values().cloned().collect(),
    )
}

pub fn update_row(
    table: &Identifier,
    data: &RowData,
    key: &Identifier,
    id: Value,
) -> BoundStatement {
    let assignments = data
        .columns()
        .map(|column| format!("{} = ?", column.quoted()))
        .collect::<Vec<_>>()
        .join(", ");

    let mut params: Vec<Value> = data.values().cloned().collect();
    params.push(id);

    BoundStatement::with_params(
        format!(
            "UPDATE {} SET {} WHERE {} = ?",
            table.quoted(),
            assignments,
            key.quoted()
        ),
        params,
    )
}

pub fn delete_row(table: &Identifier, key: &Identifier, id: Value) -> BoundStatement {
    BoundStatement::with_params(
        format!("DELETE FROM {} WHERE {} = ?", table.quoted(), key.quoted()),
        vec![id],
    )
}

pub fn drop_table(table: &Identifier) -> BoundStatement {
    BoundStatement::new(format!("DROP TABLE {}", table.quoted()))
}

pub fn add_column(table: &Identifier, column: &ColumnDefinition) -> BoundStatement {
    BoundStatement::new(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        table.quoted(),
        column
    ))
}

pub fn drop_column(table: &Identifier, column: &Identifier) -> BoundStatement {
    BoundStatement::new(format!(
        "ALTER TABLE {} DROP COLUMN {}",
        table.quoted(),
        column.quoted()
    ))
}

pub fn rename_column(table: &Identifier, from: &Identifier, to: &Identifier) -> BoundStatement {
    BoundStatement::new(format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        table.quoted(),
        from.quoted(),
        to.quoted()
    ))
}

pub fn rename_table(from: &Identifier, to: &Identifier) -> BoundStatement {
    BoundStatement::new(format!(
        "ALTER TABLE {} RENAME TO {}",
        from.quoted(),
        to.quoted()
    ))
}

/// SQLite storage classes accepted for new columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Blob,
    Numeric,
}

impl ColumnType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "TEXT" | "VARCHAR" | "STRING" => Some(Self::Text),
            "INTEGER" | "INT" => Some(Self::Integer),
            "REAL" | "FLOAT" | "DOUBLE" => Some(Self::Real),
            "BLOB" => Some(Self::Blob),
            "NUMERIC" | "BOOLEAN" | "DATE" | "DATETIME" => Some(Self::Numeric),
            _ => None,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
        }
    }
}

/// A column to append with `ALTER TABLE ... ADD COLUMN`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: Identifier,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub unique: bool,
    pub default: Option<Value>,
}

impl ColumnDefinition {
    pub fn new(name: Identifier, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            not_null: false,
            unique: false,
            default: None,
        }
    }

    pub fn not_null(mut self, not_null: bool) -> Self {
        self.not_null = not_null;
        self
    }

    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn default_value(mut self, default: Option<Value>) -> Self {
        self.default = default;
        self
    }

    /// Build from raw request fields.
    pub fn parse(name: &str, column_type: &str) -> ValidationResult<Self> {
        let name = Identifier::parse(name, IdentifierKind::Column)?;
        let column_type =
            ColumnType::parse(column_type).ok_or_else(|| ValidationError::InvalidColumnType {
                received: column_type.trim().to_string(),
                allowed: "TEXT, INTEGER, REAL, BLOB, NUMERIC",
            })?;
        Ok(Self::new(name, column_type))
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name.quoted(), self.column_type.as_sql())?;
        if self.not_null {
            f.write_str(" NOT NULL")?;
        }
        if self.unique {
            f.write_str(" UNIQUE")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {}", sql_literal(default))?;
        }
        Ok(())
    }
}

/// Render a JSON value as a SQL literal. DDL cannot take bound parameters,
/// so strings are single-quoted with embedded quotes doubled.
fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".into(),
        Value::Bool(b) => if *b { "1" } else { "0" }.into(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}
