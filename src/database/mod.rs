//! Database access layer.
//!
//! Drivers execute [`BoundStatement`]s produced either by the SQL builder
//! (for the CRUD and schema routes) or by the raw query route after the
//! statement policy has accepted them.

pub mod result;
pub mod sql_builder;
pub mod sqlite;
pub mod traits;

pub use result::*;
pub use sql_builder::{BoundStatement, ColumnDefinition, ColumnType};
pub use sqlite::SqliteDriver;
pub use traits::DatabaseDriver;

use crate::config::DatabaseConfig;
use crate::error::DbResult;
use std::sync::Arc;

/// Create a database driver based on configuration.
pub fn create_driver(config: &DatabaseConfig) -> DbResult<Arc<dyn DatabaseDriver>> {
    let driver = SqliteDriver::open(config)?;
    Ok(Arc::new(driver))
}
