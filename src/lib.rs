//! Admin data-plane gateway for SQLite.
//!
//! Every identifier that reaches SQL text is validated and quoted, raw
//! statements pass a verb and keyword policy, `CREATE TABLE` has its own
//! filter, and row payloads are checked before any SQL is built. Requests
//! arrive as JSON lines and are answered the same way.
//!
//! # Example
//!
//! ```no_run
//! use tablegate::{
//!     auth::MemoryKeyStore,
//!     config::ServerConfig,
//!     database::create_driver,
//!     protocol::GatewayServerBuilder,
//!     server::{GatewayHandler, ServerStateBuilder},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::builder().from_env()?.build();
//!     let driver = create_driver(&config.database)?;
//!
//!     let state = Arc::new(
//!         ServerStateBuilder::new()
//!             .config(config)
//!             .driver(driver)
//!             .key_store(Arc::new(MemoryKeyStore::new()))
//!             .build()?,
//!     );
//!
//!     let server = GatewayServerBuilder::new()
//!         .handler(GatewayHandler::new(state))
//!         .build()?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod protocol;
pub mod security;
pub mod server;

pub use config::{DatabaseConfig, DatabaseConfigBuilder, SecurityConfig, ServerConfig};
pub use database::{DatabaseDriver, SqliteDriver, create_driver};
pub use error::{GatewayError, Result};
pub use protocol::{GatewayServer, GatewayServerBuilder};
pub use security::{
    CreateTableValidator, Identifier, SqlValidator, StatementPolicy, quote_identifier,
    validate_identifier, validate_row_data, validate_sql_statement,
};
pub use server::{GatewayHandler, ServerState, ServerStateBuilder};
