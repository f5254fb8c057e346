//! Server state management.

use crate::auth::{ApiKeyManager, Authenticator, KeyStore};
use crate::cache::SchemaCache;
use crate::config::ServerConfig;
use crate::database::{ColumnInfo, DatabaseDriver, primary_key};
use crate::error::{AuthError, AuthResult, ConfigError, DatabaseError, GatewayError, Result};
use crate::security::{
    CreateTableValidator, Identifier, IdentifierKind, Pagination, SqlValidator,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

pub struct ServerState {
    pub config: ServerConfig,
    pub driver: Arc<dyn DatabaseDriver>,
    pub validator: SqlValidator,
    pub create_table_validator: CreateTableValidator,
    pub schema_cache: SchemaCache,
    pub authenticator: Authenticator,
    request_count: AtomicU64,
}

impl ServerState {
    pub fn next_request_id(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn key_manager(&self) -> AuthResult<&Arc<ApiKeyManager>> {
        self.authenticator
            .key_manager()
            .ok_or(AuthError::StoreNotConfigured)
    }

    /// Column metadata, read through the schema cache. Empty results are
    /// not cached so a table created later is seen immediately.
    pub async fn table_schema(&self, table: &Identifier) -> Result<Vec<ColumnInfo>> {
        if let Some(columns) = self.schema_cache.get(table.as_str()) {
            return Ok(columns);
        }

        let columns = self.driver.table_schema(table).await?;
        if !columns.is_empty() {
            self.schema_cache.set(table.as_str(), columns.clone());
        }
        Ok(columns)
    }

    /// The table's primary key column.
    pub async fn primary_key(&self, table: &Identifier) -> Result<Identifier> {
        let columns = self.table_schema(table).await?;
        let column = primary_key(&columns)
            .ok_or_else(|| DatabaseError::NoPrimaryKey(table.to_string()))?;
        Ok(Identifier::parse(column.name.as_str(), IdentifierKind::Column)?)
    }

    /// Clamp page parameters with the configured limits.
    pub fn pagination(&self, page: Option<i64>, limit: Option<i64>) -> Pagination {
        Pagination::with_bounds(
            page,
            limit,
            self.config.security.default_page_limit,
            self.config.security.max_page_limit,
        )
    }
}

pub struct ServerStateBuilder {
    config: Option<ServerConfig>,
    driver: Option<Arc<dyn DatabaseDriver>>,
    key_store: Option<Arc<dyn KeyStore>>,
}

impl ServerStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            driver: None,
            key_store: None,
        }
    }

    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn driver(mut self, driver: Arc<dyn DatabaseDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Use managed API keys. Without a store, requests are checked against
    /// the configured static key.
    pub fn key_store(mut self, key_store: Arc<dyn KeyStore>) -> Self {
        self.key_store = Some(key_store);
        self
    }

    pub fn build(self) -> Result<ServerState> {
        let config = self.config.unwrap_or_default();
        let driver = self
            .driver
            .ok_or_else(|| GatewayError::Config(ConfigError::MissingField("driver".into())))?;

        let validator = SqlValidator::new().policy(config.security.statement_policy);
        info!("Statement policy: {:?}", validator.current_policy());
        let schema_cache = SchemaCache::default();
        let authenticator = match self.key_store {
            Some(store) => Authenticator::managed(Arc::new(ApiKeyManager::new(
                store,
                config.security.api_key_cache_ttl,
            ))),
            None => Authenticator::static_key(config.security.api_key.clone()),
        };

        Ok(ServerState {
            config,
            driver,
            validator,
            create_table_validator: CreateTableValidator::new(),
            schema_cache,
            authenticator,
            request_count: AtomicU64::new(0),
        })
    }
}

impl Default for ServerStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
