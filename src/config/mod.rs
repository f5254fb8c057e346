//! Configuration types and builders.

use crate::error::{ConfigError, GatewayError, Result};
use crate::security::StatementPolicy;
use crate::security::pagination::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::time::Duration;

/// SQLite database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// File path, or `:memory:` for a private in-memory database.
    pub path: String,
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "tablegate.db".into(),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Builder for DatabaseConfig with fluent API.
#[derive(Default)]
pub struct DatabaseConfigBuilder {
    config: DatabaseConfig,
}

impl DatabaseConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.config.busy_timeout = timeout;
        self
    }

    /// Build from environment variables.
    pub fn from_env(mut self) -> Result<Self> {
        if let Ok(path) = env::var("TABLEGATE_DATABASE_PATH") {
            self.config.path = path;
        }

        if let Ok(timeout) = env::var("TABLEGATE_BUSY_TIMEOUT_MS") {
            let millis: u64 = timeout.parse().map_err(|_| {
                GatewayError::Config(ConfigError::InvalidValue {
                    field: "TABLEGATE_BUSY_TIMEOUT_MS".into(),
                    message: "Invalid timeout in milliseconds".into(),
                })
            })?;
            self.config.busy_timeout = Duration::from_millis(millis);
        }

        Ok(self)
    }

    pub fn build(self) -> Result<DatabaseConfig> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<()> {
        if self.config.path.trim().is_empty() {
            return Err(ConfigError::MissingField("path".into()).into());
        }
        Ok(())
    }
}

/// Security configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub statement_policy: StatementPolicy,
    /// Static key accepted when no key store is configured.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_key_cache_ttl: Duration,
    pub default_page_limit: u32,
    pub max_page_limit: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            statement_policy: StatementPolicy::default(),
            api_key: None,
            api_key_cache_ttl: Duration::from_secs(300),
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: MAX_PAGE_LIMIT,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "tablegate".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            database: DatabaseConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.config.database = database;
        self
    }

    pub fn security(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    pub fn statement_policy(mut self, policy: StatementPolicy) -> Self {
        self.config.security.statement_policy = policy;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.security.api_key = Some(key.into());
        self
    }

    /// Read database and security settings from the environment.
    pub fn from_env(mut self) -> Result<Self> {
        self.config.database = DatabaseConfigBuilder::new().from_env()?.build()?;

        if let Ok(key) = env::var("TABLEGATE_API_KEY")
            && !key.is_empty()
        {
            self.config.security.api_key = Some(key);
        }

        if let Ok(policy) = env::var("TABLEGATE_STATEMENT_POLICY") {
            self.config.security.statement_policy =
                StatementPolicy::parse(&policy).ok_or_else(|| ConfigError::InvalidValue {
                    field: "TABLEGATE_STATEMENT_POLICY".into(),
                    message: format!(
                        "Unknown statement policy: '{}'. Valid policies: index, data-only",
                        policy
                    )
                    .into(),
                })?;
        }

        if let Ok(ttl) = env::var("TABLEGATE_KEY_CACHE_TTL_SECS") {
            let secs: u64 = ttl.parse().map_err(|_| ConfigError::InvalidValue {
                field: "TABLEGATE_KEY_CACHE_TTL_SECS".into(),
                message: "Invalid number of seconds".into(),
            })?;
            self.config.security.api_key_cache_ttl = Duration::from_secs(secs);
        }

        Ok(self)
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}
