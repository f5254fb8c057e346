//! Managed API keys.
//!
//! Keys live in a [`KeyStore`] under three kinds of entries:
//! `key:{key}` holds the JSON [`ApiKeyData`], `name:{name}` maps a name back
//! to its key, and `keys:list` holds a JSON array of every name.

use crate::cache::ApiKeyCache;
use crate::error::{AuthError, AuthResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const KEYS_LIST: &str = "keys:list";
const MAX_KEY_NAME_LENGTH: usize = 128;

/// String key/value storage for API key records.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn get(&self, key: &str) -> AuthResult<Option<String>>;
    async fn put(&self, key: &str, value: String) -> AuthResult<()>;
    async fn delete(&self, key: &str) -> AuthResult<()>;
}

/// Process-local key store.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: DashMap<String, String>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: String) -> AuthResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AuthResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A stored API key. The key value is only returned once, at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyData {
    pub key: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Listing entry without the key value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeySummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKeyData> for ApiKeySummary {
    fn from(data: ApiKeyData) -> Self {
        Self {
            name: data.name,
            description: data.description,
            created_at: data.created_at,
        }
    }
}

/// 32 random bytes, hex encoded.
pub fn generate_api_key() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}

/// Creates, lists, deletes and validates managed keys.
pub struct ApiKeyManager {
    store: Arc<dyn KeyStore>,
    cache: ApiKeyCache,
    // Serializes updates to the name list.
    write_lock: Mutex<()>,
}

impl ApiKeyManager {
    pub fn new(store: Arc<dyn KeyStore>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache: ApiKeyCache::new(cache_ttl),
            write_lock: Mutex::new(()),
        }
    }

    pub async fn create(&self, name: &str, description: Option<String>) -> AuthResult<ApiKeyData> {
        validate_key_name(name)?;
        let _guard = self.write_lock.lock().await;

        if self.store.get(&name_entry(name)).await?.is_some() {
            warn!("Duplicate API key name: {}", name);
            return Err(AuthError::DuplicateName);
        }

        let data = ApiKeyData {
            key: generate_api_key(),
            name: name.to_string(),
            description,
            created_at: Utc::now(),
        };

        self.store
            .put(&key_entry(&data.key), encode(&data)?)
            .await?;
        self.store.put(&name_entry(name), data.key.clone()).await?;

        let mut names = self.names().await?;
        names.push(name.to_string());
        self.store.put(KEYS_LIST, encode(&names)?).await?;

        self.cache.remove(data.key.as_str());
        info!("Created API key: {}", name);
        Ok(data)
    }

    /// All keys in creation order, without key values.
    pub async fn list(&self) -> AuthResult<Vec<ApiKeySummary>> {
        let mut summaries = Vec::new();
        for name in self.names().await? {
            let Some(key) = self.store.get(&name_entry(&name)).await? else {
                continue;
            };
            if let Some(raw) = self.store.get(&key_entry(&key)).await? {
                let data: ApiKeyData = decode(&raw)?;
                summaries.push(data.into());
            }
        }
        Ok(summaries)
    }

    pub async fn delete(&self, name: &str) -> AuthResult<()> {
        let _guard = self.write_lock.lock().await;

        let key = self
            .store
            .get(&name_entry(name))
            .await?
            .ok_or(AuthError::KeyNotFound)?;

        self.store.delete(&key_entry(&key)).await?;
        self.store.delete(&name_entry(name)).await?;

        let names: Vec<String> = self
            .names()
            .await?
            .into_iter()
            .filter(|n| n != name)
            .collect();
        self.store.put(KEYS_LIST, encode(&names)?).await?;

        self.cache.remove(key.as_str());
        info!("Deleted API key: {}", name);
        Ok(())
    }

    pub async fn has_any(&self) -> AuthResult<bool> {
        Ok(!self.names().await?.is_empty())
    }

    /// Check a key, consulting the validity cache first. Both outcomes are
    /// cached.
    pub async fn validate(&self, key: &str) -> AuthResult<bool> {
        if key.is_empty() {
            return Ok(false);
        }
        if let Some(valid) = self.cache.get(key) {
            debug!("API key cache hit");
            return Ok(valid);
        }

        let valid = self.store.get(&key_entry(key)).await?.is_some();
        self.cache.insert(key.to_string(), valid);
        Ok(valid)
    }

    async fn names(&self) -> AuthResult<Vec<String>> {
        match self.store.get(KEYS_LIST).await? {
            Some(raw) => decode(&raw),
            None => Ok(Vec::new()),
        }
    }
}

fn validate_key_name(name: &str) -> AuthResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidName("must be a non-empty string".into()));
    }
    if name.chars().count() > MAX_KEY_NAME_LENGTH {
        return Err(AuthError::InvalidName(
            format!("exceeds maximum length of {} characters", MAX_KEY_NAME_LENGTH).into(),
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(AuthError::InvalidName(
            "must not contain control characters".into(),
        ));
    }
    Ok(())
}

fn key_entry(key: &str) -> String {
    format!("key:{}", key)
}

fn name_entry(name: &str) -> String {
    format!("name:{}", name)
}

fn encode<T: Serialize>(value: &T) -> AuthResult<String> {
    serde_json::to_string(value).map_err(|e| AuthError::Store(e.to_string()))
}

fn decode<T: for<'de> Deserialize<'de>>(raw: &str) -> AuthResult<T> {
    serde_json::from_str(raw).map_err(|e| AuthError::Store(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ApiKeyManager {
        ApiKeyManager::new(Arc::new(MemoryKeyStore::new()), Duration::from_secs(60))
    }

    #[test]
    fn test_generate_api_key() {
        let key = generate_api_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_api_key());
    }

    #[tokio::test]
    async fn test_create_and_validate() {
        let manager = manager();
        assert!(!manager.has_any().await.unwrap());

        let data = manager
            .create("ci", Some("pipeline".into()))
            .await
            .unwrap();
        assert_eq!(data.name, "ci");
        assert!(manager.has_any().await.unwrap());
        assert!(manager.validate(&data.key).await.unwrap());
        assert!(!manager.validate("not-a-key").await.unwrap());
        assert!(!manager.validate("").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let manager = manager();
        manager.create("ci", None).await.unwrap();
        let err = manager.create("ci", None).await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateName));
        assert_eq!(err.to_string(), "An API key with this name already exists");
    }

    #[tokio::test]
    async fn test_list_hides_key_values() {
        let manager = manager();
        let first = manager.create("first", None).await.unwrap();
        manager.create("second", None).await.unwrap();

        let keys = manager.list().await.unwrap();
        let names: Vec<_> = keys.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);

        let json = serde_json::to_string(&keys).unwrap();
        assert!(!json.contains(&first.key));
        assert!(json.contains("createdAt"));
    }

    #[tokio::test]
    async fn test_delete_evicts_cached_validity() {
        let manager = manager();
        let data = manager.create("temp", None).await.unwrap();
        assert!(manager.validate(&data.key).await.unwrap());

        manager.delete("temp").await.unwrap();
        assert!(!manager.validate(&data.key).await.unwrap());
        assert!(!manager.has_any().await.unwrap());

        let err = manager.delete("temp").await.unwrap_err();
        assert!(matches!(err, AuthError::KeyNotFound));
    }

    #[tokio::test]
    async fn test_invalid_names() {
        let manager = manager();
        assert!(matches!(
            manager.create("   ", None).await,
            Err(AuthError::InvalidName(_))
        ));
        assert!(matches!(
            manager.create(&"a".repeat(129), None).await,
            Err(AuthError::InvalidName(_))
        ));
        assert!(matches!(
            manager.create("bad\nname", None).await,
            Err(AuthError::InvalidName(_))
        ));
    }
}
