//! TTL caches for API key validity and table schemas.

use crate::database::ColumnInfo;
use dashmap::DashMap;
use std::borrow::Borrow;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default TTL for cache entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache entry with TTL.
#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Concurrent map whose entries expire after a fixed TTL.
///
/// Lookups check staleness before trusting an entry and evict it when
/// expired.
pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(self.ttl) {
                return Some(entry.value.clone());
            }
            // Release the read guard before removing.
            drop(entry);
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, CacheEntry::new(value));
    }

    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove expired entries.
    pub fn cleanup(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| !entry.is_expired(ttl));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// API key → validity. Both positive and negative results are cached.
pub type ApiKeyCache = TtlCache<String, bool>;

/// Column metadata by table name, used for primary key lookups.
pub struct SchemaCache {
    schemas: TtlCache<String, Vec<ColumnInfo>>,
}

impl SchemaCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            schemas: TtlCache::new(ttl),
        }
    }

    pub fn get(&self, table: &str) -> Option<Vec<ColumnInfo>> {
        let hit = self.schemas.get(table);
        if hit.is_some() {
            debug!("Cache hit for schema: {}", table);
        }
        hit
    }

    pub fn set(&self, table: &str, columns: Vec<ColumnInfo>) {
        debug!("Caching schema for table: {}", table);
        self.schemas.insert(table.to_string(), columns);
    }

    pub fn invalidate(&self, table: &str) {
        debug!("Invalidating cache for table: {}", table);
        self.schemas.remove(table);
    }

    pub fn clear(&self) {
        debug!("Clearing schema cache");
        self.schemas.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            schemas_cached: self.schemas.len(),
        }
    }
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub schemas_cached: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn column(name: &str, pk: i64) -> ColumnInfo {
        ColumnInfo {
            cid: 0,
            name: name.into(),
            column_type: "INTEGER".into(),
            notnull: 0,
            dflt_value: Value::Null,
            pk,
        }
    }

    #[test]
    fn test_cache_basic() {
        let cache: ApiKeyCache = TtlCache::new(Duration::from_secs(60));
        cache.insert("abc".into(), true);
        cache.insert("zzz".into(), false);

        assert_eq!(cache.get("abc"), Some(true));
        assert_eq!(cache.get("zzz"), Some(false));
        assert_eq!(cache.get("nope"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_expiry() {
        let cache: ApiKeyCache = TtlCache::new(Duration::from_millis(1));
        cache.insert("abc".into(), true);

        std::thread::sleep(Duration::from_millis(10));

        assert_eq!(cache.get("abc"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup() {
        let cache: TtlCache<u32, u32> = TtlCache::new(Duration::from_millis(1));
        cache.insert(1, 1);
        cache.insert(2, 2);
        std::thread::sleep(Duration::from_millis(10));
        cache.cleanup();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_schema_cache_invalidation() {
        let cache = SchemaCache::new(Duration::from_secs(60));
        cache.set("users", vec![column("id", 1)]);
        assert_eq!(cache.get("users").map(|c| c.len()), Some(1));
        assert_eq!(cache.stats().schemas_cached, 1);

        cache.invalidate("users");
        assert!(cache.get("users").is_none());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = std::sync::Arc::new(TtlCache::<String, bool>::new(Duration::from_secs(60)));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = std::sync::Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        cache.insert(format!("k{}", j % 10), (i + j) % 2 == 0);
                        let _ = cache.get(format!("k{}", j % 10).as_str());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 10);
    }
}
