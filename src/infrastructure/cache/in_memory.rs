//! In-process cache backend using moka
//!
//! Always present as the fallback store behind `CacheStore`. Entries carry
//! their own expiry timestamp; expired entries are dropped on read and by the
//! periodic sweep.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;

use crate::domain::cache::CacheBackend;
use crate::domain::DomainError;

/// Configuration for the in-process backend
#[derive(Debug, Clone)]
pub struct InMemoryBackendConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Upper bound moka applies on top of per-entry TTLs
    pub default_ttl: Duration,
}

impl Default for InMemoryBackendConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            default_ttl: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredEntry {
    data: String,
    expires_at: u64,
}

/// Thread-safe in-process cache backend
#[derive(Debug)]
pub struct InMemoryBackend {
    cache: MokaCache<String, StoredEntry>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_config(InMemoryBackendConfig::default())
    }

    pub fn with_config(config: InMemoryBackendConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.default_ttl)
            .build();

        Self { cache }
    }

    fn current_time_millis() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn is_expired(entry: &StoredEntry) -> bool {
        Self::current_time_millis() > entry.expires_at
    }

    /// Whether a live (unexpired) entry exists for the key
    pub async fn contains(&self, key: &str) -> bool {
        match self.cache.get(key).await {
            Some(entry) => !Self::is_expired(&entry),
            None => false,
        }
    }

    /// Removes every expired entry, returning the count evicted. Run by the
    /// CacheStore sweep to bound fallback memory between reads.
    pub async fn evict_expired(&self) -> usize {
        self.cache.run_pending_tasks().await;

        let now = Self::current_time_millis();
        let expired: Vec<String> = self
            .cache
            .iter()
            .filter(|(_, entry)| entry.expires_at < now)
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        let count = expired.len();

        for key in expired {
            self.cache.remove(&key).await;
        }

        count
    }

    /// Approximate number of live entries
    pub async fn size(&self) -> usize {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count() as usize
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        match self.cache.get(key).await {
            Some(entry) => {
                if Self::is_expired(&entry) {
                    self.cache.remove(key).await;
                    return Ok(None);
                }

                Ok(Some(entry.data))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let entry = StoredEntry {
            data: value.to_string(),
            expires_at: Self::current_time_millis() + ttl.as_millis() as u64,
        };

        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let existed = self.cache.get(key).await.is_some();
        self.cache.remove(key).await;
        Ok(existed)
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError> {
        let regex = regex::Regex::new(&glob_to_regex(pattern))
            .map_err(|e| DomainError::cache(format!("Invalid pattern: {}", e)))?;

        self.cache.run_pending_tasks().await;

        let matching: Vec<String> = self
            .cache
            .iter()
            .filter(|(key, _)| regex.is_match(key))
            .map(|(key, _)| key.as_ref().clone())
            .collect();

        let count = matching.len();

        for key in matching {
            self.cache.remove(&key).await;
        }

        Ok(count)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

fn glob_to_regex(pattern: &str) -> String {
    format!("^{}$", regex::escape(pattern).replace(r"\*", ".*"))
}
