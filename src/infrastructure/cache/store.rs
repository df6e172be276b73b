//! Tiered cache store
//!
//! A remote distributed backend (Redis) is the preferred store; an in-process
//! moka map is always maintained as the fallback and written on every set
//! regardless of remote availability. Remote failures flip an availability
//! flag, log at warn, and degrade reads to the fallback. A cache failure is
//! never surfaced to the caller of `get`/`set`/`delete`/`flush`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::cache::CacheBackend;
use crate::domain::DomainError;

use super::in_memory::{InMemoryBackend, InMemoryBackendConfig};

/// Configuration for the tiered store
#[derive(Debug, Clone)]
pub struct CacheStoreConfig {
    /// Namespace prefix applied to every key
    pub namespace: String,
    /// Interval between fallback sweeps
    pub sweep_interval: Duration,
    /// Settings for the in-process fallback
    pub fallback: InMemoryBackendConfig,
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self {
            namespace: "fleetgate".to_string(),
            sweep_interval: Duration::from_secs(60),
            fallback: InMemoryBackendConfig::default(),
        }
    }
}

/// Tiered TTL key-value cache with memoization and tag-based invalidation
#[derive(Debug)]
pub struct CacheStore {
    remote: Option<Arc<dyn CacheBackend>>,
    fallback: InMemoryBackend,
    remote_available: AtomicBool,
    namespace: String,
    sweep_interval: Duration,
    // tag -> namespaced keys; stale entries are pruned by the sweep
    tags: RwLock<HashMap<String, HashSet<String>>>,
}

impl CacheStore {
    /// Create a store with only the in-process backend
    pub fn new(config: CacheStoreConfig) -> Self {
        Self {
            remote: None,
            fallback: InMemoryBackend::with_config(config.fallback),
            remote_available: AtomicBool::new(false),
            namespace: config.namespace,
            sweep_interval: config.sweep_interval,
            tags: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a remote backend as the preferred store
    pub fn with_remote(mut self, remote: Arc<dyn CacheBackend>) -> Self {
        self.remote = Some(remote);
        self.remote_available = AtomicBool::new(true);
        self
    }

    /// Whether the remote backend is currently marked reachable
    pub fn remote_available(&self) -> bool {
        self.remote.is_some() && self.remote_available.load(Ordering::Relaxed)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn mark_remote_unavailable(&self, err: &DomainError) {
        if self.remote_available.swap(false, Ordering::Relaxed) {
            warn!("Cache remote backend unavailable, degrading to in-process fallback: {}", err);
        }
    }

    /// Gets a typed value, or `None` on miss, expiry, or any cache failure
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let namespaced = self.namespaced(key);
        let raw = self.get_raw(&namespaced).await?;

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding undecodable cache entry '{}': {}", namespaced, e);
                self.delete_raw(&namespaced).await;
                None
            }
        }
    }

    /// Stores a typed value under the given TTL. Failures are logged, never
    /// surfaced.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to serialize cache value for '{}': {}", key, e);
                return;
            }
        };

        self.set_raw(&self.namespaced(key), &data, ttl).await;
    }

    /// Deletes a key from both tiers
    pub async fn delete(&self, key: &str) {
        self.delete_raw(&self.namespaced(key)).await;
    }

    /// Clears every entry, or every entry under the given prefix
    pub async fn flush(&self, prefix: Option<&str>) {
        let pattern = match prefix {
            Some(prefix) => format!("{}:{}*", self.namespace, prefix),
            None => format!("{}:*", self.namespace),
        };

        if let Err(e) = self.fallback.delete_pattern(&pattern).await {
            warn!("Cache fallback flush failed: {}", e);
        }

        if let Some(remote) = &self.remote {
            if self.remote_available.load(Ordering::Relaxed) {
                if let Err(e) = remote.delete_pattern(&pattern).await {
                    self.mark_remote_unavailable(&e);
                }
            }
        }

        let mut tags = self.tags.write().expect("tag index lock poisoned");
        match prefix {
            None => tags.clear(),
            Some(prefix) => {
                let key_prefix = format!("{}:{}", self.namespace, prefix);
                for keys in tags.values_mut() {
                    keys.retain(|k| !k.starts_with(&key_prefix));
                }
                tags.retain(|_, keys| !keys.is_empty());
            }
        }
    }

    /// Returns the cached value if present, otherwise invokes `compute`,
    /// stores the result, and returns it.
    ///
    /// Not exactly-once under concurrency: two callers missing the same key
    /// simultaneously may both invoke `compute`. That is an accepted
    /// relaxation; the second write simply overwrites the first.
    pub async fn remember<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, DomainError>> + Send,
    {
        if let Some(cached) = self.get::<T>(key).await {
            debug!("Cache hit for '{}'", key);
            return Ok(cached);
        }

        let value = compute().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    /// Same as [`remember`](Self::remember), additionally associating the key
    /// with each tag for group invalidation
    pub async fn remember_with_tags<T, F, Fut>(
        &self,
        key: &str,
        tags: &[&str],
        ttl: Duration,
        compute: F,
    ) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, DomainError>> + Send,
    {
        let value = self.remember(key, ttl, compute).await?;
        self.tag(key, tags);
        Ok(value)
    }

    /// Associates an already-stored key with the given tags
    pub fn tag(&self, key: &str, tags: &[&str]) {
        let namespaced = self.namespaced(key);
        let mut index = self.tags.write().expect("tag index lock poisoned");

        for tag in tags {
            index
                .entry((*tag).to_string())
                .or_default()
                .insert(namespaced.clone());
        }
    }

    /// Removes every key associated with any of the given tags
    pub async fn invalidate_tags(&self, tags: &[&str]) {
        let keys: Vec<String> = {
            let mut index = self.tags.write().expect("tag index lock poisoned");
            tags.iter()
                .filter_map(|tag| index.remove(*tag))
                .flatten()
                .collect()
        };

        for key in keys {
            self.delete_raw(&key).await;
        }
    }

    /// One maintenance pass: evict expired fallback entries, prune dead tag
    /// associations, re-probe an unavailable remote
    pub async fn sweep(&self) {
        let evicted = self.fallback.evict_expired().await;
        if evicted > 0 {
            debug!("Cache sweep evicted {} expired fallback entries", evicted);
        }

        self.prune_tags().await;

        if let Some(remote) = &self.remote {
            if !self.remote_available.load(Ordering::Relaxed) {
                if remote.ping().await.is_ok() {
                    self.remote_available.store(true, Ordering::Relaxed);
                    info!("Cache remote backend reachable again");
                }
            }
        }
    }

    /// Spawns the recurring sweep task
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        let interval = self.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                store.sweep().await;
            }
        })
    }

    async fn prune_tags(&self) {
        let tagged: Vec<String> = {
            let index = self.tags.read().expect("tag index lock poisoned");
            index.values().flatten().cloned().collect()
        };

        let mut dead = HashSet::new();
        for key in tagged {
            if !self.fallback.contains(&key).await {
                dead.insert(key);
            }
        }

        if dead.is_empty() {
            return;
        }

        let mut index = self.tags.write().expect("tag index lock poisoned");
        for keys in index.values_mut() {
            keys.retain(|k| !dead.contains(k));
        }
        index.retain(|_, keys| !keys.is_empty());
    }

    async fn get_raw(&self, namespaced: &str) -> Option<String> {
        if let Some(remote) = &self.remote {
            if self.remote_available.load(Ordering::Relaxed) {
                match remote.get(namespaced).await {
                    Ok(Some(value)) => return Some(value),
                    Ok(None) => {}
                    Err(e) => self.mark_remote_unavailable(&e),
                }
            }
        }

        match self.fallback.get(namespaced).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache fallback read failed for '{}': {}", namespaced, e);
                None
            }
        }
    }

    async fn set_raw(&self, namespaced: &str, data: &str, ttl: Duration) {
        // The fallback is written first and unconditionally, so a remote
        // outage mid-write can never lose the entry for this process.
        if let Err(e) = self.fallback.set(namespaced, data, ttl).await {
            warn!("Cache fallback write failed for '{}': {}", namespaced, e);
        }

        if let Some(remote) = &self.remote {
            if self.remote_available.load(Ordering::Relaxed) {
                if let Err(e) = remote.set(namespaced, data, ttl).await {
                    self.mark_remote_unavailable(&e);
                }
            }
        }
    }

    async fn delete_raw(&self, namespaced: &str) {
        if let Err(e) = self.fallback.delete(namespaced).await {
            warn!("Cache fallback delete failed for '{}': {}", namespaced, e);
        }

        if let Some(remote) = &self.remote {
            if self.remote_available.load(Ordering::Relaxed) {
                if let Err(e) = remote.delete(namespaced).await {
                    self.mark_remote_unavailable(&e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn store() -> CacheStore {
        CacheStore::new(CacheStoreConfig::default())
    }

    /// Backend that fails every operation, simulating an unreachable remote
    #[derive(Debug)]
    struct UnreachableBackend;

    #[async_trait]
    impl CacheBackend for UnreachableBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>, DomainError> {
            Err(DomainError::cache("connection refused"))
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), DomainError> {
            Err(DomainError::cache("connection refused"))
        }

        async fn delete(&self, _key: &str) -> Result<bool, DomainError> {
            Err(DomainError::cache("connection refused"))
        }

        async fn delete_pattern(&self, _pattern: &str) -> Result<usize, DomainError> {
            Err(DomainError::cache("connection refused"))
        }

        async fn ping(&self) -> Result<(), DomainError> {
            Err(DomainError::cache("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = store();

        store.set("k", &"v".to_string(), Duration::from_secs(5)).await;

        let result: Option<String> = store.get("k").await;
        assert_eq!(result, Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_expiry() {
        let store = store();

        store.set("k", &"v".to_string(), Duration::from_millis(50)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let result: Option<String> = store.get("k").await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fallback_resilience_with_unreachable_remote() {
        let store =
            CacheStore::new(CacheStoreConfig::default()).with_remote(Arc::new(UnreachableBackend));

        store.set("k", &42u32, Duration::from_secs(60)).await;
        assert_eq!(store.get::<u32>("k").await, Some(42));

        let computed = store
            .remember("memo", Duration::from_secs(60), || async { Ok(7u32) })
            .await
            .unwrap();
        assert_eq!(computed, 7);

        store.delete("k").await;
        assert_eq!(store.get::<u32>("k").await, None);
    }

    #[tokio::test]
    async fn test_remote_failure_flips_availability() {
        let store =
            CacheStore::new(CacheStoreConfig::default()).with_remote(Arc::new(UnreachableBackend));
        assert!(store.remote_available());

        store.set("k", &1u32, Duration::from_secs(60)).await;
        assert!(!store.remote_available());

        // Degraded reads still served by the fallback
        assert_eq!(store.get::<u32>("k").await, Some(1));
    }

    #[tokio::test]
    async fn test_writes_reach_both_tiers() {
        let remote = Arc::new(InMemoryBackend::new());
        let store = CacheStore::new(CacheStoreConfig::default())
            .with_remote(remote.clone() as Arc<dyn CacheBackend>);

        store.set("k", &"v".to_string(), Duration::from_secs(60)).await;

        let raw = remote.get("fleetgate:k").await.unwrap();
        assert_eq!(raw, Some("\"v\"".to_string()));
    }

    #[tokio::test]
    async fn test_remember_returns_cached_value() {
        let store = store();

        let first = store
            .remember("memo", Duration::from_secs(60), || async { Ok(1u32) })
            .await
            .unwrap();
        let second: u32 = store
            .remember("memo", Duration::from_secs(60), || async {
                panic!("compute must not run on a warm cache")
            })
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 1);
    }

    #[tokio::test]
    async fn test_remember_propagates_compute_error() {
        let store = store();

        let result: Result<u32, _> = store
            .remember("memo", Duration::from_secs(60), || async {
                Err(DomainError::storage("repository down"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(store.get::<u32>("memo").await, None);
    }

    #[tokio::test]
    async fn test_tag_invalidation_removes_exactly_tagged_keys() {
        let store = store();

        store
            .remember_with_tags("a", &["t1"], Duration::from_secs(60), || async {
                Ok("a".to_string())
            })
            .await
            .unwrap();
        store
            .remember_with_tags("b", &["t1"], Duration::from_secs(60), || async {
                Ok("b".to_string())
            })
            .await
            .unwrap();
        store
            .remember_with_tags("c", &["t2"], Duration::from_secs(60), || async {
                Ok("c".to_string())
            })
            .await
            .unwrap();

        store.invalidate_tags(&["t1"]).await;

        assert_eq!(store.get::<String>("a").await, None);
        assert_eq!(store.get::<String>("b").await, None);
        assert_eq!(store.get::<String>("c").await, Some("c".to_string()));
    }

    #[tokio::test]
    async fn test_flush_with_prefix() {
        let store = store();

        store.set("resolve:a", &1u32, Duration::from_secs(60)).await;
        store.set("resolve:b", &2u32, Duration::from_secs(60)).await;
        store.set("stats:c", &3u32, Duration::from_secs(60)).await;

        store.flush(Some("resolve:")).await;

        assert_eq!(store.get::<u32>("resolve:a").await, None);
        assert_eq!(store.get::<u32>("resolve:b").await, None);
        assert_eq!(store.get::<u32>("stats:c").await, Some(3));
    }

    #[tokio::test]
    async fn test_flush_all() {
        let store = store();

        store.set("a", &1u32, Duration::from_secs(60)).await;
        store.set("b", &2u32, Duration::from_secs(60)).await;

        store.flush(None).await;

        assert_eq!(store.get::<u32>("a").await, None);
        assert_eq!(store.get::<u32>("b").await, None);
    }

    #[tokio::test]
    async fn test_sweep_prunes_expired_tagged_keys() {
        let store = store();

        store
            .remember_with_tags("short", &["t"], Duration::from_millis(10), || async {
                Ok(1u32)
            })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        store.sweep().await;

        let index = store.tags.read().unwrap();
        assert!(index.get("t").is_none());
    }
}
