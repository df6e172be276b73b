//! API key registry
//!
//! Authoritative mapping from a presented secret to a key and its capability
//! set, backed by the repository and accelerated by the tiered cache on the
//! resolve hot path.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::domain::api_key::{
    ApiKey, ApiKeyId, ApiKeyPatch, ApiKeyRepository, Capabilities,
};
use crate::domain::cache::CacheKeyParams;
use crate::domain::DomainError;
use crate::infrastructure::cache::CacheStore;

use super::generator::SecretGenerator;

/// Cache tag grouping every resolution entry
const TAG_ALL_KEYS: &str = "api-keys";

/// Result of creating a new API key. `secret` is the only copy of the
/// plaintext credential that will ever exist; the registry stores a digest.
#[derive(Debug)]
pub struct CreatedKey {
    pub api_key: ApiKey,
    pub secret: String,
}

/// Parameters accepted by [`ApiKeyRegistry::create`]
#[derive(Debug, Clone, Default)]
pub struct CreateKeyParams {
    pub name: String,
    pub capabilities: Capabilities,
    pub rate_limit: Option<u32>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl CreateKeyParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }
}

#[derive(Debug)]
pub struct ApiKeyRegistry {
    repository: Arc<dyn ApiKeyRepository>,
    cache: Arc<CacheStore>,
    generator: SecretGenerator,
    resolve_ttl: Duration,
}

impl ApiKeyRegistry {
    pub fn new(repository: Arc<dyn ApiKeyRepository>, cache: Arc<CacheStore>) -> Self {
        Self {
            repository,
            cache,
            generator: SecretGenerator::fleet(),
            resolve_ttl: Duration::from_secs(30),
        }
    }

    pub fn with_resolve_ttl(mut self, ttl: Duration) -> Self {
        self.resolve_ttl = ttl;
        self
    }

    pub fn with_generator(mut self, generator: SecretGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Create a new key. Capabilities not explicitly granted stay denied.
    pub async fn create(&self, params: CreateKeyParams) -> Result<CreatedKey, DomainError> {
        if params.name.trim().is_empty() {
            return Err(DomainError::validation("API key name cannot be empty"));
        }

        let id = ApiKeyId::generate();
        info!(key_id = %id, name = %params.name, "Creating API key");

        let generated = self.generator.generate();

        let api_key = ApiKey::new(id, &params.name, &generated.hash, &generated.prefix)
            .with_capabilities(params.capabilities)
            .with_rate_limit(params.rate_limit)
            .with_expires_at(params.expires_at);

        let created = self.repository.create(api_key).await?;

        Ok(CreatedKey {
            api_key: created,
            secret: generated.secret,
        })
    }

    /// Resolve a presented secret to its key - the hot path, called on every
    /// inbound request. Results (including misses) are cached keyed by the
    /// secret's digest; mutations invalidate per-key entries immediately.
    ///
    /// A deactivated, expired, or deleted key resolves to `None`. Repository
    /// failures surface as errors: the registry cannot authorize without its
    /// source of truth.
    pub async fn resolve(&self, secret: &str) -> Result<Option<ApiKey>, DomainError> {
        if secret.is_empty() {
            return Ok(None);
        }

        let digest = self.generator.hash_secret(secret);
        let cache_key = CacheKeyParams::new("resolve")
            .with_component("digest", &digest)
            .render();

        if let Some(cached) = self.cache.get::<Option<ApiKey>>(&cache_key).await {
            debug!("API key resolution served from cache");
            return Ok(cached.filter(|key| key.is_valid()));
        }

        let resolved = self.lookup(secret).await?;

        self.cache.set(&cache_key, &resolved, self.resolve_ttl).await;
        match &resolved {
            Some(key) => {
                let id_tag = Self::id_tag(key.id());
                self.cache.tag(&cache_key, &[TAG_ALL_KEYS, &id_tag]);
            }
            None => self.cache.tag(&cache_key, &[TAG_ALL_KEYS]),
        }

        Ok(resolved)
    }

    /// Merge a partial update into a key. Returns false when the id is
    /// unknown.
    pub async fn update(&self, id: &ApiKeyId, patch: ApiKeyPatch) -> Result<bool, DomainError> {
        let Some(mut key) = self.repository.get(id).await? else {
            return Ok(false);
        };

        if let Some(name) = patch.name {
            key.set_name(name);
        }
        if let Some(capabilities) = patch.capabilities {
            key.set_capabilities(capabilities);
        }
        if let Some(rate_limit) = patch.rate_limit {
            key.set_rate_limit(Some(rate_limit));
        }
        if let Some(expires_at) = patch.expires_at {
            key.set_expires_at(Some(expires_at));
        }
        if let Some(is_active) = patch.is_active {
            if is_active {
                key.activate();
            } else {
                key.deactivate();
            }
        }

        self.repository.update(&key).await?;
        self.invalidate(id).await;

        info!(key_id = %id, "API key updated");
        Ok(true)
    }

    /// Deactivate a key; it resolves to not-found from this point on
    pub async fn deactivate(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        let Some(mut key) = self.repository.get(id).await? else {
            return Ok(false);
        };

        key.deactivate();
        self.repository.update(&key).await?;
        self.invalidate(id).await;

        info!(key_id = %id, "API key deactivated");
        Ok(true)
    }

    /// Delete a key. Historical usage logs are retained (orphaned) until an
    /// operator deletes them explicitly.
    pub async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        let deleted = self.repository.delete(id).await?;

        if deleted {
            self.invalidate(id).await;
            info!(key_id = %id, "API key deleted");
        }

        Ok(deleted)
    }

    pub async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        self.repository.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<ApiKey>, DomainError> {
        self.repository.list().await
    }

    pub async fn count(&self) -> Result<usize, DomainError> {
        self.repository.count().await
    }

    /// Bump usage bookkeeping for a key. Called by the usage recorder worker;
    /// deliberately skips cache invalidation, the short resolve TTL absorbs
    /// counter staleness without churning the hot path.
    pub async fn record_usage(&self, id: &ApiKeyId) -> Result<(), DomainError> {
        self.repository.record_usage(id).await
    }

    async fn lookup(&self, secret: &str) -> Result<Option<ApiKey>, DomainError> {
        let Some(prefix) = SecretGenerator::extract_prefix(secret) else {
            debug!("Presented credential has no recognizable prefix");
            return Ok(None);
        };

        let Some(key) = self.repository.get_by_prefix(prefix).await? else {
            return Ok(None);
        };

        if !self.generator.verify_secret(secret, key.secret_hash()) {
            debug!(key_id = %key.id(), "Credential digest mismatch");
            return Ok(None);
        }

        if !key.is_valid() {
            debug!(key_id = %key.id(), "Credential maps to an inactive or expired key");
            return Ok(None);
        }

        Ok(Some(key))
    }

    async fn invalidate(&self, id: &ApiKeyId) {
        let id_tag = Self::id_tag(id);
        self.cache.invalidate_tags(&[&id_tag]).await;
    }

    fn id_tag(id: &ApiKeyId) -> String {
        format!("api-key:{}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::api_key::Capability;
    use crate::infrastructure::api_key::InMemoryApiKeyRepository;
    use crate::infrastructure::cache::CacheStoreConfig;

    fn registry() -> ApiKeyRegistry {
        let repo = Arc::new(InMemoryApiKeyRepository::new());
        let cache = Arc::new(CacheStore::new(CacheStoreConfig::default()));
        ApiKeyRegistry::new(repo, cache)
    }

    #[tokio::test]
    async fn test_create_defaults_deny() {
        let registry = registry();

        let created = registry
            .create(
                CreateKeyParams::new("Ops").with_capabilities(Capabilities {
                    view_stats: true,
                    ..Capabilities::none()
                }),
            )
            .await
            .unwrap();

        assert!(created.secret.starts_with("fm_"));
        assert!(created.api_key.allows(Capability::ViewStats));
        assert!(!created.api_key.allows(Capability::CreateKey));
        assert!(!created.api_key.allows(Capability::DeleteKey));
        assert!(!created.api_key.allows(Capability::PowerCommands));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_name() {
        let registry = registry();
        assert!(registry.create(CreateKeyParams::new("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_after_create() {
        let registry = registry();

        let created = registry
            .create(CreateKeyParams::new("Ops").with_capabilities(Capabilities::read_only()))
            .await
            .unwrap();

        let resolved = registry.resolve(&created.secret).await.unwrap().unwrap();
        assert_eq!(resolved.id(), created.api_key.id());
        assert_eq!(resolved.capabilities(), created.api_key.capabilities());
    }

    #[tokio::test]
    async fn test_resolve_unknown_secret() {
        let registry = registry();
        assert!(registry.resolve("fm_doesnotexist").await.unwrap().is_none());
        assert!(registry.resolve("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_is_cached_and_invalidated_on_deactivate() {
        let registry = registry();

        let created = registry.create(CreateKeyParams::new("Ops")).await.unwrap();

        // Warm the cache
        assert!(registry.resolve(&created.secret).await.unwrap().is_some());

        registry.deactivate(created.api_key.id()).await.unwrap();

        // Must miss the stale cache entry and re-check the repository
        assert!(registry.resolve(&created.secret).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_after_delete() {
        let registry = registry();

        let created = registry.create(CreateKeyParams::new("Ops")).await.unwrap();
        assert!(registry.resolve(&created.secret).await.unwrap().is_some());

        assert!(registry.delete(created.api_key.id()).await.unwrap());
        assert!(registry.resolve(&created.secret).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let registry = registry();

        let created = registry.create(CreateKeyParams::new("Ops")).await.unwrap();
        assert!(registry.resolve(&created.secret).await.unwrap().is_some());

        let updated = registry
            .update(
                created.api_key.id(),
                ApiKeyPatch {
                    capabilities: Some(Capabilities::all()),
                    rate_limit: Some(100),
                    ..ApiKeyPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(updated);

        let resolved = registry.resolve(&created.secret).await.unwrap().unwrap();
        assert!(resolved.allows(Capability::PowerCommands));
        assert_eq!(resolved.rate_limit(), Some(100));
        assert_eq!(resolved.name(), "Ops");
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let registry = registry();
        let updated = registry
            .update(&ApiKeyId::generate(), ApiKeyPatch::default())
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_record_usage_increments() {
        let registry = registry();

        let created = registry.create(CreateKeyParams::new("Ops")).await.unwrap();

        registry.record_usage(created.api_key.id()).await.unwrap();
        registry.record_usage(created.api_key.id()).await.unwrap();

        let stored = registry.get(created.api_key.id()).await.unwrap().unwrap();
        assert_eq!(stored.usage_count(), 2);
    }
}
