//! In-memory API key repository
//!
//! Default store for single-process deployments and tests. SQL or flat-file
//! stores are external collaborators behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository};
use crate::domain::DomainError;

#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    keys: RwLock<HashMap<ApiKeyId, ApiKey>>,
}

impl InMemoryApiKeyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        Ok(self.keys.read().await.get(id).cloned())
    }

    async fn get_by_prefix(&self, prefix: &str) -> Result<Option<ApiKey>, DomainError> {
        Ok(self
            .keys
            .read()
            .await
            .values()
            .find(|key| key.key_prefix() == prefix)
            .cloned())
    }

    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        let mut keys = self.keys.write().await;

        if keys.contains_key(api_key.id()) {
            return Err(DomainError::conflict(format!(
                "API key '{}' already exists",
                api_key.id()
            )));
        }

        keys.insert(api_key.id().clone(), api_key.clone());
        Ok(api_key)
    }

    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError> {
        let mut keys = self.keys.write().await;

        if !keys.contains_key(api_key.id()) {
            return Err(DomainError::not_found(format!(
                "API key '{}' not found",
                api_key.id()
            )));
        }

        keys.insert(api_key.id().clone(), api_key.clone());
        Ok(api_key.clone())
    }

    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        Ok(self.keys.write().await.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<ApiKey>, DomainError> {
        let mut keys: Vec<ApiKey> = self.keys.read().await.values().cloned().collect();
        keys.sort_by(|a, b| a.created_at().cmp(&b.created_at()));
        Ok(keys)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        Ok(self.keys.read().await.len())
    }

    async fn record_usage(&self, id: &ApiKeyId) -> Result<(), DomainError> {
        let mut keys = self.keys.write().await;

        let key = keys
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("API key '{}' not found", id)))?;

        key.mark_used();
        Ok(())
    }
}
