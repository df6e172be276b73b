//! API key repository trait
//!
//! The registry depends only on this contract; SQL or flat-file stores are
//! external collaborators implementing it.

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{ApiKey, ApiKeyId};
use crate::domain::DomainError;

/// Repository trait for persisted API keys
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    /// Get an API key by its ID
    async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError>;

    /// Get an API key by its lookup prefix (used during authentication)
    async fn get_by_prefix(&self, prefix: &str) -> Result<Option<ApiKey>, DomainError>;

    /// Create a new API key
    async fn create(&self, api_key: ApiKey) -> Result<ApiKey, DomainError>;

    /// Update an existing API key; errors with NotFound when absent
    async fn update(&self, api_key: &ApiKey) -> Result<ApiKey, DomainError>;

    /// Delete an API key, returning whether it existed
    async fn delete(&self, id: &ApiKeyId) -> Result<bool, DomainError>;

    /// List all API keys
    async fn list(&self) -> Result<Vec<ApiKey>, DomainError>;

    /// Count stored API keys
    async fn count(&self) -> Result<usize, DomainError>;

    /// Increment the usage counter and last-used timestamp for a key.
    ///
    /// Invoked by the usage recorder worker, never on the request path.
    async fn record_usage(&self, id: &ApiKeyId) -> Result<(), DomainError>;
}
