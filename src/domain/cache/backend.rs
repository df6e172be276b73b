//! Cache backend trait
//!
//! Backends speak JSON strings to stay dyn-compatible. The return type is the
//! explicit three-state contract the tiered store builds on: `Ok(Some(_))` is
//! a value, `Ok(None)` is a miss, `Err(_)` is a backend failure. Backends
//! never swallow their own errors; the `CacheStore` decides fallback.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::DomainError;

#[async_trait]
pub trait CacheBackend: Send + Sync + Debug {
    /// Gets a raw JSON value
    async fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw JSON value with a TTL
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Deletes a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes every key matching a glob-style pattern, returning the count
    async fn delete_pattern(&self, pattern: &str) -> Result<usize, DomainError>;

    /// Liveness probe, used to restore a backend marked unavailable
    async fn ping(&self) -> Result<(), DomainError>;
}
