//! Usage log repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::record::{KeyUsageStats, UsageLogEntry};
use crate::domain::api_key::ApiKeyId;
use crate::domain::DomainError;

/// Repository for append-only usage log entries and their per-key aggregates
#[async_trait]
pub trait UsageLogRepository: Send + Sync + Debug {
    /// Append one entry
    async fn append(&self, entry: UsageLogEntry) -> Result<(), DomainError>;

    /// Most recent entries, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<UsageLogEntry>, DomainError>;

    /// Rolling aggregates for one key, if any usage has been recorded
    async fn stats_for_key(&self, id: &ApiKeyId) -> Result<Option<KeyUsageStats>, DomainError>;

    /// Delete every entry, returning the count removed. Irreversible.
    async fn delete_all(&self) -> Result<usize, DomainError>;

    /// Delete every entry for one key, returning the count removed. Irreversible.
    async fn delete_for_key(&self, id: &ApiKeyId) -> Result<usize, DomainError>;
}
