//! In-memory usage log repository

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::api_key::ApiKeyId;
use crate::domain::usage::{KeyUsageStats, UsageLogEntry, UsageLogRepository};
use crate::domain::DomainError;

/// Bounded in-memory store for usage log entries plus rolling per-key
/// aggregates
#[derive(Debug)]
pub struct InMemoryUsageLogRepository {
    entries: RwLock<Vec<UsageLogEntry>>,
    stats: RwLock<HashMap<ApiKeyId, KeyUsageStats>>,
    max_entries: usize,
}

impl InMemoryUsageLogRepository {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            stats: RwLock::new(HashMap::new()),
            max_entries,
        }
    }
}

impl Default for InMemoryUsageLogRepository {
    fn default() -> Self {
        Self::new(100_000)
    }
}

#[async_trait]
impl UsageLogRepository for InMemoryUsageLogRepository {
    async fn append(&self, entry: UsageLogEntry) -> Result<(), DomainError> {
        {
            let mut stats = self
                .stats
                .write()
                .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;
            stats
                .entry(entry.api_key_id.clone())
                .or_default()
                .absorb(&entry);
        }

        let mut entries = self
            .entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        entries.push(entry);

        // Oldest entries give way once the bound is hit; aggregates keep
        // counting across evictions
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }

        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<UsageLogEntry>, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(entries.iter().rev().take(limit).cloned().collect())
    }

    async fn stats_for_key(&self, id: &ApiKeyId) -> Result<Option<KeyUsageStats>, DomainError> {
        let stats = self
            .stats
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(stats.get(id).cloned())
    }

    async fn delete_all(&self) -> Result<usize, DomainError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;
        let removed = entries.len();
        entries.clear();

        self.stats
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?
            .clear();

        Ok(removed)
    }

    async fn delete_for_key(&self, id: &ApiKeyId) -> Result<usize, DomainError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let before = entries.len();
        entries.retain(|entry| &entry.api_key_id != id);
        let removed = before - entries.len();

        self.stats
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?
            .remove(id);

        Ok(removed)
    }
}
