//! Metrics source contract
//!
//! Metric collection is an external collaborator of the gateway; the API layer
//! depends only on this trait.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A point-in-time snapshot of host metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub hostname: String,
    pub uptime_secs: u64,
    pub cpu_percent: f32,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub collected_at: DateTime<Utc>,
}

#[async_trait]
pub trait MetricsSource: Send + Sync + Debug {
    async fn snapshot(&self) -> Result<MetricsSnapshot, DomainError>;
}
