//! Process-local metrics source
//!
//! Stand-in collaborator wiring the guarded stats route; real collectors run
//! in the agent and implement the same trait.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::metrics::{MetricsSnapshot, MetricsSource};
use crate::domain::DomainError;

#[derive(Debug)]
pub struct ProcessMetricsSource {
    hostname: String,
    started_at: Instant,
}

impl ProcessMetricsSource {
    pub fn new() -> Self {
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());

        Self {
            hostname,
            started_at: Instant::now(),
        }
    }
}

impl Default for ProcessMetricsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for ProcessMetricsSource {
    async fn snapshot(&self) -> Result<MetricsSnapshot, DomainError> {
        Ok(MetricsSnapshot {
            hostname: self.hostname.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            cpu_percent: 0.0,
            memory_used_bytes: 0,
            memory_total_bytes: 0,
            collected_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot() {
        let source = ProcessMetricsSource::new();
        let snapshot = source.snapshot().await.unwrap();
        assert!(!snapshot.hostname.is_empty());
    }
}
