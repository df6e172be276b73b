//! Usage log entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::api_key::ApiKeyId;

/// One admitted request against a specific key. Append-only; removed only by
/// explicit operator deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLogEntry {
    pub id: String,
    pub api_key_id: ApiKeyId,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    pub response_time_ms: u64,
    pub client_address: String,
    pub timestamp: DateTime<Utc>,
}

impl UsageLogEntry {
    pub fn new(
        api_key_id: ApiKeyId,
        endpoint: impl Into<String>,
        method: impl Into<String>,
        status_code: u16,
        response_time_ms: u64,
        client_address: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("usage-{}", uuid::Uuid::new_v4()),
            api_key_id,
            endpoint: endpoint.into(),
            method: method.into(),
            status_code,
            response_time_ms,
            client_address: client_address.into(),
            timestamp: Utc::now(),
        }
    }

    /// 2xx and 3xx statuses count as successes, 4xx and 5xx as failures
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }
}

/// Rolling per-key aggregates maintained as entries are appended
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyUsageStats {
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub avg_response_time_ms: f64,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl KeyUsageStats {
    /// Fold one entry into the aggregate
    pub fn absorb(&mut self, entry: &UsageLogEntry) {
        let previous_total = self.total_requests as f64;
        self.total_requests += 1;

        if entry.is_success() {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }

        self.avg_response_time_ms = (self.avg_response_time_ms * previous_total
            + entry.response_time_ms as f64)
            / self.total_requests as f64;
        self.last_used_at = Some(entry.timestamp);
    }
}
