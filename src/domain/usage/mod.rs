//! Usage log domain: entries, aggregates, repository contract

mod record;
mod repository;

pub use record::{KeyUsageStats, UsageLogEntry};
pub use repository::UsageLogRepository;
