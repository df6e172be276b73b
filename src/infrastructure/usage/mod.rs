//! Usage infrastructure: recorder worker and log storage

mod in_memory;
mod recorder;

pub use in_memory::InMemoryUsageLogRepository;
pub use recorder::UsageRecorder;
