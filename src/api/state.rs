//! Application state for shared services
//!
//! Everything is explicitly constructed in `create_app_state` and injected
//! here; there is no module-level singleton.

use std::sync::Arc;

use crate::domain::metrics::MetricsSource;
use crate::domain::usage::UsageLogRepository;
use crate::infrastructure::api_key::ApiKeyRegistry;
use crate::infrastructure::cache::CacheStore;
use crate::infrastructure::throttle::FixedWindowLimiter;
use crate::infrastructure::usage::UsageRecorder;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ApiKeyRegistry>,
    pub cache: Arc<CacheStore>,
    pub usage_logs: Arc<dyn UsageLogRepository>,
    pub recorder: Arc<UsageRecorder>,
    pub limiter: Arc<FixedWindowLimiter>,
    pub metrics: Arc<dyn MetricsSource>,
}
