//! Fleetgate: request admission and API key authorization gateway for the
//! fleet metrics server.
//!
//! Every inbound request passes the admission gate: credentials are resolved
//! to capability sets through a tiered cache, unresolved traffic is throttled
//! per client address, and admitted keyed requests are logged asynchronously.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::api::AppState;
use crate::config::AppConfig;
use crate::domain::api_key::{ApiKeyRepository, Capabilities};
use crate::domain::metrics::MetricsSource;
use crate::domain::usage::UsageLogRepository;
use crate::infrastructure::api_key::{ApiKeyRegistry, CreateKeyParams, InMemoryApiKeyRepository};
use crate::infrastructure::cache::{
    CacheStore, CacheStoreConfig, InMemoryBackendConfig, RedisBackend,
};
use crate::infrastructure::metrics::ProcessMetricsSource;
use crate::infrastructure::throttle::{FixedWindowLimiter, ThrottleConfig};
use crate::infrastructure::usage::{InMemoryUsageLogRepository, UsageRecorder};

/// Wire up every service from configuration. The remote cache tier is
/// optional; when it is unreachable at startup the store begins in degraded
/// mode and the sweeper keeps probing.
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let mut store = CacheStore::new(CacheStoreConfig {
        namespace: config.cache.namespace.clone(),
        sweep_interval: Duration::from_secs(config.cache.sweep_interval_secs),
        fallback: InMemoryBackendConfig {
            max_capacity: config.cache.fallback_max_capacity,
            ..InMemoryBackendConfig::default()
        },
    });

    if let Some(url) = &config.cache.redis_url {
        match RedisBackend::with_url(url).await {
            Ok(backend) => {
                info!("Connected to remote cache backend");
                store = store.with_remote(Arc::new(backend));
            }
            Err(e) => {
                warn!("Remote cache backend unavailable, starting degraded: {}", e);
            }
        }
    }

    let cache = Arc::new(store);
    cache.spawn_sweeper();

    let key_repo: Arc<dyn ApiKeyRepository> = Arc::new(InMemoryApiKeyRepository::new());
    let usage_logs: Arc<dyn UsageLogRepository> =
        Arc::new(InMemoryUsageLogRepository::new(config.usage.max_entries));

    let registry = Arc::new(
        ApiKeyRegistry::new(key_repo.clone(), cache.clone())
            .with_resolve_ttl(Duration::from_secs(config.cache.resolve_ttl_secs)),
    );

    let recorder = Arc::new(UsageRecorder::spawn(usage_logs.clone(), key_repo.clone()));

    let limiter = Arc::new(FixedWindowLimiter::new(ThrottleConfig {
        window: Duration::from_secs(config.throttle.window_secs),
        max_requests: config.throttle.max_requests,
    }));

    let metrics: Arc<dyn MetricsSource> = Arc::new(ProcessMetricsSource::new());

    let state = AppState {
        registry,
        cache,
        usage_logs,
        recorder,
        limiter,
        metrics,
    };

    bootstrap_admin_key(&state).await?;

    Ok(state)
}

/// Create the initial full-capability key when the registry is empty, so a
/// fresh deployment can be administered at all. The secret is printed to the
/// log exactly once and never recoverable afterwards.
async fn bootstrap_admin_key(state: &AppState) -> anyhow::Result<()> {
    if state.registry.count().await? > 0 {
        return Ok(());
    }

    let created = state
        .registry
        .create(CreateKeyParams::new("bootstrap").with_capabilities(Capabilities::all()))
        .await?;

    info!(
        key_id = %created.api_key.id(),
        "Bootstrap API key created. Store this secret now, it will not be shown again: {}",
        created.secret
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_app_state_bootstraps_admin_key() {
        let state = create_app_state(&AppConfig::default()).await.unwrap();

        let keys = state.registry.list().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name(), "bootstrap");
        assert!(keys[0].capabilities().power_commands);
    }
}
