//! Route tree assembly

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::state::AppState;
use crate::api::{admin, health, v1};

use super::middleware::admission;

/// Build the full route tree with the admission gate ahead of every route
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/live", get(health::live))
        .nest("/v1", v1::router())
        .nest("/admin", admin::router())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            admission,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        extract::ConnectInfo,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::api::admin::keys::{CreateKeyResponse, ListKeysResponse};
    use crate::domain::api_key::{ApiKeyRepository, Capabilities};
    use crate::domain::metrics::MetricsSource;
    use crate::domain::usage::UsageLogRepository;
    use crate::infrastructure::api_key::{
        ApiKeyRegistry, CreateKeyParams, InMemoryApiKeyRepository,
    };
    use crate::infrastructure::cache::{CacheStore, CacheStoreConfig};
    use crate::infrastructure::metrics::ProcessMetricsSource;
    use crate::infrastructure::throttle::{FixedWindowLimiter, ThrottleConfig};
    use crate::infrastructure::usage::{InMemoryUsageLogRepository, UsageRecorder};

    fn state() -> AppState {
        let cache = Arc::new(CacheStore::new(CacheStoreConfig::default()));
        let key_repo: Arc<dyn ApiKeyRepository> = Arc::new(InMemoryApiKeyRepository::new());
        let usage_logs: Arc<dyn UsageLogRepository> =
            Arc::new(InMemoryUsageLogRepository::new(1000));
        let metrics: Arc<dyn MetricsSource> = Arc::new(ProcessMetricsSource::new());

        AppState {
            registry: Arc::new(ApiKeyRegistry::new(key_repo.clone(), cache.clone())),
            cache,
            usage_logs: usage_logs.clone(),
            recorder: Arc::new(UsageRecorder::spawn(usage_logs, key_repo)),
            limiter: Arc::new(FixedWindowLimiter::new(ThrottleConfig {
                window: Duration::from_secs(60),
                max_requests: 100,
            })),
            metrics,
        }
    }

    fn request(method: &str, path: &str, secret: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(secret) = secret {
            builder = builder.header("x-api-key", secret);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let mut request = builder.body(body).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("9.9.9.9:54321".parse::<SocketAddr>().unwrap()));
        request
    }

    async fn body_json<T: serde::de::DeserializeOwned>(
        response: axum::response::Response,
    ) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_routes_are_open() {
        let router = create_router(state());

        let response = router
            .clone()
            .oneshot(request("GET", "/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(request("GET", "/live", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_requires_capability() {
        let state = state();
        let created = state
            .registry
            .create(CreateKeyParams::new("Viewer").with_capabilities(Capabilities::read_only()))
            .await
            .unwrap();
        let router = create_router(state);

        let response = router
            .clone()
            .oneshot(request("GET", "/v1/stats", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router
            .oneshot(request("GET", "/v1/stats", Some(&created.secret), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_key_lifecycle_over_http() {
        let state = state();
        let admin = state
            .registry
            .create(CreateKeyParams::new("Admin").with_capabilities(Capabilities::all()))
            .await
            .unwrap();
        let router = create_router(state);

        // Create a viewer key; the secret appears in this response only
        let response = router
            .clone()
            .oneshot(request(
                "POST",
                "/admin/keys",
                Some(&admin.secret),
                Some(r#"{"name":"Viewer","capabilities":{"view_stats":true}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: CreateKeyResponse = body_json(response).await;
        assert!(created.secret.starts_with("fm_"));
        assert!(created.key.capabilities.view_stats);
        assert!(!created.key.capabilities.create_key);

        // The new credential works immediately
        let response = router
            .clone()
            .oneshot(request("GET", "/v1/stats", Some(&created.secret), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Listing shows prefixes, never secrets
        let response = router
            .clone()
            .oneshot(request("GET", "/admin/keys", Some(&admin.secret), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed: ListKeysResponse = body_json(response).await;
        assert_eq!(listed.total, 2);
        assert!(listed.keys.iter().all(|k| k.key_prefix.starts_with("fm_")));

        // Deactivation revokes the credential
        let response = router
            .clone()
            .oneshot(request(
                "DELETE",
                &format!("/admin/keys/{}/deactivate", created.key.id),
                Some(&admin.secret),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = router
            .oneshot(request("GET", "/v1/stats", Some(&created.secret), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_routes_reject_insufficient_keys() {
        let state = state();
        let viewer = state
            .registry
            .create(CreateKeyParams::new("Viewer").with_capabilities(Capabilities::read_only()))
            .await
            .unwrap();
        let router = create_router(state);

        let response = router
            .clone()
            .oneshot(request(
                "POST",
                "/admin/keys",
                Some(&viewer.secret),
                Some(r#"{"name":"Sneaky"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = router
            .oneshot(request("DELETE", "/admin/usage", Some(&viewer.secret), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_key_id_is_not_found() {
        let state = state();
        let admin = state
            .registry
            .create(CreateKeyParams::new("Admin").with_capabilities(Capabilities::all()))
            .await
            .unwrap();
        let router = create_router(state);

        let response = router
            .oneshot(request(
                "DELETE",
                &format!("/admin/keys/{}", uuid::Uuid::new_v4()),
                Some(&admin.secret),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
