//! Health and liveness routes
//!
//! Unauthenticated by design so orchestrators can probe the process before
//! any key exists. They still pass through the admission gate and count
//! against the anonymous throttle.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Whether the remote cache tier is currently reachable. The service
    /// degrades to the in-process tier, so this never fails the check.
    pub cache_remote: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache_remote: state.cache.remote_available(),
    })
}

pub async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
