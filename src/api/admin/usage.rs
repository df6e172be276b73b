//! Usage log administration routes

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::AuthContext;
use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::api_key::{ApiKeyId, Capability};
use crate::domain::usage::{KeyUsageStats, UsageLogEntry};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct RecentUsageQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecentUsageResponse {
    pub entries: Vec<UsageLogEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}

/// Newest-first slice of the usage log
pub async fn recent_usage(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<RecentUsageQuery>,
) -> Result<Json<RecentUsageResponse>, ApiError> {
    ctx.require(Capability::ViewStats)?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let entries = state.usage_logs.recent(limit).await?;

    Ok(Json(RecentUsageResponse { entries }))
}

/// Rolling aggregates for one key. Stats survive log eviction, so a key can
/// report totals larger than the retained entry count.
pub async fn key_usage_stats(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<KeyUsageStats>, ApiError> {
    ctx.require(Capability::ViewStats)?;

    let id = parse_id(&id)?;
    let stats = state
        .usage_logs
        .stats_for_key(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("No usage recorded for this key"))?;

    Ok(Json(stats))
}

pub async fn delete_all_usage(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<DeletedResponse>, ApiError> {
    ctx.require(Capability::PowerCommands)?;

    let deleted = state.usage_logs.delete_all().await?;
    Ok(Json(DeletedResponse { deleted }))
}

pub async fn delete_key_usage(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    ctx.require(Capability::PowerCommands)?;

    let id = parse_id(&id)?;
    let deleted = state.usage_logs.delete_for_key(&id).await?;

    Ok(Json(DeletedResponse { deleted }))
}

fn parse_id(id: &str) -> Result<ApiKeyId, ApiError> {
    ApiKeyId::new(id).map_err(|e| ApiError::bad_request(e.to_string()))
}
