//! API key administration routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::middleware::AuthContext;
use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyPatch, Capabilities, Capability};
use crate::infrastructure::api_key::CreateKeyParams;

/// Public view of a key. The secret digest never leaves the server; the
/// prefix is enough to correlate a key with the credential a client holds.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiKeyResponse {
    pub id: String,
    pub name: String,
    pub key_prefix: String,
    pub capabilities: Capabilities,
    pub is_active: bool,
    pub rate_limit: Option<u32>,
    pub usage_count: u64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ApiKey> for ApiKeyResponse {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id().to_string(),
            name: key.name().to_string(),
            key_prefix: key.key_prefix().to_string(),
            capabilities: *key.capabilities(),
            is_active: key.is_active(),
            rate_limit: key.rate_limit(),
            usage_count: key.usage_count(),
            last_used_at: key.last_used_at(),
            expires_at: key.expires_at(),
            created_at: key.created_at(),
            updated_at: key.updated_at(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    pub name: String,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub rate_limit: Option<u32>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Creation response carries the plaintext secret exactly once
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateKeyResponse {
    pub key: ApiKeyResponse,
    pub secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListKeysResponse {
    pub keys: Vec<ApiKeyResponse>,
    pub total: usize,
}

pub async fn list_keys(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<ListKeysResponse>, ApiError> {
    ctx.require(Capability::ViewKeys)?;

    let keys = state.registry.list().await?;

    Ok(Json(ListKeysResponse {
        total: keys.len(),
        keys: keys.iter().map(ApiKeyResponse::from).collect(),
    }))
}

pub async fn get_key(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    ctx.require(Capability::ViewKeys)?;

    let id = parse_id(&id)?;
    let key = state
        .registry
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("API key not found"))?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

pub async fn create_key(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(request): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<CreateKeyResponse>), ApiError> {
    ctx.require(Capability::CreateKey)?;

    let params = CreateKeyParams {
        name: request.name,
        capabilities: request.capabilities,
        rate_limit: request.rate_limit,
        expires_at: request.expires_at,
    };

    let created = state.registry.create(params).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateKeyResponse {
            key: ApiKeyResponse::from(&created.api_key),
            secret: created.secret,
        }),
    ))
}

pub async fn update_key(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(patch): Json<ApiKeyPatch>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    ctx.require(Capability::CreateKey)?;

    let id = parse_id(&id)?;

    if !state.registry.update(&id, patch).await? {
        return Err(ApiError::not_found("API key not found"));
    }

    let key = state
        .registry
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("API key not found"))?;

    Ok(Json(ApiKeyResponse::from(&key)))
}

pub async fn deactivate_key(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.require(Capability::DeleteKey)?;

    let id = parse_id(&id)?;

    if !state.registry.deactivate(&id).await? {
        return Err(ApiError::not_found("API key not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_key(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.require(Capability::DeleteKey)?;

    let id = parse_id(&id)?;

    if !state.registry.delete(&id).await? {
        return Err(ApiError::not_found("API key not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(id: &str) -> Result<ApiKeyId, ApiError> {
    ApiKeyId::new(id).map_err(|e| ApiError::bad_request(e.to_string()))
}
