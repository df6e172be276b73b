//! Fleet stats route

use axum::{extract::State, Json};
use tracing::debug;

use crate::api::middleware::AuthContext;
use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::api_key::Capability;
use crate::domain::metrics::MetricsSnapshot;

pub async fn get_stats(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<MetricsSnapshot>, ApiError> {
    let key = ctx.require(Capability::ViewStats)?;
    debug!(key_id = %key.id(), "Serving stats snapshot");

    let snapshot = state.metrics.snapshot().await?;
    Ok(Json(snapshot))
}
