//! Versioned public API

pub mod stats;

use axum::{routing::get, Router};

use crate::api::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(stats::get_stats))
}
