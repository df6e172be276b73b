//! Administrative routes, all capability-guarded

pub mod keys;
pub mod usage;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::api::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/keys", get(keys::list_keys).post(keys::create_key))
        .route(
            "/keys/{id}",
            get(keys::get_key)
                .patch(keys::update_key)
                .delete(keys::delete_key),
        )
        .route("/keys/{id}/deactivate", delete(keys::deactivate_key))
        .route(
            "/usage",
            get(usage::recent_usage).delete(usage::delete_all_usage),
        )
        .route(
            "/usage/keys/{id}",
            get(usage::key_usage_stats).delete(usage::delete_key_usage),
        )
}
