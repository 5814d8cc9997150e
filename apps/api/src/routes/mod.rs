pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::content::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/content",
            get(handlers::handle_list).post(handlers::handle_create),
        )
        .route("/api/content/search", get(handlers::handle_search))
        .route("/api/content/filter", get(handlers::handle_filter))
        .route("/api/content/reindex", post(handlers::handle_reindex))
        .route(
            "/api/content/:id",
            get(handlers::handle_get)
                .put(handlers::handle_update)
                .delete(handlers::handle_delete),
        )
        .with_state(state)
}
