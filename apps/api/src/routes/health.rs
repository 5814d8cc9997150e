use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Reports the service version and how many documents are searchable.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let storage = match state.config.index_path {
        Some(_) => "disk",
        None => "memory",
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": env!("CARGO_PKG_NAME"),
        "indexedDocuments": state.content.indexed_count().await,
        "indexStorage": storage
    }))
}
