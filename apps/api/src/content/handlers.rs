//! Axum route handlers for the Content API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::errors::AppError;
use crate::models::content::{
    ContentRecord, ContentSubmission, FilterParams, SearchParams, SearchResult,
};
use crate::state::AppState;

/// GET /api/content
pub async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<Vec<ContentRecord>>, AppError> {
    Ok(Json(state.content.list_all().await?))
}

/// GET /api/content/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ContentRecord>, AppError> {
    Ok(Json(state.content.get(id).await?))
}

/// POST /api/content
pub async fn handle_create(
    State(state): State<AppState>,
    Json(submission): Json<ContentSubmission>,
) -> Result<(StatusCode, Json<ContentRecord>), AppError> {
    let record = state.content.create(&submission).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/content/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(submission): Json<ContentSubmission>,
) -> Result<Json<ContentRecord>, AppError> {
    Ok(Json(state.content.update(id, &submission).await?))
}

/// DELETE /api/content/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.content.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/content/search
///
/// Ranked results with highlights. All parameters are optional; with none of
/// `query`, `category` or `author` the result is empty.
pub async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    Ok(Json(state.content.search(&params).await?))
}

/// GET /api/content/filter
pub async fn handle_filter(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<Vec<ContentRecord>>, AppError> {
    Ok(Json(state.content.filter(&params).await?))
}

/// POST /api/content/reindex
///
/// Runs to completion before responding.
pub async fn handle_reindex(State(state): State<AppState>) -> Result<String, AppError> {
    let report = state.content.reindex().await?;
    Ok(report.message())
}
