//! Handlers for usage statistics.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use rulekeeper_db::repositories::StatsRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/stats
pub async fn global(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let stats = StatsRepo::global(&state.pool).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/rules/stats
pub async fn rule_usage(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let usage = StatsRepo::rule_usage(&state.pool).await?;
    Ok(Json(DataResponse { data: usage }))
}

/// GET /api/v1/categories/stats
pub async fn category_usage(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let usage = StatsRepo::category_usage(&state.pool).await?;
    Ok(Json(DataResponse { data: usage }))
}
