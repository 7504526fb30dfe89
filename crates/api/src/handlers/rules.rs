//! Handlers for the `/rules` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rulekeeper_core::error::CoreError;
use rulekeeper_core::types::DbId;
use rulekeeper_core::validation::validate_input;
use rulekeeper_db::models::rule::RuleInput;
use rulekeeper_db::repositories::RuleRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Rule", id })
}

/// GET /api/v1/rules
///
/// List all rules, newest first.
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let rules = RuleRepo::list(&state.pool).await?;
    tracing::debug!(count = rules.len(), "Listed rules");
    Ok(Json(DataResponse { data: rules }))
}

/// POST /api/v1/rules
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<RuleInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;

    let rule = RuleRepo::create(&state.pool, &input).await?;
    tracing::info!(id = rule.id, name = %rule.name, "Rule created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: rule })))
}

/// GET /api/v1/rules/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let rule = RuleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: rule }))
}

/// PUT /api/v1/rules/{id}
///
/// Replace every field of a rule. Snapshots frozen from it whose content
/// now differs are flagged outdated in the same transaction.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RuleInput>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;

    let (rule, marked) = RuleRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(id, snapshots_marked_outdated = marked, "Rule updated");
    Ok(Json(DataResponse { data: rule }))
}

/// DELETE /api/v1/rules/{id}
///
/// Returns 409 while any template snapshot was frozen from this rule.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !RuleRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(id, "Rule deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/rules/{id}/copy
pub async fn copy(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let copy = RuleRepo::copy(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(source_id = id, id = copy.id, "Rule copied");
    Ok((StatusCode::CREATED, Json(DataResponse { data: copy })))
}
