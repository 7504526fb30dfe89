//! Handlers for the `/categories` resource and its ordered rule list.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rulekeeper_core::error::CoreError;
use rulekeeper_core::types::DbId;
use rulekeeper_core::validation::validate_input;
use rulekeeper_db::models::category::{CreateCategory, UpdateCategory};
use rulekeeper_db::repositories::CategoryRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for appending a rule to a category.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddRuleRequest {
    pub rule_id: DbId,
}

/// Request body for rewriting a category's rule order.
///
/// Must list every membership of the category exactly once.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderRulesRequest {
    pub category_rule_ids: Vec<DbId>,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Category",
        id,
    })
}

// ---------------------------------------------------------------------------
// Category CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/categories
///
/// List all categories by `sort_order`, each with its rules in order.
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let categories = CategoryRepo::list_with_rules(&state.pool).await?;
    Ok(Json(DataResponse { data: categories }))
}

/// POST /api/v1/categories
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateCategory>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;

    let category = CategoryRepo::create(&state.pool, &input).await?;
    tracing::info!(id = category.id, name = %category.name, "Category created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: category })))
}

/// GET /api/v1/categories/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let category = CategoryRepo::find_with_rules(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse { data: category }))
}

/// PUT /api/v1/categories/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCategory>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;

    let category = CategoryRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(id, "Category updated");
    Ok(Json(DataResponse { data: category }))
}

/// DELETE /api/v1/categories/{id}
///
/// Removes the category from every preset and template and drops the
/// snapshots taken under it.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !CategoryRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/categories/{id}/copy
///
/// Copies the category together with its rule memberships.
pub async fn copy(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let copy = CategoryRepo::copy(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    tracing::info!(
        source_id = id,
        id = copy.category.id,
        rules = copy.rules.len(),
        "Category copied"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: copy })))
}

// ---------------------------------------------------------------------------
// Rule membership
// ---------------------------------------------------------------------------

/// GET /api/v1/categories/{id}/rules
pub async fn list_rules(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    CategoryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;

    let rules = CategoryRepo::list_rules(&state.pool, id).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// POST /api/v1/categories/{id}/rules
///
/// Appends the rule at the end of the category.
pub async fn add_rule(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AddRuleRequest>,
) -> AppResult<impl IntoResponse> {
    let membership = CategoryRepo::add_rule(&state.pool, id, input.rule_id).await?;
    tracing::info!(
        category_id = id,
        rule_id = input.rule_id,
        sort_order = membership.sort_order,
        "Rule added to category"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: membership })))
}

/// PUT /api/v1/categories/{id}/rules/reorder
///
/// Rewrites the rule order to `0..n` following the request list.
pub async fn reorder_rules(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ReorderRulesRequest>,
) -> AppResult<impl IntoResponse> {
    let rules = CategoryRepo::set_rule_order(&state.pool, id, &input.category_rule_ids).await?;
    tracing::info!(category_id = id, count = rules.len(), "Category rules reordered");
    Ok(Json(DataResponse { data: rules }))
}

/// DELETE /api/v1/category-rules/{id}
///
/// `id` is the membership id, not the rule id.
pub async fn remove_rule(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !CategoryRepo::remove_rule(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "CategoryRule",
            id,
        }));
    }
    tracing::info!(id, "Rule removed from category");
    Ok(StatusCode::NO_CONTENT)
}
